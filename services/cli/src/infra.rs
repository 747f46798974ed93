use adler_scoring::error::AppError;
use adler_scoring::housekeeping::{RepositoryError, ScoreRecordRepository};
use adler_scoring::scoring::{
    CompletionOracle, CompletionState, ContainerId, ContainerScoringCheck, ElementDirectory,
    ElementId, ElementReference, EnrollmentCheck, GradeOracle, GradeSignal, LearningElement,
    OracleError, ScoreMetadata, ScoreMetadataStore, UserId,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Serialized view of the platform tables the scorer reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PlatformSnapshot {
    pub(crate) elements: Vec<ElementReference>,
    pub(crate) score_items: Vec<ScoreMetadata>,
    pub(crate) scored_containers: Vec<ContainerId>,
    pub(crate) enrollments: Vec<Enrollment>,
    pub(crate) completion_tracked: Vec<ElementId>,
    pub(crate) completions: Vec<CompletionRecord>,
    pub(crate) grades: Vec<GradeRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Enrollment {
    pub(crate) container_id: ContainerId,
    pub(crate) user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CompletionRecord {
    pub(crate) element_id: ElementId,
    pub(crate) user_id: UserId,
    pub(crate) state: CompletionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct GradeRecord {
    pub(crate) element_id: ElementId,
    pub(crate) user_id: UserId,
    #[serde(flatten)]
    pub(crate) grade: GradeSignal,
}

impl PlatformSnapshot {
    pub(crate) fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub(crate) fn save(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Platform adapter backed by an in-memory snapshot.
#[derive(Debug, Default)]
pub(crate) struct SnapshotPlatform {
    snapshot: Mutex<PlatformSnapshot>,
}

impl SnapshotPlatform {
    pub(crate) fn new(snapshot: PlatformSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub(crate) fn snapshot(&self) -> Result<PlatformSnapshot, OracleError> {
        Ok(self.read()?.clone())
    }

    /// Lock for the oracle side, which only reads.
    fn read(&self) -> Result<MutexGuard<'_, PlatformSnapshot>, OracleError> {
        self.snapshot
            .lock()
            .map_err(|_| OracleError::Unavailable("snapshot lock poisoned".to_string()))
    }

    /// Lock for the score-record side, which both reads and deletes.
    fn lock_records(&self) -> Result<MutexGuard<'_, PlatformSnapshot>, RepositoryError> {
        self.snapshot
            .lock()
            .map_err(|_| RepositoryError::Unavailable("snapshot lock poisoned".to_string()))
    }
}

impl CompletionOracle for SnapshotPlatform {
    fn is_enabled(&self, element: &LearningElement) -> Result<bool, OracleError> {
        Ok(self.read()?.completion_tracked.contains(&element.id))
    }

    fn state(
        &self,
        element: &LearningElement,
        user: UserId,
    ) -> Result<CompletionState, OracleError> {
        Ok(self
            .read()?
            .completions
            .iter()
            .find(|record| record.element_id == element.id && record.user_id == user)
            .map(|record| record.state)
            .unwrap_or_default())
    }
}

impl GradeOracle for SnapshotPlatform {
    fn grade(
        &self,
        element: &LearningElement,
        user: UserId,
    ) -> Result<Option<GradeSignal>, OracleError> {
        Ok(self
            .read()?
            .grades
            .iter()
            .filter(|record| record.element_id == element.id && record.user_id == user)
            .map(|record| record.grade)
            .max_by(|left, right| left.raw.total_cmp(&right.raw)))
    }
}

impl ScoreMetadataStore for SnapshotPlatform {
    fn get(&self, element_id: ElementId) -> Result<Option<ScoreMetadata>, OracleError> {
        Ok(self
            .read()?
            .score_items
            .iter()
            .find(|item| item.element_id == element_id)
            .copied())
    }
}

impl EnrollmentCheck for SnapshotPlatform {
    fn is_enrolled(&self, container_id: ContainerId, user: UserId) -> Result<bool, OracleError> {
        Ok(self.read()?.enrollments.contains(&Enrollment {
            container_id,
            user_id: user,
        }))
    }
}

impl ContainerScoringCheck for SnapshotPlatform {
    fn is_scored(&self, container_id: ContainerId) -> Result<bool, OracleError> {
        Ok(self.read()?.scored_containers.contains(&container_id))
    }
}

impl ElementDirectory for SnapshotPlatform {
    fn resolve(&self, element_id: ElementId) -> Result<Option<ElementReference>, OracleError> {
        Ok(self
            .read()?
            .elements
            .iter()
            .find(|reference| reference.id() == element_id)
            .cloned())
    }
}

impl ScoreRecordRepository for SnapshotPlatform {
    fn element_ids(&self) -> Result<Vec<ElementId>, RepositoryError> {
        Ok(self
            .lock_records()?
            .score_items
            .iter()
            .map(|item| item.element_id)
            .collect())
    }

    fn delete_element(&self, element_id: ElementId) -> Result<bool, RepositoryError> {
        let mut guard = self.lock_records()?;
        let before = guard.score_items.len();
        guard.score_items.retain(|item| item.element_id != element_id);
        Ok(guard.score_items.len() != before)
    }

    fn is_container_registered(&self, container_id: ContainerId) -> Result<bool, RepositoryError> {
        Ok(self.lock_records()?.scored_containers.contains(&container_id))
    }

    fn unregister_container(&self, container_id: ContainerId) -> Result<bool, RepositoryError> {
        let mut guard = self.lock_records()?;
        let before = guard.scored_containers.len();
        guard.scored_containers.retain(|id| *id != container_id);
        Ok(guard.scored_containers.len() != before)
    }
}
