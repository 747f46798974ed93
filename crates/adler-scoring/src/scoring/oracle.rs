use std::sync::Arc;

use super::domain::{
    CompletionState, ContainerId, ElementId, ElementReference, GradeSignal, LearningElement,
    ScoreError, ScoreMetadata, UserId,
};

/// Completion tracking as exposed by the host platform.
pub trait CompletionOracle: Send + Sync {
    fn is_enabled(&self, element: &LearningElement) -> Result<bool, OracleError>;
    fn state(&self, element: &LearningElement, user: UserId)
        -> Result<CompletionState, OracleError>;
}

/// Gradebook lookup for graded elements.
pub trait GradeOracle: Send + Sync {
    /// Best grade of the user, or `None` without any graded submission.
    fn grade(
        &self,
        element: &LearningElement,
        user: UserId,
    ) -> Result<Option<GradeSignal>, OracleError>;
}

pub trait ScoreMetadataStore: Send + Sync {
    fn get(&self, element_id: ElementId) -> Result<Option<ScoreMetadata>, OracleError>;
}

pub trait EnrollmentCheck: Send + Sync {
    fn is_enrolled(&self, container_id: ContainerId, user: UserId) -> Result<bool, OracleError>;
}

pub trait ContainerScoringCheck: Send + Sync {
    fn is_scored(&self, container_id: ContainerId) -> Result<bool, OracleError>;
}

/// Maps raw element ids to the platform's element references.
pub trait ElementDirectory: Send + Sync {
    fn resolve(&self, element_id: ElementId) -> Result<Option<ElementReference>, OracleError>;
}

/// Failure talking to one of the platform collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl From<OracleError> for ScoreError {
    fn from(value: OracleError) -> Self {
        match value {
            OracleError::Unavailable(reason) => ScoreError::OracleUnavailable { reason },
        }
    }
}

/// The set of platform collaborators a scorer reads from.
#[derive(Clone)]
pub struct Oracles {
    pub completion: Arc<dyn CompletionOracle>,
    pub grades: Arc<dyn GradeOracle>,
    pub metadata: Arc<dyn ScoreMetadataStore>,
    pub enrollment: Arc<dyn EnrollmentCheck>,
    pub containers: Arc<dyn ContainerScoringCheck>,
    pub directory: Arc<dyn ElementDirectory>,
}

impl Oracles {
    /// Wire every collaborator to one platform adapter.
    pub fn from_platform<P>(platform: Arc<P>) -> Self
    where
        P: CompletionOracle
            + GradeOracle
            + ScoreMetadataStore
            + EnrollmentCheck
            + ContainerScoringCheck
            + ElementDirectory
            + 'static,
    {
        Self {
            completion: platform.clone(),
            grades: platform.clone(),
            metadata: platform.clone(),
            enrollment: platform.clone(),
            containers: platform.clone(),
            directory: platform,
        }
    }
}
