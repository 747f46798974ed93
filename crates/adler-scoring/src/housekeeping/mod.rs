//! Score-record cleanup after platform deletions.
//!
//! Score metadata lives outside the platform's own tables, so deleting a course
//! or course module leaves records behind unless they are purged here.

pub mod repository;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scoring::{ContainerId, ElementDirectory, ElementId, OracleError};

pub use repository::{RepositoryError, ScoreRecordRepository};

/// Deletion events relevant to score records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlatformEvent {
    ContainerDeleted {
        container_id: ContainerId,
    },
    ContainerContentDeleted {
        container_id: ContainerId,
    },
    ElementDeleted {
        element_id: ElementId,
        container_id: ContainerId,
    },
}

/// What a cleanup run removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub container_unregistered: bool,
    pub removed_elements: Vec<ElementId>,
}

#[derive(Debug, thiserror::Error)]
pub enum HousekeepingError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] OracleError),
}

pub struct ScoreHousekeeper<R, D> {
    records: Arc<R>,
    directory: Arc<D>,
}

impl<R, D> ScoreHousekeeper<R, D>
where
    R: ScoreRecordRepository + 'static,
    D: ElementDirectory + 'static,
{
    pub fn new(records: Arc<R>, directory: Arc<D>) -> Self {
        Self { records, directory }
    }

    pub fn handle(&self, event: PlatformEvent) -> Result<CleanupSummary, HousekeepingError> {
        match event {
            PlatformEvent::ContainerDeleted { container_id } => {
                self.on_container_deleted(container_id)
            }
            PlatformEvent::ContainerContentDeleted { container_id } => {
                debug!(%container_id, "container content deleted");
                self.on_container_content_deleted()
            }
            PlatformEvent::ElementDeleted {
                element_id,
                container_id,
            } => self.on_element_deleted(element_id, container_id),
        }
    }

    /// Unregister the container and purge records its elements left behind.
    pub fn on_container_deleted(
        &self,
        container_id: ContainerId,
    ) -> Result<CleanupSummary, HousekeepingError> {
        let container_unregistered = self.records.unregister_container(container_id)?;
        let mut summary = self.on_container_content_deleted()?;
        summary.container_unregistered = container_unregistered;

        info!(
            %container_id,
            container_unregistered,
            removed = summary.removed_elements.len(),
            "container score records cleaned up"
        );
        Ok(summary)
    }

    /// Delete every score record whose element no longer exists.
    pub fn on_container_content_deleted(&self) -> Result<CleanupSummary, HousekeepingError> {
        let mut removed_elements = Vec::new();
        for element_id in self.records.element_ids()? {
            if self.directory.resolve(element_id)?.is_some() {
                continue;
            }
            if self.records.delete_element(element_id)? {
                removed_elements.push(element_id);
            }
        }

        if !removed_elements.is_empty() {
            info!(removed = removed_elements.len(), "orphaned score records purged");
        }
        Ok(CleanupSummary {
            container_unregistered: false,
            removed_elements,
        })
    }

    /// Drop the element's record, but only for containers that take part in scoring.
    pub fn on_element_deleted(
        &self,
        element_id: ElementId,
        container_id: ContainerId,
    ) -> Result<CleanupSummary, HousekeepingError> {
        if !self.records.is_container_registered(container_id)? {
            debug!(%element_id, %container_id, "element outside scored container, nothing to clean");
            return Ok(CleanupSummary::default());
        }

        let mut summary = CleanupSummary::default();
        if self.records.delete_element(element_id)? {
            info!(%element_id, %container_id, "element score record deleted");
            summary.removed_elements.push(element_id);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ElementKind, ElementReference, LearningElement};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    const COURSE: ContainerId = ContainerId(3);

    #[derive(Default)]
    struct MemoryRecords {
        elements: Mutex<BTreeSet<ElementId>>,
        containers: Mutex<BTreeSet<ContainerId>>,
    }

    impl MemoryRecords {
        fn with(elements: &[i64], containers: &[ContainerId]) -> Self {
            Self {
                elements: Mutex::new(elements.iter().copied().map(ElementId).collect()),
                containers: Mutex::new(containers.iter().copied().collect()),
            }
        }

        fn remaining(&self) -> Vec<ElementId> {
            self.elements
                .lock()
                .expect("records mutex poisoned")
                .iter()
                .copied()
                .collect()
        }

        fn registered(&self, container_id: ContainerId) -> bool {
            self.containers
                .lock()
                .expect("records mutex poisoned")
                .contains(&container_id)
        }
    }

    impl ScoreRecordRepository for MemoryRecords {
        fn element_ids(&self) -> Result<Vec<ElementId>, RepositoryError> {
            Ok(self.remaining())
        }

        fn delete_element(&self, element_id: ElementId) -> Result<bool, RepositoryError> {
            Ok(self
                .elements
                .lock()
                .expect("records mutex poisoned")
                .remove(&element_id))
        }

        fn is_container_registered(
            &self,
            container_id: ContainerId,
        ) -> Result<bool, RepositoryError> {
            Ok(self.registered(container_id))
        }

        fn unregister_container(&self, container_id: ContainerId) -> Result<bool, RepositoryError> {
            Ok(self
                .containers
                .lock()
                .expect("records mutex poisoned")
                .remove(&container_id))
        }
    }

    struct OfflineRecords;

    impl ScoreRecordRepository for OfflineRecords {
        fn element_ids(&self) -> Result<Vec<ElementId>, RepositoryError> {
            Err(RepositoryError::Unavailable("database offline".to_string()))
        }

        fn delete_element(&self, _element_id: ElementId) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Unavailable("database offline".to_string()))
        }

        fn is_container_registered(
            &self,
            _container_id: ContainerId,
        ) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Unavailable("database offline".to_string()))
        }

        fn unregister_container(
            &self,
            _container_id: ContainerId,
        ) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Unavailable("database offline".to_string()))
        }
    }

    #[derive(Default)]
    struct LiveElements(BTreeMap<ElementId, ElementReference>);

    impl LiveElements {
        fn with(ids: &[i64]) -> Self {
            Self(
                ids.iter()
                    .map(|id| {
                        let element = LearningElement {
                            id: ElementId(*id),
                            container_id: COURSE,
                            kind: ElementKind::Primitive,
                        };
                        (ElementId(*id), ElementReference::Resolved(element))
                    })
                    .collect(),
            )
        }
    }

    impl ElementDirectory for LiveElements {
        fn resolve(&self, element_id: ElementId) -> Result<Option<ElementReference>, OracleError> {
            Ok(self.0.get(&element_id).cloned())
        }
    }

    fn housekeeper(
        records: MemoryRecords,
        live: &[i64],
    ) -> (
        ScoreHousekeeper<MemoryRecords, LiveElements>,
        Arc<MemoryRecords>,
    ) {
        let records = Arc::new(records);
        let housekeeper =
            ScoreHousekeeper::new(records.clone(), Arc::new(LiveElements::with(live)));
        (housekeeper, records)
    }

    #[test]
    fn content_deletion_purges_only_orphans() {
        let (housekeeper, records) =
            housekeeper(MemoryRecords::with(&[1, 2, 3, 11, 12], &[COURSE]), &[1, 2, 3]);

        let summary = housekeeper
            .on_container_content_deleted()
            .expect("cleanup succeeds");

        assert_eq!(summary.removed_elements, vec![ElementId(11), ElementId(12)]);
        assert!(!summary.container_unregistered);
        assert_eq!(records.remaining(), vec![ElementId(1), ElementId(2), ElementId(3)]);
        assert!(records.registered(COURSE));
    }

    #[test]
    fn container_deletion_unregisters_and_purges() {
        let (housekeeper, records) =
            housekeeper(MemoryRecords::with(&[1, 2, 7], &[COURSE]), &[7]);

        let summary = housekeeper
            .handle(PlatformEvent::ContainerDeleted {
                container_id: COURSE,
            })
            .expect("cleanup succeeds");

        assert!(summary.container_unregistered);
        assert_eq!(summary.removed_elements, vec![ElementId(1), ElementId(2)]);
        assert!(!records.registered(COURSE));
        assert_eq!(records.remaining(), vec![ElementId(7)]);
    }

    #[test]
    fn deleting_unregistered_container_still_purges_orphans() {
        let (housekeeper, _records) = housekeeper(MemoryRecords::with(&[5], &[]), &[]);

        let summary = housekeeper
            .on_container_deleted(ContainerId(8))
            .expect("cleanup succeeds");

        assert!(!summary.container_unregistered);
        assert_eq!(summary.removed_elements, vec![ElementId(5)]);
    }

    #[test]
    fn element_deletion_in_scored_container_removes_its_record() {
        let (housekeeper, records) =
            housekeeper(MemoryRecords::with(&[1, 2], &[COURSE]), &[2]);

        let summary = housekeeper
            .handle(PlatformEvent::ElementDeleted {
                element_id: ElementId(1),
                container_id: COURSE,
            })
            .expect("cleanup succeeds");

        assert_eq!(summary.removed_elements, vec![ElementId(1)]);
        assert_eq!(records.remaining(), vec![ElementId(2)]);
    }

    #[test]
    fn element_deletion_outside_scored_container_is_ignored() {
        let (housekeeper, records) = housekeeper(MemoryRecords::with(&[1], &[]), &[]);

        let summary = housekeeper
            .on_element_deleted(ElementId(1), COURSE)
            .expect("cleanup succeeds");

        assert_eq!(summary, CleanupSummary::default());
        assert_eq!(records.remaining(), vec![ElementId(1)]);
    }

    #[test]
    fn element_without_record_reports_nothing_removed() {
        let (housekeeper, _records) = housekeeper(MemoryRecords::with(&[], &[COURSE]), &[]);

        let summary = housekeeper
            .on_element_deleted(ElementId(9), COURSE)
            .expect("cleanup succeeds");

        assert!(summary.removed_elements.is_empty());
    }

    #[test]
    fn repository_failures_propagate() {
        let housekeeper = ScoreHousekeeper::new(
            Arc::new(OfflineRecords),
            Arc::new(LiveElements::default()),
        );

        match housekeeper.on_container_content_deleted() {
            Err(HousekeepingError::Repository(RepositoryError::Unavailable(reason))) => {
                assert_eq!(reason, "database offline")
            }
            other => panic!("expected repository failure, got {other:?}"),
        }
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: PlatformEvent = serde_json::from_str(
            r#"{"event":"element_deleted","element_id":4,"container_id":3}"#,
        )
        .expect("valid event");

        assert_eq!(
            event,
            PlatformEvent::ElementDeleted {
                element_id: ElementId(4),
                container_id: COURSE,
            }
        );
    }
}
