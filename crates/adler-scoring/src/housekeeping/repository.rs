use crate::scoring::{ContainerId, ElementId};

/// Writable side of the score-record tables.
pub trait ScoreRecordRepository: Send + Sync {
    /// Ids of every element that currently has a score record.
    fn element_ids(&self) -> Result<Vec<ElementId>, RepositoryError>;
    /// Returns `false` when there was no record to delete.
    fn delete_element(&self, element_id: ElementId) -> Result<bool, RepositoryError>;
    fn is_container_registered(&self, container_id: ContainerId) -> Result<bool, RepositoryError>;
    /// Returns `false` when the container was not registered.
    fn unregister_container(&self, container_id: ContainerId) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
