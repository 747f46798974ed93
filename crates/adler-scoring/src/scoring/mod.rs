//! Achievement scoring for learning elements.
//!
//! Primitive elements are scored from their completion state and only earn the
//! full score or nothing. Interactive elements are scored linearly from their
//! grade. Platform state is read through the traits in [`oracle`].

pub mod batch;
pub mod calculator;
pub mod concurrent;
pub mod domain;
pub mod oracle;
pub mod scorer;
pub mod user;

#[cfg(test)]
mod tests;

pub use batch::{BatchError, BatchScoreAggregator, BatchScores};
pub use concurrent::{BatchOptions, ConcurrentBatchScorer};
pub use domain::{
    AchievementSignal, CompletionState, ContainerId, ElementId, ElementKind, ElementReference,
    GradeSignal, LearningElement, ScoreError, ScoreMetadata, ScoreResult, UserId,
};
pub use oracle::{
    CompletionOracle, ContainerScoringCheck, ElementDirectory, EnrollmentCheck, GradeOracle,
    OracleError, Oracles, ScoreMetadataStore,
};
pub use scorer::ElementScorer;
pub use user::{resolve_user, CurrentUser};
