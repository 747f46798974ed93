use std::collections::{btree_map, BTreeMap, BTreeSet};

use tracing::{info, warn};

use super::domain::{ElementId, ElementReference, ScoreError, ScoreResult, UserId};
use super::oracle::{OracleError, Oracles};
use super::scorer::ElementScorer;

/// Per-element outcome of a batch, one slot for every requested id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchScores(BTreeMap<ElementId, ScoreResult>);

impl BatchScores {
    pub fn get(&self, element_id: ElementId) -> Option<&ScoreResult> {
        self.0.get(&element_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ElementId, ScoreResult> {
        self.0.iter()
    }

    pub fn successes(&self) -> impl Iterator<Item = (ElementId, f64)> + '_ {
        self.0
            .iter()
            .filter_map(|(id, result)| result.as_ref().ok().map(|score| (*id, *score)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (ElementId, &ScoreError)> + '_ {
        self.0
            .iter()
            .filter_map(|(id, result)| result.as_ref().err().map(|error| (*id, error)))
    }

    /// Sum of all successfully computed scores.
    pub fn total(&self) -> f64 {
        self.successes().map(|(_, score)| score).sum()
    }
}

impl FromIterator<(ElementId, ScoreResult)> for BatchScores {
    fn from_iter<T: IntoIterator<Item = (ElementId, ScoreResult)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for BatchScores {
    type Item = (ElementId, ScoreResult);
    type IntoIter = btree_map::IntoIter<ElementId, ScoreResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Caller-wide failure that aborts a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("user not enrolled or elements do not exist: {}", join_ids(.element_ids))]
    AccessDenied { element_ids: Vec<ElementId> },
    #[error("authorization check failed: {0}")]
    Unavailable(#[from] OracleError),
}

fn join_ids(ids: &[ElementId]) -> String {
    ids.iter()
        .map(ElementId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Scores many elements for one user, isolating per-element failures.
pub struct BatchScoreAggregator {
    scorer: ElementScorer,
}

impl BatchScoreAggregator {
    pub fn new(oracles: Oracles) -> Self {
        Self {
            scorer: ElementScorer::new(oracles),
        }
    }

    pub fn scorer(&self) -> &ElementScorer {
        &self.scorer
    }

    /// Resolve the requested ids and check the caller may see every one of them.
    ///
    /// Any unknown id or foreign container denies the whole request; the
    /// offending ids are reported together.
    pub fn authorize<I>(&self, elements: I, user: UserId) -> Result<Vec<ElementReference>, BatchError>
    where
        I: IntoIterator<Item = ElementId>,
    {
        let requested: BTreeSet<ElementId> = elements.into_iter().collect();
        let oracles = self.scorer.oracles();

        let mut admitted = Vec::with_capacity(requested.len());
        let mut denied = Vec::new();
        for element_id in requested {
            match oracles.directory.resolve(element_id)? {
                Some(reference)
                    if oracles
                        .enrollment
                        .is_enrolled(reference.container_id(), user)? =>
                {
                    admitted.push(reference)
                }
                _ => denied.push(element_id),
            }
        }

        if !denied.is_empty() {
            warn!(%user, denied = denied.len(), "batch score request denied");
            return Err(BatchError::AccessDenied {
                element_ids: denied,
            });
        }

        Ok(admitted)
    }

    pub fn scores_for<I>(&self, elements: I, user: UserId) -> Result<BatchScores, BatchError>
    where
        I: IntoIterator<Item = ElementId>,
    {
        let admitted = self.authorize(elements, user)?;
        let scores: BatchScores = admitted
            .into_iter()
            .map(|reference| (reference.id(), self.scorer.score_reference(reference, user)))
            .collect();

        info!(
            %user,
            requested = scores.len(),
            failed = scores.failures().count(),
            "batch scored"
        );
        Ok(scores)
    }

    /// Resolve and score a single id without the batch pre-check.
    pub fn score_one(&self, element_id: ElementId, user: UserId) -> ScoreResult {
        let reference = self
            .scorer
            .oracles()
            .directory
            .resolve(element_id)?
            .ok_or(ScoreError::UnknownElement { element_id })?;
        self.scorer.score_reference(reference, user)
    }
}
