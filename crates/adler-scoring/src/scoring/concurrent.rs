//! Parallel batch scoring with per-element timeouts.
//!
//! Oracle calls are blocking, so every lookup runs on tokio's blocking pool.
//! A timed-out lookup keeps running there and keeps its concurrency permit
//! until it returns; its late result is discarded.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::batch::{BatchError, BatchScoreAggregator, BatchScores};
use super::domain::{ElementId, ElementReference, ScoreError, ScoreResult, UserId};
use super::oracle::OracleError;
use crate::config::ScoringConfig;

/// Limits applied to a concurrent batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub max_concurrency: usize,
    pub oracle_timeout: Duration,
    pub oracle_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            oracle_timeout: Duration::from_millis(2000),
            oracle_retries: 0,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl From<&ScoringConfig> for BatchOptions {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            max_concurrency: config.batch_concurrency,
            oracle_timeout: config.oracle_timeout,
            oracle_retries: config.oracle_retries,
            retry_backoff: config.retry_backoff,
        }
    }
}

pub struct ConcurrentBatchScorer {
    aggregator: Arc<BatchScoreAggregator>,
    options: BatchOptions,
    permits: Arc<Semaphore>,
}

impl ConcurrentBatchScorer {
    pub fn new(aggregator: Arc<BatchScoreAggregator>, options: BatchOptions) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
        Self {
            aggregator,
            options,
            permits,
        }
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Same contract as [`BatchScoreAggregator::scores_for`], with lookups in parallel.
    pub async fn scores_for<I>(&self, elements: I, user: UserId) -> Result<BatchScores, BatchError>
    where
        I: IntoIterator<Item = ElementId>,
    {
        let requested: BTreeSet<ElementId> = elements.into_iter().collect();
        let aggregator = Arc::clone(&self.aggregator);
        let admitted =
            match tokio::task::spawn_blocking(move || aggregator.authorize(requested, user)).await {
                Ok(result) => result?,
                Err(join_error) => {
                    return Err(BatchError::Unavailable(OracleError::Unavailable(format!(
                        "authorization task failed: {join_error}"
                    ))))
                }
            };

        let handles: Vec<_> = admitted
            .into_iter()
            .map(|reference| {
                let element_id = reference.id();
                let task = score_with_retry(
                    Arc::clone(&self.aggregator),
                    Arc::clone(&self.permits),
                    self.options,
                    reference,
                    user,
                );
                (element_id, tokio::spawn(task))
            })
            .collect();

        let mut slots = Vec::with_capacity(handles.len());
        for (element_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    warn!(%element_id, error = %join_error, "scoring task aborted");
                    Err(ScoreError::OracleUnavailable {
                        reason: format!("scoring task failed: {join_error}"),
                    })
                }
            };
            slots.push((element_id, result));
        }

        Ok(slots.into_iter().collect())
    }
}

async fn score_with_retry(
    aggregator: Arc<BatchScoreAggregator>,
    permits: Arc<Semaphore>,
    options: BatchOptions,
    reference: ElementReference,
    user: UserId,
) -> ScoreResult {
    let mut attempt = 0;
    loop {
        let result = score_once(
            &aggregator,
            Arc::clone(&permits),
            options.oracle_timeout,
            reference.clone(),
            user,
        )
        .await;

        match result {
            Err(error) if error.is_transient() && attempt < options.oracle_retries => {
                attempt += 1;
                debug!(element_id = %reference.id(), attempt, %error, "retrying element score");
                tokio::time::sleep(retry_delay(options.retry_backoff, attempt)).await;
            }
            other => return other,
        }
    }
}

/// Linear backoff, saturating instead of overflowing.
pub(crate) fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

async fn score_once(
    aggregator: &Arc<BatchScoreAggregator>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    reference: ElementReference,
    user: UserId,
) -> ScoreResult {
    let permit = permits
        .acquire_owned()
        .await
        .map_err(|_| ScoreError::OracleUnavailable {
            reason: "scoring permits closed".to_string(),
        })?;

    let element_id = reference.id();
    let aggregator = Arc::clone(aggregator);
    // The permit lives as long as the lookup, not the wait for it.
    let lookup = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        aggregator.scorer().score_reference(reference, user)
    });

    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ScoreError::OracleUnavailable {
            reason: format!("scoring task failed: {join_error}"),
        }),
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(%element_id, timeout_ms, "oracle lookup timed out");
            Err(ScoreError::OracleUnavailable {
                reason: format!("timed out after {timeout_ms} ms"),
            })
        }
    }
}
