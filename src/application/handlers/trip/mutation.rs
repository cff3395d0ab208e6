//! Read, compute, compare-and-swap, retry.
//!
//! Every trip write in the crate goes through [`TripMutator::mutate`]. The
//! closure receives a freshly read trip on every attempt and must derive
//! the next value from it alone; nothing computed on an earlier attempt is
//! reused.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MutationConfig;
use crate::application::handlers::publish_best_effort;
use crate::domain::foundation::{CommandMetadata, EventId, Timestamp, TripId};
use crate::domain::trip::{Trip, TripError, TripMutated};
use crate::ports::{EventPublisher, StoreError, TripStore};

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max.max(base);
        self
    }

    /// Ceiling of the wait after the given failed attempt (1-based).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Wait after the given failed attempt: half the ceiling plus a random
    /// share of the other half, so colliding writers spread out.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt).as_millis() as u64;
        let half = ceiling / 2;
        let jitter = if ceiling > half {
            rand::thread_rng().gen_range(0..=ceiling - half)
        } else {
            0
        };
        Duration::from_millis(half + jitter)
    }
}

impl From<&MutationConfig> for RetryPolicy {
    fn from(config: &MutationConfig) -> Self {
        RetryPolicy::default()
            .with_max_attempts(config.max_attempts)
            .with_backoff(config.base_backoff(), config.max_backoff())
    }
}

/// Result of a successful mutation.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// The committed value, or the current one when nothing needed writing.
    pub trip: Trip,
    pub attempts: u32,
    pub written: bool,
}

/// Shared compare-and-swap loop used by every trip command.
#[derive(Clone)]
pub struct TripMutator {
    store: Arc<dyn TripStore>,
    event_publisher: Arc<dyn EventPublisher>,
    policy: RetryPolicy,
}

impl TripMutator {
    pub fn new(
        store: Arc<dyn TripStore>,
        event_publisher: Arc<dyn EventPublisher>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            event_publisher,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn TripStore> {
        &self.store
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Applies `compute` to the current trip until a write lands.
    ///
    /// `compute` returns `Ok(None)` when the trip already has the desired
    /// shape; no write is issued in that case. Domain errors from `compute`
    /// end the loop immediately.
    pub async fn mutate<F>(
        &self,
        trip_id: &TripId,
        operation: &'static str,
        metadata: &CommandMetadata,
        mut compute: F,
    ) -> Result<MutationOutcome, TripError>
    where
        F: FnMut(&Trip) -> Result<Option<Trip>, TripError> + Send,
    {
        for attempt in 1..=self.policy.max_attempts {
            let current = self.store.get(trip_id).await?;
            let next = match compute(&current)? {
                Some(next) => next,
                None => {
                    return Ok(MutationOutcome {
                        trip: current,
                        attempts: attempt,
                        written: false,
                    })
                }
            };

            match self
                .store
                .compare_and_swap(trip_id, current.version(), &next)
                .await
            {
                Ok(committed) => {
                    tracing::debug!(
                        trip_id = %trip_id,
                        operation,
                        version = committed.version().value(),
                        attempt,
                        "trip mutation committed"
                    );
                    self.publish_mutated(&committed, operation, metadata, attempt)
                        .await;
                    return Ok(MutationOutcome {
                        trip: committed,
                        attempts: attempt,
                        written: true,
                    });
                }
                Err(StoreError::VersionConflict { expected, actual }) => {
                    tracing::debug!(
                        trip_id = %trip_id,
                        operation,
                        expected = expected.value(),
                        actual = actual.value(),
                        attempt,
                        "version conflict, retrying"
                    );
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }

        tracing::warn!(
            trip_id = %trip_id,
            operation,
            attempts = self.policy.max_attempts,
            "gave up after repeated version conflicts"
        );
        Err(TripError::ConcurrentModification {
            attempts: self.policy.max_attempts,
        })
    }

    async fn publish_mutated(
        &self,
        trip: &Trip,
        operation: &'static str,
        metadata: &CommandMetadata,
        attempts: u32,
    ) {
        let event = TripMutated {
            event_id: EventId::new(),
            trip_id: *trip.id(),
            operation: operation.to_string(),
            version: trip.version(),
            actor: metadata.actor.clone(),
            attempts,
            occurred_at: Timestamp::now(),
        };
        publish_best_effort(self.event_publisher.as_ref(), &event, metadata).await;
    }
}
