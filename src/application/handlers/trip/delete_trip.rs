//! DeleteTripHandler - Command handler for deleting a trip.
//!
//! Only the owner may delete. The delete itself is version-guarded like any
//! other write, so a trip that changed between the read and the delete is
//! re-read and re-authorized. Membership cleanup runs after the trip is
//! gone and is best-effort: a profile left pointing at a deleted trip is
//! harmless because fan-out skips missing trips.

use std::sync::Arc;

use crate::application::handlers::publish_best_effort;
use crate::application::handlers::trip::RetryPolicy;
use crate::domain::foundation::{CommandMetadata, EventId, ProfileId, Timestamp, TripId};
use crate::domain::trip::{Permission, TripDeleted, TripError};
use crate::ports::{EventPublisher, ProfileDirectory, StoreError, TripStore};

#[derive(Debug, Clone)]
pub struct DeleteTripCommand {
    pub trip_id: TripId,
}

#[derive(Debug, Clone)]
pub struct DeleteTripResult {
    pub trip_id: TripId,
    /// Profiles whose `member_of` no longer lists the trip.
    pub memberships_removed: Vec<ProfileId>,
    /// Profiles whose membership could not be removed.
    pub membership_failures: Vec<ProfileId>,
}

pub struct DeleteTripHandler {
    store: Arc<dyn TripStore>,
    directory: Arc<dyn ProfileDirectory>,
    event_publisher: Arc<dyn EventPublisher>,
    policy: RetryPolicy,
}

impl DeleteTripHandler {
    pub fn new(
        store: Arc<dyn TripStore>,
        directory: Arc<dyn ProfileDirectory>,
        event_publisher: Arc<dyn EventPublisher>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            event_publisher,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: DeleteTripCommand,
        metadata: CommandMetadata,
    ) -> Result<DeleteTripResult, TripError> {
        // 1. Version-guarded delete, re-authorizing on every attempt
        let mut deleted = None;
        for attempt in 1..=self.policy.max_attempts {
            let trip = self.store.get(&cmd.trip_id).await?;
            trip.authorize(&metadata.actor, Permission::Manage)?;

            match self.store.delete(&cmd.trip_id, trip.version()).await {
                Ok(()) => {
                    deleted = Some(trip);
                    break;
                }
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(trip_id = %cmd.trip_id, attempt, "delete raced a write, retrying");
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.backoff(attempt)).await;
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }
        let trip = deleted.ok_or(TripError::ConcurrentModification {
            attempts: self.policy.max_attempts,
        })?;

        // 2. Drop the trip from every participant's membership set
        let mut memberships_removed = Vec::new();
        let mut membership_failures = Vec::new();
        for participant in trip.participants() {
            match self
                .directory
                .remove_membership(&participant.profile_id, trip.id())
                .await
            {
                Ok(()) => memberships_removed.push(participant.profile_id.clone()),
                Err(e) => {
                    tracing::warn!(
                        trip_id = %trip.id(),
                        profile_id = %participant.profile_id,
                        error = %e,
                        "membership cleanup failed after delete"
                    );
                    membership_failures.push(participant.profile_id.clone());
                }
            }
        }

        tracing::info!(trip_id = %trip.id(), "trip deleted");

        // 3. Announce
        let event = TripDeleted {
            event_id: EventId::new(),
            trip_id: *trip.id(),
            actor: metadata.actor.clone(),
            occurred_at: Timestamp::now(),
        };
        publish_best_effort(self.event_publisher.as_ref(), &event, &metadata).await;

        Ok(DeleteTripResult {
            trip_id: *trip.id(),
            memberships_removed,
            membership_failures,
        })
    }
}
