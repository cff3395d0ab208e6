//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod profile;
pub mod trip;

use serde::Serialize;

use crate::domain::foundation::{CommandMetadata, DomainEvent, EventEnvelope};
use crate::ports::EventPublisher;

/// Publishes `event` after the owning write has committed.
///
/// Failures are logged and reported as `false`; the committed state is
/// never rolled back because of the bus.
pub(crate) async fn publish_best_effort<E>(
    publisher: &dyn EventPublisher,
    event: &E,
    metadata: &CommandMetadata,
) -> bool
where
    E: DomainEvent + Serialize,
{
    let envelope = match EventEnvelope::from_event(event) {
        Ok(envelope) => envelope
            .with_correlation_id(metadata.correlation_id())
            .with_actor_id(metadata.actor.to_string()),
        Err(e) => {
            tracing::warn!(event_type = event.event_type(), error = %e, "event serialization failed");
            return false;
        }
    };
    match publisher.publish(envelope).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                error = %e,
                "event publish failed"
            );
            false
        }
    }
}
