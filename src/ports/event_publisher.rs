//! EventPublisher port - publishing domain events after a commit.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Publishing happens after the owning record has committed, so a failure
/// here never rolls back state. Callers log and continue.
///
/// ```ignore
/// let envelope = EventEnvelope::from_event(&trip_mutated)?;
/// publisher.publish(envelope).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publishes in order, stopping at the first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
