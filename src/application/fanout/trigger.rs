//! Event handler that turns display-field edits into fan-out jobs.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::domain::profile::ProfileDisplayFieldsUpdated;
use crate::ports::EventHandler;

use super::worker::FanoutQueue;

/// Subscribed to `profile.display_fields_updated.v1`. Only the profile id
/// is taken from the payload; the engine re-reads everything else.
///
/// A full queue parks the profile rather than failing the event.
pub struct FanoutTrigger {
    queue: FanoutQueue,
}

impl FanoutTrigger {
    pub fn new(queue: FanoutQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl EventHandler for FanoutTrigger {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let payload: ProfileDisplayFieldsUpdated = event.payload_as().map_err(|e| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("malformed {} payload: {}", event.event_type, e),
            )
        })?;

        match self.queue.enqueue_or_park(payload.profile_id.clone()) {
            Ok(false) => Ok(()),
            Ok(true) => {
                tracing::debug!(profile_id = %payload.profile_id, "fan-out queue full, profile parked");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(profile_id = %payload.profile_id, error = %e, "fan-out not queued");
                Err(DomainError::new(ErrorCode::InternalError, e.to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        "fanout_trigger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::pid;
    use crate::domain::foundation::{EventId, Timestamp};
    use crate::domain::profile::{ContactHandle, DisplayName};

    fn envelope(id: &str) -> EventEnvelope {
        EventEnvelope::from_event(&ProfileDisplayFieldsUpdated {
            event_id: EventId::new(),
            profile_id: pid(id),
            display_name: DisplayName::new("Ed").unwrap(),
            contact_handle: ContactHandle::new("+1555").unwrap(),
            updated_at: Timestamp::now(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn enqueues_profile_id() {
        let (queue, mut receiver) = FanoutQueue::bounded(4);
        let trigger = FanoutTrigger::new(queue);

        trigger.handle(envelope("ed")).await.unwrap();

        let job = receiver.recv().await.unwrap();
        assert_eq!(job.profile_id, pid("ed"));
        assert_eq!(job.pass, 0);
    }

    #[tokio::test]
    async fn full_queue_defers_instead_of_dropping() {
        let (queue, mut receiver) = FanoutQueue::bounded(1);
        let trigger = FanoutTrigger::new(queue);
        trigger.handle(envelope("a")).await.unwrap();

        trigger.handle(envelope("b")).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap().profile_id, pid("a"));
        assert_eq!(receiver.recv().await.unwrap().profile_id, pid("b"));
    }

    #[tokio::test]
    async fn stopped_worker_surfaces_as_error() {
        let (queue, receiver) = FanoutQueue::bounded(1);
        drop(receiver);
        let trigger = FanoutTrigger::new(queue);

        let result = trigger.handle(envelope("a")).await;

        assert_eq!(result.unwrap_err().code, ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn garbage_payload_is_rejected() {
        let (queue, _receiver) = FanoutQueue::bounded(1);
        let trigger = FanoutTrigger::new(queue);

        let result = trigger.handle(EventEnvelope::test_fixture()).await;

        assert_eq!(result.unwrap_err().code, ErrorCode::ValidationFailed);
    }
}
