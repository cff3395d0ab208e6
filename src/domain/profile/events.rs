//! Profile domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, ProfileId, Timestamp};
use crate::domain_event;

use super::{ContactHandle, DisplayName};

/// Routing key of [`ProfileDisplayFieldsUpdated`].
pub const PROFILE_DISPLAY_FIELDS_UPDATED: &str = "profile.display_fields_updated.v1";

/// Published after a display-field edit commits in the directory.
///
/// Consumers must not trust the carried values as current; fan-out re-reads
/// the profile so that replays converge on the latest state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDisplayFieldsUpdated {
    pub event_id: EventId,
    pub profile_id: ProfileId,
    pub display_name: DisplayName,
    pub contact_handle: ContactHandle,
    pub updated_at: Timestamp,
}

domain_event!(
    ProfileDisplayFieldsUpdated,
    event_type = "profile.display_fields_updated.v1",
    aggregate_id = profile_id,
    aggregate_type = "Profile",
    occurred_at = updated_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, EventEnvelope};

    #[test]
    fn event_type_matches_routing_constant() {
        let event = ProfileDisplayFieldsUpdated {
            event_id: EventId::new(),
            profile_id: ProfileId::new("alice").unwrap(),
            display_name: DisplayName::new("Alice").unwrap(),
            contact_handle: ContactHandle::new("+1555").unwrap(),
            updated_at: Timestamp::now(),
        };

        assert_eq!(event.event_type(), PROFILE_DISPLAY_FIELDS_UPDATED);

        let envelope = EventEnvelope::from_event(&event).unwrap();
        assert_eq!(envelope.aggregate_id, "alice");
        let back: ProfileDisplayFieldsUpdated = envelope.payload_as().unwrap();
        assert_eq!(back, event);
    }
}
