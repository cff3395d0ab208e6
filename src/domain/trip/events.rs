//! Trip domain events.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, ProfileId, Timestamp, TripId, Version};
use crate::domain_event;

pub const TRIP_MUTATED: &str = "trip.mutated.v1";
pub const TRIP_DELETED: &str = "trip.deleted.v1";

/// Published after a trip mutation commits. Audit only; subscribers that
/// need ordered state use the change notifier instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripMutated {
    pub event_id: EventId,
    pub trip_id: TripId,
    pub operation: String,
    pub version: Version,
    pub actor: ProfileId,
    pub attempts: u32,
    pub occurred_at: Timestamp,
}

domain_event!(
    TripMutated,
    event_type = "trip.mutated.v1",
    aggregate_id = trip_id,
    aggregate_type = "Trip",
    occurred_at = occurred_at,
    event_id = event_id
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripDeleted {
    pub event_id: EventId,
    pub trip_id: TripId,
    pub actor: ProfileId,
    pub occurred_at: Timestamp,
}

domain_event!(
    TripDeleted,
    event_type = "trip.deleted.v1",
    aggregate_id = trip_id,
    aggregate_type = "Trip",
    occurred_at = occurred_at,
    event_id = event_id
);
