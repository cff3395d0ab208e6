//! Trip aggregate: participants, days and activities kept as one document.

mod activity;
mod aggregate;
mod day;
mod errors;
mod events;
mod index;
mod participant;
mod snapshot;

pub use activity::{
    Activity, ActivityDraft, ActivityKind, ActivityPatch, Attachment, Coords, Cost, Location,
    TimeWindow,
};
pub use aggregate::{Permission, Trip};
pub use day::Day;
pub use errors::{ErrorKind, TripError};
pub use events::{TripDeleted, TripMutated, TRIP_DELETED, TRIP_MUTATED};
pub use index::TripIndex;
pub use participant::{ParticipantRef, Role};
pub use snapshot::{ActivitySnapshot, DaySnapshot, ParticipantSnapshot, TripSnapshot};
