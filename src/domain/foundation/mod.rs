//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, versions, events and error types
//! that form the vocabulary of the trip domain.

mod command;
mod errors;
mod events;
mod ids;
mod timestamp;
mod version;

pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use crate::domain_event;
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{ActivityId, AttachmentId, DayId, ProfileId, TripId};
pub use timestamp::Timestamp;
pub use version::Version;
