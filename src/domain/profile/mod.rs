//! Profile domain module.
//!
//! Profiles are the single source of truth for the display fields that
//! trips carry denormalized copies of.
//!
//! # Events
//!
//! - `ProfileDisplayFieldsUpdated` - Published when a display name or
//!   contact handle changes; drives the denormalization fan-out.

mod errors;
mod events;
mod profile;
mod values;

pub use errors::ProfileError;
pub use events::{ProfileDisplayFieldsUpdated, PROFILE_DISPLAY_FIELDS_UPDATED};
pub use profile::{DisplayFieldsUpdate, Profile};
pub use values::{ContactHandle, DisplayName};
