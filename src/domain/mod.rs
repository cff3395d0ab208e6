//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, versions, errors, events)
//! - `profile` - Profile aggregate, the source of truth for display fields
//! - `trip` - Trip aggregate with participants, days and activities

pub mod foundation;
pub mod profile;
pub mod trip;
