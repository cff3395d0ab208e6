//! TripSync - Collaborative trip planning core
//!
//! Trips are aggregates of days and activities edited concurrently by their
//! participants. This crate provides:
//!
//! - Versioned trip storage with compare-and-swap writes and retrying
//!   mutations, so concurrent edits never overwrite each other
//! - Ordered per-trip change notification with liveness-based cleanup
//! - A profile directory that owns display fields, and a fan-out engine
//!   that repairs the copies held by every trip a profile belongs to
//!
//! [`runtime::TripSyncRuntime`] wires the pieces together.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod runtime;
pub mod telemetry;

pub use runtime::{RuntimeError, RuntimeParts, TripSyncRuntime};
