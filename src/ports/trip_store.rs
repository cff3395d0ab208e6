//! Trip store port.
//!
//! One record per trip holding the whole nested document plus its version.
//! There is deliberately no unconditional overwrite: every write names the
//! version it was computed from.

use async_trait::async_trait;

use crate::domain::foundation::{TripId, Version};
use crate::domain::trip::{Trip, TripError};

use super::Subscription;

/// Errors raised by a [`TripStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("trip not found: {0}")]
    NotFound(TripId),

    #[error("version conflict: expected {expected}, stored {actual}")]
    VersionConflict { expected: Version, actual: Version },

    #[error("trip already exists: {0}")]
    AlreadyExists(TripId),

    #[error("store failure: {0}")]
    Infrastructure(String),
}

impl From<StoreError> for TripError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => TripError::TripNotFound(id),
            StoreError::AlreadyExists(id) => {
                TripError::invalid_state(format!("trip {} already exists", id))
            }
            // Callers that can retry handle conflicts before converting.
            StoreError::VersionConflict { .. } => TripError::ConcurrentModification { attempts: 1 },
            StoreError::Infrastructure(msg) => TripError::Infrastructure(msg),
        }
    }
}

/// Durable key to document storage for trips.
///
/// Implementations must:
/// - assign `Version::INITIAL` on create and `expected.next()` on a
///   successful compare-and-swap
/// - push every committed value to the change notifier, in commit order
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Reads the current value; its `version()` is the stored version.
    async fn get(&self, id: &TripId) -> Result<Trip, StoreError>;

    /// Inserts a new trip at `Version::INITIAL`.
    async fn create(&self, trip: &Trip) -> Result<Trip, StoreError>;

    /// Replaces the stored value only if its version still equals `expected`.
    ///
    /// Returns the committed value stamped with its new version.
    async fn compare_and_swap(
        &self,
        id: &TripId,
        expected: Version,
        trip: &Trip,
    ) -> Result<Trip, StoreError>;

    /// Deletes the trip if its version still equals `expected`, closing
    /// every open subscription to it.
    async fn delete(&self, id: &TripId, expected: Version) -> Result<(), StoreError>;

    /// Opens a stream of committed values for one trip.
    ///
    /// The stream carries only commits made after subscribing; read the
    /// current value with [`TripStore::get`] for the starting point.
    async fn subscribe(&self, id: &TripId) -> Result<Subscription, StoreError>;
}
