//! Identity directory port.
//!
//! The directory is the single source of truth for display fields; trips
//! only hold copies.

use async_trait::async_trait;

use crate::domain::foundation::{ProfileId, TripId};
use crate::domain::profile::{ContactHandle, DisplayFieldsUpdate, Profile, ProfileError};
use crate::domain::trip::TripError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("profile not found: {0}")]
    NotFound(ProfileId),

    #[error("profile already exists: {0}")]
    AlreadyExists(ProfileId),

    #[error("contact handle already in use: {0}")]
    DuplicateContactHandle(String),

    #[error("directory failure: {0}")]
    Infrastructure(String),
}

impl From<DirectoryError> for ProfileError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => ProfileError::NotFound(id),
            DirectoryError::DuplicateContactHandle(handle) => {
                ProfileError::DuplicateContactHandle(handle)
            }
            DirectoryError::AlreadyExists(id) => {
                ProfileError::Infrastructure(format!("profile {} already exists", id))
            }
            DirectoryError::Infrastructure(msg) => ProfileError::Infrastructure(msg),
        }
    }
}

impl From<DirectoryError> for TripError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => TripError::ProfileNotFound(id),
            other => TripError::Infrastructure(other.to_string()),
        }
    }
}

/// Outcome of a display-field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFieldsChange {
    pub profile: Profile,
    pub changed: bool,
}

/// Durable key to profile storage.
///
/// Every method is a single atomic record update; callers never
/// read-modify-write a profile themselves.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get(&self, id: &ProfileId) -> Result<Profile, DirectoryError>;

    async fn find_by_contact_handle(
        &self,
        handle: &ContactHandle,
    ) -> Result<Option<Profile>, DirectoryError>;

    /// Inserts a new profile.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the id is taken
    /// - `DuplicateContactHandle` if another profile owns the handle
    async fn create(&self, profile: &Profile) -> Result<(), DirectoryError>;

    /// Applies a display-field edit and returns the resulting profile.
    async fn update_display_fields(
        &self,
        id: &ProfileId,
        update: &DisplayFieldsUpdate,
    ) -> Result<DisplayFieldsChange, DirectoryError>;

    /// Adds a trip to the profile's `member_of` set. Idempotent.
    async fn add_membership(&self, id: &ProfileId, trip_id: TripId)
        -> Result<Profile, DirectoryError>;

    /// Removes a trip from the profile's `member_of` set. Idempotent.
    async fn remove_membership(
        &self,
        id: &ProfileId,
        trip_id: &TripId,
    ) -> Result<(), DirectoryError>;
}
