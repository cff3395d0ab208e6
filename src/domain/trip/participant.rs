//! Participants and their roles.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ProfileId, Timestamp};
use crate::domain::profile::{ContactHandle, DisplayName, Profile};

/// Role of a participant within one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    /// May edit days, activities and trip details.
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }

    /// May add or remove participants, change roles and delete the trip.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        };
        write!(f, "{}", s)
    }
}

/// Denormalized reference to a profile inside a trip.
///
/// `contact_handle` and `display_name` are copies taken at the last sync
/// and may lag the directory until the next fan-out pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub profile_id: ProfileId,
    pub contact_handle: ContactHandle,
    pub display_name: DisplayName,
    pub role: Role,
    pub joined_at: Timestamp,
}

impl ParticipantRef {
    /// Snapshots a profile's display fields into a new participant entry.
    pub fn from_profile(profile: &Profile, role: Role, joined_at: Timestamp) -> Self {
        Self {
            profile_id: profile.id().clone(),
            contact_handle: profile.contact_handle().clone(),
            display_name: profile.display_name().clone(),
            role,
            joined_at,
        }
    }

    /// Whether the copied fields already equal the given values.
    pub fn is_synced_with(&self, contact_handle: &ContactHandle, display_name: &DisplayName) -> bool {
        &self.contact_handle == contact_handle && &self.display_name == display_name
    }
}
