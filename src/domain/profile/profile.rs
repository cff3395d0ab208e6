//! Profile aggregate: source of truth for a participant's display fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::foundation::{ProfileId, Timestamp, TripId, Version};

use super::{ContactHandle, DisplayName};

/// Partial edit of the fields that trips hold copies of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFieldsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<DisplayName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_handle: Option<ContactHandle>,
}

impl DisplayFieldsUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.contact_handle.is_none()
    }
}

/// A user's profile.
///
/// `member_of` lists every trip this profile participates in and is kept
/// in step with trip membership so fan-out never scans all trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    id: ProfileId,
    contact_handle: ContactHandle,
    display_name: DisplayName,
    avatar_ref: Option<String>,
    member_of: BTreeSet<TripId>,
    version: Version,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Profile {
    /// Creates a profile on first authentication.
    pub fn new(id: ProfileId, contact_handle: ContactHandle, display_name: DisplayName) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            contact_handle,
            display_name,
            avatar_ref: None,
            member_of: BTreeSet::new(),
            version: Version::INITIAL,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a profile from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ProfileId,
        contact_handle: ContactHandle,
        display_name: DisplayName,
        avatar_ref: Option<String>,
        member_of: BTreeSet<TripId>,
        version: Version,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            contact_handle,
            display_name,
            avatar_ref,
            member_of,
            version,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &ProfileId {
        &self.id
    }

    pub fn contact_handle(&self) -> &ContactHandle {
        &self.contact_handle
    }

    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    pub fn avatar_ref(&self) -> Option<&str> {
        self.avatar_ref.as_deref()
    }

    pub fn member_of(&self) -> &BTreeSet<TripId> {
        &self.member_of
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn with_avatar_ref(mut self, avatar_ref: Option<String>) -> Self {
        self.avatar_ref = avatar_ref;
        self
    }

    /// Applies a display-field edit. Returns `true` if anything changed.
    pub fn apply_display_fields(&mut self, update: &DisplayFieldsUpdate) -> bool {
        let mut changed = false;
        if let Some(name) = &update.display_name {
            if name != &self.display_name {
                self.display_name = name.clone();
                changed = true;
            }
        }
        if let Some(handle) = &update.contact_handle {
            if handle != &self.contact_handle {
                self.contact_handle = handle.clone();
                changed = true;
            }
        }
        if changed {
            self.touch();
        }
        changed
    }

    /// Records membership of a trip. Returns `false` if already present.
    pub fn join_trip(&mut self, trip_id: TripId) -> bool {
        let inserted = self.member_of.insert(trip_id);
        if inserted {
            self.touch();
        }
        inserted
    }

    /// Drops membership of a trip. Returns `false` if it was not present.
    pub fn leave_trip(&mut self, trip_id: &TripId) -> bool {
        let removed = self.member_of.remove(trip_id);
        if removed {
            self.touch();
        }
        removed
    }

    fn touch(&mut self) {
        self.version = self.version.next();
        self.updated_at = Timestamp::now();
    }
}
