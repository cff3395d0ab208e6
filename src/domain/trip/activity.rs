//! Activities planned inside a day.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActivityId, AttachmentId, ProfileId, Timestamp, ValidationError};

use super::TripError;

const MAX_TITLE_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 10_000;

/// What kind of plan an activity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Transport,
    Lodging,
    Food,
    Sightseeing,
    Event,
    Other,
}

impl Default for ActivityKind {
    fn default() -> Self {
        ActivityKind::Other
    }
}

/// Start and optional end of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
}

impl TimeWindow {
    /// Builds a window, rejecting an end before the start.
    pub fn new(start: Timestamp, end: Option<Timestamp>) -> Result<Self, TripError> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    fn validate(&self) -> Result<(), TripError> {
        match self.end {
            Some(end) if end.is_before(&self.start) => Err(TripError::invalid_state(
                "activity end time is before its start time",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
}

impl Location {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("location.name"));
        }
        if let Some(coords) = self.coords {
            if !(-90.0..=90.0).contains(&coords.lat) || !(-180.0..=180.0).contains(&coords.lng) {
                return Err(ValidationError::invalid_format(
                    "location.coords",
                    "latitude/longitude out of range",
                ));
            }
        }
        Ok(())
    }
}

/// Expense attached to an activity, in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub amount_minor: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<ProfileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_among: Option<Vec<ProfileId>>,
}

impl Cost {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.amount_minor < 0 {
            return Err(ValidationError::invalid_format(
                "cost.amount_minor",
                "must not be negative",
            ));
        }
        let iso = self.currency.len() == 3 && self.currency.chars().all(|c| c.is_ascii_uppercase());
        if !iso {
            return Err(ValidationError::invalid_format(
                "cost.currency",
                "expected a three-letter ISO 4217 code",
            ));
        }
        Ok(())
    }

    /// Every profile the cost refers to.
    pub fn referenced_profiles(&self) -> impl Iterator<Item = &ProfileId> {
        self.payer_id
            .iter()
            .chain(self.split_among.iter().flatten())
    }

    /// Drops `profile_id` as payer and from the split.
    pub fn forget_profile(&mut self, profile_id: &ProfileId) {
        if self.payer_id.as_ref() == Some(profile_id) {
            self.payer_id = None;
        }
        if let Some(split) = &mut self.split_among {
            split.retain(|id| id != profile_id);
            if split.is_empty() {
                self.split_among = None;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: AttachmentId,
    pub name: String,
    pub uri: String,
    pub added_by: ProfileId,
    pub added_at: Timestamp,
}

/// A planned activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: ActivityId,
    pub title: String,
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Cost>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_by: ProfileId,
    pub created_at: Timestamp,
    pub updated_by: ProfileId,
    pub updated_at: Timestamp,
}

/// Caller-supplied content of a new activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub title: String,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub cost: Option<Cost>,
    #[serde(default)]
    pub notes: String,
    /// Attachments as `(name, uri)` pairs.
    #[serde(default)]
    pub attachments: Vec<(String, String)>,
}

impl ActivityDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Materializes the draft under a freshly generated id.
    pub fn into_activity(self, actor: &ProfileId, now: Timestamp) -> Result<Activity, TripError> {
        let activity = Activity {
            activity_id: ActivityId::new(),
            title: self.title.trim().to_string(),
            kind: self.kind,
            time_window: self.time_window,
            location: self.location,
            cost: self.cost,
            notes: self.notes,
            attachments: self
                .attachments
                .into_iter()
                .map(|(name, uri)| Attachment {
                    attachment_id: AttachmentId::new(),
                    name,
                    uri,
                    added_by: actor.clone(),
                    added_at: now,
                })
                .collect(),
            created_by: actor.clone(),
            created_at: now,
            updated_by: actor.clone(),
            updated_at: now,
        };
        activity.validate()?;
        Ok(activity)
    }
}

/// Partial update of an activity.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub kind: Option<ActivityKind>,
    #[serde(default)]
    pub time_window: Option<Option<TimeWindow>>,
    #[serde(default)]
    pub location: Option<Option<Location>>,
    #[serde(default)]
    pub cost: Option<Option<Cost>>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Attachments to append as `(name, uri)` pairs.
    #[serde(default)]
    pub add_attachments: Vec<(String, String)>,
    #[serde(default)]
    pub remove_attachments: Vec<AttachmentId>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.kind.is_none()
            && self.time_window.is_none()
            && self.location.is_none()
            && self.cost.is_none()
            && self.notes.is_none()
            && self.add_attachments.is_empty()
            && self.remove_attachments.is_empty()
    }
}

impl Activity {
    /// Returns a patched copy; the receiver is left untouched.
    pub fn patched(
        &self,
        patch: &ActivityPatch,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Activity, TripError> {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(window) = &patch.time_window {
            next.time_window = *window;
        }
        if let Some(location) = &patch.location {
            next.location = location.clone();
        }
        if let Some(cost) = &patch.cost {
            next.cost = cost.clone();
        }
        if let Some(notes) = &patch.notes {
            next.notes = notes.clone();
        }
        for removed in &patch.remove_attachments {
            let before = next.attachments.len();
            next.attachments.retain(|a| &a.attachment_id != removed);
            if next.attachments.len() == before {
                return Err(TripError::invalid_state(format!(
                    "attachment {} is not on this activity",
                    removed
                )));
            }
        }
        next.attachments
            .extend(patch.add_attachments.iter().map(|(name, uri)| Attachment {
                attachment_id: AttachmentId::new(),
                name: name.clone(),
                uri: uri.clone(),
                added_by: actor.clone(),
                added_at: now,
            }));
        next.updated_by = actor.clone();
        next.updated_at = now;
        next.validate()?;
        Ok(next)
    }

    /// Checks field-level constraints.
    pub fn validate(&self) -> Result<(), TripError> {
        if self.title.is_empty() {
            return Err(ValidationError::empty_field("title").into());
        }
        let len = self.title.chars().count();
        if len > MAX_TITLE_LEN {
            return Err(ValidationError::too_long("title", MAX_TITLE_LEN, len).into());
        }
        let notes_len = self.notes.chars().count();
        if notes_len > MAX_NOTES_LEN {
            return Err(ValidationError::too_long("notes", MAX_NOTES_LEN, notes_len).into());
        }
        if let Some(window) = &self.time_window {
            window.validate()?;
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(cost) = &self.cost {
            cost.validate()?;
        }
        for attachment in &self.attachments {
            if attachment.name.trim().is_empty() {
                return Err(ValidationError::empty_field("attachment.name").into());
            }
            if attachment.uri.trim().is_empty() {
                return Err(ValidationError::empty_field("attachment.uri").into());
            }
        }
        Ok(())
    }
}
