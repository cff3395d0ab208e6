//! Trip aggregate root.
//!
//! Every structural operation borrows the current value and returns a new
//! one. The receiver is never modified, so a failed compare-and-swap can
//! simply discard the result and start over from a fresh read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{
    ActivityId, DayId, ProfileId, Timestamp, TripId, ValidationError, Version,
};
use crate::domain::profile::{ContactHandle, DisplayName, Profile};

use super::{
    Activity, ActivityPatch, Day, ParticipantRef, Role, TripError, TripIndex,
};

const MAX_TRIP_TITLE_LEN: usize = 120;

/// Access level an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Manage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    id: TripId,
    title: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    participants: Vec<ParticipantRef>,
    days: Vec<Day>,
    version: Version,
    created_by: ProfileId,
    created_at: Timestamp,
    updated_by: ProfileId,
    updated_at: Timestamp,
}

impl Trip {
    /// Creates a trip whose only participant is the owner.
    pub fn create(
        id: TripId,
        title: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        owner: &Profile,
    ) -> Result<Self, TripError> {
        let title = validate_title(title.into())?;
        validate_date_range(start_date, end_date)?;
        let now = Timestamp::now();
        Ok(Self {
            id,
            title,
            start_date,
            end_date,
            participants: vec![ParticipantRef::from_profile(owner, Role::Owner, now)],
            days: Vec::new(),
            version: Version::INITIAL,
            created_by: owner.id().clone(),
            created_at: now,
            updated_by: owner.id().clone(),
            updated_at: now,
        })
    }

    pub fn id(&self) -> &TripId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn participants(&self) -> &[ParticipantRef] {
        &self.participants
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_by(&self) -> &ProfileId {
        &self.created_by
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_by(&self) -> &ProfileId {
        &self.updated_by
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Stamps the version assigned by the store on commit.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn index(&self) -> TripIndex {
        TripIndex::build(self)
    }

    pub fn participant(&self, profile_id: &ProfileId) -> Option<&ParticipantRef> {
        self.participants.iter().find(|p| &p.profile_id == profile_id)
    }

    pub fn owner(&self) -> Option<&ParticipantRef> {
        self.participants.iter().find(|p| p.role == Role::Owner)
    }

    pub fn day(&self, day_id: &DayId) -> Option<&Day> {
        self.days.iter().find(|d| &d.day_id == day_id)
    }

    pub fn activity(&self, day_id: &DayId, activity_id: &ActivityId) -> Option<&Activity> {
        self.day(day_id)?
            .activities
            .iter()
            .find(|a| &a.activity_id == activity_id)
    }

    /// Checks that `actor` is a participant holding at least `permission`.
    pub fn authorize(
        &self,
        actor: &ProfileId,
        permission: Permission,
    ) -> Result<&ParticipantRef, TripError> {
        let participant = self.participant(actor).ok_or(TripError::Forbidden)?;
        let allowed = match permission {
            Permission::Read => true,
            Permission::Write => participant.role.can_write(),
            Permission::Manage => participant.role.can_manage(),
        };
        if allowed {
            Ok(participant)
        } else {
            Err(TripError::Forbidden)
        }
    }

    /// Verifies the identity invariants of the nested collections.
    pub fn check_invariants(&self) -> Result<(), TripError> {
        let mut profiles = HashSet::new();
        let mut owners = 0;
        for participant in &self.participants {
            if !profiles.insert(&participant.profile_id) {
                return Err(TripError::invalid_state(format!(
                    "participant {} appears twice",
                    participant.profile_id
                )));
            }
            if participant.role == Role::Owner {
                owners += 1;
            }
        }
        if owners != 1 {
            return Err(TripError::invalid_state(format!(
                "trip must have exactly one owner, found {}",
                owners
            )));
        }
        let mut days = HashSet::new();
        let mut activities = HashSet::new();
        for day in &self.days {
            if !days.insert(day.day_id) {
                return Err(TripError::invalid_state(format!(
                    "day {} appears twice",
                    day.day_id
                )));
            }
            for activity in &day.activities {
                if !activities.insert(activity.activity_id) {
                    return Err(TripError::invalid_state(format!(
                        "activity {} appears twice",
                        activity.activity_id
                    )));
                }
            }
        }
        Ok(())
    }

    // ---- structural operations ----

    pub fn with_details(
        &self,
        title: Option<String>,
        dates: Option<(NaiveDate, NaiveDate)>,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        let mut next = self.clone();
        if let Some(title) = title {
            next.title = validate_title(title)?;
        }
        if let Some((start, end)) = dates {
            validate_date_range(start, end)?;
            if let Some(day) = next.days.iter().find(|d| d.date < start || d.date > end) {
                return Err(TripError::invalid_state(format!(
                    "day {} on {} falls outside the new date range",
                    day.day_id, day.date
                )));
            }
            next.start_date = start;
            next.end_date = end;
        }
        Ok(next.touched(actor, now))
    }

    /// Inserts a day, keeping days ordered by date (stable for equal dates).
    pub fn with_day_added(
        &self,
        day: Day,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        if day.date < self.start_date || day.date > self.end_date {
            return Err(TripError::invalid_state(format!(
                "{} is outside the trip's dates ({} to {})",
                day.date, self.start_date, self.end_date
            )));
        }
        let index = self.index();
        if index.day(&day.day_id).is_ok() {
            return Err(TripError::invalid_state(format!(
                "day {} already exists",
                day.day_id
            )));
        }
        let mut next = self.clone();
        let pos = next.days.partition_point(|d| d.date <= day.date);
        next.days.insert(pos, day);
        Ok(next.touched(actor, now))
    }

    pub fn with_day_removed(
        &self,
        day_id: &DayId,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        let pos = self.index().day(day_id)?;
        let mut next = self.clone();
        next.days.remove(pos);
        Ok(next.touched(actor, now))
    }

    /// Appends an activity to the end of a day.
    pub fn with_activity_added(
        &self,
        day_id: &DayId,
        activity: Activity,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        let index = self.index();
        let day_pos = index.day(day_id)?;
        if index.contains_activity(&activity.activity_id) {
            return Err(TripError::invalid_state(format!(
                "activity {} already exists",
                activity.activity_id
            )));
        }
        activity.validate()?;
        self.check_cost_participants(&activity)?;
        let mut next = self.clone();
        next.days[day_pos].activities.push(activity);
        Ok(next.touched(actor, now))
    }

    pub fn with_activity_updated(
        &self,
        day_id: &DayId,
        activity_id: &ActivityId,
        patch: &ActivityPatch,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        let (day_pos, activity_pos) = self.index().activity(day_id, activity_id)?;
        let current = &self.days[day_pos].activities[activity_pos];
        let updated = current.patched(patch, actor, now)?;
        if updated.cost != current.cost {
            self.check_cost_participants(&updated)?;
        }
        let mut next = self.clone();
        next.days[day_pos].activities[activity_pos] = updated;
        Ok(next.touched(actor, now))
    }

    /// Removes an activity; the order of the remaining ones is preserved.
    pub fn with_activity_removed(
        &self,
        day_id: &DayId,
        activity_id: &ActivityId,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        let (day_pos, activity_pos) = self.index().activity(day_id, activity_id)?;
        let mut next = self.clone();
        next.days[day_pos].activities.remove(activity_pos);
        Ok(next.touched(actor, now))
    }

    pub fn with_participant_added(
        &self,
        participant: ParticipantRef,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        if participant.role == Role::Owner {
            return Err(TripError::invalid_state(
                "a trip has exactly one owner; add participants as editor or viewer",
            ));
        }
        if self.participant(&participant.profile_id).is_some() {
            return Err(TripError::invalid_state(format!(
                "{} is already a participant",
                participant.profile_id
            )));
        }
        let mut next = self.clone();
        next.participants.push(participant);
        Ok(next.touched(actor, now))
    }

    pub fn with_participant_removed(
        &self,
        profile_id: &ProfileId,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        let pos = self
            .index()
            .participant(profile_id)
            .ok_or_else(|| TripError::ParticipantNotFound(profile_id.clone()))?;
        if self.participants[pos].role == Role::Owner {
            return Err(TripError::invalid_state(
                "the owner cannot be removed; delete the trip instead",
            ));
        }
        let mut next = self.clone();
        next.participants.remove(pos);
        // Costs may only name participants
        for activity in next.days.iter_mut().flat_map(|day| day.activities.iter_mut()) {
            if let Some(cost) = &mut activity.cost {
                cost.forget_profile(profile_id);
            }
        }
        Ok(next.touched(actor, now))
    }

    pub fn with_participant_role(
        &self,
        profile_id: &ProfileId,
        role: Role,
        actor: &ProfileId,
        now: Timestamp,
    ) -> Result<Self, TripError> {
        let pos = self
            .index()
            .participant(profile_id)
            .ok_or_else(|| TripError::ParticipantNotFound(profile_id.clone()))?;
        if role == Role::Owner || self.participants[pos].role == Role::Owner {
            return Err(TripError::invalid_state("ownership cannot be reassigned"));
        }
        let mut next = self.clone();
        next.participants[pos].role = role;
        Ok(next.touched(actor, now))
    }

    /// Rewrites one participant's copied display fields.
    ///
    /// Returns `Ok(None)` when the copy is already current, which makes
    /// repeated repair passes no-ops. Audit fields are left alone.
    pub fn with_participant_synced(
        &self,
        profile_id: &ProfileId,
        contact_handle: &ContactHandle,
        display_name: &DisplayName,
    ) -> Result<Option<Self>, TripError> {
        let pos = self
            .index()
            .participant(profile_id)
            .ok_or_else(|| TripError::ParticipantNotFound(profile_id.clone()))?;
        if self.participants[pos].is_synced_with(contact_handle, display_name) {
            return Ok(None);
        }
        let mut next = self.clone();
        next.participants[pos].contact_handle = contact_handle.clone();
        next.participants[pos].display_name = display_name.clone();
        Ok(Some(next))
    }

    fn check_cost_participants(&self, activity: &Activity) -> Result<(), TripError> {
        if let Some(cost) = &activity.cost {
            if let Some(stranger) = cost
                .referenced_profiles()
                .find(|id| self.participant(id).is_none())
            {
                return Err(TripError::invalid_state(format!(
                    "cost refers to {} who is not a participant",
                    stranger
                )));
            }
        }
        Ok(())
    }

    fn touched(mut self, actor: &ProfileId, now: Timestamp) -> Self {
        self.updated_by = actor.clone();
        self.updated_at = now;
        self
    }
}

fn validate_title(title: String) -> Result<String, TripError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(ValidationError::empty_field("title").into());
    }
    let len = title.chars().count();
    if len > MAX_TRIP_TITLE_LEN {
        return Err(ValidationError::too_long("title", MAX_TRIP_TITLE_LEN, len).into());
    }
    Ok(title)
}

fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), TripError> {
    if end < start {
        return Err(TripError::invalid_state("trip ends before it starts"));
    }
    Ok(())
}
