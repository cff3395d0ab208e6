//! Position index over a trip's nested collections.
//!
//! Built from one freshly read aggregate and dropped with it; never cached
//! across mutation attempts.

use std::collections::HashMap;

use crate::domain::foundation::{ActivityId, DayId, ProfileId};

use super::{Trip, TripError};

#[derive(Debug, Default)]
pub struct TripIndex {
    days: HashMap<DayId, usize>,
    activities: HashMap<ActivityId, (usize, usize)>,
    participants: HashMap<ProfileId, usize>,
}

impl TripIndex {
    pub fn build(trip: &Trip) -> Self {
        let mut index = TripIndex::default();
        for (pos, participant) in trip.participants().iter().enumerate() {
            index.participants.insert(participant.profile_id.clone(), pos);
        }
        for (day_pos, day) in trip.days().iter().enumerate() {
            index.days.insert(day.day_id, day_pos);
            for (activity_pos, activity) in day.activities.iter().enumerate() {
                index
                    .activities
                    .insert(activity.activity_id, (day_pos, activity_pos));
            }
        }
        index
    }

    pub fn day(&self, day_id: &DayId) -> Result<usize, TripError> {
        self.days
            .get(day_id)
            .copied()
            .ok_or(TripError::DayNotFound(*day_id))
    }

    /// Position of an activity, which must live in the given day.
    pub fn activity(
        &self,
        day_id: &DayId,
        activity_id: &ActivityId,
    ) -> Result<(usize, usize), TripError> {
        let day_pos = self.day(day_id)?;
        match self.activities.get(activity_id) {
            Some(&(d, a)) if d == day_pos => Ok((d, a)),
            _ => Err(TripError::ActivityNotFound {
                day_id: *day_id,
                activity_id: *activity_id,
            }),
        }
    }

    pub fn participant(&self, profile_id: &ProfileId) -> Option<usize> {
        self.participants.get(profile_id).copied()
    }

    pub fn contains_activity(&self, activity_id: &ActivityId) -> bool {
        self.activities.contains_key(activity_id)
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
