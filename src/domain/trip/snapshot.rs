//! Read-only export of a trip for planning assistants.
//!
//! Contact handles are left out; the snapshot carries only what is needed
//! to reason about the itinerary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActivityId, DayId, Timestamp, TripId};

use super::{ActivityKind, Role, Trip};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub trip_id: TripId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub version: u64,
    pub participants: Vec<ParticipantSnapshot>,
    pub days: Vec<DaySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub day_id: DayId,
    pub date: NaiveDate,
    pub title: Option<String>,
    pub activities: Vec<ActivitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub activity_id: ActivityId,
    pub title: String,
    pub kind: ActivityKind,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    pub location: Option<String>,
    pub notes: String,
}

impl From<&Trip> for TripSnapshot {
    fn from(trip: &Trip) -> Self {
        Self {
            trip_id: *trip.id(),
            title: trip.title().to_string(),
            start_date: trip.start_date(),
            end_date: trip.end_date(),
            version: trip.version().value(),
            participants: trip
                .participants()
                .iter()
                .map(|p| ParticipantSnapshot {
                    display_name: p.display_name.to_string(),
                    role: p.role,
                })
                .collect(),
            days: trip
                .days()
                .iter()
                .map(|day| DaySnapshot {
                    day_id: day.day_id,
                    date: day.date,
                    title: day.title.clone(),
                    activities: day
                        .activities
                        .iter()
                        .map(|a| ActivitySnapshot {
                            activity_id: a.activity_id,
                            title: a.title.clone(),
                            kind: a.kind,
                            starts_at: a.time_window.map(|w| w.start),
                            ends_at: a.time_window.and_then(|w| w.end),
                            location: a.location.as_ref().map(|l| l.name.clone()),
                            notes: a.notes.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ProfileId;
    use crate::domain::profile::{ContactHandle, DisplayName, Profile};
    use crate::domain::trip::{ActivityDraft, Day};

    #[test]
    fn snapshot_omits_contact_handles() {
        let owner = Profile::new(
            ProfileId::new("alice").unwrap(),
            ContactHandle::new("+15550001").unwrap(),
            DisplayName::new("Alice").unwrap(),
        );
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let day = Day::new(date, Some("Arrival".into()));
        let day_id = day.day_id;
        let now = Timestamp::now();
        let trip = Trip::create(TripId::new(), "Kyoto", date, date, &owner)
            .unwrap()
            .with_day_added(day, owner.id(), now)
            .unwrap()
            .with_activity_added(
                &day_id,
                ActivityDraft::titled("Check in").into_activity(owner.id(), now).unwrap(),
                owner.id(),
                now,
            )
            .unwrap();

        let snapshot = TripSnapshot::from(&trip);
        let json = serde_json::to_string(&snapshot).unwrap();

        assert_eq!(snapshot.days[0].activities[0].title, "Check in");
        assert_eq!(snapshot.participants[0].display_name, "Alice");
        assert!(!json.contains("+15550001"));
    }
}
