//! UpdateActivityHandler - applies a partial patch to one activity.
//!
//! The patch is re-applied to a fresh read on every attempt, so two editors
//! changing different activities of the same trip never overwrite each
//! other.

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{ActivityId, CommandMetadata, DayId, Timestamp, TripId};
use crate::domain::trip::{ActivityPatch, Permission, Trip, TripError};

#[derive(Debug, Clone)]
pub struct UpdateActivityCommand {
    pub trip_id: TripId,
    pub day_id: DayId,
    pub activity_id: ActivityId,
    pub patch: ActivityPatch,
}

pub struct UpdateActivityHandler {
    mutator: TripMutator,
}

impl UpdateActivityHandler {
    pub fn new(mutator: TripMutator) -> Self {
        Self { mutator }
    }

    pub async fn handle(
        &self,
        cmd: UpdateActivityCommand,
        metadata: CommandMetadata,
    ) -> Result<Trip, TripError> {
        if cmd.patch.is_empty() {
            return Err(TripError::invalid_state("activity patch is empty"));
        }

        let actor = metadata.actor.clone();
        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "update_activity", &metadata, |trip| {
                trip.authorize(&actor, Permission::Write)?;
                trip.with_activity_updated(
                    &cmd.day_id,
                    &cmd.activity_id,
                    &cmd.patch,
                    &actor,
                    Timestamp::now(),
                )
                .map(Some)
            })
            .await?;

        Ok(outcome.trip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::trip::{
        AddActivityCommand, AddActivityHandler, AddDayCommand, AddDayHandler,
    };
    use crate::application::test_support::*;
    use crate::domain::trip::{ActivityDraft, Location, TimeWindow};

    async fn trip_with_activity(fx: &Fixture) -> (TripId, DayId, ActivityId) {
        let trip = fx.seed_trip().await;
        let day = AddDayHandler::new(fx.mutator())
            .handle(
                AddDayCommand {
                    trip_id: *trip.id(),
                    date: date(3),
                    title: None,
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();
        let activity = AddActivityHandler::new(fx.mutator())
            .handle(
                AddActivityCommand {
                    trip_id: *trip.id(),
                    day_id: day.day_id,
                    draft: ActivityDraft::titled("Castle"),
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();
        (*trip.id(), day.day_id, activity.activity_id)
    }

    #[tokio::test]
    async fn patch_changes_only_named_fields() {
        let fx = Fixture::new();
        let (trip_id, day_id, activity_id) = trip_with_activity(&fx).await;
        let patch = ActivityPatch {
            notes: Some("Buy tickets online".into()),
            location: Some(Some(Location {
                name: "Castelo de São Jorge".into(),
                address: None,
                coords: None,
            })),
            ..ActivityPatch::default()
        };

        let trip = UpdateActivityHandler::new(fx.mutator())
            .handle(
                UpdateActivityCommand {
                    trip_id,
                    day_id,
                    activity_id,
                    patch,
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();

        let activity = trip.activity(&day_id, &activity_id).unwrap();
        assert_eq!(activity.title, "Castle");
        assert_eq!(activity.notes, "Buy tickets online");
        assert!(activity.location.is_some());
    }

    #[tokio::test]
    async fn end_before_start_is_invalid() {
        let fx = Fixture::new();
        let (trip_id, day_id, activity_id) = trip_with_activity(&fx).await;
        let start = Timestamp::now();
        let patch = ActivityPatch {
            time_window: Some(Some(TimeWindow {
                start,
                end: Some(start.plus_minutes(-30)),
            })),
            ..ActivityPatch::default()
        };

        let result = UpdateActivityHandler::new(fx.mutator())
            .handle(
                UpdateActivityCommand {
                    trip_id,
                    day_id,
                    activity_id,
                    patch,
                },
                fx.owner_meta(),
            )
            .await;

        assert!(matches!(
            result,
            Err(TripError::InvalidState(_)) | Err(TripError::ValidationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let fx = Fixture::new();
        let (trip_id, day_id, activity_id) = trip_with_activity(&fx).await;

        let result = UpdateActivityHandler::new(fx.mutator())
            .handle(
                UpdateActivityCommand {
                    trip_id,
                    day_id,
                    activity_id,
                    patch: ActivityPatch::default(),
                },
                fx.owner_meta(),
            )
            .await;

        assert!(matches!(result, Err(TripError::InvalidState(_))));
    }

    #[tokio::test]
    async fn activity_under_wrong_day_is_not_found() {
        let fx = Fixture::new();
        let (trip_id, _, activity_id) = trip_with_activity(&fx).await;
        let other_day = DayId::new();

        let result = UpdateActivityHandler::new(fx.mutator())
            .handle(
                UpdateActivityCommand {
                    trip_id,
                    day_id: other_day,
                    activity_id,
                    patch: ActivityPatch {
                        title: Some("Moved".into()),
                        ..ActivityPatch::default()
                    },
                },
                fx.owner_meta(),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), crate::domain::trip::ErrorKind::NotFound);
    }
}
