//! AddActivityHandler - Command handler for adding an activity to a day.
//!
//! The activity id is random and fixed before the first attempt. Concurrent
//! adds to the same day each keep their own id and land one after another
//! through the compare-and-swap loop.

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{ActivityId, CommandMetadata, DayId, Timestamp, TripId};
use crate::domain::trip::{ActivityDraft, Permission, Trip, TripError};

#[derive(Debug, Clone)]
pub struct AddActivityCommand {
    pub trip_id: TripId,
    pub day_id: DayId,
    pub draft: ActivityDraft,
}

#[derive(Debug, Clone)]
pub struct AddActivityResult {
    pub activity_id: ActivityId,
    pub trip: Trip,
    /// Attempts the compare-and-swap loop needed.
    pub attempts: u32,
}

pub struct AddActivityHandler {
    mutator: TripMutator,
}

impl AddActivityHandler {
    pub fn new(mutator: TripMutator) -> Self {
        Self { mutator }
    }

    pub async fn handle(
        &self,
        cmd: AddActivityCommand,
        metadata: CommandMetadata,
    ) -> Result<AddActivityResult, TripError> {
        let actor = metadata.actor.clone();
        let activity = cmd.draft.into_activity(&actor, Timestamp::now())?;
        let activity_id = activity.activity_id;

        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "add_activity", &metadata, |trip| {
                trip.authorize(&actor, Permission::Write)?;
                trip.with_activity_added(&cmd.day_id, activity.clone(), &actor, Timestamp::now())
                    .map(Some)
            })
            .await?;

        Ok(AddActivityResult {
            activity_id,
            trip: outcome.trip,
            attempts: outcome.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::trip::{AddDayCommand, AddDayHandler};
    use crate::application::test_support::*;
    use crate::domain::trip::{ActivityKind, Cost, Role};

    async fn trip_with_day(fx: &Fixture) -> (Trip, DayId) {
        let trip = fx.seed_trip().await;
        let added = AddDayHandler::new(fx.mutator())
            .handle(
                AddDayCommand {
                    trip_id: *trip.id(),
                    date: date(2),
                    title: None,
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();
        (added.trip, added.day_id)
    }

    #[tokio::test]
    async fn adds_activity_and_returns_its_id() {
        let fx = Fixture::new();
        let (trip, day_id) = trip_with_day(&fx).await;
        let mut draft = ActivityDraft::titled("Tram 28");
        draft.kind = ActivityKind::Transport;

        let result = AddActivityHandler::new(fx.mutator())
            .handle(
                AddActivityCommand {
                    trip_id: *trip.id(),
                    day_id,
                    draft,
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();

        let activity = result.trip.activity(&day_id, &result.activity_id).unwrap();
        assert_eq!(activity.title, "Tram 28");
        assert_eq!(activity.created_by, owner());
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn conflict_is_retried_against_the_newer_version() {
        let fx = Fixture::new();
        let (trip, day_id) = trip_with_day(&fx).await;
        fx.store.conflict_next(1);

        let result = AddActivityHandler::new(fx.mutator())
            .handle(
                AddActivityCommand {
                    trip_id: *trip.id(),
                    day_id,
                    draft: ActivityDraft::titled("Lunch"),
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();

        assert_eq!(result.attempts, 2);
        assert_eq!(result.trip.days()[0].activities.len(), 1);
    }

    #[tokio::test]
    async fn cost_payer_must_be_a_participant() {
        let fx = Fixture::new();
        let (trip, day_id) = trip_with_day(&fx).await;
        let mut draft = ActivityDraft::titled("Dinner");
        draft.cost = Some(Cost {
            amount_minor: 4_500,
            currency: "EUR".into(),
            payer_id: Some(pid("stranger")),
            split_among: None,
        });

        let result = AddActivityHandler::new(fx.mutator())
            .handle(
                AddActivityCommand {
                    trip_id: *trip.id(),
                    day_id,
                    draft,
                },
                fx.owner_meta(),
            )
            .await;

        assert!(matches!(result, Err(TripError::InvalidState(_))));
    }

    #[tokio::test]
    async fn blank_title_fails_before_reading() {
        let fx = Fixture::new();
        let (trip, day_id) = trip_with_day(&fx).await;
        let reads = fx.store.reads();

        let result = AddActivityHandler::new(fx.mutator())
            .handle(
                AddActivityCommand {
                    trip_id: *trip.id(),
                    day_id,
                    draft: ActivityDraft::titled("  "),
                },
                fx.owner_meta(),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(fx.store.reads(), reads);
    }

    #[tokio::test]
    async fn unknown_day_is_not_found() {
        let fx = Fixture::new();
        let (trip, _) = trip_with_day(&fx).await;
        fx.seed_member(trip.id(), "ed", Role::Editor).await;
        let missing = DayId::new();

        let result = AddActivityHandler::new(fx.mutator())
            .handle(
                AddActivityCommand {
                    trip_id: *trip.id(),
                    day_id: missing,
                    draft: ActivityDraft::titled("Fado"),
                },
                meta("ed"),
            )
            .await;

        assert_eq!(result.unwrap_err(), TripError::DayNotFound(missing));
    }
}
