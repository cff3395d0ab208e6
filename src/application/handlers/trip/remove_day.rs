//! RemoveDayHandler - removes a day and every activity it holds.

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{CommandMetadata, DayId, Timestamp, TripId};
use crate::domain::trip::{Permission, Trip, TripError};

#[derive(Debug, Clone)]
pub struct RemoveDayCommand {
    pub trip_id: TripId,
    pub day_id: DayId,
}

pub struct RemoveDayHandler {
    mutator: TripMutator,
}

impl RemoveDayHandler {
    pub fn new(mutator: TripMutator) -> Self {
        Self { mutator }
    }

    pub async fn handle(
        &self,
        cmd: RemoveDayCommand,
        metadata: CommandMetadata,
    ) -> Result<Trip, TripError> {
        let actor = metadata.actor.clone();
        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "remove_day", &metadata, |trip| {
                trip.authorize(&actor, Permission::Write)?;
                trip.with_day_removed(&cmd.day_id, &actor, Timestamp::now())
                    .map(Some)
            })
            .await?;
        Ok(outcome.trip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::trip::{AddDayCommand, AddDayHandler};
    use crate::application::test_support::*;

    #[tokio::test]
    async fn removes_existing_day() {
        let fx = Fixture::new();
        let trip = fx.seed_trip().await;
        let added = AddDayHandler::new(fx.mutator())
            .handle(
                AddDayCommand {
                    trip_id: *trip.id(),
                    date: date(2),
                    title: Some("Belém".into()),
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();

        let trip = RemoveDayHandler::new(fx.mutator())
            .handle(
                RemoveDayCommand {
                    trip_id: *trip.id(),
                    day_id: added.day_id,
                },
                fx.owner_meta(),
            )
            .await
            .unwrap();

        assert!(trip.days().is_empty());
    }

    #[tokio::test]
    async fn unknown_day_is_not_found_and_nothing_is_written() {
        let fx = Fixture::new();
        let trip = fx.seed_trip().await;
        let day_id = DayId::new();

        let result = RemoveDayHandler::new(fx.mutator())
            .handle(
                RemoveDayCommand {
                    trip_id: *trip.id(),
                    day_id,
                },
                fx.owner_meta(),
            )
            .await;

        assert_eq!(result.unwrap_err(), TripError::DayNotFound(day_id));
        assert_eq!(fx.store.writes(), 0);
    }
}
