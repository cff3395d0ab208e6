//! AddDayHandler - Command handler for adding a day to a trip.

use chrono::NaiveDate;

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{CommandMetadata, DayId, Timestamp, TripId};
use crate::domain::trip::{Day, Permission, Trip, TripError};

#[derive(Debug, Clone)]
pub struct AddDayCommand {
    pub trip_id: TripId,
    pub date: NaiveDate,
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AddDayResult {
    pub day_id: DayId,
    pub trip: Trip,
}

pub struct AddDayHandler {
    mutator: TripMutator,
}

impl AddDayHandler {
    pub fn new(mutator: TripMutator) -> Self {
        Self { mutator }
    }

    pub async fn handle(
        &self,
        cmd: AddDayCommand,
        metadata: CommandMetadata,
    ) -> Result<AddDayResult, TripError> {
        // Id is fixed before the loop so every retry inserts the same day
        let day = Day::new(cmd.date, cmd.title);
        let day_id = day.day_id;
        let actor = metadata.actor.clone();

        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "add_day", &metadata, |trip| {
                trip.authorize(&actor, Permission::Write)?;
                trip.with_day_added(day.clone(), &actor, Timestamp::now())
                    .map(Some)
            })
            .await?;

        Ok(AddDayResult {
            day_id,
            trip: outcome.trip,
        })
    }
}
