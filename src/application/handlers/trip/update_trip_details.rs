//! UpdateTripDetailsHandler - rename a trip or move its date range.

use chrono::NaiveDate;

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{CommandMetadata, Timestamp, TripId};
use crate::domain::trip::{Permission, Trip, TripError};

#[derive(Debug, Clone)]
pub struct UpdateTripDetailsCommand {
    pub trip_id: TripId,
    pub title: Option<String>,
    pub dates: Option<(NaiveDate, NaiveDate)>,
}

pub struct UpdateTripDetailsHandler {
    mutator: TripMutator,
}

impl UpdateTripDetailsHandler {
    pub fn new(mutator: TripMutator) -> Self {
        Self { mutator }
    }

    pub async fn handle(
        &self,
        cmd: UpdateTripDetailsCommand,
        metadata: CommandMetadata,
    ) -> Result<Trip, TripError> {
        if cmd.title.is_none() && cmd.dates.is_none() {
            return Err(TripError::invalid_state("nothing to update"));
        }

        let actor = metadata.actor.clone();
        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "update_trip_details", &metadata, |trip| {
                trip.authorize(&actor, Permission::Write)?;
                trip.with_details(cmd.title.clone(), cmd.dates, &actor, Timestamp::now())
                    .map(Some)
            })
            .await?;

        Ok(outcome.trip)
    }
}
