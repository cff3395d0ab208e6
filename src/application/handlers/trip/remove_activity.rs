//! RemoveActivityHandler - removes one activity from a day.

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{ActivityId, CommandMetadata, DayId, Timestamp, TripId};
use crate::domain::trip::{Permission, Trip, TripError};

#[derive(Debug, Clone)]
pub struct RemoveActivityCommand {
    pub trip_id: TripId,
    pub day_id: DayId,
    pub activity_id: ActivityId,
}

pub struct RemoveActivityHandler {
    mutator: TripMutator,
}

impl RemoveActivityHandler {
    pub fn new(mutator: TripMutator) -> Self {
        Self { mutator }
    }

    pub async fn handle(
        &self,
        cmd: RemoveActivityCommand,
        metadata: CommandMetadata,
    ) -> Result<Trip, TripError> {
        let actor = metadata.actor.clone();
        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "remove_activity", &metadata, |trip| {
                trip.authorize(&actor, Permission::Write)?;
                trip.with_activity_removed(&cmd.day_id, &cmd.activity_id, &actor, Timestamp::now())
                    .map(Some)
            })
            .await?;
        Ok(outcome.trip)
    }
}
