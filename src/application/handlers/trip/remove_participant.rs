//! RemoveParticipantHandler - removes a participant, or lets one leave.
//!
//! The trip is written first and membership removed afterwards. If the
//! membership removal fails the profile keeps a stale trip id; fan-out
//! treats that trip as skipped, so the leftover is harmless.
//!
//! The profile may rejoin between the two steps. Membership is only
//! removed while the trip does not list the profile, and restored if a
//! rejoin committed while the removal was in flight.

use std::sync::Arc;

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{CommandMetadata, ProfileId, Timestamp, TripId};
use crate::domain::trip::{Permission, Trip, TripError};
use crate::ports::ProfileDirectory;

#[derive(Debug, Clone)]
pub struct RemoveParticipantCommand {
    pub trip_id: TripId,
    pub profile_id: ProfileId,
}

#[derive(Debug, Clone)]
pub struct RemoveParticipantResult {
    pub trip: Trip,
    pub membership_removed: bool,
}

pub struct RemoveParticipantHandler {
    mutator: TripMutator,
    directory: Arc<dyn ProfileDirectory>,
}

impl RemoveParticipantHandler {
    pub fn new(mutator: TripMutator, directory: Arc<dyn ProfileDirectory>) -> Self {
        Self { mutator, directory }
    }

    pub async fn handle(
        &self,
        cmd: RemoveParticipantCommand,
        metadata: CommandMetadata,
    ) -> Result<RemoveParticipantResult, TripError> {
        let actor = metadata.actor.clone();
        // Leaving only needs to be a participant
        let required = if actor == cmd.profile_id {
            Permission::Read
        } else {
            Permission::Manage
        };

        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "remove_participant", &metadata, |trip| {
                trip.authorize(&actor, required)?;
                trip.with_participant_removed(&cmd.profile_id, &actor, Timestamp::now())
                    .map(Some)
            })
            .await?;

        let membership_removed = self
            .settle_membership(&cmd.profile_id, &cmd.trip_id)
            .await;

        Ok(RemoveParticipantResult {
            trip: outcome.trip,
            membership_removed,
        })
    }

    /// Drops the trip from the profile's memberships unless the profile is
    /// a participant again. Returns whether the membership is gone.
    async fn settle_membership(&self, profile_id: &ProfileId, trip_id: &TripId) -> bool {
        if self.rejoined(profile_id, trip_id).await {
            return false;
        }

        if let Err(e) = self.directory.remove_membership(profile_id, trip_id).await {
            tracing::warn!(
                trip_id = %trip_id,
                profile_id = %profile_id,
                error = %e,
                "membership removal failed after participant removal"
            );
            return false;
        }

        if !self.rejoined(profile_id, trip_id).await {
            return true;
        }
        tracing::debug!(
            trip_id = %trip_id,
            profile_id = %profile_id,
            "participant rejoined during removal, restoring membership"
        );
        if let Err(e) = self.directory.add_membership(profile_id, *trip_id).await {
            tracing::warn!(
                trip_id = %trip_id,
                profile_id = %profile_id,
                error = %e,
                "could not restore membership of rejoined participant"
            );
        }
        false
    }

    async fn rejoined(&self, profile_id: &ProfileId, trip_id: &TripId) -> bool {
        match self.mutator.store().get(trip_id).await {
            Ok(trip) => trip.participant(profile_id).is_some(),
            // Deleted trips and failed reads fall through to removal
            Err(_) => false,
        }
    }
}
