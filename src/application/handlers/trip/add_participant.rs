//! AddParticipantHandler - Command handler for adding a profile to a trip.
//!
//! Ordering matters for denormalization:
//!
//! 1. The trip id is added to the profile's `member_of` first, so any
//!    fan-out that starts from here on includes this trip.
//! 2. The participant is written into the trip with a copy of the profile's
//!    display fields.
//! 3. Membership is asserted again, which also re-reads the profile. A
//!    removal that raced this join may have dropped the first one. If the
//!    profile changed between step 1 and step 2 the copy is repaired in
//!    place; a fan-out that ran in that window may have skipped the trip
//!    because the participant was not there yet.
//!
//! Once step 2 commits the join has happened. Failures after that are
//! logged and reported as an unrepaired join, never as an error.

use std::sync::Arc;

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{CommandMetadata, ProfileId, Timestamp, TripId};
use crate::domain::trip::{ParticipantRef, Permission, Role, Trip, TripError};
use crate::ports::ProfileDirectory;

#[derive(Debug, Clone)]
pub struct AddParticipantCommand {
    pub trip_id: TripId,
    pub profile_id: ProfileId,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct AddParticipantResult {
    pub trip: Trip,
    /// The copy was refreshed after the join because the profile moved on.
    pub repaired: bool,
}

pub struct AddParticipantHandler {
    mutator: TripMutator,
    directory: Arc<dyn ProfileDirectory>,
}

impl AddParticipantHandler {
    pub fn new(mutator: TripMutator, directory: Arc<dyn ProfileDirectory>) -> Self {
        Self { mutator, directory }
    }

    pub async fn handle(
        &self,
        cmd: AddParticipantCommand,
        metadata: CommandMetadata,
    ) -> Result<AddParticipantResult, TripError> {
        let actor = metadata.actor.clone();

        // 1. Load profile and check preconditions before touching membership
        let profile = self.directory.get(&cmd.profile_id).await?;
        let current = self.mutator.store().get(&cmd.trip_id).await?;
        current.authorize(&actor, Permission::Manage)?;
        if current.participant(&cmd.profile_id).is_some() {
            return Err(TripError::invalid_state(format!(
                "{} is already a participant",
                cmd.profile_id
            )));
        }
        let already_member = profile.member_of().contains(&cmd.trip_id);

        // 2. Membership first
        self.directory
            .add_membership(&cmd.profile_id, cmd.trip_id)
            .await?;

        // 3. Write the participant
        let participant = ParticipantRef::from_profile(&profile, cmd.role, Timestamp::now());
        let added = self
            .mutator
            .mutate(&cmd.trip_id, "add_participant", &metadata, |trip| {
                trip.authorize(&actor, Permission::Manage)?;
                trip.with_participant_added(participant.clone(), &actor, Timestamp::now())
                    .map(Some)
            })
            .await;

        let outcome = match added {
            Ok(outcome) => outcome,
            Err(err) => {
                if !already_member {
                    self.rollback_membership(&cmd.profile_id, &cmd.trip_id).await;
                }
                return Err(err);
            }
        };

        // 4. Post-join repair
        let latest = match self
            .directory
            .add_membership(&cmd.profile_id, cmd.trip_id)
            .await
        {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!(
                    trip_id = %cmd.trip_id,
                    profile_id = %cmd.profile_id,
                    error = %e,
                    "post-join profile read failed; leaving copy for fan-out"
                );
                return Ok(AddParticipantResult {
                    trip: outcome.trip,
                    repaired: false,
                });
            }
        };
        if participant.is_synced_with(latest.contact_handle(), latest.display_name()) {
            return Ok(AddParticipantResult {
                trip: outcome.trip,
                repaired: false,
            });
        }

        tracing::debug!(
            trip_id = %cmd.trip_id,
            profile_id = %cmd.profile_id,
            "profile changed during join, repairing copy"
        );
        let repaired = self
            .mutator
            .mutate(&cmd.trip_id, "sync_participant", &metadata, |trip| {
                match trip.with_participant_synced(
                    &cmd.profile_id,
                    latest.contact_handle(),
                    latest.display_name(),
                ) {
                    // Removed again in the meantime; nothing to repair
                    Err(TripError::ParticipantNotFound(_)) => Ok(None),
                    other => other,
                }
            })
            .await;

        match repaired {
            Ok(repaired) => Ok(AddParticipantResult {
                repaired: repaired.written,
                trip: repaired.trip,
            }),
            Err(e) => {
                tracing::warn!(
                    trip_id = %cmd.trip_id,
                    profile_id = %cmd.profile_id,
                    error = %e,
                    "post-join repair failed; leaving copy for fan-out"
                );
                Ok(AddParticipantResult {
                    trip: outcome.trip,
                    repaired: false,
                })
            }
        }
    }

    async fn rollback_membership(&self, profile_id: &ProfileId, trip_id: &TripId) {
        // A concurrent join of the same profile may have won; keep its membership
        if let Ok(trip) = self.mutator.store().get(trip_id).await {
            if trip.participant(profile_id).is_some() {
                return;
            }
        }
        if let Err(e) = self.directory.remove_membership(profile_id, trip_id).await {
            tracing::warn!(
                trip_id = %trip_id,
                profile_id = %profile_id,
                error = %e,
                "could not roll back membership after failed join"
            );
        }
    }
}
