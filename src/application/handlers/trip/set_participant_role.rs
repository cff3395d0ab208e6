//! SetParticipantRoleHandler - switches a participant between editor and viewer.

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{CommandMetadata, ProfileId, Timestamp, TripId};
use crate::domain::trip::{Permission, Role, Trip, TripError};

#[derive(Debug, Clone)]
pub struct SetParticipantRoleCommand {
    pub trip_id: TripId,
    pub profile_id: ProfileId,
    pub role: Role,
}

pub struct SetParticipantRoleHandler {
    mutator: TripMutator,
}

impl SetParticipantRoleHandler {
    pub fn new(mutator: TripMutator) -> Self {
        Self { mutator }
    }

    pub async fn handle(
        &self,
        cmd: SetParticipantRoleCommand,
        metadata: CommandMetadata,
    ) -> Result<Trip, TripError> {
        let actor = metadata.actor.clone();
        let outcome = self
            .mutator
            .mutate(&cmd.trip_id, "set_participant_role", &metadata, |trip| {
                trip.authorize(&actor, Permission::Manage)?;
                if trip
                    .participant(&cmd.profile_id)
                    .is_some_and(|p| p.role == cmd.role)
                {
                    return Ok(None);
                }
                trip.with_participant_role(&cmd.profile_id, cmd.role, &actor, Timestamp::now())
                    .map(Some)
            })
            .await?;
        Ok(outcome.trip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::*;

    fn cmd(trip_id: &TripId, id: &str, role: Role) -> SetParticipantRoleCommand {
        SetParticipantRoleCommand {
            trip_id: *trip_id,
            profile_id: pid(id),
            role,
        }
    }

    #[tokio::test]
    async fn owner_promotes_viewer() {
        let fx = Fixture::new();
        let trip = fx.seed_trip().await;
        fx.seed_member(trip.id(), "vic", Role::Viewer).await;

        let trip = SetParticipantRoleHandler::new(fx.mutator())
            .handle(cmd(trip.id(), "vic", Role::Editor), fx.owner_meta())
            .await
            .unwrap();

        assert_eq!(trip.participant(&pid("vic")).unwrap().role, Role::Editor);
    }

    #[tokio::test]
    async fn same_role_writes_nothing() {
        let fx = Fixture::new();
        let trip = fx.seed_trip().await;
        fx.seed_member(trip.id(), "vic", Role::Viewer).await;
        let writes = fx.store.writes();

        SetParticipantRoleHandler::new(fx.mutator())
            .handle(cmd(trip.id(), "vic", Role::Viewer), fx.owner_meta())
            .await
            .unwrap();

        assert_eq!(fx.store.writes(), writes);
    }

    #[tokio::test]
    async fn owner_role_is_not_transferable() {
        let fx = Fixture::new();
        let trip = fx.seed_trip().await;
        fx.seed_member(trip.id(), "ed", Role::Editor).await;

        let result = SetParticipantRoleHandler::new(fx.mutator())
            .handle(cmd(trip.id(), "ed", Role::Owner), fx.owner_meta())
            .await;

        assert!(matches!(result, Err(TripError::InvalidState(_))));
    }

    #[tokio::test]
    async fn editor_cannot_change_roles() {
        let fx = Fixture::new();
        let trip = fx.seed_trip().await;
        fx.seed_member(trip.id(), "ed", Role::Editor).await;
        fx.seed_member(trip.id(), "vic", Role::Viewer).await;

        let result = SetParticipantRoleHandler::new(fx.mutator())
            .handle(cmd(trip.id(), "vic", Role::Editor), meta("ed"))
            .await;

        assert_eq!(result.unwrap_err(), TripError::Forbidden);
    }
}
