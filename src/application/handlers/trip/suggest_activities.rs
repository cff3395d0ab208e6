//! SuggestActivitiesHandler - asks the suggestion service about a trip.
//!
//! The provider receives a snapshot and returns text. Nothing it says is
//! written back; callers turn accepted ideas into ordinary `AddActivity`
//! commands.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, TripId};
use crate::domain::trip::{Permission, TripError, TripSnapshot};
use crate::ports::{SuggestionProvider, TripStore};

#[derive(Debug, Clone)]
pub struct SuggestActivitiesCommand {
    pub trip_id: TripId,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct SuggestActivitiesResult {
    pub suggestions: String,
    /// Version the suggestions were based on.
    pub based_on_version: u64,
}

pub struct SuggestActivitiesHandler {
    store: Arc<dyn TripStore>,
    provider: Arc<dyn SuggestionProvider>,
}

impl SuggestActivitiesHandler {
    pub fn new(store: Arc<dyn TripStore>, provider: Arc<dyn SuggestionProvider>) -> Self {
        Self { store, provider }
    }

    pub async fn handle(
        &self,
        cmd: SuggestActivitiesCommand,
        metadata: CommandMetadata,
    ) -> Result<SuggestActivitiesResult, TripError> {
        let trip = self.store.get(&cmd.trip_id).await?;
        trip.authorize(&metadata.actor, Permission::Read)?;
        let snapshot = TripSnapshot::from(&trip);

        let suggestions = self
            .provider
            .suggest(&snapshot, &cmd.prompt)
            .await
            .map_err(|e| {
                tracing::warn!(
                    trip_id = %cmd.trip_id,
                    provider = self.provider.name(),
                    error = %e,
                    "suggestion request failed"
                );
                TripError::from(e)
            })?;

        Ok(SuggestActivitiesResult {
            suggestions,
            based_on_version: snapshot.version,
        })
    }
}
