//! CreateTripHandler - Command handler for creating a trip.
//!
//! The owner's membership is recorded before the trip exists so that a
//! fan-out racing with creation already sees the new trip id.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::application::handlers::publish_best_effort;
use crate::domain::foundation::{CommandMetadata, EventId, Timestamp, TripId};
use crate::domain::trip::{Trip, TripError, TripMutated};
use crate::ports::{EventPublisher, ProfileDirectory, TripStore};

/// Command to create a trip owned by the acting profile.
#[derive(Debug, Clone)]
pub struct CreateTripCommand {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Result of successfully creating a trip.
#[derive(Debug, Clone)]
pub struct CreateTripResult {
    pub trip: Trip,
}

/// Handler for creating trips.
pub struct CreateTripHandler {
    store: Arc<dyn TripStore>,
    directory: Arc<dyn ProfileDirectory>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CreateTripHandler {
    pub fn new(
        store: Arc<dyn TripStore>,
        directory: Arc<dyn ProfileDirectory>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            directory,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateTripCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateTripResult, TripError> {
        // 1. Load the owner's profile for the denormalized copy
        let owner = self.directory.get(&metadata.actor).await?;

        // 2. Build the aggregate (validates title and dates)
        let trip = Trip::create(
            TripId::new(),
            cmd.title,
            cmd.start_date,
            cmd.end_date,
            &owner,
        )?;

        // 3. Record membership, then persist
        self.directory
            .add_membership(owner.id(), *trip.id())
            .await?;

        let stored = match self.store.create(&trip).await {
            Ok(stored) => stored,
            Err(err) => {
                if let Err(cleanup) = self
                    .directory
                    .remove_membership(owner.id(), trip.id())
                    .await
                {
                    tracing::warn!(
                        trip_id = %trip.id(),
                        error = %cleanup,
                        "could not roll back owner membership"
                    );
                }
                return Err(err.into());
            }
        };

        tracing::info!(trip_id = %stored.id(), owner = %owner.id(), "trip created");

        // 4. Announce
        let event = TripMutated {
            event_id: EventId::new(),
            trip_id: *stored.id(),
            operation: "create_trip".to_string(),
            version: stored.version(),
            actor: metadata.actor.clone(),
            attempts: 1,
            occurred_at: Timestamp::now(),
        };
        publish_best_effort(self.event_publisher.as_ref(), &event, &metadata).await;

        Ok(CreateTripResult { trip: stored })
    }
}
