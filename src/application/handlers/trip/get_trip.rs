//! GetTripHandler - Query handler for reading a trip.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, TripId};
use crate::domain::trip::{Permission, Trip, TripError};
use crate::ports::TripStore;

#[derive(Debug, Clone)]
pub struct GetTripQuery {
    pub trip_id: TripId,
}

/// Reads a trip on behalf of one of its participants.
pub struct GetTripHandler {
    store: Arc<dyn TripStore>,
}

impl GetTripHandler {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetTripQuery,
        metadata: CommandMetadata,
    ) -> Result<Trip, TripError> {
        let trip = self.store.get(&query.trip_id).await?;
        trip.authorize(&metadata.actor, Permission::Read)?;
        Ok(trip)
    }
}
