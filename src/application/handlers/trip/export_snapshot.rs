//! ExportTripSnapshotHandler - read-only export for planning assistants.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, TripId};
use crate::domain::trip::{Permission, TripError, TripSnapshot};
use crate::ports::TripStore;

#[derive(Debug, Clone)]
pub struct ExportTripSnapshotQuery {
    pub trip_id: TripId,
}

pub struct ExportTripSnapshotHandler {
    store: Arc<dyn TripStore>,
}

impl ExportTripSnapshotHandler {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: ExportTripSnapshotQuery,
        metadata: CommandMetadata,
    ) -> Result<TripSnapshot, TripError> {
        let trip = self.store.get(&query.trip_id).await?;
        trip.authorize(&metadata.actor, Permission::Read)?;
        Ok(TripSnapshot::from(&trip))
    }
}
