//! SubscribeTripHandler - Query handler for live trip updates.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, TripId};
use crate::domain::trip::{Permission, Trip, TripError};
use crate::ports::{Subscription, TripStore};

#[derive(Debug, Clone)]
pub struct SubscribeTripQuery {
    pub trip_id: TripId,
}

/// Current snapshot plus the stream of later commits.
///
/// Pushes carry versions above `snapshot`'s when the store can fix a
/// baseline at subscribe time; otherwise callers should drop pushes whose
/// version is not greater than the one already shown.
#[derive(Debug)]
pub struct SubscribeTripResult {
    pub snapshot: Trip,
    pub subscription: Subscription,
}

pub struct SubscribeTripHandler {
    store: Arc<dyn TripStore>,
}

impl SubscribeTripHandler {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: SubscribeTripQuery,
        metadata: CommandMetadata,
    ) -> Result<SubscribeTripResult, TripError> {
        // Subscribe before reading so no commit falls between the two
        let subscription = self.store.subscribe(&query.trip_id).await?;
        let snapshot = self.store.get(&query.trip_id).await?;

        // A refused subscription is cancelled when dropped here
        snapshot.authorize(&metadata.actor, Permission::Read)?;

        tracing::debug!(trip_id = %query.trip_id, actor = %metadata.actor, "trip subscribed");
        Ok(SubscribeTripResult {
            snapshot,
            subscription,
        })
    }
}
