//! In-memory trip store.
//!
//! Commits and notifier pushes happen under the same write lock, so the
//! notifier observes versions in commit order and a subscriber registered
//! under the read lock knows its exact starting version.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{TripId, Version};
use crate::domain::trip::Trip;
use crate::ports::{ChangeNotifier, StoreError, Subscription, TripStore};

#[derive(Clone)]
pub struct InMemoryTripStore {
    trips: Arc<RwLock<HashMap<TripId, Trip>>>,
    notifier: Arc<dyn ChangeNotifier>,
    commits: Arc<AtomicU64>,
}

impl InMemoryTripStore {
    pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            trips: Arc::new(RwLock::new(HashMap::new())),
            notifier,
            commits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Successful compare-and-swap writes since creation.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    pub async fn trip_count(&self) -> usize {
        self.trips.read().await.len()
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn get(&self, id: &TripId) -> Result<Trip, StoreError> {
        self.trips
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn create(&self, trip: &Trip) -> Result<Trip, StoreError> {
        let mut trips = self.trips.write().await;
        if trips.contains_key(trip.id()) {
            return Err(StoreError::AlreadyExists(*trip.id()));
        }
        let stored = trip.clone().with_version(Version::INITIAL);
        trips.insert(*stored.id(), stored.clone());
        Ok(stored)
    }

    async fn compare_and_swap(
        &self,
        id: &TripId,
        expected: Version,
        trip: &Trip,
    ) -> Result<Trip, StoreError> {
        let mut trips = self.trips.write().await;
        let current = trips.get(id).ok_or(StoreError::NotFound(*id))?;
        if current.version() != expected {
            return Err(StoreError::VersionConflict {
                expected,
                actual: current.version(),
            });
        }
        let committed = trip.clone().with_version(expected.next());
        trips.insert(*id, committed.clone());
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.notifier.publish(&committed);
        Ok(committed)
    }

    async fn delete(&self, id: &TripId, expected: Version) -> Result<(), StoreError> {
        let mut trips = self.trips.write().await;
        let current = trips.get(id).ok_or(StoreError::NotFound(*id))?;
        if current.version() != expected {
            return Err(StoreError::VersionConflict {
                expected,
                actual: current.version(),
            });
        }
        trips.remove(id);
        self.notifier.close(id);
        Ok(())
    }

    async fn subscribe(&self, id: &TripId) -> Result<Subscription, StoreError> {
        let trips = self.trips.read().await;
        let current = trips.get(id).ok_or(StoreError::NotFound(*id))?;
        Ok(self.notifier.subscribe(*id, Some(current.version())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notifier::TripRooms;
    use crate::domain::foundation::ProfileId;
    use crate::domain::profile::{ContactHandle, DisplayName, Profile};
    use chrono::NaiveDate;

    fn store() -> InMemoryTripStore {
        InMemoryTripStore::new(Arc::new(TripRooms::default()))
    }

    fn trip() -> Trip {
        let owner = Profile::new(
            ProfileId::new("alice").unwrap(),
            ContactHandle::new("+1555").unwrap(),
            DisplayName::new("Alice").unwrap(),
        );
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        Trip::create(TripId::new(), "Rome", date, date, &owner).unwrap()
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = store();
        let trip = trip();
        store.create(&trip).await.unwrap();

        let loaded = store.get(trip.id()).await.unwrap();
        assert_eq!(loaded.version(), Version::INITIAL);
        assert_eq!(
            store.create(&trip).await.unwrap_err(),
            StoreError::AlreadyExists(*trip.id())
        );
    }

    #[tokio::test]
    async fn cas_bumps_version_and_rejects_stale_writers() {
        let store = store();
        let trip = store.create(&trip()).await.unwrap();

        let committed = store
            .compare_and_swap(trip.id(), Version::INITIAL, &trip)
            .await
            .unwrap();
        assert_eq!(committed.version(), Version::new(2));

        let stale = store
            .compare_and_swap(trip.id(), Version::INITIAL, &trip)
            .await
            .unwrap_err();
        assert_eq!(
            stale,
            StoreError::VersionConflict {
                expected: Version::INITIAL,
                actual: Version::new(2)
            }
        );
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn subscriber_sees_each_commit() {
        let store = store();
        let trip = store.create(&trip()).await.unwrap();
        let mut sub = store.subscribe(trip.id()).await.unwrap();

        let v2 = store
            .compare_and_swap(trip.id(), Version::new(1), &trip)
            .await
            .unwrap();
        store
            .compare_and_swap(trip.id(), v2.version(), &v2)
            .await
            .unwrap();

        assert_eq!(sub.recv().await.unwrap().version(), Version::new(2));
        assert_eq!(sub.recv().await.unwrap().version(), Version::new(3));
    }

    #[tokio::test]
    async fn delete_is_version_guarded_and_closes_streams() {
        let store = store();
        let trip = store.create(&trip()).await.unwrap();
        let mut sub = store.subscribe(trip.id()).await.unwrap();

        assert!(store.delete(trip.id(), Version::new(9)).await.is_err());
        store.delete(trip.id(), Version::INITIAL).await.unwrap();

        assert!(sub.recv().await.is_none());
        assert_eq!(
            store.get(trip.id()).await.unwrap_err(),
            StoreError::NotFound(*trip.id())
        );
    }
}
