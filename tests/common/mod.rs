//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use tripsync::adapters::{
    InMemoryProfileDirectory, InMemoryTripStore, MockSuggestionProvider, TripRooms,
    TripRoomsConfig,
};
use tripsync::application::handlers::profile::RegisterProfileCommand;
use tripsync::application::handlers::trip::{
    AddDayCommand, AddParticipantCommand, CreateTripCommand,
};
use tripsync::config::AppConfig;
use tripsync::domain::foundation::{CommandMetadata, DayId, ProfileId, TripId, Version};
use tripsync::domain::profile::{ContactHandle, DisplayName};
use tripsync::domain::trip::{Role, Trip};
use tripsync::ports::{ChangeNotifier, StoreError, Subscription, TripStore};
use tripsync::{RuntimeParts, TripSyncRuntime};

pub fn pid(id: &str) -> ProfileId {
    ProfileId::new(id).unwrap()
}

pub fn meta(id: &str) -> CommandMetadata {
    CommandMetadata::new(pid(id))
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, day).unwrap()
}

/// Defaults tuned for fast tests: generous retries, tiny backoff, quick
/// repair passes.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.mutation.max_attempts = 64;
    config.mutation.base_backoff_ms = 1;
    config.mutation.max_backoff_ms = 5;
    config.fanout.repair_delay_ms = 10;
    config.fanout.max_repair_passes = 3;
    config
}

/// Runtime over in-memory adapters with `store` wrapped by the caller.
pub fn runtime_with_store<F>(config: &AppConfig, wrap: F) -> TripSyncRuntime
where
    F: FnOnce(InMemoryTripStore) -> Arc<dyn TripStore>,
{
    let rooms = TripRooms::new(TripRoomsConfig::from(&config.notifier));
    let notifier: Arc<dyn ChangeNotifier> = Arc::new(rooms.clone());
    TripSyncRuntime::assemble(
        config,
        RuntimeParts {
            store: wrap(InMemoryTripStore::new(notifier)),
            directory: Arc::new(InMemoryProfileDirectory::new()),
            rooms,
            suggestions: Arc::new(MockSuggestionProvider::new()),
        },
    )
}

pub async fn register(runtime: &TripSyncRuntime, id: &str) {
    let name = format!("{}{}", id[..1].to_uppercase(), &id[1..]);
    runtime
        .register_profile_handler()
        .handle(
            RegisterProfileCommand {
                contact_handle: ContactHandle::new(format!("{}@example.com", id)).unwrap(),
                display_name: DisplayName::new(name).unwrap(),
                avatar_ref: None,
            },
            meta(id),
        )
        .await
        .unwrap();
}

/// Trip owned by `owner` with a single empty day.
pub async fn trip_with_day(runtime: &TripSyncRuntime, owner: &str) -> (TripId, DayId) {
    let created = runtime
        .create_trip_handler()
        .handle(
            CreateTripCommand {
                title: "Kyoto".to_string(),
                start_date: date(1),
                end_date: date(10),
            },
            meta(owner),
        )
        .await
        .unwrap();
    let trip_id = *created.trip.id();
    let day = runtime
        .add_day_handler()
        .handle(
            AddDayCommand {
                trip_id,
                date: date(2),
                title: None,
            },
            meta(owner),
        )
        .await
        .unwrap();
    (trip_id, day.day_id)
}

pub async fn join(runtime: &TripSyncRuntime, trip_id: TripId, owner: &str, id: &str, role: Role) {
    runtime
        .add_participant_handler()
        .handle(
            AddParticipantCommand {
                trip_id,
                profile_id: pid(id),
                role,
            },
            meta(owner),
        )
        .await
        .unwrap();
}

type Hook = Box<dyn FnOnce() -> futures::future::BoxFuture<'static, ()> + Send>;

/// Store wrapper that can run a hook right before the next
/// compare-and-swap and can fail chosen trips.
pub struct InterleavingStore {
    inner: InMemoryTripStore,
    before_next_swap: Mutex<Option<Hook>>,
    failing: Mutex<HashSet<TripId>>,
    conflicts: AtomicU32,
}

impl InterleavingStore {
    pub fn new(inner: InMemoryTripStore) -> Self {
        Self {
            inner,
            before_next_swap: Mutex::new(None),
            failing: Mutex::new(HashSet::new()),
            conflicts: AtomicU32::new(0),
        }
    }

    pub fn before_next_swap<F>(&self, hook: F)
    where
        F: FnOnce() -> futures::future::BoxFuture<'static, ()> + Send + 'static,
    {
        *self.before_next_swap.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn fail(&self, trip_id: TripId) {
        self.failing.lock().unwrap().insert(trip_id);
    }

    pub fn heal(&self, trip_id: &TripId) {
        self.failing.lock().unwrap().remove(trip_id);
    }

    pub fn conflicts(&self) -> u32 {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn check(&self, id: &TripId) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(StoreError::Infrastructure("injected outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TripStore for InterleavingStore {
    async fn get(&self, id: &TripId) -> Result<Trip, StoreError> {
        self.check(id)?;
        self.inner.get(id).await
    }

    async fn create(&self, trip: &Trip) -> Result<Trip, StoreError> {
        self.inner.create(trip).await
    }

    async fn compare_and_swap(
        &self,
        id: &TripId,
        expected: Version,
        trip: &Trip,
    ) -> Result<Trip, StoreError> {
        self.check(id)?;
        let hook = self.before_next_swap.lock().unwrap().take();
        if let Some(hook) = hook {
            hook().await;
        }
        let result = self.inner.compare_and_swap(id, expected, trip).await;
        if matches!(result, Err(StoreError::VersionConflict { .. })) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn delete(&self, id: &TripId, expected: Version) -> Result<(), StoreError> {
        self.inner.delete(id, expected).await
    }

    async fn subscribe(&self, id: &TripId) -> Result<Subscription, StoreError> {
        self.inner.subscribe(id).await
    }
}
