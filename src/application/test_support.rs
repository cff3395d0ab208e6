//! Shared fixtures for handler and fan-out tests.
//!
//! The scripted store and directory wrap the in-memory adapters and add
//! knobs for conflicts and failures that real backends only produce under
//! load.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::adapters::events::InMemoryEventBus;
use crate::adapters::memory::{InMemoryProfileDirectory, InMemoryTripStore};
use crate::adapters::notifier::TripRooms;
use crate::application::handlers::trip::{RetryPolicy, TripMutator};
use crate::domain::foundation::{
    CommandMetadata, DomainError, ErrorCode, EventEnvelope, ProfileId, Timestamp, TripId, Version,
};
use crate::domain::profile::{ContactHandle, DisplayFieldsUpdate, DisplayName, Profile};
use crate::domain::trip::{ParticipantRef, Role, Trip};
use crate::ports::{
    DirectoryError, DisplayFieldsChange, EventPublisher, ProfileDirectory, StoreError,
    Subscription, TripStore,
};

pub fn pid(id: &str) -> ProfileId {
    ProfileId::new(id).unwrap()
}

pub fn owner() -> ProfileId {
    pid("owner")
}

/// June 2026, day `d`.
pub fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

pub fn meta(id: &str) -> CommandMetadata {
    CommandMetadata::new(pid(id))
}

// ─────────────────────────────────────────────────────────────────────
// Scripted store
// ─────────────────────────────────────────────────────────────────────

pub struct ScriptedStore {
    inner: InMemoryTripStore,
    conflicts: AtomicU32,
    reads: AtomicU32,
    writes: AtomicU32,
    conflicts_after_write: Mutex<Option<u32>>,
    failing: Mutex<HashSet<TripId>>,
}

impl ScriptedStore {
    pub fn new(rooms: TripRooms) -> Self {
        Self {
            inner: InMemoryTripStore::new(Arc::new(rooms)),
            conflicts: AtomicU32::new(0),
            reads: AtomicU32::new(0),
            writes: AtomicU32::new(0),
            conflicts_after_write: Mutex::new(None),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Makes the next `n` compare-and-swap calls report a conflict.
    /// `u32::MAX` means every call.
    pub fn conflict_next(&self, n: u32) {
        self.conflicts.store(n, Ordering::SeqCst);
    }

    /// Lets the next write through, then behaves as `conflict_next(n)`.
    pub fn conflict_after_next_write(&self, n: u32) {
        *self.conflicts_after_write.lock().unwrap() = Some(n);
    }

    /// Reads of this trip fail with an infrastructure error.
    pub fn fail_trip(&self, id: TripId) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn heal_trip(&self, id: &TripId) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    fn take_conflict(&self) -> bool {
        self.conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

#[async_trait]
impl TripStore for ScriptedStore {
    async fn get(&self, id: &TripId) -> Result<Trip, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(id) {
            return Err(StoreError::Infrastructure("disk on fire".into()));
        }
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
        if self.take_conflict() {
            return Err(StoreError::VersionConflict {
                expected,
                actual: expected.next(),
            });
        }
        let committed = self.inner.compare_and_swap(id, expected, trip).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(n) = self.conflicts_after_write.lock().unwrap().take() {
            self.conflict_next(n);
        }
        Ok(committed)
    }

    async fn delete(&self, id: &TripId, expected: Version) -> Result<(), StoreError> {
        if self.take_conflict() {
            return Err(StoreError::VersionConflict {
                expected,
                actual: expected.next(),
            });
        }
        self.inner.delete(id, expected).await
    }

    async fn subscribe(&self, id: &TripId) -> Result<Subscription, StoreError> {
        self.inner.subscribe(id).await
    }
}

// ─────────────────────────────────────────────────────────────────────
// Scripted directory
// ─────────────────────────────────────────────────────────────────────

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
pub struct ScriptedDirectory {
    inner: InMemoryProfileDirectory,
    failing_gets: AtomicU32,
    fail_add_membership: AtomicBool,
    fail_remove_membership: AtomicBool,
    edit_on_join: Mutex<Option<DisplayFieldsUpdate>>,
    before_remove_membership: Mutex<Option<Hook>>,
}

impl ScriptedDirectory {
    /// Makes the next `n` profile reads fail with an infrastructure error.
    pub fn fail_next_gets(&self, n: u32) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }

    pub fn fail_add_membership(&self, fail: bool) {
        self.fail_add_membership.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove_membership(&self, fail: bool) {
        self.fail_remove_membership.store(fail, Ordering::SeqCst);
    }

    /// Applies `update` to the joining profile just before its next
    /// membership is recorded, as a concurrent edit would.
    pub fn edit_on_join(&self, update: DisplayFieldsUpdate) {
        *self.edit_on_join.lock().unwrap() = Some(update);
    }

    /// Runs `hook` inside the next membership removal, before it applies.
    pub fn before_remove_membership<F>(&self, hook: F)
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        *self.before_remove_membership.lock().unwrap() = Some(Box::new(hook));
    }
}

#[async_trait]
impl ProfileDirectory for ScriptedDirectory {
    async fn get(&self, id: &ProfileId) -> Result<Profile, DirectoryError> {
        let failed = self
            .failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DirectoryError::Infrastructure("directory down".into()));
        }
        self.inner.get(id).await
    }

    async fn find_by_contact_handle(
        &self,
        handle: &ContactHandle,
    ) -> Result<Option<Profile>, DirectoryError> {
        self.inner.find_by_contact_handle(handle).await
    }

    async fn create(&self, profile: &Profile) -> Result<(), DirectoryError> {
        self.inner.create(profile).await
    }

    async fn update_display_fields(
        &self,
        id: &ProfileId,
        update: &DisplayFieldsUpdate,
    ) -> Result<DisplayFieldsChange, DirectoryError> {
        self.inner.update_display_fields(id, update).await
    }

    async fn add_membership(
        &self,
        id: &ProfileId,
        trip_id: TripId,
    ) -> Result<Profile, DirectoryError> {
        if self.fail_add_membership.load(Ordering::SeqCst) {
            return Err(DirectoryError::Infrastructure("directory down".into()));
        }
        let edit = self.edit_on_join.lock().unwrap().take();
        if let Some(update) = edit {
            self.inner.update_display_fields(id, &update).await?;
        }
        self.inner.add_membership(id, trip_id).await
    }

    async fn remove_membership(
        &self,
        id: &ProfileId,
        trip_id: &TripId,
    ) -> Result<(), DirectoryError> {
        if self.fail_remove_membership.load(Ordering::SeqCst) {
            return Err(DirectoryError::Infrastructure("directory down".into()));
        }
        let hook = self.before_remove_membership.lock().unwrap().take();
        if let Some(hook) = hook {
            hook().await;
        }
        self.inner.remove_membership(id, trip_id).await
    }
}

/// Publisher whose every call fails.
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: EventEnvelope) -> Result<(), DomainError> {
        Err(DomainError::new(ErrorCode::InternalError, "bus unavailable"))
    }

    async fn publish_all(&self, _events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        Err(DomainError::new(ErrorCode::InternalError, "bus unavailable"))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Fixture
// ─────────────────────────────────────────────────────────────────────

pub struct Fixture {
    pub rooms: TripRooms,
    pub store: Arc<ScriptedStore>,
    pub directory: Arc<ScriptedDirectory>,
    pub events: Arc<InMemoryEventBus>,
}

impl Fixture {
    pub fn new() -> Self {
        let rooms = TripRooms::default();
        Self {
            store: Arc::new(ScriptedStore::new(rooms.clone())),
            rooms,
            directory: Arc::new(ScriptedDirectory::default()),
            events: Arc::new(InMemoryEventBus::new()),
        }
    }

    pub fn policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(3)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
    }

    pub fn mutator(&self) -> TripMutator {
        TripMutator::new(self.store.clone(), self.events.clone(), Self::policy())
    }

    pub fn owner_meta(&self) -> CommandMetadata {
        CommandMetadata::new(owner())
    }

    /// Creates the profile `id` named after it, or returns it if present.
    pub async fn seed_profile(&self, id: &str) -> Profile {
        if let Ok(existing) = self.directory.get(&pid(id)).await {
            return existing;
        }
        let mut name = id.to_string();
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        let profile = Profile::new(
            pid(id),
            ContactHandle::new(format!("{}@example.com", id)).unwrap(),
            DisplayName::new(name).unwrap(),
        );
        self.directory.create(&profile).await.unwrap();
        profile
    }

    /// A week-long trip owned by `owner`, with membership recorded.
    pub async fn seed_trip(&self) -> Trip {
        let profile = self.seed_profile("owner").await;
        let trip = Trip::create(TripId::new(), "Lisbon", date(1), date(7), &profile).unwrap();
        let stored = self.store.create(&trip).await.unwrap();
        self.directory
            .add_membership(profile.id(), *stored.id())
            .await
            .unwrap();
        stored
    }

    /// Adds `id` to the trip with `role`, bypassing the handlers.
    pub async fn seed_member(&self, trip_id: &TripId, id: &str, role: Role) -> Trip {
        let profile = self.seed_profile(id).await;
        self.directory
            .add_membership(profile.id(), *trip_id)
            .await
            .unwrap();
        let current = self.store.get(trip_id).await.unwrap();
        let next = current
            .with_participant_added(
                ParticipantRef::from_profile(&profile, role, Timestamp::now()),
                &owner(),
                Timestamp::now(),
            )
            .unwrap();
        self.store
            .compare_and_swap(trip_id, current.version(), &next)
            .await
            .unwrap()
    }

    pub async fn trip(&self, trip_id: &TripId) -> Trip {
        self.store.get(trip_id).await.unwrap()
    }

    pub async fn profile(&self, id: &str) -> Profile {
        self.directory.get(&pid(id)).await.unwrap()
    }
}
