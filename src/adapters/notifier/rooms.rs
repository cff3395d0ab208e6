//! Per-trip rooms delivering committed trip values to subscribers.
//!
//! ```text
//! Room: trip-1                       Room: trip-2
//! ├── last_delivered: v7             ├── last_delivered: v2
//! ├── pending: {v9}                  ├── pending: {}
//! ├── subscriber-a (mpsc, 256)       └── subscriber-d
//! └── subscriber-b
//! ```
//!
//! Each room delivers versions strictly in sequence. A push that arrives
//! ahead of its predecessor waits in `pending` until the gap fills. The
//! buffer is flushed in version order once it holds more than
//! `max_pending_reorder` entries or the gap has been open for
//! `max_reorder_wait`; the reaper checks the latter on every tick, so a
//! gap at the tail of a burst does not wait for another commit.
//!
//! The registry sits behind a `std::sync::Mutex` so that `publish` never
//! awaits and can run inside a store's commit critical section.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::NotifierConfig;
use crate::domain::foundation::{TripId, Version};
use crate::domain::trip::Trip;
use crate::ports::{ChangeNotifier, Subscription, SubscriptionControl};

/// Tuning for [`TripRooms`].
#[derive(Debug, Clone)]
pub struct TripRoomsConfig {
    /// Buffered pushes per subscriber before it is dropped as too slow.
    pub channel_capacity: usize,

    /// Idle time after which a subscriber is considered gone.
    pub liveness_timeout: Duration,

    /// How often the background reaper runs.
    pub reap_interval: Duration,

    /// Out-of-order pushes held per room before forcing a flush.
    pub max_pending_reorder: usize,

    /// How long a version gap may stay open before forcing a flush.
    pub max_reorder_wait: Duration,
}

impl Default for TripRoomsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            liveness_timeout: Duration::from_secs(60),
            reap_interval: Duration::from_secs(15),
            max_pending_reorder: 64,
            max_reorder_wait: Duration::from_secs(2),
        }
    }
}

impl TripRoomsConfig {
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    pub fn with_max_pending_reorder(mut self, max: usize) -> Self {
        self.max_pending_reorder = max;
        self
    }

    pub fn with_max_reorder_wait(mut self, wait: Duration) -> Self {
        self.max_reorder_wait = wait;
        self
    }
}

impl From<&NotifierConfig> for TripRoomsConfig {
    fn from(config: &NotifierConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity,
            liveness_timeout: config.liveness_timeout(),
            reap_interval: config.reap_interval(),
            max_pending_reorder: config.max_pending_reorder,
            max_reorder_wait: config.max_reorder_wait(),
        }
    }
}

/// Milliseconds since the notifier started, shared with the handle.
struct Liveness {
    epoch: Instant,
    last_seen_ms: AtomicU64,
}

impl Liveness {
    fn new(epoch: Instant) -> Self {
        let liveness = Self {
            epoch,
            last_seen_ms: AtomicU64::new(0),
        };
        liveness.touch();
        liveness
    }

    fn touch(&self) {
        self.last_seen_ms
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn idle_for(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.last_seen_ms.load(Ordering::Relaxed)))
    }
}

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Arc<Trip>>,
    liveness: Arc<Liveness>,
}

#[derive(Default)]
struct Room {
    subscribers: Vec<Subscriber>,
    last_delivered: Option<Version>,
    pending: BTreeMap<Version, Arc<Trip>>,
    gap_opened: Option<Instant>,
}

impl Room {
    /// Sends to every subscriber, dropping those that are full or gone.
    fn deliver(&mut self, trip_id: &TripId, trip: &Arc<Trip>) {
        self.last_delivered = Some(trip.version());
        self.subscribers
            .retain(|sub| match sub.sender.try_send(Arc::clone(trip)) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        trip_id = %trip_id,
                        subscriber = sub.id,
                        version = trip.version().value(),
                        "subscriber fell behind, dropping it"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            });
    }

    fn drain_in_sequence(&mut self, trip_id: &TripId) {
        while let Some(last) = self.last_delivered {
            match self.pending.remove(&last.next()) {
                Some(next) => self.deliver(trip_id, &next),
                None => break,
            }
        }
        if self.pending.is_empty() {
            self.gap_opened = None;
        }
    }

    fn flush_pending(&mut self, trip_id: &TripId) {
        self.gap_opened = None;
        let pending = std::mem::take(&mut self.pending);
        for (_, trip) in pending {
            self.deliver(trip_id, &trip);
        }
    }

    fn gap_stalled(&self, max_wait: Duration) -> bool {
        self.gap_opened
            .map_or(false, |opened| opened.elapsed() >= max_wait)
    }
}

struct Shared {
    rooms: Mutex<HashMap<TripId, Room>>,
    config: TripRoomsConfig,
    next_subscriber: AtomicU64,
    epoch: Instant,
}

impl Shared {
    fn rooms(&self) -> MutexGuard<'_, HashMap<TripId, Room>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_subscriber(&self, trip_id: &TripId, subscriber_id: u64) {
        let mut rooms = self.rooms();
        if let Some(room) = rooms.get_mut(trip_id) {
            room.subscribers.retain(|s| s.id != subscriber_id);
            if room.subscribers.is_empty() {
                rooms.remove(trip_id);
            }
        }
    }
}

/// Control handle held by a [`Subscription`].
struct RoomHandle {
    shared: Weak<Shared>,
    trip_id: TripId,
    subscriber_id: u64,
    liveness: Arc<Liveness>,
    cancelled: AtomicBool,
}

impl SubscriptionControl for RoomHandle {
    fn touch(&self) {
        self.liveness.touch();
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.remove_subscriber(&self.trip_id, self.subscriber_id);
        }
    }
}

/// In-process [`ChangeNotifier`].
#[derive(Clone)]
pub struct TripRooms {
    shared: Arc<Shared>,
}

impl TripRooms {
    pub fn new(config: TripRoomsConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                rooms: Mutex::new(HashMap::new()),
                config,
                next_subscriber: AtomicU64::new(1),
                epoch: Instant::now(),
            }),
        }
    }

    pub fn config(&self) -> &TripRoomsConfig {
        &self.shared.config
    }

    /// Removes subscribers whose receiver is gone or that have been idle
    /// longer than the liveness timeout. Returns how many were removed.
    pub fn reap_expired(&self) -> usize {
        let timeout = self.shared.config.liveness_timeout;
        let now_ms = self.shared.epoch.elapsed().as_millis() as u64;
        let mut removed = 0;
        let mut rooms = self.shared.rooms();
        rooms.retain(|trip_id, room| {
            let before = room.subscribers.len();
            room.subscribers.retain(|sub| {
                !sub.sender.is_closed() && sub.liveness.idle_for(now_ms) <= timeout
            });
            let reaped = before - room.subscribers.len();
            if reaped > 0 {
                tracing::debug!(trip_id = %trip_id, reaped, "reaped idle subscribers");
            }
            removed += reaped;
            !room.subscribers.is_empty()
        });
        removed
    }

    /// Flushes every room whose version gap has been open longer than
    /// `max_reorder_wait`. Returns how many rooms were flushed.
    pub fn flush_stalled(&self) -> usize {
        let max_wait = self.shared.config.max_reorder_wait;
        let mut flushed = 0;
        let mut rooms = self.shared.rooms();
        rooms.retain(|trip_id, room| {
            if room.gap_stalled(max_wait) {
                tracing::warn!(
                    trip_id = %trip_id,
                    last_delivered = room.last_delivered.map(|v| v.value()),
                    pending = room.pending.len(),
                    "version gap stayed open, flushing reorder buffer"
                );
                room.flush_pending(trip_id);
                flushed += 1;
            }
            !room.subscribers.is_empty()
        });
        flushed
    }

    pub fn room_count(&self) -> usize {
        self.shared.rooms().len()
    }

    pub fn total_subscriber_count(&self) -> usize {
        self.shared
            .rooms()
            .values()
            .map(|room| room.subscribers.len())
            .sum()
    }
}

impl Default for TripRooms {
    fn default() -> Self {
        Self::new(TripRoomsConfig::default())
    }
}

impl ChangeNotifier for TripRooms {
    fn subscribe(&self, trip_id: TripId, baseline: Option<Version>) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.shared.config.channel_capacity.max(1));
        let subscriber_id = self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let liveness = Arc::new(Liveness::new(self.shared.epoch));

        {
            let mut rooms = self.shared.rooms();
            let room = rooms.entry(trip_id).or_insert_with(|| Room {
                last_delivered: baseline,
                ..Room::default()
            });
            room.subscribers.push(Subscriber {
                id: subscriber_id,
                sender,
                liveness: Arc::clone(&liveness),
            });
        }

        tracing::debug!(trip_id = %trip_id, subscriber = subscriber_id, "subscriber joined");

        let handle = RoomHandle {
            shared: Arc::downgrade(&self.shared),
            trip_id,
            subscriber_id,
            liveness,
            cancelled: AtomicBool::new(false),
        };
        Subscription::new(trip_id, receiver, Arc::new(handle))
    }

    fn publish(&self, trip: &Trip) {
        let trip_id = *trip.id();
        let version = trip.version();
        let max_pending = self.shared.config.max_pending_reorder;
        let max_wait = self.shared.config.max_reorder_wait;

        let mut rooms = self.shared.rooms();
        let Some(room) = rooms.get_mut(&trip_id) else {
            return;
        };

        match room.last_delivered {
            Some(last) if version <= last => {
                tracing::debug!(trip_id = %trip_id, version = version.value(), "stale push ignored");
            }
            Some(last) if version != last.next() => {
                room.pending.insert(version, Arc::new(trip.clone()));
                room.gap_opened.get_or_insert_with(Instant::now);
                if room.pending.len() > max_pending || room.gap_stalled(max_wait) {
                    tracing::warn!(
                        trip_id = %trip_id,
                        last_delivered = last.value(),
                        pending = room.pending.len(),
                        "version gap did not close, flushing reorder buffer"
                    );
                    room.flush_pending(&trip_id);
                }
            }
            _ => {
                room.deliver(&trip_id, &Arc::new(trip.clone()));
                room.drain_in_sequence(&trip_id);
            }
        }

        if room.subscribers.is_empty() {
            rooms.remove(&trip_id);
        }
    }

    fn close(&self, trip_id: &TripId) {
        if let Some(room) = self.shared.rooms().remove(trip_id) {
            tracing::debug!(
                trip_id = %trip_id,
                subscribers = room.subscribers.len(),
                "closed trip room"
            );
        }
    }

    fn subscriber_count(&self, trip_id: &TripId) -> usize {
        self.shared
            .rooms()
            .get(trip_id)
            .map(|room| room.subscribers.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ProfileId;
    use crate::domain::profile::{ContactHandle, DisplayName, Profile};
    use chrono::NaiveDate;

    fn base_trip() -> Trip {
        let owner = Profile::new(
            ProfileId::new("alice").unwrap(),
            ContactHandle::new("+1555").unwrap(),
            DisplayName::new("Alice").unwrap(),
        );
        let date = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        Trip::create(TripId::new(), "Oslo", date, date, &owner).unwrap()
    }

    fn at(trip: &Trip, version: u64) -> Trip {
        trip.clone().with_version(Version::new(version))
    }

    fn versions(subscription: &mut Subscription) -> Vec<u64> {
        let mut seen = Vec::new();
        while let Some(trip) = subscription.try_recv() {
            seen.push(trip.version().value());
        }
        seen
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber_once() {
        let rooms = TripRooms::default();
        let trip = base_trip();
        let mut a = rooms.subscribe(*trip.id(), Some(Version::new(1)));
        let mut b = rooms.subscribe(*trip.id(), Some(Version::new(1)));

        rooms.publish(&at(&trip, 2));
        rooms.publish(&at(&trip, 3));

        assert_eq!(versions(&mut a), vec![2, 3]);
        assert_eq!(versions(&mut b), vec![2, 3]);
    }

    #[tokio::test]
    async fn out_of_order_pushes_are_resequenced() {
        let rooms = TripRooms::default();
        let trip = base_trip();
        let mut sub = rooms.subscribe(*trip.id(), Some(Version::new(1)));

        rooms.publish(&at(&trip, 3));
        assert!(sub.try_recv().is_none());
        rooms.publish(&at(&trip, 2));
        rooms.publish(&at(&trip, 2));

        assert_eq!(versions(&mut sub), vec![2, 3]);
    }

    #[tokio::test]
    async fn unclosed_gap_is_flushed_after_limit() {
        let rooms = TripRooms::new(TripRoomsConfig::default().with_max_pending_reorder(2));
        let trip = base_trip();
        let mut sub = rooms.subscribe(*trip.id(), Some(Version::new(1)));

        rooms.publish(&at(&trip, 4));
        rooms.publish(&at(&trip, 5));
        assert!(sub.try_recv().is_none());
        rooms.publish(&at(&trip, 6));
        rooms.publish(&at(&trip, 3));

        assert_eq!(versions(&mut sub), vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn stalled_gap_is_flushed_without_another_commit() {
        let rooms = TripRooms::new(
            TripRoomsConfig::default().with_max_reorder_wait(Duration::from_millis(20)),
        );
        let trip = base_trip();
        let mut sub = rooms.subscribe(*trip.id(), Some(Version::new(3)));

        rooms.publish(&at(&trip, 5));
        assert_eq!(rooms.flush_stalled(), 0);
        assert!(sub.try_recv().is_none());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(rooms.flush_stalled(), 1);
        assert_eq!(versions(&mut sub), vec![5]);

        // The missing version is stale once the stream has moved past it
        rooms.publish(&at(&trip, 4));
        rooms.publish(&at(&trip, 6));
        assert_eq!(versions(&mut sub), vec![6]);
    }

    #[tokio::test]
    async fn baseline_resequences_the_first_pushes() {
        let rooms = TripRooms::default();
        let trip = base_trip();
        let mut sub = rooms.subscribe(*trip.id(), Some(Version::new(2)));

        rooms.publish(&at(&trip, 4));
        rooms.publish(&at(&trip, 3));

        assert_eq!(versions(&mut sub), vec![3, 4]);
    }

    #[tokio::test]
    async fn unknown_baseline_starts_at_first_push() {
        let rooms = TripRooms::default();
        let trip = base_trip();
        let mut sub = rooms.subscribe(*trip.id(), None);

        rooms.publish(&at(&trip, 7));
        rooms.publish(&at(&trip, 8));

        assert_eq!(versions(&mut sub), vec![7, 8]);
    }

    #[tokio::test]
    async fn cancel_releases_room() {
        let rooms = TripRooms::default();
        let trip = base_trip();
        let mut sub = rooms.subscribe(*trip.id(), None);
        assert_eq!(rooms.subscriber_count(trip.id()), 1);

        sub.cancel();
        sub.cancel();

        assert_eq!(rooms.subscriber_count(trip.id()), 0);
        assert_eq!(rooms.room_count(), 0);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn full_subscriber_is_dropped_not_skipped() {
        let rooms = TripRooms::new(TripRoomsConfig::default().with_channel_capacity(1));
        let trip = base_trip();
        let mut slow = rooms.subscribe(*trip.id(), Some(Version::new(1)));

        rooms.publish(&at(&trip, 2));
        rooms.publish(&at(&trip, 3));

        assert_eq!(rooms.subscriber_count(trip.id()), 0);
        assert_eq!(slow.recv().await.map(|t| t.version().value()), Some(2));
        assert!(slow.recv().await.is_none());
    }

    #[tokio::test]
    async fn idle_subscribers_are_reaped() {
        let rooms = TripRooms::new(
            TripRoomsConfig::default().with_liveness_timeout(Duration::from_millis(20)),
        );
        let trip = base_trip();
        let idle = rooms.subscribe(*trip.id(), None);
        let alive = rooms.subscribe(*trip.id(), None);

        tokio::time::sleep(Duration::from_millis(60)).await;
        alive.heartbeat();

        assert_eq!(rooms.reap_expired(), 1);
        assert_eq!(rooms.subscriber_count(trip.id()), 1);
        drop(idle);
        drop(alive);
        assert_eq!(rooms.room_count(), 0);
    }

    #[tokio::test]
    async fn leaked_subscription_expires() {
        let rooms = TripRooms::new(
            TripRoomsConfig::default().with_liveness_timeout(Duration::from_millis(20)),
        );
        let trip = base_trip();
        // A consumer that vanished without running Drop.
        std::mem::forget(rooms.subscribe(*trip.id(), None));
        assert_eq!(rooms.reap_expired(), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(rooms.reap_expired(), 1);
        assert_eq!(rooms.room_count(), 0);
    }

    #[tokio::test]
    async fn close_ends_every_stream() {
        let rooms = TripRooms::default();
        let trip = base_trip();
        let mut sub = rooms.subscribe(*trip.id(), None);

        rooms.close(trip.id());

        assert!(sub.recv().await.is_none());
        assert_eq!(rooms.room_count(), 0);
    }
}
