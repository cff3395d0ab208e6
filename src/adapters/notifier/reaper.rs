//! Background task that expires subscribers whose consumers went away
//! without cancelling and flushes version gaps that stayed open.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use super::TripRooms;

/// Runs [`TripRooms::reap_expired`] and [`TripRooms::flush_stalled`] until
/// shutdown, ticking at the shorter of `reap_interval` and
/// `max_reorder_wait`.
pub fn spawn_reaper(rooms: TripRooms, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let config = rooms.config();
    let period = config
        .reap_interval
        .min(config.max_reorder_wait)
        .max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("subscriber reaper stopping");
                        return;
                    }
                }
                _ = interval.tick() => {
                    let reaped = rooms.reap_expired();
                    if reaped > 0 {
                        tracing::debug!(reaped, "expired idle subscribers");
                    }
                    rooms.flush_stalled();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notifier::TripRoomsConfig;
    use crate::domain::foundation::TripId;
    use crate::domain::foundation::{ProfileId, Version};
    use crate::domain::profile::{ContactHandle, DisplayName, Profile};
    use crate::domain::trip::Trip;
    use crate::ports::ChangeNotifier;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn reaper_expires_leaked_subscribers_and_stops_on_shutdown() {
        let rooms = TripRooms::new(
            TripRoomsConfig::default()
                .with_liveness_timeout(Duration::from_millis(10))
                .with_reap_interval(Duration::from_millis(10)),
        );
        std::mem::forget(rooms.subscribe(TripId::new(), None));
        let (tx, rx) = watch::channel(false);
        let task = spawn_reaper(rooms.clone(), rx);

        time::sleep(Duration::from_millis(80)).await;
        assert_eq!(rooms.total_subscriber_count(), 0);

        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("reaper should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn reaper_flushes_gap_left_by_the_last_commit() {
        let rooms = TripRooms::new(
            TripRoomsConfig::default().with_max_reorder_wait(Duration::from_millis(10)),
        );
        let owner = Profile::new(
            ProfileId::new("alice").unwrap(),
            ContactHandle::new("+1555").unwrap(),
            DisplayName::new("Alice").unwrap(),
        );
        let day = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let trip = Trip::create(TripId::new(), "Oslo", day, day, &owner).unwrap();
        let mut sub = rooms.subscribe(*trip.id(), Some(Version::new(1)));
        let (tx, rx) = watch::channel(false);
        let task = spawn_reaper(rooms.clone(), rx);

        // Version 2 never reaches the notifier
        rooms.publish(&trip.clone().with_version(Version::new(3)));

        let pushed = time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("gap should be flushed by the reaper")
            .unwrap();
        assert_eq!(pushed.version(), Version::new(3));

        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
