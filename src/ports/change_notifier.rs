//! Change notifier port - per-trip push of committed values.
//!
//! A [`Subscription`] is a bounded receiver plus a control handle back into
//! the notifier. Dropping it cancels it.

use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::domain::foundation::{TripId, Version};
use crate::domain::trip::Trip;

/// Control side of a subscription, implemented by the notifier.
pub trait SubscriptionControl: Send + Sync {
    /// Refreshes the liveness stamp.
    fn touch(&self);

    /// Detaches the subscriber from its room. Must be idempotent.
    fn cancel(&self);
}

/// Publish/subscribe surface the store commits through.
pub trait ChangeNotifier: Send + Sync {
    /// Registers a subscriber for one trip.
    ///
    /// `baseline` is the last committed version the caller already knows
    /// about, when known exactly; pushes resume at its successor.
    fn subscribe(&self, trip_id: TripId, baseline: Option<Version>) -> Subscription;

    /// Delivers a committed value to every subscriber of its trip.
    ///
    /// Must not block; called while the store may hold its commit lock.
    fn publish(&self, trip: &Trip);

    /// Ends every subscription to a trip (used on delete).
    fn close(&self, trip_id: &TripId);

    fn subscriber_count(&self, trip_id: &TripId) -> usize;
}

/// Live stream of committed values for one trip.
pub struct Subscription {
    trip_id: TripId,
    receiver: mpsc::Receiver<Arc<Trip>>,
    control: Option<Arc<dyn SubscriptionControl>>,
}

impl Subscription {
    pub fn new(
        trip_id: TripId,
        receiver: mpsc::Receiver<Arc<Trip>>,
        control: Arc<dyn SubscriptionControl>,
    ) -> Self {
        Self {
            trip_id,
            receiver,
            control: Some(control),
        }
    }

    pub fn trip_id(&self) -> &TripId {
        &self.trip_id
    }

    /// Waits for the next push. `None` once cancelled, closed or dropped
    /// for falling behind.
    pub async fn recv(&mut self) -> Option<Arc<Trip>> {
        let next = self.receiver.recv().await;
        if next.is_some() {
            self.heartbeat();
        }
        next
    }

    /// Returns a push that is already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Trip>> {
        let next = self.receiver.try_recv().ok();
        if next.is_some() {
            self.heartbeat();
        }
        next
    }

    /// Signals that the consumer is still alive while idle.
    pub fn heartbeat(&self) {
        if let Some(control) = &self.control {
            control.touch();
        }
    }

    /// Stops delivery and releases the subscriber slot. Safe to call twice.
    pub fn cancel(&mut self) {
        if let Some(control) = self.control.take() {
            control.cancel();
        }
        self.receiver.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_none()
    }
}

impl Stream for Subscription {
    type Item = Arc<Trip>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.receiver.poll_recv(cx);
        if let Poll::Ready(Some(_)) = &polled {
            self.heartbeat();
        }
        polled
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("trip_id", &self.trip_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
