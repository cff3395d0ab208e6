//! Denormalization fan-out.
//!
//! `UpdateDisplayFields` publishes an event; [`FanoutTrigger`] turns it into
//! a [`FanoutJob`]; [`FanoutWorker`] runs [`FanoutEngine`] passes until
//! every member trip carries the current display fields or the repair
//! budget is spent.

mod engine;
mod trigger;
mod worker;

pub use engine::{FanoutEngine, FanoutFailure, FanoutReport, TripSyncOutcome};
pub use trigger::FanoutTrigger;
pub use worker::{FanoutJob, FanoutQueue, FanoutQueueError, FanoutWorker};
