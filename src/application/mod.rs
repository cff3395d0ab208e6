//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Trip writes funnel through the compare-and-swap mutator; profile edits
//! hand propagation off to the fan-out worker.

pub mod fanout;
pub mod handlers;

#[cfg(test)]
pub(crate) mod test_support;

pub use fanout::{FanoutEngine, FanoutQueue, FanoutReport, FanoutTrigger, FanoutWorker};
pub use handlers::trip::{RetryPolicy, TripMutator};
