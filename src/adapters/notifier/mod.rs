//! In-process change notifier.
//!
//! - `TripRooms` - Ordered per-trip delivery with slow-consumer eviction
//! - `spawn_reaper` - Liveness sweep for subscribers that vanished

mod reaper;
mod rooms;

pub use reaper::spawn_reaper;
pub use rooms::{TripRooms, TripRoomsConfig};
