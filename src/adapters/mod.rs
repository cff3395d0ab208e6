//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - In-process trip store and profile directory
//! - `postgres` - Durable trip store and profile directory
//! - `notifier` - Per-trip subscription rooms and the idle reaper
//! - `events` - In-process domain event bus
//! - `suggestion` - Scripted suggestion provider

pub mod events;
pub mod memory;
pub mod notifier;
pub mod postgres;
pub mod suggestion;

pub use events::InMemoryEventBus;
pub use memory::{InMemoryProfileDirectory, InMemoryTripStore};
pub use notifier::{spawn_reaper, TripRooms, TripRoomsConfig};
pub use postgres::{PostgresProfileDirectory, PostgresTripStore};
pub use suggestion::MockSuggestionProvider;
