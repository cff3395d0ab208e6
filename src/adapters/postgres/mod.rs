//! PostgreSQL adapters - Durable implementations of the storage ports.
//!
//! - `PostgresTripStore` - Trips as versioned JSONB documents
//! - `PostgresProfileDirectory` - Profiles with a `uuid[]` membership column
//! - `connect` / `migrate` - Pool setup and embedded migrations

mod pool;
mod profile_directory;
mod trip_store;

pub use pool::{connect, migrate};
pub use profile_directory::PostgresProfileDirectory;
pub use trip_store::PostgresTripStore;
