//! In-memory storage adapters, used when no database is configured and in
//! tests.

mod profile_directory;
mod trip_store;

pub use profile_directory::InMemoryProfileDirectory;
pub use trip_store::InMemoryTripStore;
