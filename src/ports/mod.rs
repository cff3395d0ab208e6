//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `TripStore` - Versioned trip documents with compare-and-swap
//! - `ProfileDirectory` - Profiles, the source of truth for display fields
//!
//! ## Notification Ports
//!
//! - `ChangeNotifier` / `Subscription` - Ordered per-trip pushes
//! - `EventPublisher` / `EventSubscriber` / `EventHandler` - Domain events
//!
//! ## Collaborator Ports
//!
//! - `SuggestionProvider` - Read-only itinerary suggestions

mod change_notifier;
mod event_publisher;
mod event_subscriber;
mod profile_directory;
mod suggestion_provider;
mod trip_store;

pub use change_notifier::{ChangeNotifier, Subscription, SubscriptionControl};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use profile_directory::{DirectoryError, DisplayFieldsChange, ProfileDirectory};
pub use suggestion_provider::{SuggestionError, SuggestionProvider};
pub use trip_store::{StoreError, TripStore};
