//! Suggestion provider adapters.

mod mock;

pub use mock::MockSuggestionProvider;
