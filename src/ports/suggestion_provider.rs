//! Suggestion provider port.
//!
//! The provider sees a read-only snapshot and answers with text. There is
//! no path from its output back into the mutation engine.

use async_trait::async_trait;

use crate::domain::trip::{TripError, TripSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestionError {
    #[error("suggestion service unavailable: {0}")]
    Unavailable(String),

    #[error("suggestion request rejected: {0}")]
    Rejected(String),
}

impl From<SuggestionError> for TripError {
    fn from(err: SuggestionError) -> Self {
        TripError::Infrastructure(err.to_string())
    }
}

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Produces free-text suggestions for the given itinerary.
    async fn suggest(&self, snapshot: &TripSnapshot, prompt: &str)
        -> Result<String, SuggestionError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
