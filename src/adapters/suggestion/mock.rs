//! Mock suggestion provider.
//!
//! Returns scripted replies in order, optionally after a delay, and records
//! every snapshot it was shown.
//!
//! ```ignore
//! let provider = MockSuggestionProvider::new()
//!     .with_reply("Try the Time Out Market for lunch.")
//!     .with_delay(Duration::from_millis(50));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::domain::trip::TripSnapshot;
use crate::ports::{SuggestionError, SuggestionProvider};

#[derive(Debug, Clone)]
pub struct MockSuggestionProvider {
    replies: Arc<Mutex<VecDeque<Result<String, SuggestionError>>>>,
    calls: Arc<Mutex<Vec<(TripSnapshot, String)>>>,
    delay: Duration,
}

impl MockSuggestionProvider {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.lock_replies().push_back(Ok(text.into()));
        self
    }

    pub fn with_error(self, error: SuggestionError) -> Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Snapshots and prompts received so far.
    pub fn calls(&self) -> Vec<(TripSnapshot, String)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, SuggestionError>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockSuggestionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SuggestionProvider for MockSuggestionProvider {
    async fn suggest(
        &self,
        snapshot: &TripSnapshot,
        prompt: &str,
    ) -> Result<String, SuggestionError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((snapshot.clone(), prompt.to_string()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        // Unscripted calls get a canned line so wiring tests need no setup
        self.lock_replies().pop_front().unwrap_or_else(|| {
            Ok(format!(
                "No suggestions for {} right now.",
                snapshot.title
            ))
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
