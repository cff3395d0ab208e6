//! Command infrastructure for CQRS handlers.
//!
//! Instead of each handler accepting the acting profile plus loose
//! correlation parameters, they accept a single `CommandMetadata`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProfileId;

/// Metadata context for command handlers.
///
/// Carries the verified acting profile and correlation context through
/// command processing. Propagated to emitted events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// The verified profile executing this command (used for role checks).
    pub actor: ProfileId,

    /// Links related operations across a single user request.
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl CommandMetadata {
    /// Creates new command metadata for the acting profile.
    pub fn new(actor: ProfileId) -> Self {
        Self {
            actor,
            correlation_id: None,
        }
    }

    /// Builder: Add correlation ID for request tracing.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Returns the correlation ID, generating one if not set.
    pub fn correlation_id(&self) -> String {
        self.correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Returns the correlation ID only if explicitly set.
    pub fn correlation_id_opt(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}
