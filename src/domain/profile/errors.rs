//! Profile-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, ProfileId, ValidationError};

/// Profile-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// Profile was not found.
    NotFound(ProfileId),
    /// Another profile already uses this contact handle.
    DuplicateContactHandle(String),
    /// Acting profile may not edit this profile.
    Forbidden,
    /// Validation failed.
    ValidationFailed { field: String, message: String },
    /// Infrastructure error.
    Infrastructure(String),
}

impl ProfileError {
    pub fn not_found(id: ProfileId) -> Self {
        ProfileError::NotFound(id)
    }
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ProfileError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ProfileError::Infrastructure(message.into())
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            ProfileError::NotFound(_) => ErrorCode::ProfileNotFound,
            ProfileError::DuplicateContactHandle(_) => ErrorCode::DuplicateContactHandle,
            ProfileError::Forbidden => ErrorCode::Forbidden,
            ProfileError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ProfileError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
    pub fn message(&self) -> String {
        match self {
            ProfileError::NotFound(id) => format!("Profile not found: {}", id),
            ProfileError::DuplicateContactHandle(handle) => {
                format!("Contact handle already in use: {}", handle)
            }
            ProfileError::Forbidden => "Permission denied".to_string(),
            ProfileError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ProfileError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ProfileError {}

impl From<ValidationError> for ProfileError {
    fn from(err: ValidationError) -> Self {
        ProfileError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for ProfileError {
    fn from(err: DomainError) -> Self {
        ProfileError::Infrastructure(err.to_string())
    }
}
