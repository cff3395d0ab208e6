//! Trip-specific error types.

use crate::domain::foundation::{
    ActivityId, DayId, DomainError, ErrorCode, ProfileId, TripId, ValidationError,
};

/// Coarse failure class callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    ConcurrentModification,
    Infrastructure,
}

/// Trip-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripError {
    /// Trip was not found.
    TripNotFound(TripId),
    /// Day is not part of the trip.
    DayNotFound(DayId),
    /// Activity is not part of the given day.
    ActivityNotFound { day_id: DayId, activity_id: ActivityId },
    /// Profile is not a participant of the trip.
    ParticipantNotFound(ProfileId),
    /// Profile does not exist in the directory.
    ProfileNotFound(ProfileId),
    /// Acting profile lacks the required role.
    Forbidden,
    /// Precondition failed (duplicate participant, bad time window, ...).
    InvalidState(String),
    /// Validation failed.
    ValidationFailed { field: String, message: String },
    /// Compare-and-swap retries were exhausted.
    ConcurrentModification { attempts: u32 },
    /// Infrastructure error.
    Infrastructure(String),
}

impl TripError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        TripError::InvalidState(message.into())
    }
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        TripError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
    pub fn infrastructure(message: impl Into<String>) -> Self {
        TripError::Infrastructure(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TripError::TripNotFound(_)
            | TripError::DayNotFound(_)
            | TripError::ActivityNotFound { .. }
            | TripError::ParticipantNotFound(_)
            | TripError::ProfileNotFound(_) => ErrorKind::NotFound,
            TripError::Forbidden => ErrorKind::Forbidden,
            TripError::InvalidState(_) | TripError::ValidationFailed { .. } => {
                ErrorKind::InvalidState
            }
            TripError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            TripError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TripError::TripNotFound(_) => ErrorCode::TripNotFound,
            TripError::DayNotFound(_) => ErrorCode::DayNotFound,
            TripError::ActivityNotFound { .. } => ErrorCode::ActivityNotFound,
            TripError::ParticipantNotFound(_) => ErrorCode::ParticipantNotFound,
            TripError::ProfileNotFound(_) => ErrorCode::ProfileNotFound,
            TripError::Forbidden => ErrorCode::Forbidden,
            TripError::InvalidState(_) => ErrorCode::InvalidState,
            TripError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            TripError::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            TripError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            TripError::TripNotFound(id) => format!("Trip not found: {}", id),
            TripError::DayNotFound(id) => format!("Day not found: {}", id),
            TripError::ActivityNotFound {
                day_id,
                activity_id,
            } => format!("Activity {} not found in day {}", activity_id, day_id),
            TripError::ParticipantNotFound(id) => format!("Participant not found: {}", id),
            TripError::ProfileNotFound(id) => format!("Profile not found: {}", id),
            TripError::Forbidden => "Permission denied".to_string(),
            TripError::InvalidState(msg) => format!("Invalid state: {}", msg),
            TripError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            TripError::ConcurrentModification { attempts } => format!(
                "Trip was modified concurrently; gave up after {} attempts",
                attempts
            ),
            TripError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for TripError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for TripError {}

impl From<ValidationError> for TripError {
    fn from(err: ValidationError) -> Self {
        TripError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for TripError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Forbidden => TripError::Forbidden,
            ErrorCode::InvalidState | ErrorCode::DuplicateParticipant => {
                TripError::InvalidState(err.message)
            }
            ErrorCode::ValidationFailed => TripError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => TripError::Infrastructure(err.to_string()),
        }
    }
}
