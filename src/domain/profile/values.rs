//! Profile value objects that are copied into trips.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

const MAX_CONTACT_HANDLE_LEN: usize = 64;
const MAX_DISPLAY_NAME_LEN: usize = 80;

/// Unique contact identifier of a profile, such as a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContactHandle(String);

impl ContactHandle {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::empty_field("contact_handle"));
        }
        let len = value.chars().count();
        if len > MAX_CONTACT_HANDLE_LEN {
            return Err(ValidationError::too_long(
                "contact_handle",
                MAX_CONTACT_HANDLE_LEN,
                len,
            ));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ValidationError::invalid_format(
                "contact_handle",
                "must not contain whitespace",
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContactHandle {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContactHandle> for String {
    fn from(value: ContactHandle) -> Self {
        value.0
    }
}

impl fmt::Display for ContactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable name shown to other participants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::empty_field("display_name"));
        }
        let len = value.chars().count();
        if len > MAX_DISPLAY_NAME_LEN {
            return Err(ValidationError::too_long(
                "display_name",
                MAX_DISPLAY_NAME_LEN,
                len,
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_handle_is_trimmed() {
        let handle = ContactHandle::new("  +15551234567 ").unwrap();
        assert_eq!(handle.as_str(), "+15551234567");
    }

    #[test]
    fn contact_handle_rejects_inner_whitespace() {
        let err = ContactHandle::new("+1 555 123").unwrap_err();
        assert_eq!(err.field(), "contact_handle");
    }

    #[test]
    fn contact_handle_rejects_empty() {
        assert!(matches!(
            ContactHandle::new("   "),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn display_name_rejects_overlong() {
        let long = "x".repeat(81);
        assert!(matches!(
            DisplayName::new(long),
            Err(ValidationError::TooLong { max: 80, actual: 81, .. })
        ));
    }

    #[test]
    fn display_name_deserialization_validates() {
        let ok: DisplayName = serde_json::from_str(r#""Ada""#).unwrap();
        assert_eq!(ok.as_str(), "Ada");
        assert!(serde_json::from_str::<DisplayName>(r#""""#).is_err());
    }
}
