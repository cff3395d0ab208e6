//! RegisterProfileHandler - creates a profile on first authentication.
//!
//! Idempotent: registering an existing profile returns it unchanged. The
//! profile id is the verified id from the identity provider, taken from the
//! command metadata rather than the request body.

use std::sync::Arc;

use crate::domain::foundation::CommandMetadata;
use crate::domain::profile::{ContactHandle, DisplayName, Profile, ProfileError};
use crate::ports::{DirectoryError, ProfileDirectory};

#[derive(Debug, Clone)]
pub struct RegisterProfileCommand {
    pub contact_handle: ContactHandle,
    pub display_name: DisplayName,
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegisterProfileResult {
    pub profile: Profile,
    pub created: bool,
}

pub struct RegisterProfileHandler {
    directory: Arc<dyn ProfileDirectory>,
}

impl RegisterProfileHandler {
    pub fn new(directory: Arc<dyn ProfileDirectory>) -> Self {
        Self { directory }
    }

    pub async fn handle(
        &self,
        cmd: RegisterProfileCommand,
        metadata: CommandMetadata,
    ) -> Result<RegisterProfileResult, ProfileError> {
        // 1. Already registered?
        match self.directory.get(&metadata.actor).await {
            Ok(profile) => {
                return Ok(RegisterProfileResult {
                    profile,
                    created: false,
                })
            }
            Err(DirectoryError::NotFound(_)) => {}
            Err(other) => return Err(other.into()),
        }

        // 2. Create
        let profile = Profile::new(metadata.actor.clone(), cmd.contact_handle, cmd.display_name)
            .with_avatar_ref(cmd.avatar_ref);

        match self.directory.create(&profile).await {
            Ok(()) => {
                tracing::info!(profile_id = %profile.id(), "profile registered");
                Ok(RegisterProfileResult {
                    profile,
                    created: true,
                })
            }
            // A parallel first login got there first
            Err(DirectoryError::AlreadyExists(id)) => Ok(RegisterProfileResult {
                profile: self.directory.get(&id).await?,
                created: false,
            }),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::*;

    fn cmd(handle: &str, name: &str) -> RegisterProfileCommand {
        RegisterProfileCommand {
            contact_handle: ContactHandle::new(handle).unwrap(),
            display_name: DisplayName::new(name).unwrap(),
            avatar_ref: None,
        }
    }

    #[tokio::test]
    async fn first_registration_creates_profile() {
        let fx = Fixture::new();
        let handler = RegisterProfileHandler::new(fx.directory.clone());

        let result = handler
            .handle(cmd("+351900000001", "Ana"), meta("ana"))
            .await
            .unwrap();

        assert!(result.created);
        assert_eq!(result.profile.display_name().as_str(), "Ana");
        assert!(result.profile.member_of().is_empty());
    }

    #[tokio::test]
    async fn second_registration_returns_existing() {
        let fx = Fixture::new();
        let handler = RegisterProfileHandler::new(fx.directory.clone());
        handler
            .handle(cmd("+351900000001", "Ana"), meta("ana"))
            .await
            .unwrap();

        let again = handler
            .handle(cmd("+351900000001", "Ana Maria"), meta("ana"))
            .await
            .unwrap();

        assert!(!again.created);
        assert_eq!(again.profile.display_name().as_str(), "Ana");
    }

    #[tokio::test]
    async fn contact_handle_must_be_unique() {
        let fx = Fixture::new();
        let handler = RegisterProfileHandler::new(fx.directory.clone());
        handler
            .handle(cmd("+351900000001", "Ana"), meta("ana"))
            .await
            .unwrap();

        let result = handler
            .handle(cmd("+351900000001", "Bruno"), meta("bruno"))
            .await;

        assert!(matches!(
            result,
            Err(ProfileError::DuplicateContactHandle(_))
        ));
    }
}
