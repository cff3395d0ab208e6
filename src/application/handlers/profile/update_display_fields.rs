//! UpdateDisplayFieldsHandler - edits the fields trips hold copies of.
//!
//! The directory commit is the only synchronous step. Propagation to the
//! member trips happens later, driven by the published event; a failure
//! there never fails the edit.

use std::sync::Arc;

use crate::application::handlers::publish_best_effort;
use crate::domain::foundation::{CommandMetadata, EventId, ProfileId, Timestamp};
use crate::domain::profile::{
    DisplayFieldsUpdate, Profile, ProfileDisplayFieldsUpdated, ProfileError,
};
use crate::ports::{EventPublisher, ProfileDirectory};

#[derive(Debug, Clone)]
pub struct UpdateDisplayFieldsCommand {
    pub profile_id: ProfileId,
    pub update: DisplayFieldsUpdate,
}

#[derive(Debug, Clone)]
pub struct UpdateDisplayFieldsResult {
    pub profile: Profile,
    pub changed: bool,
    /// The fan-out event reached the bus.
    pub fanout_scheduled: bool,
}

pub struct UpdateDisplayFieldsHandler {
    directory: Arc<dyn ProfileDirectory>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl UpdateDisplayFieldsHandler {
    pub fn new(
        directory: Arc<dyn ProfileDirectory>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            directory,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateDisplayFieldsCommand,
        metadata: CommandMetadata,
    ) -> Result<UpdateDisplayFieldsResult, ProfileError> {
        // 1. Only the profile's owner edits it
        if metadata.actor != cmd.profile_id {
            return Err(ProfileError::Forbidden);
        }
        if cmd.update.is_empty() {
            return Err(ProfileError::validation(
                "update",
                "at least one display field is required",
            ));
        }

        // 2. Commit to the source of truth
        let change = self
            .directory
            .update_display_fields(&cmd.profile_id, &cmd.update)
            .await?;

        if !change.changed {
            return Ok(UpdateDisplayFieldsResult {
                profile: change.profile,
                changed: false,
                fanout_scheduled: false,
            });
        }

        // 3. Hand off to fan-out
        let profile = change.profile;
        let event = ProfileDisplayFieldsUpdated {
            event_id: EventId::new(),
            profile_id: profile.id().clone(),
            display_name: profile.display_name().clone(),
            contact_handle: profile.contact_handle().clone(),
            updated_at: Timestamp::now(),
        };
        let fanout_scheduled =
            publish_best_effort(self.event_publisher.as_ref(), &event, &metadata).await;

        tracing::info!(
            profile_id = %profile.id(),
            trips = profile.member_of().len(),
            fanout_scheduled,
            "display fields updated"
        );

        Ok(UpdateDisplayFieldsResult {
            profile,
            changed: true,
            fanout_scheduled,
        })
    }
}
