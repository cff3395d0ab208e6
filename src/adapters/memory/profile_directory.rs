//! In-memory identity directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{ProfileId, TripId};
use crate::domain::profile::{ContactHandle, DisplayFieldsUpdate, Profile};
use crate::ports::{DirectoryError, DisplayFieldsChange, ProfileDirectory};

#[derive(Default)]
struct Records {
    profiles: HashMap<ProfileId, Profile>,
    handles: HashMap<ContactHandle, ProfileId>,
}

#[derive(Clone, Default)]
pub struct InMemoryProfileDirectory {
    records: Arc<RwLock<Records>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn profile_count(&self) -> usize {
        self.records.read().await.profiles.len()
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn get(&self, id: &ProfileId) -> Result<Profile, DirectoryError> {
        self.records
            .read()
            .await
            .profiles
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))
    }

    async fn find_by_contact_handle(
        &self,
        handle: &ContactHandle,
    ) -> Result<Option<Profile>, DirectoryError> {
        let records = self.records.read().await;
        Ok(records
            .handles
            .get(handle)
            .and_then(|id| records.profiles.get(id))
            .cloned())
    }

    async fn create(&self, profile: &Profile) -> Result<(), DirectoryError> {
        let mut records = self.records.write().await;
        if records.profiles.contains_key(profile.id()) {
            return Err(DirectoryError::AlreadyExists(profile.id().clone()));
        }
        if records.handles.contains_key(profile.contact_handle()) {
            return Err(DirectoryError::DuplicateContactHandle(
                profile.contact_handle().to_string(),
            ));
        }
        records
            .handles
            .insert(profile.contact_handle().clone(), profile.id().clone());
        records.profiles.insert(profile.id().clone(), profile.clone());
        Ok(())
    }

    async fn update_display_fields(
        &self,
        id: &ProfileId,
        update: &DisplayFieldsUpdate,
    ) -> Result<DisplayFieldsChange, DirectoryError> {
        let mut guard = self.records.write().await;
        let records = &mut *guard;

        if let Some(handle) = &update.contact_handle {
            if let Some(owner) = records.handles.get(handle) {
                if owner != id {
                    return Err(DirectoryError::DuplicateContactHandle(handle.to_string()));
                }
            }
        }

        let profile = records
            .profiles
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
        let old_handle = profile.contact_handle().clone();
        let changed = profile.apply_display_fields(update);

        if profile.contact_handle() != &old_handle {
            records.handles.remove(&old_handle);
            records
                .handles
                .insert(profile.contact_handle().clone(), id.clone());
        }

        Ok(DisplayFieldsChange {
            profile: profile.clone(),
            changed,
        })
    }

    async fn add_membership(
        &self,
        id: &ProfileId,
        trip_id: TripId,
    ) -> Result<Profile, DirectoryError> {
        let mut records = self.records.write().await;
        let profile = records
            .profiles
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
        profile.join_trip(trip_id);
        Ok(profile.clone())
    }

    async fn remove_membership(
        &self,
        id: &ProfileId,
        trip_id: &TripId,
    ) -> Result<(), DirectoryError> {
        let mut records = self.records.write().await;
        let profile = records
            .profiles
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
        profile.leave_trip(trip_id);
        Ok(())
    }
}
