//! Denormalization fan-out engine.
//!
//! Rewrites one profile's copied display fields in every trip listed in its
//! `member_of` set. Each trip is repaired through the same compare-and-swap
//! loop as user edits, independently of the others, and the engine always
//! works from the profile as it is *now*. Running it again after a partial
//! failure therefore only touches the stragglers, and running it twice
//! writes nothing the second time.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::application::handlers::trip::TripMutator;
use crate::domain::foundation::{CommandMetadata, ProfileId, TripId};
use crate::domain::profile::Profile;
use crate::domain::trip::TripError;
use crate::ports::ProfileDirectory;

/// Outcome of repairing one trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripSyncOutcome {
    /// The copy was stale and has been rewritten.
    Updated,
    /// The copy already matched.
    Unchanged,
    /// The trip is gone or no longer lists the profile.
    Skipped,
    Failed(TripError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutFailure {
    pub trip_id: TripId,
    pub error: TripError,
}

/// Per-trip results of one fan-out pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub profile_id: ProfileId,
    pub updated: Vec<TripId>,
    pub unchanged: Vec<TripId>,
    pub skipped: Vec<TripId>,
    pub failed: Vec<FanoutFailure>,
}

impl FanoutReport {
    fn empty(profile_id: ProfileId) -> Self {
        Self {
            profile_id,
            updated: Vec::new(),
            unchanged: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Some trips were left with stale copies.
    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.unchanged.len() + self.skipped.len() + self.failed.len()
    }

    fn record(&mut self, trip_id: TripId, outcome: TripSyncOutcome) {
        match outcome {
            TripSyncOutcome::Updated => self.updated.push(trip_id),
            TripSyncOutcome::Unchanged => self.unchanged.push(trip_id),
            TripSyncOutcome::Skipped => self.skipped.push(trip_id),
            TripSyncOutcome::Failed(error) => self.failed.push(FanoutFailure { trip_id, error }),
        }
    }
}

pub struct FanoutEngine {
    directory: Arc<dyn ProfileDirectory>,
    mutator: TripMutator,
    max_concurrency: usize,
}

impl FanoutEngine {
    pub fn new(
        directory: Arc<dyn ProfileDirectory>,
        mutator: TripMutator,
        max_concurrency: usize,
    ) -> Self {
        Self {
            directory,
            mutator,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Runs one pass for `profile_id`.
    ///
    /// Fails only if the profile itself cannot be read; per-trip failures
    /// are collected in the report.
    pub async fn run(&self, profile_id: &ProfileId) -> Result<FanoutReport, TripError> {
        let profile = self.directory.get(profile_id).await?;
        let metadata = CommandMetadata::new(profile_id.clone())
            .with_correlation_id(format!("fanout:{}", profile_id));

        let trip_ids: Vec<TripId> = profile.member_of().iter().copied().collect();
        let results: Vec<(TripId, TripSyncOutcome)> = stream::iter(trip_ids)
            .map(|trip_id| {
                let profile = &profile;
                let metadata = &metadata;
                async move { (trip_id, self.sync_trip(&trip_id, profile, metadata).await) }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut report = FanoutReport::empty(profile_id.clone());
        for (trip_id, outcome) in results {
            report.record(trip_id, outcome);
        }

        if report.is_partial_failure() {
            tracing::warn!(
                profile_id = %profile_id,
                updated = report.updated.len(),
                failed = report.failed.len(),
                "fan-out left stale copies"
            );
        } else {
            tracing::info!(
                profile_id = %profile_id,
                updated = report.updated.len(),
                unchanged = report.unchanged.len(),
                skipped = report.skipped.len(),
                "fan-out pass complete"
            );
        }
        Ok(report)
    }

    async fn sync_trip(
        &self,
        trip_id: &TripId,
        profile: &Profile,
        metadata: &CommandMetadata,
    ) -> TripSyncOutcome {
        let result = self
            .mutator
            .mutate(trip_id, "sync_participant", metadata, |trip| {
                trip.with_participant_synced(
                    profile.id(),
                    profile.contact_handle(),
                    profile.display_name(),
                )
            })
            .await;

        match result {
            Ok(outcome) if outcome.written => TripSyncOutcome::Updated,
            Ok(_) => TripSyncOutcome::Unchanged,
            // Membership may lead the trip during a join or trail it after a
            // removal; either way there is nothing to repair here.
            Err(TripError::TripNotFound(_)) | Err(TripError::ParticipantNotFound(_)) => {
                TripSyncOutcome::Skipped
            }
            Err(error) => {
                tracing::debug!(trip_id = %trip_id, error = %error, "trip sync failed");
                TripSyncOutcome::Failed(error)
            }
        }
    }
}
