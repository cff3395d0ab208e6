//! PostgreSQL implementation of TripStore.
//!
//! Each trip is one row: the aggregate as JSONB plus a `version` column
//! that every write is conditioned on. Pushes to the notifier happen after
//! the statement returns, so two commits may reach it out of order; rooms
//! re-sequence by version, and subscribers start without a baseline.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use crate::domain::foundation::{TripId, Version};
use crate::domain::trip::Trip;
use crate::ports::{ChangeNotifier, StoreError, Subscription, TripStore};

#[derive(Clone)]
pub struct PostgresTripStore {
    pool: PgPool,
    notifier: Arc<dyn ChangeNotifier>,
}

impl PostgresTripStore {
    pub fn new(pool: PgPool, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { pool, notifier }
    }

    async fn current_version(&self, id: &TripId) -> Result<Option<Version>, StoreError> {
        let row = sqlx::query("SELECT version FROM trips WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("read trip version", e))?;

        row.map(|row| {
            row.try_get::<i64, _>("version")
                .map(to_version)
                .map_err(|e| db_error("decode version", e))
        })
        .transpose()
    }

    /// Distinguishes a missing row from a stale `expected` after a
    /// conditional statement touched nothing.
    async fn explain_miss(&self, id: &TripId, expected: Version) -> StoreError {
        match self.current_version(id).await {
            Ok(Some(actual)) => StoreError::VersionConflict { expected, actual },
            Ok(None) => StoreError::NotFound(*id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl TripStore for PostgresTripStore {
    async fn get(&self, id: &TripId) -> Result<Trip, StoreError> {
        let row = sqlx::query("SELECT version, document FROM trips WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch trip", e))?
            .ok_or(StoreError::NotFound(*id))?;

        row_to_trip(row)
    }

    async fn create(&self, trip: &Trip) -> Result<Trip, StoreError> {
        let stored = trip.clone().with_version(Version::INITIAL);
        let document = to_document(&stored)?;

        let result = sqlx::query(
            r#"
            INSERT INTO trips (id, version, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(stored.id().as_uuid())
        .bind(from_version(stored.version()))
        .bind(document)
        .bind(stored.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert trip", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(*stored.id()));
        }
        Ok(stored)
    }

    async fn compare_and_swap(
        &self,
        id: &TripId,
        expected: Version,
        trip: &Trip,
    ) -> Result<Trip, StoreError> {
        let committed = trip.clone().with_version(expected.next());
        let document = to_document(&committed)?;

        let result = sqlx::query(
            r#"
            UPDATE trips SET
                version = $3,
                document = $4,
                updated_at = $5
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(from_version(expected))
        .bind(from_version(committed.version()))
        .bind(document)
        .bind(committed.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update trip", e))?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, expected).await);
        }

        self.notifier.publish(&committed);
        Ok(committed)
    }

    async fn delete(&self, id: &TripId, expected: Version) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = $1 AND version = $2")
            .bind(id.as_uuid())
            .bind(from_version(expected))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete trip", e))?;

        if result.rows_affected() == 0 {
            return Err(self.explain_miss(id, expected).await);
        }

        self.notifier.close(id);
        Ok(())
    }

    async fn subscribe(&self, id: &TripId) -> Result<Subscription, StoreError> {
        // A commit landing between this read and the registration is never
        // pushed; its gap is flushed after `max_reorder_wait`
        let baseline = self
            .current_version(id)
            .await?
            .ok_or(StoreError::NotFound(*id))?;
        Ok(self.notifier.subscribe(*id, Some(baseline)))
    }
}

fn row_to_trip(row: sqlx::postgres::PgRow) -> Result<Trip, StoreError> {
    let version: i64 = row
        .try_get("version")
        .map_err(|e| db_error("decode version", e))?;
    let document: serde_json::Value = row
        .try_get("document")
        .map_err(|e| db_error("decode document", e))?;

    let trip: Trip = serde_json::from_value(document)
        .map_err(|e| StoreError::Infrastructure(format!("corrupt trip document: {}", e)))?;
    // The column is authoritative
    Ok(trip.with_version(to_version(version)))
}

fn to_document(trip: &Trip) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(trip)
        .map_err(|e| StoreError::Infrastructure(format!("serialize trip: {}", e)))
}

fn to_version(raw: i64) -> Version {
    Version::new(raw.max(0) as u64)
}

fn from_version(version: Version) -> i64 {
    version.value() as i64
}

fn db_error(context: &str, e: sqlx::Error) -> StoreError {
    StoreError::Infrastructure(format!("Failed to {}: {}", context, e))
}
