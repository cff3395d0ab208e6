//! PostgreSQL implementation of ProfileDirectory.
//!
//! `member_of` is a `uuid[]` column maintained with `array_append` and
//! `array_remove`, so membership changes are single-statement and never
//! race with display-field edits of the same row.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;

use crate::domain::foundation::{ProfileId, Timestamp, TripId, Version};
use crate::domain::profile::{ContactHandle, DisplayFieldsUpdate, DisplayName, Profile};
use crate::ports::{DirectoryError, DisplayFieldsChange, ProfileDirectory};

const CONTACT_HANDLE_CONSTRAINT: &str = "profiles_contact_handle_key";

const SELECT_PROFILE: &str = r#"
    SELECT id, contact_handle, display_name, avatar_ref, member_of,
           version, created_at, updated_at
    FROM profiles
"#;

#[derive(Clone)]
pub struct PostgresProfileDirectory {
    pool: PgPool,
}

impl PostgresProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &ProfileId) -> Result<bool, DirectoryError> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles WHERE id = $1")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("check profile existence", e))?;
        Ok(result.0 > 0)
    }
}

#[async_trait]
impl ProfileDirectory for PostgresProfileDirectory {
    async fn get(&self, id: &ProfileId) -> Result<Profile, DirectoryError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_PROFILE))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch profile", e))?
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;

        row_to_profile(row)
    }

    async fn find_by_contact_handle(
        &self,
        handle: &ContactHandle,
    ) -> Result<Option<Profile>, DirectoryError> {
        let row = sqlx::query(&format!("{} WHERE contact_handle = $1", SELECT_PROFILE))
            .bind(handle.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch profile by handle", e))?;

        row.map(row_to_profile).transpose()
    }

    async fn create(&self, profile: &Profile) -> Result<(), DirectoryError> {
        let member_of: Vec<uuid::Uuid> =
            profile.member_of().iter().map(|id| *id.as_uuid()).collect();

        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, contact_handle, display_name, avatar_ref, member_of,
                version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(profile.id().as_str())
        .bind(profile.contact_handle().as_str())
        .bind(profile.display_name().as_str())
        .bind(profile.avatar_ref())
        .bind(&member_of)
        .bind(profile.version().value() as i64)
        .bind(profile.created_at().as_datetime())
        .bind(profile.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(CONTACT_HANDLE_CONSTRAINT) => {
                DirectoryError::DuplicateContactHandle(profile.contact_handle().to_string())
            }
            Some(_) => DirectoryError::AlreadyExists(profile.id().clone()),
            None => db_error("insert profile", e),
        })?;

        Ok(())
    }

    async fn update_display_fields(
        &self,
        id: &ProfileId,
        update: &DisplayFieldsUpdate,
    ) -> Result<DisplayFieldsChange, DirectoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        // 1. Lock the row
        let row = sqlx::query(&format!("{} WHERE id = $1 FOR UPDATE", SELECT_PROFILE))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("lock profile", e))?
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
        let mut profile = row_to_profile(row)?;

        // 2. Apply in memory
        if !profile.apply_display_fields(update) {
            return Ok(DisplayFieldsChange {
                profile,
                changed: false,
            });
        }

        // 3. Write back
        sqlx::query(
            r#"
            UPDATE profiles SET
                contact_handle = $2,
                display_name = $3,
                version = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(profile.contact_handle().as_str())
        .bind(profile.display_name().as_str())
        .bind(profile.version().value() as i64)
        .bind(profile.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => DirectoryError::DuplicateContactHandle(profile.contact_handle().to_string()),
            None => db_error("update profile", e),
        })?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit profile update", e))?;

        Ok(DisplayFieldsChange {
            profile,
            changed: true,
        })
    }

    async fn add_membership(
        &self,
        id: &ProfileId,
        trip_id: TripId,
    ) -> Result<Profile, DirectoryError> {
        sqlx::query(
            r#"
            UPDATE profiles SET
                member_of = array_append(member_of, $2),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(member_of))
            "#,
        )
        .bind(id.as_str())
        .bind(trip_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("add membership", e))?;

        // Zero rows means already a member or no such profile; get tells which
        self.get(id).await
    }

    async fn remove_membership(
        &self,
        id: &ProfileId,
        trip_id: &TripId,
    ) -> Result<(), DirectoryError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                member_of = array_remove(member_of, $2),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(member_of)
            "#,
        )
        .bind(id.as_str())
        .bind(trip_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("remove membership", e))?;

        if result.rows_affected() == 0 && !self.exists(id).await? {
            return Err(DirectoryError::NotFound(id.clone()));
        }
        Ok(())
    }
}

fn row_to_profile(row: sqlx::postgres::PgRow) -> Result<Profile, DirectoryError> {
    let id: String = row.try_get("id").map_err(|e| db_error("get id", e))?;
    let contact_handle: String = row
        .try_get("contact_handle")
        .map_err(|e| db_error("get contact_handle", e))?;
    let display_name: String = row
        .try_get("display_name")
        .map_err(|e| db_error("get display_name", e))?;
    let avatar_ref: Option<String> = row
        .try_get("avatar_ref")
        .map_err(|e| db_error("get avatar_ref", e))?;
    let member_of: Vec<uuid::Uuid> = row
        .try_get("member_of")
        .map_err(|e| db_error("get member_of", e))?;
    let version: i64 = row.try_get("version").map_err(|e| db_error("get version", e))?;
    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(|e| db_error("get created_at", e))?;
    let updated_at: chrono::DateTime<chrono::Utc> = row
        .try_get("updated_at")
        .map_err(|e| db_error("get updated_at", e))?;

    let corrupt = |e: crate::domain::foundation::ValidationError| {
        DirectoryError::Infrastructure(format!("corrupt profile row {}: {}", id, e))
    };

    Ok(Profile::reconstitute(
        ProfileId::new(id.clone()).map_err(corrupt)?,
        ContactHandle::new(contact_handle).map_err(corrupt)?,
        DisplayName::new(display_name).map_err(corrupt)?,
        avatar_ref,
        member_of
            .into_iter()
            .map(TripId::from_uuid)
            .collect::<BTreeSet<_>>(),
        Version::new(version.max(0) as u64),
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}

/// Name of the violated unique constraint, if that is what `e` is.
fn unique_violation(e: &sqlx::Error) -> Option<&str> {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or("profiles_pkey"))
        }
        _ => None,
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DirectoryError {
    DirectoryError::Infrastructure(format!("Failed to {}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(unique_violation(&sqlx::Error::RowNotFound).is_none());
    }

    #[test]
    fn select_lists_every_mapped_column() {
        for column in [
            "contact_handle",
            "display_name",
            "avatar_ref",
            "member_of",
            "version",
            "created_at",
            "updated_at",
        ] {
            assert!(SELECT_PROFILE.contains(column), "missing {}", column);
        }
    }
}
