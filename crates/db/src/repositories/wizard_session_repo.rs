//! Repository for the `wizard_sessions` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::wizard_session::WizardSessionRow;
use crate::Timestamp;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, form_key, data, created_at, updated_at";

/// Provides CRUD operations for wizard session data.
pub struct WizardSessionRepo;

impl WizardSessionRepo {
    /// Find the stored data for one browser session and form key.
    pub async fn find(
        pool: &PgPool,
        session_id: Uuid,
        form_key: &str,
    ) -> Result<Option<WizardSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM wizard_sessions WHERE session_id = $1 AND form_key = $2"
        );
        sqlx::query_as::<_, WizardSessionRow>(&query)
            .bind(session_id)
            .bind(form_key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the stored data, returning the row.
    pub async fn upsert(
        pool: &PgPool,
        session_id: Uuid,
        form_key: &str,
        data: &serde_json::Value,
    ) -> Result<WizardSessionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO wizard_sessions (session_id, form_key, data)
             VALUES ($1, $2, $3)
             ON CONFLICT (session_id, form_key)
             DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WizardSessionRow>(&query)
            .bind(session_id)
            .bind(form_key)
            .bind(data)
            .fetch_one(pool)
            .await
    }

    /// Delete the stored data. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, session_id: Uuid, form_key: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM wizard_sessions WHERE session_id = $1 AND form_key = $2")
                .bind(session_id)
                .bind(form_key)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete rows not touched since `cutoff`. Returns the count of deleted rows.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM wizard_sessions WHERE updated_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
