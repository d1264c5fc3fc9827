//! PostgreSQL-backed [`SessionStore`].

use async_trait::async_trait;
use notify_admin_core::error::CoreError;
use notify_admin_core::types::{FormData, SessionId};
use notify_admin_core::wizard::SessionStore;

use crate::repositories::WizardSessionRepo;
use crate::DbPool;

/// Keeps wizard data in the `wizard_sessions` table so it survives restarts
/// and is shared by every API replica.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn db_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Wizard session query failed");
    CoreError::Internal(format!("Session store error: {err}"))
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session: SessionId, key: &str) -> Result<Option<FormData>, CoreError> {
        let row = WizardSessionRepo::find(&self.pool, session, key)
            .await
            .map_err(db_error)?;

        row.map(|row| {
            serde_json::from_value::<FormData>(row.data).map_err(|e| {
                CoreError::Internal(format!("Corrupt wizard session {}: {e}", row.id))
            })
        })
        .transpose()
    }

    async fn set(&self, session: SessionId, key: &str, data: &FormData) -> Result<(), CoreError> {
        let value = serde_json::to_value(data)
            .map_err(|e| CoreError::Internal(format!("Cannot encode wizard session: {e}")))?;
        WizardSessionRepo::upsert(&self.pool, session, key, &value)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete(&self, session: SessionId, key: &str) -> Result<(), CoreError> {
        WizardSessionRepo::delete(&self.pool, session, key)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
