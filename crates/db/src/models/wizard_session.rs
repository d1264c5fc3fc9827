//! Wizard session row model.

use sqlx::FromRow;
use uuid::Uuid;

use crate::{DbId, Timestamp};

/// A row from the `wizard_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct WizardSessionRow {
    pub id: DbId,
    pub session_id: Uuid,
    pub form_key: String,
    /// JSON object of field name -> string value.
    pub data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
