use std::sync::Arc;

use notify_admin_core::add_service::ServiceApi;
use notify_admin_core::wizard::{SessionStore, WizardEngine};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool, present only when `DATABASE_URL` is configured.
    pub pool: Option<notify_admin_db::DbPool>,
    /// Where wizard form data is kept between requests.
    pub sessions: Arc<dyn SessionStore>,
    /// Service creation on the Notify API.
    pub services: Arc<dyn ServiceApi>,
    /// The add-service wizard.
    pub add_service: Arc<WizardEngine>,
}
