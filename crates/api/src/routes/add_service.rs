//! Route definitions for the add-service wizard.
//!
//! ```text
//! GET    /add-service?current_step&government_type    show_step
//! POST   /add-service?current_step&government_type    submit_step (form-urlencoded)
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::add_service::{self, ADD_SERVICE_PATH};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        ADD_SERVICE_PATH,
        get(add_service::show_step).post(add_service::submit_step),
    )
}
