//! Signed-in user extractor.
//!
//! Login happens upstream; the gateway in front of this service forwards the
//! authenticated user's id in the `x-user-id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use notify_admin_core::error::CoreError;
use notify_admin_core::types::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user creating a service.
///
/// ```ignore
/// async fn handler(user: CurrentUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: UserId,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing signed-in user".into()))
            })?;

        let user_id = raw.trim().parse::<UserId>().map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid signed-in user id".into()))
        })?;

        Ok(CurrentUser { user_id })
    }
}
