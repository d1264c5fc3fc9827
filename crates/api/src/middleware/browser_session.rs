//! Browser session extractor.
//!
//! Wizard data is keyed by an opaque UUID held in the `notify_admin_session`
//! cookie. Requests without a usable cookie get a fresh id, which the handler
//! sends back with `Set-Cookie`.

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use notify_admin_core::types::SessionId;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Name of the browser session cookie.
pub const SESSION_COOKIE: &str = "notify_admin_session";

#[derive(Debug, Clone, Copy)]
pub struct BrowserSession {
    pub id: SessionId,
    /// `true` when the request carried no valid cookie and `id` was just minted.
    pub is_new: bool,
}

impl BrowserSession {
    /// `Set-Cookie` value for a newly minted session, `None` for an existing one.
    pub fn set_cookie(&self, secure: bool) -> Result<Option<HeaderValue>, AppError> {
        if !self.is_new {
            return Ok(None);
        }

        let mut cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.id
        );
        if secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map(Some)
            .map_err(|e| AppError::InternalError(format!("Invalid session cookie: {e}")))
    }
}

/// Find the session id in any `Cookie` header.
fn session_from_cookies(parts: &Parts) -> Option<SessionId> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.trim().parse().ok())
}

impl FromRequestParts<AppState> for BrowserSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(match session_from_cookies(parts) {
            Some(id) => BrowserSession { id, is_new: false },
            None => {
                let id = Uuid::new_v4();
                tracing::debug!(session_id = %id, "Starting new browser session");
                BrowserSession { id, is_new: true }
            }
        })
    }
}
