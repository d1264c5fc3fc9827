//! Handlers for the add-service wizard.
//!
//! Both endpoints hand the request to the shared [`WizardEngine`] and only
//! translate its [`WizardOutcome`] into HTTP: a rendered step becomes a JSON
//! step view, everything else becomes a `303 See Other`.

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;

use notify_admin_core::add_service::AddServiceFinalizer;
use notify_admin_core::types::{FormData, ServiceId};
use notify_admin_core::wizard::{StepRequest, WizardLocation, WizardOutcome};

use crate::error::{AppError, AppResult};
use crate::middleware::browser_session::BrowserSession;
use crate::middleware::current_user::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Path the wizard is mounted at.
pub const ADD_SERVICE_PATH: &str = "/add-service";

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct AddServiceParams {
    pub current_step: Option<String>,
    pub government_type: Option<String>,
}

impl From<AddServiceParams> for StepRequest {
    fn from(params: AddServiceParams) -> Self {
        StepRequest {
            current_step: params.current_step,
            branch: params.government_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// URL of a wizard step.
pub fn step_url(location: &WizardLocation) -> String {
    match location.branch {
        Some(branch) => format!(
            "{ADD_SERVICE_PATH}?current_step={}&government_type={branch}",
            location.step
        ),
        None => format!("{ADD_SERVICE_PATH}?current_step={}", location.step),
    }
}

/// Dashboard of a newly created service.
pub fn service_dashboard_url(service_id: ServiceId) -> String {
    format!("/services/{service_id}")
}

fn outcome_response(
    state: &AppState,
    session: &BrowserSession,
    outcome: WizardOutcome,
) -> AppResult<Response> {
    let mut response = match outcome {
        WizardOutcome::Render(view) => Json(DataResponse { data: view }).into_response(),
        WizardOutcome::Redirect(location) => Redirect::to(&step_url(&location)).into_response(),
        WizardOutcome::Completed(service_id) => {
            Redirect::to(&service_dashboard_url(service_id)).into_response()
        }
    };

    if let Some(cookie) = session.set_cookie(state.config.session_cookie_secure)? {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }

    Ok(response)
}

// ---------------------------------------------------------------------------
// GET /add-service
// ---------------------------------------------------------------------------

/// Show the requested step bound to the accumulated form data.
pub async fn show_step(
    State(state): State<AppState>,
    user: CurrentUser,
    session: BrowserSession,
    Query(params): Query<AddServiceParams>,
) -> AppResult<Response> {
    let request = StepRequest::from(params);

    tracing::debug!(
        user_id = %user.user_id,
        session_id = %session.id,
        step = ?request.current_step,
        "Rendering add-service step"
    );

    let outcome = state
        .add_service
        .render(state.sessions.as_ref(), session.id, &request)
        .await?;

    outcome_response(&state, &session, outcome)
}

// ---------------------------------------------------------------------------
// POST /add-service
// ---------------------------------------------------------------------------

/// Submit the requested step.
///
/// Valid data advances to the next step; on the last step the service is
/// created and the browser is sent to its dashboard.
pub async fn submit_step(
    State(state): State<AppState>,
    user: CurrentUser,
    session: BrowserSession,
    Query(params): Query<AddServiceParams>,
    form: Result<Form<FormData>, FormRejection>,
) -> AppResult<Response> {
    let Form(submitted) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = StepRequest::from(params);

    let finalizer = AddServiceFinalizer::new(
        state.services.as_ref(),
        user.user_id,
        &state.config.service_defaults,
    );

    let outcome = state
        .add_service
        .submit(
            state.sessions.as_ref(),
            &finalizer,
            session.id,
            &request,
            submitted,
        )
        .await?;

    if let WizardOutcome::Completed(service_id) = &outcome {
        tracing::info!(
            user_id = %user.user_id,
            %service_id,
            "Service created through add-service wizard"
        );
    }

    outcome_response(&state, &session, outcome)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn step_url_includes_branch_when_present() {
        let location = WizardLocation {
            step: "choose_organisation",
            branch: Some("pt"),
        };
        assert_eq!(
            step_url(&location),
            "/add-service?current_step=choose_organisation&government_type=pt"
        );
    }

    #[test]
    fn step_url_without_branch() {
        let location = WizardLocation {
            step: "choose_service_name",
            branch: None,
        };
        assert_eq!(step_url(&location), "/add-service?current_step=choose_service_name");
    }

    #[test]
    fn params_map_government_type_to_branch() {
        let request = StepRequest::from(AddServiceParams {
            current_step: Some("choose_organisation".into()),
            government_type: Some("federal".into()),
        });
        assert_eq!(request, StepRequest::new(Some("choose_organisation"), Some("federal")));
    }

    #[test]
    fn dashboard_url_uses_service_id() {
        let id = Uuid::nil();
        assert_eq!(
            service_dashboard_url(id),
            "/services/00000000-0000-0000-0000-000000000000"
        );
    }
}
