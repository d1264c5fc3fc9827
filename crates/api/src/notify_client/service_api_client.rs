//! Service creation against the Notify API.
//!
//! Wraps `POST /service` and `POST /service/{id}/billing/free-sms-fragment-limit`
//! using [`reqwest`]. Every request carries a short-lived HS256 bearer token
//! issued by the admin client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use notify_admin_core::add_service::{NewService, ServiceApi, ServiceConflict, ServiceCreation};
use notify_admin_core::error::CoreError;
use notify_admin_core::types::ServiceId;
use serde::{Deserialize, Serialize};

use crate::config::NotifyApiConfig;

/// HTTP client for the Notify API's service endpoints.
#[derive(Debug, Clone)]
pub struct NotifyApiClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
    free_sms_fragment_limits: BTreeMap<String, i64>,
}

/// Errors from the Notify API client.
#[derive(Debug, thiserror::Error)]
pub enum NotifyApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The bearer token could not be signed.
    #[error("Token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The API returned a non-2xx status code.
    #[error("Notify API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

/// Bearer token claims expected by the Notify API.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer: the admin client id.
    pub iss: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

#[derive(Debug, Deserialize)]
struct CreateServiceResponse {
    data: CreatedService,
}

#[derive(Debug, Deserialize)]
struct CreatedService {
    id: ServiceId,
}

/// Error body returned with 4xx responses: `{"result": "error", "message": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: serde_json::Value,
}

impl NotifyApiClient {
    /// Build a client from configuration, applying the request timeout.
    pub fn new(config: &NotifyApiConfig) -> Result<Self, NotifyApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            free_sms_fragment_limits: config.free_sms_fragment_limits.clone(),
        })
    }

    /// Sign a fresh bearer token.
    pub fn auth_token(&self) -> Result<String, NotifyApiError> {
        let claims = TokenClaims {
            iss: self.client_id.clone(),
            iat: chrono::Utc::now().timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Create a service.
    ///
    /// A 400 naming `name` or `email_from` is returned as a conflict; any
    /// other non-2xx status is an error.
    pub async fn post_service(&self, service: &NewService) -> Result<ServiceCreation, NotifyApiError> {
        let response = self
            .client
            .post(format!("{}/service", self.base_url))
            .bearer_auth(self.auth_token()?)
            .json(service)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let created: CreateServiceResponse = response.json().await?;
            return Ok(ServiceCreation::Created(created.data.id));
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::BAD_REQUEST {
            if let Some(conflict) = parse_conflict(&body) {
                return Ok(ServiceCreation::Conflict(conflict));
            }
        }

        Err(NotifyApiError::ApiError {
            status: status.as_u16(),
            body,
        })
    }

    /// Set the annual free SMS fragment allowance for a service.
    pub async fn set_free_sms_fragment_limit(
        &self,
        service_id: ServiceId,
        limit: i64,
    ) -> Result<(), NotifyApiError> {
        let body = serde_json::json!({ "free_sms_fragment_limit": limit });

        let response = self
            .client
            .post(format!(
                "{}/service/{service_id}/billing/free-sms-fragment-limit",
                self.base_url
            ))
            .bearer_auth(self.auth_token()?)
            .json(&body)
            .send()
            .await?;

        Self::ensure_success(response).await
    }

    /// Check that a response has a 2xx status, discarding the body.
    async fn ensure_success(response: reqwest::Response) -> Result<(), NotifyApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Pick the conflict out of a 400 error body. `name` wins over `email_from`.
fn parse_conflict(body: &str) -> Option<ServiceConflict> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;

    let has_errors = |field: &str| match parsed.message.get(field) {
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        _ => false,
    };

    if has_errors("name") {
        Some(ServiceConflict::NameInUse)
    } else if has_errors("email_from") {
        Some(ServiceConflict::EmailFromInUse)
    } else {
        None
    }
}

#[async_trait]
impl ServiceApi for NotifyApiClient {
    async fn create_service(&self, service: &NewService) -> Result<ServiceCreation, CoreError> {
        let to_core = |e: NotifyApiError| CoreError::Internal(e.to_string());

        let service_id = match self.post_service(service).await.map_err(to_core)? {
            ServiceCreation::Created(id) => id,
            ServiceCreation::Conflict(conflict) => {
                tracing::info!(field = conflict.field(), "Notify API rejected new service");
                return Ok(ServiceCreation::Conflict(conflict));
            }
        };

        tracing::info!(%service_id, "Service created");

        match self.free_sms_fragment_limits.get(&service.organisation_type) {
            Some(&limit) => {
                self.set_free_sms_fragment_limit(service_id, limit)
                    .await
                    .map_err(to_core)?;
                tracing::debug!(%service_id, limit, "Free SMS fragment limit set");
            }
            None => {
                tracing::warn!(
                    %service_id,
                    organisation_type = %service.organisation_type,
                    "No free SMS fragment limit configured for organisation type"
                );
            }
        }

        Ok(ServiceCreation::Created(service_id))
    }
}
