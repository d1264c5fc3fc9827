#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use notify_admin_api::config::{default_free_sms_fragment_limits, NotifyApiConfig, ServerConfig};
use notify_admin_api::middleware::browser_session::SESSION_COOKIE;
use notify_admin_api::middleware::current_user::USER_ID_HEADER;
use notify_admin_api::router::build_app_router;
use notify_admin_api::state::AppState;
use notify_admin_core::add_service::{
    self, NewService, ServiceApi, ServiceConflict, ServiceCreation, ServiceDefaults,
};
use notify_admin_core::error::CoreError;
use notify_admin_core::types::{FormData, ServiceId, SessionId, UserId};
use notify_admin_core::wizard::MemorySessionStore;

/// Build a test `ServerConfig` with safe defaults and no database.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        session_cookie_secure: false,
        session_ttl_hours: 24,
        notify_api: NotifyApiConfig {
            base_url: "http://notify-api.invalid".to_string(),
            client_id: "notify-admin".to_string(),
            secret: "test-secret".to_string(),
            timeout_secs: 1,
            free_sms_fragment_limits: default_free_sms_fragment_limits(),
        },
        service_defaults: ServiceDefaults::default(),
    }
}

// ---------------------------------------------------------------------------
// Fake Notify API
// ---------------------------------------------------------------------------

/// What the fake API answers to every create-service call.
#[derive(Debug, Clone, Copy)]
pub enum ApiReply {
    Created(ServiceId),
    Conflict(ServiceConflict),
    Unavailable,
}

/// `ServiceApi` that records every payload and answers with a fixed reply.
pub struct RecordingServiceApi {
    reply: Mutex<ApiReply>,
    calls: Mutex<Vec<NewService>>,
}

impl RecordingServiceApi {
    pub fn new(reply: ApiReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: ApiReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> Vec<NewService> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceApi for RecordingServiceApi {
    async fn create_service(&self, service: &NewService) -> Result<ServiceCreation, CoreError> {
        self.calls.lock().unwrap().push(service.clone());
        match *self.reply.lock().unwrap() {
            ApiReply::Created(id) => Ok(ServiceCreation::Created(id)),
            ApiReply::Conflict(conflict) => Ok(ServiceCreation::Conflict(conflict)),
            ApiReply::Unavailable => Err(CoreError::Internal(
                "HTTP request failed: connection refused".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The full router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<MemorySessionStore>,
    pub services: Arc<RecordingServiceApi>,
}

/// Build the full application router with all middleware layers, using an
/// in-memory session store and a recording fake Notify API.
pub fn build_test_app(reply: ApiReply) -> TestApp {
    let sessions = Arc::new(MemorySessionStore::new());
    let services = Arc::new(RecordingServiceApi::new(reply));

    let state = AppState {
        config: Arc::new(test_config()),
        pool: None,
        sessions: sessions.clone(),
        services: services.clone(),
        add_service: Arc::new(add_service::engine().unwrap()),
    };

    TestApp {
        router: build_app_router(state),
        sessions,
        services,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Stored add-service data for a browser session.
    pub async fn session_data(&self, session: SessionId) -> Option<FormData> {
        use notify_admin_core::wizard::SessionStore;
        self.sessions
            .get(session, add_service::SESSION_FORM_KEY)
            .await
            .unwrap()
    }

    pub async fn seed_session(&self, session: SessionId, data: &FormData) {
        use notify_admin_core::wizard::SessionStore;
        self.sessions
            .set(session, add_service::SESSION_FORM_KEY, data)
            .await
            .unwrap();
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Who is making a wizard request.
#[derive(Debug, Clone, Copy)]
pub struct Visitor {
    pub user: UserId,
    pub session: SessionId,
}

impl Visitor {
    pub fn new() -> Self {
        Self {
            user: UserId::new_v4(),
            session: SessionId::new_v4(),
        }
    }

    fn builder(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, self.user.to_string())
            .header(COOKIE, format!("{SESSION_COOKIE}={}", self.session))
    }

    pub fn get(&self, uri: &str) -> Request<Body> {
        self.builder(Method::GET, uri).body(Body::empty()).unwrap()
    }

    pub fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
        self.builder(Method::POST, uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encode_form(fields)))
            .unwrap()
    }
}

/// Issue a bare GET request without any headers.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// `application/x-www-form-urlencoded` encoding.
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fn encode(value: &str) -> String {
        value
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                b' ' => "+".to_string(),
                _ => format!("%{b:02X}"),
            })
            .collect()
    }

    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn form_data(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>()
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Read the full response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `Location` header of a redirect.
pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get("location")
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
}
