use std::collections::BTreeMap;
use std::time::Duration;

use notify_admin_core::add_service::ServiceDefaults;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development against a Notify
/// API running on its default port. In production, override via environment
/// variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// PostgreSQL URL. When unset, wizard sessions live in process memory.
    pub database_url: Option<String>,
    /// Whether the browser session cookie carries the `Secure` attribute.
    pub session_cookie_secure: bool,
    /// Age after which unfinished wizard sessions are purged (default: `24`).
    pub session_ttl_hours: i64,
    /// Notify API connection settings.
    pub notify_api: NotifyApiConfig,
    /// Limits and classification applied to new services.
    pub service_defaults: ServiceDefaults,
}

/// Longest accepted `SESSION_TTL_HOURS`: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

/// Check that a session TTL is positive and small enough for timestamp math.
pub fn validate_session_ttl_hours(hours: i64) -> Result<i64, String> {
    if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(format!(
            "SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}, got {hours}"
        ))
    }
}

/// Connection settings for the Notify REST API.
#[derive(Debug, Clone)]
pub struct NotifyApiConfig {
    /// Base URL (default: `http://localhost:6011`).
    pub base_url: String,
    /// Admin client id, sent as the token issuer.
    pub client_id: String,
    /// Shared secret used to sign bearer tokens.
    pub secret: String,
    /// Per-request timeout in seconds (default: `10`).
    pub timeout_secs: u64,
    /// Annual free SMS fragments granted to a new service, by organisation type.
    pub free_sms_fragment_limits: BTreeMap<String, i64>,
}

impl NotifyApiConfig {
    /// Free SMS fragment allowance for an organisation type, if configured.
    pub fn free_sms_fragment_limit(&self, organisation_type: &str) -> Option<i64> {
        self.free_sms_fragment_limits.get(organisation_type).copied()
    }
}

/// Default free SMS fragment allowances per organisation type.
pub fn default_free_sms_fragment_limits() -> BTreeMap<String, i64> {
    BTreeMap::from([
        ("central".to_string(), 250_000),
        ("local".to_string(), 25_000),
        ("nhs".to_string(), 25_000),
    ])
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                  |
    /// |----------------------------------|--------------------------|
    /// | `HOST`                           | `0.0.0.0`                |
    /// | `PORT`                           | `3000`                   |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                     |
    /// | `DATABASE_URL`                   | unset (memory sessions)  |
    /// | `SESSION_COOKIE_SECURE`          | `false`                  |
    /// | `SESSION_TTL_HOURS`              | `24`                     |
    /// | `NOTIFY_API_HOST_NAME`           | `http://localhost:6011`  |
    /// | `ADMIN_CLIENT_USER_NAME`         | `notify-admin`           |
    /// | `ADMIN_CLIENT_SECRET`            | `dev-notify-secret-key`  |
    /// | `NOTIFY_API_TIMEOUT_SECS`        | `10`                     |
    /// | `DEFAULT_SERVICE_LIMIT`          | `50`                     |
    /// | `DEFAULT_SMS_DAILY_LIMIT`        | `50`                     |
    /// | `DEFAULT_ORGANISATION_TYPE`      | `central`                |
    /// | `FREE_SMS_FRAGMENT_LIMIT_CENTRAL`| `250000`                 |
    /// | `FREE_SMS_FRAGMENT_LIMIT_LOCAL`  | `25000`                  |
    /// | `FREE_SMS_FRAGMENT_LIMIT_NHS`    | `25000`                  |
    ///
    /// # Panics
    ///
    /// Panics if a numeric or boolean variable is set but does not parse, or
    /// if `SESSION_TTL_HOURS` is outside `1..=MAX_SESSION_TTL_HOURS`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let session_cookie_secure: bool = std::env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("SESSION_COOKIE_SECURE must be true or false");

        let session_ttl_hours: i64 = std::env::var("SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("SESSION_TTL_HOURS must be a valid i64");
        let session_ttl_hours =
            validate_session_ttl_hours(session_ttl_hours).unwrap_or_else(|e| panic!("{e}"));

        let notify_api = NotifyApiConfig::from_env();

        let defaults = ServiceDefaults::default();
        let service_defaults = ServiceDefaults {
            organisation_type: std::env::var("DEFAULT_ORGANISATION_TYPE")
                .unwrap_or(defaults.organisation_type),
            message_limit: std::env::var("DEFAULT_SERVICE_LIMIT")
                .map(|v| v.parse().expect("DEFAULT_SERVICE_LIMIT must be a valid i64"))
                .unwrap_or(defaults.message_limit),
            sms_daily_limit: std::env::var("DEFAULT_SMS_DAILY_LIMIT")
                .map(|v| v.parse().expect("DEFAULT_SMS_DAILY_LIMIT must be a valid i64"))
                .unwrap_or(defaults.sms_daily_limit),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            session_cookie_secure,
            session_ttl_hours,
            notify_api,
            service_defaults,
        }
    }
}

impl ServerConfig {
    /// Wizard session lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_hours.max(1) as u64 * 3600)
    }
}

impl NotifyApiConfig {
    /// Load Notify API settings from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var("NOTIFY_API_HOST_NAME")
            .unwrap_or_else(|_| "http://localhost:6011".into())
            .trim_end_matches('/')
            .to_string();

        let client_id =
            std::env::var("ADMIN_CLIENT_USER_NAME").unwrap_or_else(|_| "notify-admin".into());

        let secret =
            std::env::var("ADMIN_CLIENT_SECRET").unwrap_or_else(|_| "dev-notify-secret-key".into());
        assert!(!secret.is_empty(), "ADMIN_CLIENT_SECRET must not be empty");

        let timeout_secs: u64 = std::env::var("NOTIFY_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("NOTIFY_API_TIMEOUT_SECS must be a valid u64");

        let mut free_sms_fragment_limits = default_free_sms_fragment_limits();
        for (organisation_type, limit) in free_sms_fragment_limits.iter_mut() {
            let var = format!("FREE_SMS_FRAGMENT_LIMIT_{}", organisation_type.to_uppercase());
            if let Ok(value) = std::env::var(&var) {
                *limit = value
                    .parse()
                    .unwrap_or_else(|e| panic!("{var} must be a valid i64: {e}"));
            }
        }

        Self {
            base_url,
            client_id,
            secret,
            timeout_secs,
            free_sms_fragment_limits,
        }
    }
}
