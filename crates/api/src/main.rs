use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use notify_admin_core::add_service;
use notify_admin_core::wizard::{MemorySessionStore, SessionStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notify_admin_api::config::ServerConfig;
use notify_admin_api::notify_client::NotifyApiClient;
use notify_admin_api::state::AppState;
use notify_admin_api::{background, router};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notify_admin_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        notify_api = %config.notify_api.base_url,
        "Loaded server configuration"
    );

    // --- Session store ---
    let pool = match &config.database_url {
        Some(database_url) => {
            let pool = notify_admin_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            notify_admin_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            notify_admin_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Some(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, wizard sessions are kept in memory");
            None
        }
    };

    let sessions: Arc<dyn SessionStore> = match &pool {
        Some(pool) => Arc::new(notify_admin_db::PgSessionStore::new(pool.clone())),
        None => Arc::new(MemorySessionStore::with_ttl(config.session_ttl())),
    };
    tracing::info!(backend = sessions.backend(), "Session store ready");

    // --- Session cleanup ---
    let cleanup_cancel = CancellationToken::new();
    let cleanup_handle = pool.clone().map(|pool| {
        tokio::spawn(background::session_cleanup::run(
            pool,
            config.session_ttl_hours,
            cleanup_cancel.clone(),
        ))
    });

    // --- Notify API client ---
    let services =
        NotifyApiClient::new(&config.notify_api).expect("Failed to build Notify API client");

    // --- Wizard ---
    let add_service = add_service::engine().expect("Invalid add-service wizard definition");
    tracing::info!(steps = add_service.definition().len(), "Add-service wizard ready");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        sessions,
        services: Arc::new(services),
        add_service: Arc::new(add_service),
    };

    let app = router::build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cleanup_cancel.cancel();
    if let Some(handle) = cleanup_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Wizard session cleanup stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
