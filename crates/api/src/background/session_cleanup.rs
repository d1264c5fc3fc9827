//! Periodic purge of abandoned wizard sessions.
//!
//! Only runs when sessions are kept in PostgreSQL. The in-memory store drops
//! its own expired entries on write.

use std::time::Duration;

use chrono::{DateTime, Utc};
use notify_admin_db::repositories::WizardSessionRepo;
use notify_admin_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Oldest `updated_at` a live session may have, `None` if `ttl_hours` does
/// not fit a timestamp.
fn cutoff(ttl_hours: i64) -> Option<DateTime<Utc>> {
    chrono::Duration::try_hours(ttl_hours).and_then(|ttl| Utc::now().checked_sub_signed(ttl))
}

/// Delete wizard sessions not updated within `ttl_hours`, once per
/// [`CLEANUP_INTERVAL`], until `cancel` is triggered.
pub async fn run(pool: DbPool, ttl_hours: i64, cancel: CancellationToken) {
    tracing::info!(
        ttl_hours,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Wizard session cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Wizard session cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                let Some(cutoff) = cutoff(ttl_hours) else {
                    tracing::error!(ttl_hours, "Wizard session cleanup: TTL out of range");
                    continue;
                };
                match WizardSessionRepo::delete_older_than(&pool, cutoff).await {
                    Ok(0) => tracing::debug!("Wizard session cleanup: nothing to purge"),
                    Ok(deleted) => {
                        tracing::info!(deleted, "Wizard session cleanup: purged stale sessions");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Wizard session cleanup failed");
                    }
                }
            }
        }
    }
}
