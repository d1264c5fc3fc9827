//! Accumulated wizard data and the store that keeps it between requests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::types::{FormData, SessionId};

// ---------------------------------------------------------------------------
// WizardSession
// ---------------------------------------------------------------------------

/// Form values accumulated across the steps of one wizard run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WizardSession {
    data: FormData,
}

impl WizardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: FormData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn into_data(self) -> FormData {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Merge newly validated fields; a later value wins on a name collision.
    pub fn merge(&mut self, fields: FormData) {
        self.data.extend(fields);
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Per-browser-session key/value storage for wizard data.
///
/// Implementations must give read-your-writes consistency within one
/// browser session. Nothing is shared across sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session: SessionId, key: &str) -> Result<Option<FormData>, CoreError>;

    async fn set(&self, session: SessionId, key: &str, data: &FormData) -> Result<(), CoreError>;

    async fn delete(&self, session: SessionId, key: &str) -> Result<(), CoreError>;

    /// Short name of the backend, reported by the health endpoint.
    fn backend(&self) -> &'static str;
}

/// In-process session store, used for local development and tests.
///
/// Data does not survive a restart and is not shared between replicas.
/// With a TTL, entries not written within it read as absent and are
/// dropped on the next write.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<(SessionId, String), MemoryEntry>>,
    ttl: Option<Duration>,
}

#[derive(Debug)]
struct MemoryEntry {
    data: FormData,
    updated_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.updated_at) >= ttl)
    }
}

impl MemorySessionStore {
    /// A store that keeps entries until they are deleted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that forgets entries not written within `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::default(),
            ttl: Some(ttl),
        }
    }

    /// Number of stored entries across all sessions, expired ones included
    /// until they are purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        Self::purge(&mut entries, self.ttl, Instant::now())
    }

    fn purge(
        entries: &mut HashMap<(SessionId, String), MemoryEntry>,
        ttl: Option<Duration>,
        now: Instant,
    ) -> usize {
        if ttl.is_none() {
            return 0;
        }
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(ttl, now));
        before - entries.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session: SessionId, key: &str) -> Result<Option<FormData>, CoreError> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(&(session, key.to_string()))
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .map(|entry| entry.data.clone()))
    }

    async fn set(&self, session: SessionId, key: &str, data: &FormData) -> Result<(), CoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let purged = Self::purge(&mut entries, self.ttl, now);
        if purged > 0 {
            tracing::debug!(purged, "Dropped expired in-memory wizard sessions");
        }

        entries.insert(
            (session, key.to_string()),
            MemoryEntry {
                data: data.clone(),
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn delete(&self, session: SessionId, key: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(&(session, key.to_string()));
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
