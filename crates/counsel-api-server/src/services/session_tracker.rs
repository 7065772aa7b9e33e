use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::utils::error::ApiError;

const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
struct SessionEntry {
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    last_active: Instant,
    message_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub message_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub total_messages: u64,
    pub idle_ttl_seconds: u64,
}

/// Activity bookkeeping per chat session. Holds no conversation content.
#[derive(Clone)]
pub struct SessionTracker {
    sessions: Arc<DashMap<String, SessionEntry>>,
    idle_ttl: Duration,
}

impl SessionTracker {
    pub fn new(idle_ttl: Duration) -> Self {
        info!("Initializing session tracker (idle ttl {:?})", idle_ttl);
        Self {
            sessions: Arc::new(DashMap::new()),
            idle_ttl,
        }
    }

    /// Client-supplied id if usable, otherwise a fresh random one.
    pub fn resolve_id(requested: Option<&str>) -> Result<String, ApiError> {
        match requested.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) if id.len() > MAX_SESSION_ID_LEN => Err(ApiError::BadRequest(format!(
                "session_id must be at most {} characters",
                MAX_SESSION_ID_LEN
            ))),
            Some(id) => Ok(id.to_string()),
            None => Ok(Uuid::new_v4().to_string()),
        }
    }

    /// Record one message for `session_id`, creating the entry if needed.
    pub fn touch(&self, session_id: &str) -> SessionSnapshot {
        self.touch_at(session_id, Instant::now())
    }

    fn touch_at(&self, session_id: &str, now: Instant) -> SessionSnapshot {
        let wall_now = Utc::now();
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                created_at: wall_now,
                last_active_at: wall_now,
                last_active: now,
                message_count: 0,
            });

        entry.last_active = now;
        entry.last_active_at = wall_now;
        entry.message_count += 1;

        debug!("Session {} now has {} messages", session_id, entry.message_count);
        snapshot(session_id, &entry)
    }

    pub fn get(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.sessions
            .get(session_id)
            .map(|entry| snapshot(session_id, entry.value()))
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle longer than the ttl as of `now`. Returns removed count.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        let ttl = self.idle_ttl;
        self.sessions
            .retain(|_, entry| now.saturating_duration_since(entry.last_active) <= ttl);
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            info!("Swept {} idle sessions", removed);
        }
        removed
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_sessions: self.sessions.len(),
            total_messages: self.sessions.iter().map(|e| e.value().message_count).sum(),
            idle_ttl_seconds: self.idle_ttl.as_secs(),
        }
    }

    /// Periodic sweep until `shutdown` flips to true or its sender is dropped.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracker.sweep(Instant::now());
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Session sweeper stopped");
                            return;
                        }
                    }
                }
            }
        })
    }
}

fn snapshot(session_id: &str, entry: &SessionEntry) -> SessionSnapshot {
    SessionSnapshot {
        session_id: session_id.to_string(),
        created_at: entry.created_at,
        last_active_at: entry.last_active_at,
        message_count: entry.message_count,
    }
}
