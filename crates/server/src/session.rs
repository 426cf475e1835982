//! Session Management
//!
//! Holds clarification sessions between the question and the customer's
//! answer. A session is checked out with [`SessionManager::checkout`] while
//! a request advances it, so no lock is held across LLM calls, and checked
//! back in with [`CheckedOutSession::checkin`] unless it reached a terminal
//! phase. A checkout dropped without checkin (cancelled request) abandons
//! the session. Sessions idle for longer than the configured timeout are
//! abandoned by a background cleanup task.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use aicc_agent::ClarificationSession;

use crate::ServerError;

struct SessionEntry {
    /// `None` while checked out
    session: Option<ClarificationSession>,
    created_at: Instant,
    last_activity: Instant,
}

impl SessionEntry {
    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Summary of a stored session
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub conversation_id: Option<String>,
    pub checked_out: bool,
    pub age_seconds: u64,
    pub idle_seconds: u64,
}

/// A session taken out of the [`SessionManager`]
///
/// Call [`checkin`](Self::checkin) when done. Dropping it instead removes the
/// session from the store, so a cancelled request never leaves it busy.
pub struct CheckedOutSession<'a> {
    manager: &'a SessionManager,
    id: String,
    session: Option<ClarificationSession>,
}

impl CheckedOutSession<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Put the session back, or drop it if it reached a terminal phase
    pub fn checkin(mut self) {
        if let Some(session) = self.session.take() {
            self.manager.checkin(&self.id, session);
        }
    }
}

impl Deref for CheckedOutSession<'_> {
    type Target = ClarificationSession;

    fn deref(&self) -> &ClarificationSession {
        self.session
            .as_ref()
            .unwrap_or_else(|| unreachable!("session is present until checkin or drop"))
    }
}

impl DerefMut for CheckedOutSession<'_> {
    fn deref_mut(&mut self) -> &mut ClarificationSession {
        self.session
            .as_mut()
            .unwrap_or_else(|| unreachable!("session is present until checkin or drop"))
    }
}

impl Drop for CheckedOutSession<'_> {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.manager.abandon_checked_out(&self.id);
        }
    }
}

/// In-memory store of pending clarification sessions
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self::with_config(max_sessions, Duration::from_secs(300), Duration::from_secs(60))
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    /// Start a background task that abandons idle sessions.
    ///
    /// Send `true` on the returned channel to stop it.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "Abandoned idle clarification sessions"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Store a session awaiting an answer and return its id
    pub fn insert(&self, session: ClarificationSession) -> Result<String, ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);
            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Capacity);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Instant::now();
        tracing::debug!(
            session_id = %id,
            conversation_id = %session.conversation_id(),
            "Stored clarification session"
        );
        sessions.insert(
            id.clone(),
            SessionEntry {
                session: Some(session),
                created_at: now,
                last_activity: now,
            },
        );
        Ok(id)
    }

    /// Take a session out for processing
    pub fn checkout(&self, id: &str) -> Result<CheckedOutSession<'_>, ServerError> {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))?;
        let session = entry
            .session
            .take()
            .ok_or_else(|| ServerError::SessionBusy(id.to_string()))?;
        entry.last_activity = Instant::now();
        Ok(CheckedOutSession {
            manager: self,
            id: id.to_string(),
            session: Some(session),
        })
    }

    /// Return a checked-out session; terminal sessions are dropped
    fn checkin(&self, id: &str, session: ClarificationSession) {
        let mut sessions = self.sessions.write();
        if session.phase().is_terminal() {
            sessions.remove(id);
            return;
        }
        // Removed while checked out
        if let Some(entry) = sessions.get_mut(id) {
            entry.session = Some(session);
            entry.last_activity = Instant::now();
        }
    }

    /// Checkout dropped mid-request; the session may be half-advanced
    fn abandon_checked_out(&self, id: &str) {
        if self.sessions.write().remove(id).is_some() {
            metrics::counter!("aicc_sessions_total", "outcome" => "abandoned").increment(1);
            tracing::warn!(session_id = %id, "Request cancelled while advancing session, abandoned");
        }
    }

    /// Abandon a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Remove idle sessions, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, SessionEntry>) -> usize {
        let timeout = self.session_timeout;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let expired = entry.is_expired(timeout);
            if expired {
                metrics::counter!("aicc_sessions_total", "outcome" => "abandoned").increment(1);
                tracing::info!(session_id = %id, "Expired session");
            }
            !expired
        });
        before - sessions.len()
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions
            .read()
            .iter()
            .map(|(id, entry)| SessionInfo {
                session_id: id.clone(),
                conversation_id: entry
                    .session
                    .as_ref()
                    .map(|s| s.conversation_id().to_string()),
                checked_out: entry.session.is_none(),
                age_seconds: entry.created_at.elapsed().as_secs(),
                idle_seconds: entry.last_activity.elapsed().as_secs(),
            })
            .collect()
    }
}
