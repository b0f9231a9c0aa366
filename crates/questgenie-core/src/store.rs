//! In-memory session registry.
//!
//! Sessions live only as long as the process. Each one sits behind its own
//! mutex, held for the whole of an action, so actions within a session run
//! one at a time while different sessions never wait on each other.
//!
//! A connection that goes away without ending its session leaves the entry
//! behind; [`SessionStore::spawn_idle_sweeper`] discards entries that stay
//! untouched for longer than the configured idle timeout.

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{QuizError, Result};
use crate::session::Session;

/// Opaque identifier handed to a connection when its session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an id taken from a URL.
    ///
    /// Anything that is not a valid id is reported as an unknown session.
    pub fn parse(raw: &str) -> Result<Self> {
        raw.parse()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| QuizError::session_not_found(s))
    }
}

/// All live sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session and returns its id with the initial state.
    pub async fn create(&self) -> (SessionId, Session) {
        let id = SessionId::new_v4();
        let session = Session::new();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(Mutex::new(session.clone())));
        info!(session_id = %id, live = sessions.len(), "Session started");
        (id, session)
    }

    async fn entry(&self, id: SessionId) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| QuizError::session_not_found(id))
    }

    /// Returns a copy of the session's current state.
    ///
    /// Waits for an in-flight action on the same session to finish.
    pub async fn snapshot(&self, id: SessionId) -> Result<Session> {
        let entry = self.entry(id).await?;
        let session = entry.lock().await;
        Ok(session.clone())
    }

    /// Ends a session and discards its state.
    pub async fn remove(&self, id: SessionId) -> Result<()> {
        let removed = self.sessions.write().await.remove(&id);
        let Some(entry) = removed else {
            return Err(QuizError::session_not_found(id));
        };
        let session = entry.lock().await;
        info!(
            session_id = %id,
            duration_secs = session.elapsed().num_seconds(),
            attempted = session.questions_attempted(),
            correct = session.correct_answers(),
            "Session ended"
        );
        Ok(())
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Discards every session untouched for longer than `max_idle`.
    ///
    /// Sessions with an action in flight are skipped. Returns how many
    /// sessions were discarded.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let Ok(session) = entry.try_lock() else {
                return true;
            };
            let idle = session.idle_for();
            let expired = idle.to_std().is_ok_and(|idle| idle > max_idle);
            if expired {
                info!(
                    session_id = %id,
                    idle_secs = idle.num_seconds(),
                    attempted = session.questions_attempted(),
                    correct = session.correct_answers(),
                    "Session expired"
                );
            }
            !expired
        });
        before - sessions.len()
    }

    /// Runs [`evict_idle`](Self::evict_idle) every `every` until the task
    /// is aborted or the runtime shuts down.
    pub fn spawn_idle_sweeper(
        self: Arc<Self>,
        max_idle: Duration,
        every: Duration,
    ) -> JoinHandle<()> {
        let every = every.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle(max_idle).await;
                if evicted > 0 {
                    let live = self.len().await;
                    debug!(evicted, live, "Idle sweep finished");
                }
            }
        })
    }

    /// Runs `f` against a copy of the session, holding the session lock.
    ///
    /// The state returned by `f` replaces the stored one only when `f`
    /// succeeds; on error the stored session is left as it was.
    pub async fn run<F, Fut, T>(&self, id: SessionId, f: F) -> Result<T>
    where
        F: FnOnce(Session) -> Fut + Send,
        Fut: Future<Output = Result<(Session, T)>> + Send,
    {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;
        let (next, output) = f(guard.clone()).await?;
        *guard = next;
        Ok(output)
    }
}
