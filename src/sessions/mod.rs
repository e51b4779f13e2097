//! Session registry
//!
//! Each session is created on request, lives in memory, and is discarded
//! when ended or after sitting idle. Sessions never share dice or history.

mod events;
mod live;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

pub use events::SessionEvent;
pub use live::{DiceSession, ROLL_DELAY};

/// Default time a session may sit untouched before it is reaped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Session registry errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session limit reached ({0})")]
    Capacity(usize),
}

/// Registry of live sessions
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<DiceSession>>>,
    roll_delay: Duration,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(roll_delay: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            roll_delay,
            max_sessions,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Set how long an unobserved session may sit untouched
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Create a shared instance
    pub fn shared(roll_delay: Duration, max_sessions: usize) -> Arc<Self> {
        Arc::new(Self::new(roll_delay, max_sessions))
    }

    /// Start a new session with the default table
    pub async fn create(&self) -> Result<Arc<DiceSession>, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::Capacity(self.max_sessions));
        }

        let session = DiceSession::shared(SessionId::new(), self.roll_delay);
        sessions.insert(session.id(), session.clone());
        info!("Session {} started ({} live)", session.id(), sessions.len());
        Ok(session)
    }

    /// Look up a live session
    pub async fn get(&self, id: SessionId) -> Result<Arc<DiceSession>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    /// End a session and discard its state
    ///
    /// Rolls already in flight still resolve, but nothing can observe them.
    pub async fn end(&self, id: SessionId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        session.close();
        info!("Session {} ended", id);
        Ok(())
    }

    /// End every session that has gone idle
    ///
    /// Returns the ids of the sessions discarded.
    pub async fn reap_idle(&self) -> Vec<SessionId> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<SessionId> = sessions
            .values()
            .filter(|s| s.is_idle(self.idle_timeout))
            .map(|s| s.id())
            .collect();

        for id in &idle {
            if let Some(session) = sessions.remove(id) {
                session.close();
            }
        }
        if !idle.is_empty() {
            info!("Reaped {} idle sessions ({} live)", idle.len(), sessions.len());
        }
        idle
    }

    /// Periodically reap idle sessions until shutdown is signalled
    pub fn spawn_reaper(
        self: &Arc<Self>,
        every: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.reap_idle().await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
            debug!("Session reaper stopped");
        })
    }

    /// Get count of live sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
