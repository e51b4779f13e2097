//! Live dice session
//!
//! Wraps the dice state machine with roll timers and event fan-out.
//! State is only touched inside short synchronous lock scopes; the roll
//! delay runs in a spawned task that commits back into the same session.
//! Events are sent while the lock is held, so observers see them in the
//! same order the state changed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::events::SessionEvent;
use super::SessionId;
use crate::dice::{DieId, DieKind, PendingRoll, RollRecord, Session, SessionSnapshot};

/// Delay between a roll starting and its result being committed
pub const ROLL_DELAY: Duration = Duration::from_millis(800);

/// Buffered events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 64;

/// A session with its own dice, history and observers
#[derive(Debug)]
pub struct DiceSession {
    id: SessionId,
    state: Mutex<Session>,
    roll_delay: Duration,
    events: broadcast::Sender<SessionEvent>,
    created_at: DateTime<Utc>,
    last_active: Mutex<Instant>,
}

impl DiceSession {
    /// Create a session with the default table (one d20)
    pub fn new(id: SessionId, roll_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            id,
            state: Mutex::new(Session::new()),
            roll_delay,
            events,
            created_at: Utc::now(),
            last_active: Mutex::new(Instant::now()),
        }
    }

    /// Create a shared instance
    pub fn shared(id: SessionId, roll_delay: Duration) -> Arc<Self> {
        Arc::new(Self::new(id, roll_delay))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn roll_delay(&self) -> Duration {
        self.roll_delay
    }

    /// Current dice and history
    pub fn snapshot(&self) -> SessionSnapshot {
        self.touch();
        self.state.lock().snapshot()
    }

    /// Roll history, newest first
    pub fn history(&self) -> Vec<RollRecord> {
        self.touch();
        self.state.lock().history().to_vec()
    }

    /// Receive events for this session
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.touch();
        self.events.subscribe()
    }

    /// Add a die showing its highest face
    ///
    /// Returns `None` if the table is full.
    pub fn add_die(&self, kind: DieKind) -> Option<DieId> {
        self.touch();
        let mut state = self.state.lock();
        let id = state.add_die(kind)?;
        if let Some(die) = state.die(id) {
            self.publish(SessionEvent::DieAdded { die: die.clone() });
        }
        debug!("Session {} added {} {}", self.id, kind, id);
        Some(id)
    }

    /// Remove a die; ignored for the last die or an unknown id
    pub fn remove_die(&self, die_id: DieId) -> bool {
        self.touch();
        let mut state = self.state.lock();
        let removed = state.remove_die(die_id);
        if removed {
            self.publish(SessionEvent::DieRemoved { die_id });
            debug!("Session {} removed die {}", self.id, die_id);
        }
        removed
    }

    /// Replace all dice with a single d20 showing 20
    pub fn reset_to_default(&self) {
        self.touch();
        let mut state = self.state.lock();
        state.reset_to_default();
        self.publish(SessionEvent::DiceReset {
            die: state.dice()[0].clone(),
        });
        debug!("Session {} reset dice", self.id);
    }

    /// Roll one die
    ///
    /// Returns `None` if the die is unknown or already rolling. Otherwise the
    /// die is rolling when this returns, and the handle resolves to the
    /// committed records once the roll delay has passed.
    pub fn roll_one(self: &Arc<Self>, die_id: DieId) -> Option<JoinHandle<Vec<RollRecord>>> {
        self.touch();
        let mut state = self.state.lock();
        let pending = state.begin_roll(die_id)?;
        Some(self.schedule(pending))
    }

    /// Roll every die together
    ///
    /// Returns `None` if any die is already rolling.
    pub fn roll_all(self: &Arc<Self>) -> Option<JoinHandle<Vec<RollRecord>>> {
        self.touch();
        let mut state = self.state.lock();
        let pending = state.begin_roll_all()?;
        Some(self.schedule(pending))
    }

    /// Time since a client last read or changed this session
    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }

    /// Whether the session can be discarded without anyone noticing
    ///
    /// Requires no attached observers, no roll in flight, and at least
    /// `timeout` since the last client call.
    pub fn is_idle(&self, timeout: Duration) -> bool {
        if self.events.receiver_count() > 0 || self.idle_for() < timeout {
            return false;
        }
        !self.state.lock().any_rolling()
    }

    /// Notify observers that the session is gone
    pub(crate) fn close(&self) {
        let _state = self.state.lock();
        self.publish(SessionEvent::SessionEnded);
    }

    /// Announce a begun roll and start its timer
    ///
    /// Called with the state lock held.
    fn schedule(self: &Arc<Self>, pending: PendingRoll) -> JoinHandle<Vec<RollRecord>> {
        debug!(
            "Session {} rolling {} dice",
            self.id,
            pending.die_ids().len()
        );
        self.publish(SessionEvent::RollStarted {
            die_ids: pending.die_ids().to_vec(),
        });

        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(session.roll_delay).await;
            session.commit(pending)
        })
    }

    fn commit(&self, pending: PendingRoll) -> Vec<RollRecord> {
        let mut state = self.state.lock();
        let records = state.commit(pending, &mut rand::rng());

        if !records.is_empty() {
            debug!(
                "Session {} committed {} rolls ({} critical)",
                self.id,
                records.len(),
                records.iter().filter(|r| r.is_critical).count()
            );
            self.publish(SessionEvent::RollCommitted {
                records: records.clone(),
                dice: state.dice().to_vec(),
            });
        }
        records
    }

    fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
