//! Bounded roll history

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::die::{Critical, DieKind};

/// Maximum number of records kept per session
pub const HISTORY_LIMIT: usize = 20;

/// One completed roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollRecord {
    pub id: Uuid,
    pub kind: DieKind,
    pub value: u8,
    pub rolled_at: DateTime<Utc>,
    pub is_critical: bool,
    pub critical: Option<Critical>,
}

impl RollRecord {
    /// Record a roll outcome, classifying it as it is created
    pub fn new(kind: DieKind, value: u8) -> Self {
        let critical = kind.critical(value);
        Self {
            id: Uuid::new_v4(),
            kind,
            value,
            rolled_at: Utc::now(),
            is_critical: critical.is_some(),
            critical,
        }
    }
}

/// Newest-first log of roll records, capped at [`HISTORY_LIMIT`]
#[derive(Debug, Clone, Default)]
pub struct RollHistory {
    records: VecDeque<RollRecord>,
}

impl RollHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a batch of records
    ///
    /// The first record of the batch becomes the newest entry. Oldest
    /// entries are evicted once the limit is exceeded.
    pub fn push_batch(&mut self, batch: Vec<RollRecord>) {
        for record in batch.into_iter().rev() {
            self.records.push_front(record);
        }
        self.records.truncate(HISTORY_LIMIT);
    }

    /// Prepend a single record
    pub fn push(&mut self, record: RollRecord) {
        self.push_batch(vec![record]);
    }

    /// Iterate records newest-first
    pub fn iter(&self) -> impl Iterator<Item = &RollRecord> {
        self.records.iter()
    }

    /// Copy out the records newest-first
    pub fn to_vec(&self) -> Vec<RollRecord> {
        self.records.iter().cloned().collect()
    }

    /// Most recent record
    pub fn latest(&self) -> Option<&RollRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
