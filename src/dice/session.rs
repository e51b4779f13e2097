//! Dice collection and roll history state machine
//!
//! Rolls are two-phase:
//! - `begin_*` marks dice as rolling and hands back a [`PendingRoll`]
//! - `commit` draws the new faces, clears the rolling flags and records history
//!
//! The delay between the two phases is owned by the caller.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use super::die::{Die, DieId, DieKind};
use super::history::{RollHistory, RollRecord};

/// Most dice a single table may hold
pub const MAX_DICE: usize = 64;

/// Dice that entered the rolling state together and resolve together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRoll {
    die_ids: Vec<DieId>,
}

impl PendingRoll {
    /// Dice in this roll, in collection order
    pub fn die_ids(&self) -> &[DieId] {
        &self.die_ids
    }
}

/// Read-only view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub dice: Vec<Die>,
    pub history: Vec<RollRecord>,
    /// More than one die on the table
    pub can_remove: bool,
    /// No die is mid-roll
    pub can_roll_all: bool,
}

/// Dice collection (never empty) plus bounded roll history
#[derive(Debug, Clone)]
pub struct Session {
    dice: Vec<Die>,
    history: RollHistory,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Start with a single d20 showing 20
    pub fn new() -> Self {
        Self {
            dice: vec![Die::new(DieKind::D20)],
            history: RollHistory::new(),
        }
    }

    /// Dice in collection order
    pub fn dice(&self) -> &[Die] {
        &self.dice
    }

    /// Look up a die
    pub fn die(&self, id: DieId) -> Option<&Die> {
        self.dice.iter().find(|d| d.id == id)
    }

    pub fn history(&self) -> &RollHistory {
        &self.history
    }

    /// Whether any die is mid-roll
    pub fn any_rolling(&self) -> bool {
        self.dice.iter().any(|d| d.is_rolling)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            dice: self.dice.clone(),
            history: self.history.to_vec(),
            can_remove: self.dice.len() > 1,
            can_roll_all: !self.any_rolling(),
        }
    }

    /// Append a new idle die showing its highest face
    ///
    /// Returns `None` once the table holds [`MAX_DICE`] dice.
    pub fn add_die(&mut self, kind: DieKind) -> Option<DieId> {
        if self.dice.len() >= MAX_DICE {
            return None;
        }
        let die = Die::new(kind);
        let id = die.id;
        self.dice.push(die);
        Some(id)
    }

    /// Remove a die, unless it is the last one
    ///
    /// Returns true if a die was removed.
    pub fn remove_die(&mut self, id: DieId) -> bool {
        if self.dice.len() <= 1 {
            return false;
        }
        let before = self.dice.len();
        self.dice.retain(|d| d.id != id);
        self.dice.len() != before
    }

    /// Replace every die with a single fresh d20; history is kept
    pub fn reset_to_default(&mut self) {
        self.dice = vec![Die::new(DieKind::D20)];
    }

    /// Start rolling one idle die
    pub fn begin_roll(&mut self, id: DieId) -> Option<PendingRoll> {
        let die = self.dice.iter_mut().find(|d| d.id == id)?;
        if die.is_rolling {
            return None;
        }
        die.is_rolling = true;
        Some(PendingRoll { die_ids: vec![id] })
    }

    /// Start rolling every die, unless one is already rolling
    pub fn begin_roll_all(&mut self) -> Option<PendingRoll> {
        if self.any_rolling() {
            return None;
        }
        for die in &mut self.dice {
            die.is_rolling = true;
        }
        Some(PendingRoll {
            die_ids: self.dice.iter().map(|d| d.id).collect(),
        })
    }

    /// Resolve a pending roll
    ///
    /// Every die still on the table and still rolling draws a new face.
    /// One record per resolved die goes into history as a single batch,
    /// in collection order. Dice removed while rolling produce nothing.
    pub fn commit<R: Rng>(&mut self, pending: PendingRoll, rng: &mut R) -> Vec<RollRecord> {
        let pending: HashSet<DieId> = pending.die_ids.into_iter().collect();
        let mut records = Vec::with_capacity(pending.len());

        for die in &mut self.dice {
            if !die.is_rolling || !pending.contains(&die.id) {
                continue;
            }
            die.value = die.kind.roll(rng);
            die.is_rolling = false;
            records.push(RollRecord::new(die.kind, die.value));
        }

        if !records.is_empty() {
            self.history.push_batch(records.clone());
        }
        records
    }
}
