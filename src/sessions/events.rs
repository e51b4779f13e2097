//! Session events pushed to observers

use serde::Serialize;

use crate::dice::{Die, DieId, RollRecord};

/// Something that changed in a session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    #[serde(rename = "die_added")]
    DieAdded { die: Die },
    #[serde(rename = "die_removed")]
    DieRemoved { die_id: DieId },
    /// Collection replaced by a single fresh d20
    #[serde(rename = "dice_reset")]
    DiceReset { die: Die },
    /// Dice entered the rolling state
    #[serde(rename = "roll_started")]
    RollStarted { die_ids: Vec<DieId> },
    /// Dice resolved; records are in collection order
    #[serde(rename = "roll_committed")]
    RollCommitted { records: Vec<RollRecord>, dice: Vec<Die> },
    #[serde(rename = "session_ended")]
    SessionEnded,
}
