//! Dice module
//!
//! Implements the dice table for one session:
//! - d6 and d20 dice with critical classification
//! - A bounded, newest-first roll history
//! - The two-phase roll state machine (idle -> rolling -> idle)

mod die;
mod history;
mod session;

pub use die::{Critical, Die, DieId, DieKind, ParseKindError};
pub use history::{RollHistory, RollRecord, HISTORY_LIMIT};
pub use session::{PendingRoll, Session, SessionSnapshot, MAX_DICE};
