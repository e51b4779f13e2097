//! Scenario tests for diced
//!
//! Modular scenarios covering:
//! - Table: dice collection management
//! - Rolling: two-phase rolls and history
//! - Live: WebSocket observers and commands

pub mod live;
pub mod table;
