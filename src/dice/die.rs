//! Dice kinds and individual dice
//!
//! Parses kinds like "d6", "D20" and rolls single faces.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Supported die kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DieKind {
    D6,
    D20,
}

impl DieKind {
    /// Number of faces on this kind of die
    pub fn faces(self) -> u8 {
        match self {
            DieKind::D6 => 6,
            DieKind::D20 => 20,
        }
    }

    /// Roll one face uniformly in `[1, faces]`
    pub fn roll<R: Rng>(self, rng: &mut R) -> u8 {
        rng.random_range(1..=self.faces())
    }

    /// Classify a rolled value
    ///
    /// A d6 is critical only on a 6. A d20 is critical on a natural 20
    /// (success) or a natural 1 (failure).
    pub fn critical(self, value: u8) -> Option<Critical> {
        match self {
            DieKind::D6 if value == 6 => Some(Critical::Success),
            DieKind::D20 if value == 20 => Some(Critical::Success),
            DieKind::D20 if value == 1 => Some(Critical::Failure),
            _ => None,
        }
    }

    /// Check if a rolled value is critical for this kind
    pub fn is_critical(self, value: u8) -> bool {
        self.critical(value).is_some()
    }
}

impl fmt::Display for DieKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.faces())
    }
}

/// Error returned for unknown die kinds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown die kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for DieKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = s.trim().to_lowercase();
        // "d6" and "6" are both accepted
        match kind.strip_prefix('d').unwrap_or(&kind) {
            "6" => Ok(DieKind::D6),
            "20" => Ok(DieKind::D20),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// Notable roll outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Critical {
    /// Highest face
    Success,
    /// Natural 1 on a d20
    Failure,
}

/// Unique die identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DieId(Uuid);

impl DieId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DieId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DieId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A single die on the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Die {
    pub id: DieId,
    pub kind: DieKind,
    /// Face currently showing, always in `[1, kind.faces()]`
    pub value: u8,
    pub is_rolling: bool,
}

impl Die {
    /// Create a new idle die showing its highest face
    pub fn new(kind: DieKind) -> Self {
        Self {
            id: DieId::new(),
            kind,
            value: kind.faces(),
            is_rolling: false,
        }
    }

    /// Whether the face currently showing is critical
    pub fn is_critical(&self) -> bool {
        self.kind.is_critical(self.value)
    }
}
