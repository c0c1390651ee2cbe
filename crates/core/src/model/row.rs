use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::RowId;

/// Number of repetition rounds tracked per practice row.
pub const TOTAL_ROUNDS: usize = 8;

/// Stock row names used when seeding a fresh subject.
pub const DEFAULT_ROW_NAMES: [&str; 5] = ["2015", "2016", "2017", "2018", "2019"];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RowError {
    #[error("row name cannot be empty")]
    EmptyName,

    #[error("round index {0} is out of range")]
    RoundOutOfRange(usize),
}

//
// ─── ROUNDS ────────────────────────────────────────────────────────────────────
//

/// Completion flags for one repetition round of a practice row.
///
/// The two flags are independent: a round can have its multiple-choice part
/// done without the essay part, and vice versa.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    #[serde(default)]
    pub mcq: bool,
    #[serde(default)]
    pub essay: bool,
}

/// Which completion flag of a round an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundField {
    Mcq,
    Essay,
}

/// Returns a fresh all-false rounds sequence of length `TOTAL_ROUNDS`.
#[must_use]
pub fn empty_rounds() -> Vec<RoundData> {
    vec![RoundData::default(); TOTAL_ROUNDS]
}

// Right-pads to TOTAL_ROUNDS with all-false rounds. Longer sequences are
// kept as-is, never truncated.
fn pad_rounds(mut rounds: Vec<RoundData>) -> Vec<RoundData> {
    if rounds.len() < TOTAL_ROUNDS {
        rounds.resize(TOTAL_ROUNDS, RoundData::default());
    }
    rounds
}

//
// ─── ROW ───────────────────────────────────────────────────────────────────────
//

/// One trackable unit within a subject, e.g. an exam year or topic.
///
/// Invariant: `rounds` always holds at least `TOTAL_ROUNDS` entries. Rows
/// loaded from storage with fewer rounds are padded on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowData {
    id: RowId,
    name: String,
    rounds: Vec<RoundData>,
}

impl RowData {
    /// Creates a new row with a provisional id and all-false rounds.
    ///
    /// # Errors
    ///
    /// Returns `RowError::EmptyName` if the name is empty or whitespace-only.
    pub fn new(name: impl Into<String>) -> Result<Self, RowError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(RowError::EmptyName);
        }

        Ok(Self {
            id: RowId::generate(),
            name: name.to_owned(),
            rounds: empty_rounds(),
        })
    }

    /// Rebuilds a row from its persisted parts, normalizing the rounds length.
    #[must_use]
    pub fn from_persisted(id: RowId, name: impl Into<String>, rounds: Vec<RoundData>) -> Self {
        Self {
            id,
            name: name.into(),
            rounds: pad_rounds(rounds),
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> RowId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rounds(&self) -> &[RoundData] {
        &self.rounds
    }

    /// Replaces the provisional id with the store-assigned one.
    pub fn set_id(&mut self, id: RowId) {
        self.id = id;
    }

    /// Replaces the row name.
    ///
    /// # Errors
    ///
    /// Returns `RowError::EmptyName` if the name is empty or whitespace-only.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), RowError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(RowError::EmptyName);
        }
        self.name = name.to_owned();
        Ok(())
    }

    /// Flips exactly one completion flag, leaving everything else unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RowError::RoundOutOfRange` if the round index does not
    /// address an existing round.
    pub fn toggle(&mut self, round_index: usize, field: RoundField) -> Result<(), RowError> {
        let round = self
            .rounds
            .get_mut(round_index)
            .ok_or(RowError::RoundOutOfRange(round_index))?;
        match field {
            RoundField::Mcq => round.mcq = !round.mcq,
            RoundField::Essay => round.essay = !round.essay,
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
