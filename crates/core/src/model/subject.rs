use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{RowId, SubjectId};
use crate::model::row::RowData;

/// Stock subjects seeded into an empty tracker, as `(label, icon)` pairs.
pub const DEFAULT_SUBJECTS: [(&str, &str); 3] = [
    ("Chemistry", "⚗️"),
    ("Physics", "⚛️"),
    ("Combined Maths", "📐"),
];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject label cannot be empty")]
    EmptyLabel,

    #[error("subject label yields an empty key")]
    EmptyKey,
}

//
// ─── KEY ───────────────────────────────────────────────────────────────────────
//

/// Client-local slug identifying a subject.
///
/// Derived deterministically from the display label once at creation and
/// never recomputed, even when the label is edited later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectKey(String);

impl SubjectKey {
    /// Derives a key from a display label: lower-cased, whitespace runs
    /// collapsed to single hyphens, characters outside `[a-z0-9-]` stripped.
    #[must_use]
    pub fn derive(label: &str) -> Self {
        let hyphenated = label
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        let slug = hyphenated
            .chars()
            .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
            .collect();
        Self(slug)
    }

    /// Wraps a key exactly as it was persisted. Keys are stored alongside
    /// labels and must not be re-derived on load.
    #[must_use]
    pub fn from_persisted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── SUBJECT INFO ──────────────────────────────────────────────────────────────
//

/// Display metadata for one study subject.
///
/// `key` is immutable after creation; `remote_id` is absent until the
/// persistence tier's insert resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInfo {
    key: SubjectKey,
    label: String,
    icon: String,
    remote_id: Option<SubjectId>,
}

impl SubjectInfo {
    /// Creates a new subject, deriving its key from the label.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyLabel` if the label is empty or
    /// whitespace-only, and `SubjectError::EmptyKey` if the label contains
    /// no characters that survive key derivation.
    pub fn new(label: impl Into<String>, icon: impl Into<String>) -> Result<Self, SubjectError> {
        let label = label.into();
        let label = label.trim();
        if label.is_empty() {
            return Err(SubjectError::EmptyLabel);
        }

        let key = SubjectKey::derive(label);
        if key.is_empty() {
            return Err(SubjectError::EmptyKey);
        }

        Ok(Self {
            key,
            label: label.to_owned(),
            icon: icon.into(),
            remote_id: None,
        })
    }

    /// Rebuilds a subject from its persisted parts, key included.
    #[must_use]
    pub fn from_persisted(
        remote_id: SubjectId,
        key: SubjectKey,
        label: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            key,
            label: label.into(),
            icon: icon.into(),
            remote_id: Some(remote_id),
        }
    }

    // Accessors
    #[must_use]
    pub fn key(&self) -> &SubjectKey {
        &self.key
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }

    #[must_use]
    pub fn remote_id(&self) -> Option<SubjectId> {
        self.remote_id
    }

    /// Records the id assigned by the persistence tier.
    pub fn set_remote_id(&mut self, id: SubjectId) {
        self.remote_id = Some(id);
    }

    /// Replaces label and icon. The key is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyLabel` if the label is empty or
    /// whitespace-only.
    pub fn edit(
        &mut self,
        label: impl Into<String>,
        icon: impl Into<String>,
    ) -> Result<(), SubjectError> {
        let label = label.into();
        let label = label.trim();
        if label.is_empty() {
            return Err(SubjectError::EmptyLabel);
        }
        self.label = label.to_owned();
        self.icon = icon.into();
        Ok(())
    }
}

//
// ─── SUBJECT DATA ──────────────────────────────────────────────────────────────
//

/// Per-subject container of practice rows, in insertion order.
///
/// Row id uniqueness is scoped to the owning subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectData {
    rows: Vec<RowData>,
}

impl SubjectData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_rows(rows: Vec<RowData>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[RowData] {
        &self.rows
    }

    /// Appends a row at the end of the subject.
    pub fn push_row(&mut self, row: RowData) {
        self.rows.push(row);
    }

    /// Removes the row with the given id. Returns whether a row was removed.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id() != id);
        self.rows.len() != before
    }

    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&RowData> {
        self.rows.iter().find(|row| row.id() == id)
    }

    pub fn row_mut(&mut self, id: RowId) -> Option<&mut RowData> {
        self.rows.iter_mut().find(|row| row.id() == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
