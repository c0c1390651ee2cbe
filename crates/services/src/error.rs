//! Shared error types for the services crate.

use thiserror::Error;

use revision_core::model::{RowError, SubjectError, SubjectKey};
use storage::repository::StorageError;

/// Errors raised by `TrackerService` operations.
///
/// These never escape a public operation: the engine converts each failure
/// into a user-facing notice at the point it occurs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("failed to load study data: {0}")]
    Load(#[source] StorageError),

    #[error("failed to save changes: {0}")]
    Write(#[source] StorageError),

    #[error(transparent)]
    Subject(#[from] SubjectError),

    #[error(transparent)]
    Row(#[from] RowError),

    #[error("unknown subject '{0}'")]
    UnknownSubject(SubjectKey),

    #[error("unknown row in subject '{0}'")]
    UnknownRow(SubjectKey),

    #[error("a subject named '{0}' already exists")]
    DuplicateSubject(SubjectKey),

    #[error("subject '{0}' has not finished syncing")]
    SubjectNotSynced(SubjectKey),

    #[error("tracker state lock is poisoned")]
    StatePoisoned,
}
