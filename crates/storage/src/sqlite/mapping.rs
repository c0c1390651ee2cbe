use revision_core::model::{RoundData, RowId, SubjectId};
use uuid::Uuid;

use crate::repository::StorageError;

pub(super) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(super) fn subject_id_from_text(raw: &str) -> Result<SubjectId, StorageError> {
    raw.parse::<Uuid>()
        .map(SubjectId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid subject id: {raw}")))
}

pub(super) fn row_id_from_text(raw: &str) -> Result<RowId, StorageError> {
    raw.parse::<Uuid>()
        .map(RowId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid row id: {raw}")))
}

pub(super) fn sort_order_from_i64(raw: i64) -> Result<usize, StorageError> {
    usize::try_from(raw).map_err(|_| StorageError::Serialization("sort_order underflow".into()))
}

pub(super) fn sort_order_to_i64(sort_order: usize) -> Result<i64, StorageError> {
    i64::try_from(sort_order).map_err(|_| StorageError::Serialization("sort_order overflow".into()))
}

pub(super) fn rounds_to_json(rounds: &[RoundData]) -> Result<String, StorageError> {
    serde_json::to_string(rounds).map_err(ser)
}

/// Lenient decode: a malformed rounds column reads as an empty list, which
/// the engine pads back to the expected length on load.
pub(super) fn rounds_from_json(raw: &str) -> Vec<RoundData> {
    match serde_json::from_str(raw) {
        Ok(rounds) => rounds,
        Err(err) => {
            log::debug!("ignoring malformed rounds column: {err}");
            Vec::new()
        }
    }
}
