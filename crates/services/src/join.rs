//! Two-pass join of flat storage records into the nested hierarchy.

use std::collections::HashMap;

use revision_core::model::{RowData, SubjectData, SubjectId, SubjectInfo, SubjectKey};
use storage::repository::{RowRecord, SubjectRecord};

/// Folds subject and row records into the in-memory tree.
///
/// First pass: build the `SubjectId -> SubjectKey` lookup table and one
/// empty bucket per subject. Second pass: fold each row into its subject's
/// bucket, padding rounds to the expected length. Rows whose subject cannot
/// be resolved are dropped without an error (lenient-read policy for
/// referentially inconsistent stores).
pub(crate) fn join_records(
    subjects: Vec<SubjectRecord>,
    rows: Vec<RowRecord>,
) -> (Vec<SubjectInfo>, HashMap<SubjectKey, SubjectData>) {
    let mut key_by_id: HashMap<SubjectId, SubjectKey> = HashMap::with_capacity(subjects.len());
    let mut data: HashMap<SubjectKey, SubjectData> = HashMap::with_capacity(subjects.len());
    let mut infos = Vec::with_capacity(subjects.len());

    for record in subjects {
        key_by_id.insert(record.id, record.key.clone());
        data.insert(record.key.clone(), SubjectData::new());
        infos.push(SubjectInfo::from_persisted(
            record.id,
            record.key,
            record.label,
            record.icon,
        ));
    }

    for record in rows {
        let Some(key) = key_by_id.get(&record.subject_id) else {
            log::debug!(
                "dropping row {} with unresolved subject {}",
                record.id,
                record.subject_id
            );
            continue;
        };
        let row = RowData::from_persisted(record.id, record.name, record.rounds);
        if let Some(bucket) = data.get_mut(key) {
            bucket.push_row(row);
        }
    }

    (infos, data)
}
