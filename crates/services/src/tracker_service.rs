use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use revision_core::model::{RoundField, RowData, RowId, SubjectData, SubjectId, SubjectInfo, SubjectKey};
use storage::repository::{NewRowRecord, NewSubjectRecord, RowRepository, SubjectRepository};

use crate::error::TrackerError;
use crate::join::join_records;
use crate::notify::{Notice, Notifier};

/// Read-only view of the hierarchy for the presentation layer.
#[derive(Debug, Clone)]
pub struct TrackerSnapshot {
    pub subjects: Vec<SubjectInfo>,
    pub data: HashMap<SubjectKey, SubjectData>,
    pub loading: bool,
}

#[derive(Debug, Default)]
struct TrackerState {
    subjects: Vec<SubjectInfo>,
    data: HashMap<SubjectKey, SubjectData>,
    loading: bool,
}

/// The progress state engine.
///
/// Owns the canonical in-memory hierarchy and applies every mutation
/// optimistically: the local tree is updated synchronously before the
/// corresponding remote call is issued, and a failed call surfaces as a
/// notice rather than a rollback. Inserts are the one exception — a failed
/// insert removes the provisional entries it appended, so no phantom
/// subjects or rows outlive a rejected create.
///
/// The state lock is never held across a suspension point; each remote call
/// is the sole await in its operation and runs after the local mutation has
/// fully completed.
pub struct TrackerService {
    state: Mutex<TrackerState>,
    subjects: Arc<dyn SubjectRepository>,
    rows: Arc<dyn RowRepository>,
    notifier: Arc<dyn Notifier>,
}

impl TrackerService {
    #[must_use]
    pub fn new(
        subjects: Arc<dyn SubjectRepository>,
        rows: Arc<dyn RowRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                loading: true,
                ..TrackerState::default()
            }),
            subjects,
            rows,
            notifier,
        }
    }

    /// Returns a read-only snapshot of the current hierarchy.
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        match self.state() {
            Ok(state) => TrackerSnapshot {
                subjects: state.subjects.clone(),
                data: state.data.clone(),
                loading: state.loading,
            },
            Err(_) => TrackerSnapshot {
                subjects: Vec::new(),
                data: HashMap::new(),
                loading: false,
            },
        }
    }

    // ─── Load ──────────────────────────────────────────────────────────────

    /// Populates the hierarchy from the persistence tier.
    ///
    /// Invoked once at startup. Either both fetches succeed and the store is
    /// fully loaded, or the failure is reported and the hierarchy is left
    /// empty — no partially-populated state is ever exposed. Returns whether
    /// the load succeeded.
    pub async fn load(&self) -> bool {
        match self.try_load().await {
            Ok(()) => true,
            Err(err) => {
                if let Ok(mut state) = self.state.lock() {
                    state.subjects.clear();
                    state.data.clear();
                    state.loading = false;
                }
                self.report(&err);
                false
            }
        }
    }

    async fn try_load(&self) -> Result<(), TrackerError> {
        let subjects = self
            .subjects
            .list_subjects()
            .await
            .map_err(TrackerError::Load)?;
        let rows = self.rows.list_rows().await.map_err(TrackerError::Load)?;
        let (infos, data) = join_records(subjects, rows);

        let mut state = self.state()?;
        state.subjects = infos;
        state.data = data;
        state.loading = false;
        Ok(())
    }

    // ─── Row Mutations ─────────────────────────────────────────────────────

    /// Flips one completion flag and writes the row's rounds through.
    ///
    /// The local flip is kept even if the remote write fails.
    pub async fn toggle_check(
        &self,
        subject: &SubjectKey,
        row_id: RowId,
        round_index: usize,
        field: RoundField,
    ) {
        if let Err(err) = self
            .try_toggle_check(subject, row_id, round_index, field)
            .await
        {
            self.report(&err);
        }
    }

    async fn try_toggle_check(
        &self,
        subject: &SubjectKey,
        row_id: RowId,
        round_index: usize,
        field: RoundField,
    ) -> Result<(), TrackerError> {
        {
            let mut state = self.state()?;
            let data = state
                .data
                .get_mut(subject)
                .ok_or_else(|| TrackerError::UnknownSubject(subject.clone()))?;
            let row = data
                .row_mut(row_id)
                .ok_or_else(|| TrackerError::UnknownRow(subject.clone()))?;
            row.toggle(round_index, field)?;
        }

        // The payload is read back from the tree at send time, so the write
        // carries every flip applied up to the moment it goes out.
        let rounds = {
            let state = self.state()?;
            let data = state
                .data
                .get(subject)
                .ok_or_else(|| TrackerError::UnknownSubject(subject.clone()))?;
            data.row(row_id)
                .ok_or_else(|| TrackerError::UnknownRow(subject.clone()))?
                .rounds()
                .to_vec()
        };

        self.rows
            .update_row_rounds(row_id, &rounds)
            .await
            .map_err(TrackerError::Write)?;
        Ok(())
    }

    /// Appends a new row and inserts it into the store.
    ///
    /// The store-assigned id replaces the provisional one on success; on
    /// insert failure the provisional row is removed again.
    pub async fn add_row(&self, subject: &SubjectKey, name: &str) {
        if let Err(err) = self.try_add_row(subject, name).await {
            self.report(&err);
        }
    }

    async fn try_add_row(&self, subject: &SubjectKey, name: &str) -> Result<(), TrackerError> {
        let row = RowData::new(name)?;
        let provisional = row.id();

        let record = {
            let mut state = self.state()?;
            let subject_id = remote_id_of(&state, subject)?;
            let data = state
                .data
                .get_mut(subject)
                .ok_or_else(|| TrackerError::UnknownSubject(subject.clone()))?;
            let record = NewRowRecord {
                subject_id,
                name: row.name().to_owned(),
                rounds: row.rounds().to_vec(),
                sort_order: data.rows().len(),
            };
            data.push_row(row);
            record
        };

        match self.rows.insert_new_row(record).await {
            Ok(assigned) => {
                let mut state = self.state()?;
                if let Some(row) = state
                    .data
                    .get_mut(subject)
                    .and_then(|data| data.row_mut(provisional))
                {
                    row.set_id(assigned);
                }
                Ok(())
            }
            Err(err) => {
                self.remove_provisional_rows(subject, &[provisional]);
                Err(TrackerError::Write(err))
            }
        }
    }

    /// Appends one row per name, in order, and bulk-inserts them in a single
    /// call.
    ///
    /// All-or-nothing: a failed bulk insert leaves none of the rows behind.
    /// Empty names are skipped during validation.
    pub async fn add_rows(&self, subject: &SubjectKey, names: &[String]) {
        match self.try_add_rows(subject, names).await {
            Ok(0) => {}
            Ok(count) => self
                .notifier
                .notify(Notice::info(format!("Added {count} rows"))),
            Err(err) => self.report(&err),
        }
    }

    async fn try_add_rows(
        &self,
        subject: &SubjectKey,
        names: &[String],
    ) -> Result<usize, TrackerError> {
        let rows: Vec<RowData> = names
            .iter()
            .filter_map(|name| RowData::new(name.as_str()).ok())
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }
        let provisional: Vec<RowId> = rows.iter().map(RowData::id).collect();

        let records = {
            let mut state = self.state()?;
            let subject_id = remote_id_of(&state, subject)?;
            let data = state
                .data
                .get_mut(subject)
                .ok_or_else(|| TrackerError::UnknownSubject(subject.clone()))?;
            let base = data.rows().len();
            let records: Vec<NewRowRecord> = rows
                .iter()
                .enumerate()
                .map(|(offset, row)| NewRowRecord {
                    subject_id,
                    name: row.name().to_owned(),
                    rounds: row.rounds().to_vec(),
                    sort_order: base + offset,
                })
                .collect();
            for row in rows {
                data.push_row(row);
            }
            records
        };
        let count = records.len();

        match self.rows.insert_new_rows(records).await {
            Ok(assigned) => {
                let mut state = self.state()?;
                if let Some(data) = state.data.get_mut(subject) {
                    for (provisional_id, assigned_id) in provisional.iter().zip(assigned) {
                        if let Some(row) = data.row_mut(*provisional_id) {
                            row.set_id(assigned_id);
                        }
                    }
                }
                Ok(count)
            }
            Err(err) => {
                self.remove_provisional_rows(subject, &provisional);
                Err(TrackerError::Write(err))
            }
        }
    }

    /// Removes a row. The local removal is kept even if the remote delete
    /// fails.
    pub async fn delete_row(&self, subject: &SubjectKey, row_id: RowId) {
        if let Err(err) = self.try_delete_row(subject, row_id).await {
            self.report(&err);
        }
    }

    async fn try_delete_row(&self, subject: &SubjectKey, row_id: RowId) -> Result<(), TrackerError> {
        {
            let mut state = self.state()?;
            let data = state
                .data
                .get_mut(subject)
                .ok_or_else(|| TrackerError::UnknownSubject(subject.clone()))?;
            if !data.remove_row(row_id) {
                return Err(TrackerError::UnknownRow(subject.clone()));
            }
        }

        self.rows
            .delete_row(row_id)
            .await
            .map_err(TrackerError::Write)?;
        Ok(())
    }

    /// Renames a row. The local rename is kept even if the remote write
    /// fails.
    pub async fn rename_row(&self, subject: &SubjectKey, row_id: RowId, name: &str) {
        if let Err(err) = self.try_rename_row(subject, row_id, name).await {
            self.report(&err);
        }
    }

    async fn try_rename_row(
        &self,
        subject: &SubjectKey,
        row_id: RowId,
        name: &str,
    ) -> Result<(), TrackerError> {
        {
            let mut state = self.state()?;
            let data = state
                .data
                .get_mut(subject)
                .ok_or_else(|| TrackerError::UnknownSubject(subject.clone()))?;
            let row = data
                .row_mut(row_id)
                .ok_or_else(|| TrackerError::UnknownRow(subject.clone()))?;
            row.rename(name)?;
        }

        self.rows
            .update_row_name(row_id, name.trim())
            .await
            .map_err(TrackerError::Write)?;
        Ok(())
    }

    // ─── Subject Mutations ─────────────────────────────────────────────────

    /// Creates a subject and returns its derived key.
    ///
    /// Returns `None` when validation or the insert fails; in that case no
    /// local trace of the subject remains.
    pub async fn add_subject(&self, label: &str, icon: &str) -> Option<SubjectKey> {
        match self.try_add_subject(label, icon).await {
            Ok(key) => Some(key),
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    async fn try_add_subject(&self, label: &str, icon: &str) -> Result<SubjectKey, TrackerError> {
        let info = SubjectInfo::new(label, icon)?;
        let key = info.key().clone();

        let record = {
            let mut state = self.state()?;
            if state.data.contains_key(&key) {
                return Err(TrackerError::DuplicateSubject(key));
            }
            let record = NewSubjectRecord {
                key: key.clone(),
                label: info.label().to_owned(),
                icon: info.icon().to_owned(),
                sort_order: state.subjects.len(),
            };
            state.subjects.push(info);
            state.data.insert(key.clone(), SubjectData::new());
            record
        };

        match self.subjects.insert_new_subject(record).await {
            Ok(assigned) => {
                let mut state = self.state()?;
                if let Some(info) = state.subjects.iter_mut().find(|s| s.key() == &key) {
                    info.set_remote_id(assigned);
                }
                Ok(key)
            }
            Err(err) => {
                if let Ok(mut state) = self.state.lock() {
                    state.subjects.retain(|s| s.key() != &key);
                    state.data.remove(&key);
                }
                Err(TrackerError::Write(err))
            }
        }
    }

    /// Replaces a subject's label and icon. The key never changes; the local
    /// edit is kept even if the remote write fails.
    pub async fn edit_subject(&self, key: &SubjectKey, label: &str, icon: &str) {
        if let Err(err) = self.try_edit_subject(key, label, icon).await {
            self.report(&err);
        }
    }

    async fn try_edit_subject(
        &self,
        key: &SubjectKey,
        label: &str,
        icon: &str,
    ) -> Result<(), TrackerError> {
        let remote_id = {
            let mut state = self.state()?;
            let info = state
                .subjects
                .iter_mut()
                .find(|s| s.key() == key)
                .ok_or_else(|| TrackerError::UnknownSubject(key.clone()))?;
            info.edit(label, icon)?;
            info.remote_id()
                .ok_or_else(|| TrackerError::SubjectNotSynced(key.clone()))?
        };

        self.subjects
            .update_subject(remote_id, label.trim(), icon)
            .await
            .map_err(TrackerError::Write)?;
        Ok(())
    }

    /// Removes a subject and all of its rows. The remote delete is assumed
    /// to cascade; the local removal is kept even if it fails.
    pub async fn delete_subject(&self, key: &SubjectKey) {
        if let Err(err) = self.try_delete_subject(key).await {
            self.report(&err);
        }
    }

    async fn try_delete_subject(&self, key: &SubjectKey) -> Result<(), TrackerError> {
        let remote_id = {
            let mut state = self.state()?;
            let position = state
                .subjects
                .iter()
                .position(|s| s.key() == key)
                .ok_or_else(|| TrackerError::UnknownSubject(key.clone()))?;
            let info = state.subjects.remove(position);
            state.data.remove(key);
            info.remote_id()
        };
        let remote_id = remote_id.ok_or_else(|| TrackerError::SubjectNotSynced(key.clone()))?;

        self.subjects
            .delete_subject(remote_id)
            .await
            .map_err(TrackerError::Write)?;
        Ok(())
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    fn state(&self) -> Result<MutexGuard<'_, TrackerState>, TrackerError> {
        self.state.lock().map_err(|_| TrackerError::StatePoisoned)
    }

    fn report(&self, err: &TrackerError) {
        log::warn!("{err}");
        self.notifier.notify(Notice::error(err.to_string()));
    }

    fn remove_provisional_rows(&self, subject: &SubjectKey, ids: &[RowId]) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(data) = state.data.get_mut(subject) {
                for id in ids {
                    data.remove_row(*id);
                }
            }
        }
    }
}

fn remote_id_of(state: &TrackerState, subject: &SubjectKey) -> Result<SubjectId, TrackerError> {
    let info = state
        .subjects
        .iter()
        .find(|s| s.key() == subject)
        .ok_or_else(|| TrackerError::UnknownSubject(subject.clone()))?;
    info.remote_id()
        .ok_or_else(|| TrackerError::SubjectNotSynced(subject.clone()))
}
