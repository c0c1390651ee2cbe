use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use revision_core::model::{RoundData, RowId, SubjectId, SubjectKey};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a subject.
///
/// Mirrors the domain `SubjectInfo` plus the sort position the store keeps
/// for display stability, so adapters can map records without leaking
/// storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRecord {
    pub id: SubjectId,
    pub key: SubjectKey,
    pub label: String,
    pub icon: String,
    pub sort_order: usize,
}

/// Insert shape for a subject; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubjectRecord {
    pub key: SubjectKey,
    pub label: String,
    pub icon: String,
    pub sort_order: usize,
}

/// Persisted shape for a practice row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub id: RowId,
    pub subject_id: SubjectId,
    pub name: String,
    pub rounds: Vec<RoundData>,
    pub sort_order: usize,
}

/// Insert shape for a practice row; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRowRecord {
    pub subject_id: SubjectId,
    pub name: String,
    pub rounds: Vec<RoundData>,
    pub sort_order: usize,
}

/// Repository contract for the subject collection.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// List every subject record, ordered by sort position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be read.
    async fn list_subjects(&self) -> Result<Vec<SubjectRecord>, StorageError>;

    /// Insert a subject and return the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the key is already taken, or
    /// other storage errors.
    async fn insert_new_subject(&self, subject: NewSubjectRecord)
        -> Result<SubjectId, StorageError>;

    /// Update a subject's label and icon. The key is immutable.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn update_subject(
        &self,
        id: SubjectId,
        label: &str,
        icon: &str,
    ) -> Result<(), StorageError>;

    /// Delete a subject. Cascades to the subject's rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError>;
}

/// Repository contract for the practice-row collection.
#[async_trait]
pub trait RowRepository: Send + Sync {
    /// List every row record across all subjects, ordered by sort position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be read.
    async fn list_rows(&self) -> Result<Vec<RowRecord>, StorageError>;

    /// Insert a row and return the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn insert_new_row(&self, row: NewRowRecord) -> Result<RowId, StorageError>;

    /// Insert a batch of rows in one call, returning the assigned ids in
    /// submission order. The batch is all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any insert fails; no rows are stored then.
    async fn insert_new_rows(&self, rows: Vec<NewRowRecord>) -> Result<Vec<RowId>, StorageError>;

    /// Replace a row's stored rounds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn update_row_rounds(&self, id: RowId, rounds: &[RoundData])
        -> Result<(), StorageError>;

    /// Replace a row's name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn update_row_name(&self, id: RowId, name: &str) -> Result<(), StorageError>;

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_row(&self, id: RowId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    subjects: Arc<Mutex<Vec<SubjectRecord>>>,
    rows: Arc<Mutex<Vec<RowRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn list_subjects(&self) -> Result<Vec<SubjectRecord>, StorageError> {
        let guard = self.subjects.lock().map_err(poisoned)?;
        let mut subjects = guard.clone();
        subjects.sort_by_key(|s| s.sort_order);
        Ok(subjects)
    }

    async fn insert_new_subject(
        &self,
        subject: NewSubjectRecord,
    ) -> Result<SubjectId, StorageError> {
        let mut guard = self.subjects.lock().map_err(poisoned)?;
        if guard.iter().any(|s| s.key == subject.key) {
            return Err(StorageError::Conflict);
        }
        let id = SubjectId::generate();
        guard.push(SubjectRecord {
            id,
            key: subject.key,
            label: subject.label,
            icon: subject.icon,
            sort_order: subject.sort_order,
        });
        Ok(id)
    }

    async fn update_subject(
        &self,
        id: SubjectId,
        label: &str,
        icon: &str,
    ) -> Result<(), StorageError> {
        let mut guard = self.subjects.lock().map_err(poisoned)?;
        let subject = guard
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StorageError::NotFound)?;
        subject.label = label.to_owned();
        subject.icon = icon.to_owned();
        Ok(())
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let mut guard = self.subjects.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|s| s.id != id);
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        // cascade, like the hosted store's foreign key does
        let mut rows = self.rows.lock().map_err(poisoned)?;
        rows.retain(|r| r.subject_id != id);
        Ok(())
    }
}

#[async_trait]
impl RowRepository for InMemoryRepository {
    async fn list_rows(&self) -> Result<Vec<RowRecord>, StorageError> {
        let guard = self.rows.lock().map_err(poisoned)?;
        let mut rows = guard.clone();
        rows.sort_by_key(|r| r.sort_order);
        Ok(rows)
    }

    async fn insert_new_row(&self, row: NewRowRecord) -> Result<RowId, StorageError> {
        let mut guard = self.rows.lock().map_err(poisoned)?;
        let id = RowId::generate();
        guard.push(RowRecord {
            id,
            subject_id: row.subject_id,
            name: row.name,
            rounds: row.rounds,
            sort_order: row.sort_order,
        });
        Ok(id)
    }

    async fn insert_new_rows(&self, rows: Vec<NewRowRecord>) -> Result<Vec<RowId>, StorageError> {
        let mut guard = self.rows.lock().map_err(poisoned)?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id = RowId::generate();
            guard.push(RowRecord {
                id,
                subject_id: row.subject_id,
                name: row.name,
                rounds: row.rounds,
                sort_order: row.sort_order,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn update_row_rounds(
        &self,
        id: RowId,
        rounds: &[RoundData],
    ) -> Result<(), StorageError> {
        let mut guard = self.rows.lock().map_err(poisoned)?;
        let row = guard
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::NotFound)?;
        row.rounds = rounds.to_vec();
        Ok(())
    }

    async fn update_row_name(&self, id: RowId, name: &str) -> Result<(), StorageError> {
        let mut guard = self.rows.lock().map_err(poisoned)?;
        let row = guard
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::NotFound)?;
        row.name = name.to_owned();
        Ok(())
    }

    async fn delete_row(&self, id: RowId) -> Result<(), StorageError> {
        let mut guard = self.rows.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|r| r.id != id);
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

/// Aggregates the two collection repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub subjects: Arc<dyn SubjectRepository>,
    pub rows: Arc<dyn RowRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let subjects: Arc<dyn SubjectRepository> = Arc::new(repo.clone());
        let rows: Arc<dyn RowRepository> = Arc::new(repo);
        Self { subjects, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revision_core::model::empty_rounds;

    fn new_subject(label: &str, icon: &str, sort_order: usize) -> NewSubjectRecord {
        NewSubjectRecord {
            key: SubjectKey::derive(label),
            label: label.to_owned(),
            icon: icon.to_owned(),
            sort_order,
        }
    }

    fn new_row(subject_id: SubjectId, name: &str, sort_order: usize) -> NewRowRecord {
        NewRowRecord {
            subject_id,
            name: name.to_owned(),
            rounds: empty_rounds(),
            sort_order,
        }
    }

    #[tokio::test]
    async fn lists_subjects_in_sort_order() {
        let repo = InMemoryRepository::new();
        repo.insert_new_subject(new_subject("Physics", "⚛️", 1))
            .await
            .unwrap();
        repo.insert_new_subject(new_subject("Chemistry", "⚗️", 0))
            .await
            .unwrap();

        let listed = repo.list_subjects().await.unwrap();
        assert_eq!(listed[0].label, "Chemistry");
        assert_eq!(listed[1].label, "Physics");
    }

    #[tokio::test]
    async fn rejects_duplicate_subject_key() {
        let repo = InMemoryRepository::new();
        repo.insert_new_subject(new_subject("Physics", "⚛️", 0))
            .await
            .unwrap();

        let err = repo
            .insert_new_subject(new_subject("Physics", "📘", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn bulk_insert_returns_ids_in_submission_order() {
        let repo = InMemoryRepository::new();
        let subject_id = repo
            .insert_new_subject(new_subject("Chemistry", "⚗️", 0))
            .await
            .unwrap();

        let ids = repo
            .insert_new_rows(vec![
                new_row(subject_id, "2015", 0),
                new_row(subject_id, "2016", 1),
            ])
            .await
            .unwrap();

        let listed = repo.list_rows().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(listed[0].id, ids[0]);
        assert_eq!(listed[0].name, "2015");
        assert_eq!(listed[1].id, ids[1]);
        assert_eq!(listed[1].name, "2016");
    }

    #[tokio::test]
    async fn deleting_subject_cascades_to_rows() {
        let repo = InMemoryRepository::new();
        let subject_id = repo
            .insert_new_subject(new_subject("Chemistry", "⚗️", 0))
            .await
            .unwrap();
        repo.insert_new_row(new_row(subject_id, "2015", 0))
            .await
            .unwrap();

        repo.delete_subject(subject_id).await.unwrap();

        assert!(repo.list_subjects().await.unwrap().is_empty());
        assert!(repo.list_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .update_row_name(RowId::generate(), "2015")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
