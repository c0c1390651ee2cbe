use std::sync::Arc;

use async_trait::async_trait;

use revision_core::model::{
    RoundData, RoundField, RowId, SubjectId, SubjectKey, TOTAL_ROUNDS, empty_rounds,
};
use revision_core::progress::subject_progress;
use services::{NoticeLevel, Notifier, RecordingNotifier, TrackerService};
use storage::repository::{
    InMemoryRepository, NewRowRecord, NewSubjectRecord, RowRecord, RowRepository, StorageError,
    SubjectRecord, SubjectRepository,
};

fn tracker(
    subjects: Arc<dyn SubjectRepository>,
    rows: Arc<dyn RowRepository>,
    notifier: &Arc<RecordingNotifier>,
) -> TrackerService {
    TrackerService::new(subjects, rows, Arc::clone(notifier) as Arc<dyn Notifier>)
}

fn error_notices(notifier: &RecordingNotifier) -> Vec<String> {
    notifier
        .notices()
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .map(|n| n.message)
        .collect()
}

/// Row repository that fails selected write operations, delegating the rest.
struct FlakyRows {
    inner: InMemoryRepository,
    fail_inserts: bool,
    fail_updates: bool,
}

fn connection_lost() -> StorageError {
    StorageError::Connection("connection reset by peer".into())
}

#[async_trait]
impl RowRepository for FlakyRows {
    async fn list_rows(&self) -> Result<Vec<RowRecord>, StorageError> {
        self.inner.list_rows().await
    }

    async fn insert_new_row(&self, row: NewRowRecord) -> Result<RowId, StorageError> {
        if self.fail_inserts {
            return Err(connection_lost());
        }
        self.inner.insert_new_row(row).await
    }

    async fn insert_new_rows(&self, rows: Vec<NewRowRecord>) -> Result<Vec<RowId>, StorageError> {
        if self.fail_inserts {
            return Err(connection_lost());
        }
        self.inner.insert_new_rows(rows).await
    }

    async fn update_row_rounds(
        &self,
        id: RowId,
        rounds: &[RoundData],
    ) -> Result<(), StorageError> {
        if self.fail_updates {
            return Err(connection_lost());
        }
        self.inner.update_row_rounds(id, rounds).await
    }

    async fn update_row_name(&self, id: RowId, name: &str) -> Result<(), StorageError> {
        if self.fail_updates {
            return Err(connection_lost());
        }
        self.inner.update_row_name(id, name).await
    }

    async fn delete_row(&self, id: RowId) -> Result<(), StorageError> {
        self.inner.delete_row(id).await
    }
}

/// Subject repository whose reads always fail.
struct UnreachableSubjects;

#[async_trait]
impl SubjectRepository for UnreachableSubjects {
    async fn list_subjects(&self) -> Result<Vec<SubjectRecord>, StorageError> {
        Err(connection_lost())
    }

    async fn insert_new_subject(
        &self,
        _subject: NewSubjectRecord,
    ) -> Result<SubjectId, StorageError> {
        Err(connection_lost())
    }

    async fn update_subject(
        &self,
        _id: SubjectId,
        _label: &str,
        _icon: &str,
    ) -> Result<(), StorageError> {
        Err(connection_lost())
    }

    async fn delete_subject(&self, _id: SubjectId) -> Result<(), StorageError> {
        Err(connection_lost())
    }
}

#[tokio::test]
async fn load_pads_short_rounds_and_drops_orphans() {
    let repo = InMemoryRepository::new();
    let subject_id = repo
        .insert_new_subject(NewSubjectRecord {
            key: SubjectKey::derive("Chemistry"),
            label: "Chemistry".to_owned(),
            icon: "⚗️".to_owned(),
            sort_order: 0,
        })
        .await
        .unwrap();

    // A legacy row with only two stored rounds.
    let mut short = vec![RoundData::default(); 2];
    short[0].mcq = true;
    repo.insert_new_row(NewRowRecord {
        subject_id,
        name: "2015".to_owned(),
        rounds: short,
        sort_order: 0,
    })
    .await
    .unwrap();

    // A row pointing at a subject that no longer exists.
    repo.insert_new_row(NewRowRecord {
        subject_id: SubjectId::generate(),
        name: "orphan".to_owned(),
        rounds: empty_rounds(),
        sort_order: 1,
    })
    .await
    .unwrap();

    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(repo.clone()), Arc::new(repo), &notifier);
    assert!(service.load().await);

    let snapshot = service.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.subjects.len(), 1);

    let key = snapshot.subjects[0].key().clone();
    let rows = snapshot.data[&key].rows();
    assert_eq!(rows.len(), 1, "orphan row must not appear anywhere");
    assert_eq!(rows[0].rounds().len(), TOTAL_ROUNDS);
    assert!(rows[0].rounds()[0].mcq);
    assert!(rows[0].rounds()[1..].iter().all(|r| !r.mcq && !r.essay));
    assert!(error_notices(&notifier).is_empty());
}

#[tokio::test]
async fn failed_load_leaves_hierarchy_empty_and_notifies() {
    let rows = InMemoryRepository::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(UnreachableSubjects), Arc::new(rows), &notifier);

    assert!(!service.load().await);

    let snapshot = service.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.subjects.is_empty());
    assert!(snapshot.data.is_empty());

    let errors = error_notices(&notifier);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("failed to load"));
}

#[tokio::test]
async fn first_toggle_moves_progress_to_six_percent() {
    let repo = InMemoryRepository::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(repo.clone()), Arc::new(repo), &notifier);

    let key = service.add_subject("Chemistry", "⚗️").await.unwrap();
    service.add_row(&key, "2015").await;

    let snapshot = service.snapshot();
    assert_eq!(subject_progress(&snapshot.data[&key]), 0);

    let row_id = snapshot.data[&key].rows()[0].id();
    service.toggle_check(&key, row_id, 0, RoundField::Mcq).await;

    // 1 of 16 flags: round(6.25) = 6.
    assert_eq!(subject_progress(&service.snapshot().data[&key]), 6);
}

#[tokio::test]
async fn add_rows_appends_in_order_with_full_rounds() {
    let repo = InMemoryRepository::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(repo.clone()), Arc::new(repo.clone()), &notifier);

    let key = service.add_subject("Chemistry", "⚗️").await.unwrap();
    service
        .add_rows(&key, &["2015".to_owned(), "2016".to_owned()])
        .await;

    let snapshot = service.snapshot();
    let rows = snapshot.data[&key].rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name(), "2015");
    assert_eq!(rows[1].name(), "2016");
    assert!(rows.iter().all(|r| r.rounds().len() == TOTAL_ROUNDS));

    // Local ids are the store-assigned ones once the bulk insert resolves.
    let stored = repo.list_rows().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(rows[0].id(), stored[0].id);
    assert_eq!(rows[1].id(), stored[1].id);

    let info: Vec<_> = notifier
        .notices()
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Info)
        .collect();
    assert_eq!(info.len(), 1);
}

#[tokio::test]
async fn failed_bulk_insert_leaves_no_rows_behind() {
    let subjects = InMemoryRepository::new();
    let rows = FlakyRows {
        inner: InMemoryRepository::new(),
        fail_inserts: true,
        fail_updates: false,
    };
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(subjects), Arc::new(rows), &notifier);

    let key = service.add_subject("Chemistry", "⚗️").await.unwrap();
    service
        .add_rows(&key, &["2015".to_owned(), "2016".to_owned()])
        .await;

    assert!(service.snapshot().data[&key].rows().is_empty());
    assert_eq!(error_notices(&notifier).len(), 1);
}

#[tokio::test]
async fn failed_single_insert_removes_the_provisional_row() {
    let subjects = InMemoryRepository::new();
    let rows = FlakyRows {
        inner: InMemoryRepository::new(),
        fail_inserts: true,
        fail_updates: false,
    };
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(subjects), Arc::new(rows), &notifier);

    let key = service.add_subject("Chemistry", "⚗️").await.unwrap();
    service.add_row(&key, "2015").await;

    assert!(service.snapshot().data[&key].rows().is_empty());
    assert_eq!(error_notices(&notifier).len(), 1);
}

#[tokio::test]
async fn failed_toggle_write_keeps_the_local_flip() {
    let subjects = InMemoryRepository::new();
    let inner = InMemoryRepository::new();
    let rows = FlakyRows {
        inner: inner.clone(),
        fail_inserts: false,
        fail_updates: true,
    };
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(subjects), Arc::new(rows), &notifier);

    let key = service.add_subject("Chemistry", "⚗️").await.unwrap();
    service.add_row(&key, "2015").await;
    let row_id = service.snapshot().data[&key].rows()[0].id();

    service.toggle_check(&key, row_id, 2, RoundField::Essay).await;

    // Local tree reflects the flip, the store does not, and the user heard
    // about it once.
    assert!(service.snapshot().data[&key].rows()[0].rounds()[2].essay);
    assert!(!inner.list_rows().await.unwrap()[0].rounds[2].essay);
    let errors = error_notices(&notifier);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("failed to save"));
}

#[tokio::test]
async fn edit_subject_updates_store_but_never_the_key() {
    let repo = InMemoryRepository::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(repo.clone()), Arc::new(repo.clone()), &notifier);

    let key = service.add_subject("Combined Maths!!", "📐").await.unwrap();
    service.edit_subject(&key, "Applied Mathematics", "📏").await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.subjects[0].label(), "Applied Mathematics");
    assert_eq!(snapshot.subjects[0].key().as_str(), "combined-maths");

    let stored = repo.list_subjects().await.unwrap();
    assert_eq!(stored[0].label, "Applied Mathematics");
    assert_eq!(stored[0].key.as_str(), "combined-maths");
}

#[tokio::test]
async fn delete_subject_discards_rows_locally_and_in_store() {
    let repo = InMemoryRepository::new();
    let notifier = Arc::new(RecordingNotifier::new());
    let service = tracker(Arc::new(repo.clone()), Arc::new(repo.clone()), &notifier);

    let key = service.add_subject("Chemistry", "⚗️").await.unwrap();
    service
        .add_rows(&key, &["2015".to_owned(), "2016".to_owned()])
        .await;

    service.delete_subject(&key).await;

    let snapshot = service.snapshot();
    assert!(snapshot.subjects.is_empty());
    assert!(!snapshot.data.contains_key(&key));
    assert!(repo.list_subjects().await.unwrap().is_empty());
    assert!(repo.list_rows().await.unwrap().is_empty());
}
