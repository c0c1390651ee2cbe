use std::sync::Arc;

use revision_core::model::{DEFAULT_ROW_NAMES, DEFAULT_SUBJECTS};
use storage::repository::Storage;
use storage::sqlite::SqliteInitError;

use crate::notify::Notifier;
use crate::tracker_service::TrackerService;

/// Assembles the storage tier and the tracker engine.
#[derive(Clone)]
pub struct AppServices {
    tracker: Arc<TrackerService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, run the initial load, and
    /// seed the stock subjects when the store is empty.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SqliteInitError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, notifier).await)
    }

    /// Build services over in-memory storage, for tests and prototyping.
    pub async fn in_memory(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_storage(Storage::in_memory(), notifier).await
    }

    async fn with_storage(storage: Storage, notifier: Arc<dyn Notifier>) -> Self {
        let tracker = Arc::new(TrackerService::new(
            Arc::clone(&storage.subjects),
            Arc::clone(&storage.rows),
            notifier,
        ));
        if tracker.load().await {
            ensure_default_subjects(&tracker).await;
        }
        Self { tracker }
    }

    #[must_use]
    pub fn tracker(&self) -> Arc<TrackerService> {
        Arc::clone(&self.tracker)
    }
}

/// Seeds the stock subjects, each with the stock past-paper years, when a
/// fresh store loads empty.
async fn ensure_default_subjects(tracker: &TrackerService) {
    if !tracker.snapshot().subjects.is_empty() {
        return;
    }

    let names: Vec<String> = DEFAULT_ROW_NAMES.iter().map(|&n| n.to_owned()).collect();
    for (label, icon) in DEFAULT_SUBJECTS {
        if let Some(key) = tracker.add_subject(label, icon).await {
            tracker.add_rows(&key, &names).await;
        }
    }
}
