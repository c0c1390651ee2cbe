//! Client for a hosted, PostgREST-style collection service.
//!
//! The service exposes the two collections (`subjects`, `practice_rows`)
//! with server-assigned ids; this adapter maps them onto the repository
//! contracts.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use revision_core::model::{RoundData, RowId, SubjectId, SubjectKey};

use crate::repository::{
    NewRowRecord, NewSubjectRecord, RowRecord, RowRepository, Storage, StorageError,
    SubjectRecord, SubjectRepository,
};

const SUBJECTS: &str = "subjects";
const PRACTICE_ROWS: &str = "practice_rows";

#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RestConfig {
    /// Reads the service location from the environment.
    ///
    /// Returns `None` unless both `REVISION_API_URL` and `REVISION_API_KEY`
    /// are set and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("REVISION_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_key = env::var("REVISION_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, api_key })
    }
}

#[derive(Clone)]
pub struct RestRepository {
    client: Client,
    config: RestConfig,
}

impl RestRepository {
    #[must_use]
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{collection}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }
}

fn http(e: reqwest::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn status_err(status: StatusCode) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict,
        status => StorageError::Connection(format!("unexpected status {status}")),
    }
}

fn check(response: &reqwest::Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(status_err(status))
    }
}

#[async_trait]
impl SubjectRepository for RestRepository {
    async fn list_subjects(&self) -> Result<Vec<SubjectRecord>, StorageError> {
        let response = self
            .authorized(self.client.get(self.collection_url(SUBJECTS)))
            .query(&[("select", "*"), ("order", "sort_order.asc")])
            .send()
            .await
            .map_err(http)?;
        check(&response)?;

        let subjects: Vec<SubjectWire> = response.json().await.map_err(http)?;
        Ok(subjects.into_iter().map(SubjectWire::into_record).collect())
    }

    async fn insert_new_subject(
        &self,
        subject: NewSubjectRecord,
    ) -> Result<SubjectId, StorageError> {
        let payload = [NewSubjectWire {
            key: subject.key.as_str(),
            label: &subject.label,
            icon: &subject.icon,
            sort_order: subject.sort_order,
        }];
        let response = self
            .authorized(self.client.post(self.collection_url(SUBJECTS)))
            .header("Prefer", "return=representation")
            .json(&payload)
            .send()
            .await
            .map_err(http)?;
        check(&response)?;

        let inserted: Vec<SubjectWire> = response.json().await.map_err(http)?;
        inserted
            .into_iter()
            .next()
            .map(|wire| wire.id)
            .ok_or_else(|| StorageError::Serialization("empty insert response".into()))
    }

    async fn update_subject(
        &self,
        id: SubjectId,
        label: &str,
        icon: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .authorized(self.client.patch(self.collection_url(SUBJECTS)))
            .query(&[("id", format!("eq.{id}"))])
            .json(&SubjectPatch { label, icon })
            .send()
            .await
            .map_err(http)?;
        check(&response)
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let response = self
            .authorized(self.client.delete(self.collection_url(SUBJECTS)))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(http)?;
        check(&response)
    }
}

#[async_trait]
impl RowRepository for RestRepository {
    async fn list_rows(&self) -> Result<Vec<RowRecord>, StorageError> {
        let response = self
            .authorized(self.client.get(self.collection_url(PRACTICE_ROWS)))
            .query(&[("select", "*"), ("order", "sort_order.asc")])
            .send()
            .await
            .map_err(http)?;
        check(&response)?;

        let rows: Vec<RowWire> = response.json().await.map_err(http)?;
        Ok(rows.into_iter().map(RowWire::into_record).collect())
    }

    async fn insert_new_row(&self, row: NewRowRecord) -> Result<RowId, StorageError> {
        let ids = self.insert_new_rows(vec![row]).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StorageError::Serialization("empty insert response".into()))
    }

    async fn insert_new_rows(&self, rows: Vec<NewRowRecord>) -> Result<Vec<RowId>, StorageError> {
        let submitted = rows.len();
        let payload: Vec<NewRowWire<'_>> = rows
            .iter()
            .map(|row| NewRowWire {
                subject_id: row.subject_id,
                name: &row.name,
                rounds: &row.rounds,
                sort_order: row.sort_order,
            })
            .collect();

        let response = self
            .authorized(self.client.post(self.collection_url(PRACTICE_ROWS)))
            .header("Prefer", "return=representation")
            .json(&payload)
            .send()
            .await
            .map_err(http)?;
        check(&response)?;

        let inserted: Vec<RowWire> = response.json().await.map_err(http)?;
        if inserted.len() != submitted {
            return Err(StorageError::Serialization(format!(
                "expected {submitted} inserted rows, got {}",
                inserted.len()
            )));
        }
        Ok(inserted.into_iter().map(|wire| wire.id).collect())
    }

    async fn update_row_rounds(
        &self,
        id: RowId,
        rounds: &[RoundData],
    ) -> Result<(), StorageError> {
        let response = self
            .authorized(self.client.patch(self.collection_url(PRACTICE_ROWS)))
            .query(&[("id", format!("eq.{id}"))])
            .json(&RoundsPatch { rounds })
            .send()
            .await
            .map_err(http)?;
        check(&response)
    }

    async fn update_row_name(&self, id: RowId, name: &str) -> Result<(), StorageError> {
        let response = self
            .authorized(self.client.patch(self.collection_url(PRACTICE_ROWS)))
            .query(&[("id", format!("eq.{id}"))])
            .json(&NamePatch { name })
            .send()
            .await
            .map_err(http)?;
        check(&response)
    }

    async fn delete_row(&self, id: RowId) -> Result<(), StorageError> {
        let response = self
            .authorized(self.client.delete(self.collection_url(PRACTICE_ROWS)))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(http)?;
        check(&response)
    }
}

impl Storage {
    /// Build a `Storage` backed by the hosted collection service.
    #[must_use]
    pub fn rest(config: RestConfig) -> Self {
        let repo = RestRepository::new(config);
        let subjects: Arc<dyn SubjectRepository> = Arc::new(repo.clone());
        let rows: Arc<dyn RowRepository> = Arc::new(repo);
        Self { subjects, rows }
    }
}

// ─── Wire Shapes ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SubjectWire {
    id: SubjectId,
    key: String,
    label: String,
    icon: String,
    #[serde(default)]
    sort_order: usize,
}

impl SubjectWire {
    fn into_record(self) -> SubjectRecord {
        SubjectRecord {
            id: self.id,
            key: SubjectKey::from_persisted(self.key),
            label: self.label,
            icon: self.icon,
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewSubjectWire<'a> {
    key: &'a str,
    label: &'a str,
    icon: &'a str,
    sort_order: usize,
}

#[derive(Debug, Deserialize)]
struct RowWire {
    id: RowId,
    subject_id: SubjectId,
    name: String,
    #[serde(default)]
    rounds: serde_json::Value,
    #[serde(default)]
    sort_order: usize,
}

impl RowWire {
    fn into_record(self) -> RowRecord {
        RowRecord {
            id: self.id,
            subject_id: self.subject_id,
            name: self.name,
            rounds: decode_rounds(self.rounds),
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewRowWire<'a> {
    subject_id: SubjectId,
    name: &'a str,
    rounds: &'a [RoundData],
    sort_order: usize,
}

#[derive(Debug, Serialize)]
struct SubjectPatch<'a> {
    label: &'a str,
    icon: &'a str,
}

#[derive(Debug, Serialize)]
struct RoundsPatch<'a> {
    rounds: &'a [RoundData],
}

#[derive(Debug, Serialize)]
struct NamePatch<'a> {
    name: &'a str,
}

// Missing or malformed rounds decode as an empty list; the engine pads it
// back to the expected length on load.
fn decode_rounds(value: serde_json::Value) -> Vec<RoundData> {
    match serde_json::from_value(value) {
        Ok(rounds) => rounds,
        Err(err) => {
            log::debug!("ignoring malformed rounds payload: {err}");
            Vec::new()
        }
    }
}
