use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use revision_core::model::{SubjectId, SubjectKey};

use super::SqliteRepository;
use super::mapping::{ser, sort_order_from_i64, sort_order_to_i64, subject_id_from_text};
use crate::repository::{NewSubjectRecord, StorageError, SubjectRecord, SubjectRepository};

fn insert_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn list_subjects(&self) -> Result<Vec<SubjectRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, key, label, icon, sort_order
            FROM subjects
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            subjects.push(subject_from_row(&row)?);
        }
        Ok(subjects)
    }

    async fn insert_new_subject(
        &self,
        subject: NewSubjectRecord,
    ) -> Result<SubjectId, StorageError> {
        let id = SubjectId::generate();

        sqlx::query(
            r"
            INSERT INTO subjects (id, key, label, icon, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id.to_string())
        .bind(subject.key.as_str().to_owned())
        .bind(subject.label)
        .bind(subject.icon)
        .bind(sort_order_to_i64(subject.sort_order)?)
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;

        Ok(id)
    }

    async fn update_subject(
        &self,
        id: SubjectId,
        label: &str,
        icon: &str,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE subjects SET label = ?2, icon = ?3 WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .bind(label)
        .bind(icon)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}

fn subject_from_row(row: &SqliteRow) -> Result<SubjectRecord, StorageError> {
    Ok(SubjectRecord {
        id: subject_id_from_text(&row.try_get::<String, _>("id").map_err(ser)?)?,
        key: SubjectKey::from_persisted(row.try_get::<String, _>("key").map_err(ser)?),
        label: row.try_get::<String, _>("label").map_err(ser)?,
        icon: row.try_get::<String, _>("icon").map_err(ser)?,
        sort_order: sort_order_from_i64(row.try_get::<i64, _>("sort_order").map_err(ser)?)?,
    })
}
