use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use revision_core::model::{RoundData, RowId};

use super::SqliteRepository;
use super::mapping::{
    row_id_from_text, rounds_from_json, rounds_to_json, ser, sort_order_from_i64,
    sort_order_to_i64, subject_id_from_text,
};
use crate::repository::{NewRowRecord, RowRecord, RowRepository, StorageError};

#[async_trait::async_trait]
impl RowRepository for SqliteRepository {
    async fn list_rows(&self) -> Result<Vec<RowRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, subject_id, name, rounds, sort_order
            FROM practice_rows
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(row_from_row(&row)?);
        }
        Ok(records)
    }

    async fn insert_new_row(&self, row: NewRowRecord) -> Result<RowId, StorageError> {
        let id = RowId::generate();

        sqlx::query(
            r"
            INSERT INTO practice_rows (id, subject_id, name, rounds, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id.to_string())
        .bind(row.subject_id.to_string())
        .bind(row.name)
        .bind(rounds_to_json(&row.rounds)?)
        .bind(sort_order_to_i64(row.sort_order)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(id)
    }

    async fn insert_new_rows(&self, rows: Vec<NewRowRecord>) -> Result<Vec<RowId>, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id = RowId::generate();
            sqlx::query(
                r"
                INSERT INTO practice_rows (id, subject_id, name, rounds, sort_order)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(id.to_string())
            .bind(row.subject_id.to_string())
            .bind(row.name)
            .bind(rounds_to_json(&row.rounds)?)
            .bind(sort_order_to_i64(row.sort_order)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(ids)
    }

    async fn update_row_rounds(
        &self,
        id: RowId,
        rounds: &[RoundData],
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE practice_rows SET rounds = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(rounds_to_json(rounds)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn update_row_name(&self, id: RowId, name: &str) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE practice_rows SET name = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_row(&self, id: RowId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM practice_rows WHERE id = ?1")
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

fn row_from_row(row: &SqliteRow) -> Result<RowRecord, StorageError> {
    Ok(RowRecord {
        id: row_id_from_text(&row.try_get::<String, _>("id").map_err(ser)?)?,
        subject_id: subject_id_from_text(&row.try_get::<String, _>("subject_id").map_err(ser)?)?,
        name: row.try_get::<String, _>("name").map_err(ser)?,
        rounds: rounds_from_json(&row.try_get::<String, _>("rounds").map_err(ser)?),
        sort_order: sort_order_from_i64(row.try_get::<i64, _>("sort_order").map_err(ser)?)?,
    })
}
