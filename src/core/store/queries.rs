//! Upload bookkeeping and record persistence queries

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::collections::HashMap;

use super::{parse_datetime, RecordStore, StoreError, StoredRecord, UploadedCsv};
use crate::schema::record::{quote_ident, ID_COLUMN};
use crate::schema::RecordSchema;

const UPLOAD_COLUMNS: &str = "id, type_id, csv_file, created, result_id_list";

/// Identifiers bound per `IN (...)` query, well under SQLite's variable limit
pub(crate) const FETCH_CHUNK: usize = 500;

fn upload_from_row(row: &Row<'_>) -> rusqlite::Result<UploadedCsv> {
    Ok(UploadedCsv {
        id: row.get(0)?,
        type_id: row.get(1)?,
        csv_file: row.get(2)?,
        created: parse_datetime(row.get::<_, String>(3)?),
        result_id_list: row.get(4)?,
    })
}

impl RecordStore {
    /// Record a newly stored upload
    pub fn insert_upload(&self, type_id: &str, csv_file: &str) -> Result<UploadedCsv, StoreError> {
        let created = Utc::now();
        self.conn.execute(
            "INSERT INTO uploads (type_id, csv_file, created) VALUES (?1, ?2, ?3)",
            params![type_id, csv_file, created.to_rfc3339()],
        )?;

        Ok(UploadedCsv {
            id: self.conn.last_insert_rowid(),
            type_id: type_id.to_string(),
            csv_file: csv_file.to_string(),
            created,
            result_id_list: None,
        })
    }

    pub fn get_upload(&self, id: i64) -> Result<Option<UploadedCsv>, StoreError> {
        let upload = self
            .conn
            .query_row(
                &format!("SELECT {} FROM uploads WHERE id = ?1", UPLOAD_COLUMNS),
                params![id],
                upload_from_row,
            )
            .optional()?;
        Ok(upload)
    }

    /// All uploads, newest first
    pub fn list_uploads(&self) -> Result<Vec<UploadedCsv>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM uploads ORDER BY id DESC", UPLOAD_COLUMNS))?;
        let uploads = stmt
            .query_map([], upload_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(uploads)
    }

    /// Write the comma-joined identifiers of the records created from an upload
    pub fn set_result_ids(&self, id: i64, result_id_list: Option<&str>) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE uploads SET result_id_list = ?1 WHERE id = ?2",
            params![result_id_list, id],
        )?;
        Ok(())
    }

    /// Delete an upload row; returns whether it existed
    pub fn delete_upload(&self, id: i64) -> Result<bool, StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM uploads WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// Insert one record and return its identifier
    ///
    /// The raw SQLite error is returned so callers can tell uniqueness
    /// violations from other failures.
    pub fn insert_record(
        &self,
        schema: &RecordSchema,
        values: &[(&str, SqlValue)],
    ) -> rusqlite::Result<i64> {
        let table = quote_ident(schema.table());
        if values.is_empty() {
            self.conn
                .execute(&format!("INSERT INTO {} DEFAULT VALUES", table), [])?;
        } else {
            let columns: Vec<String> = values.iter().map(|(name, _)| quote_ident(name)).collect();
            let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            );
            self.conn
                .execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
        }
        Ok(self.conn.last_insert_rowid())
    }

    /// Fetch records by identifier, in the order the identifiers are given
    pub fn fetch_records(
        &self,
        schema: &RecordSchema,
        ids: &[i64],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let fields: Vec<&str> = schema.field_names().collect();
        let mut select = vec![ID_COLUMN.to_string()];
        select.extend(fields.iter().map(|f| quote_ident(f)));

        let mut by_id: HashMap<i64, StoredRecord> = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(FETCH_CHUNK) {
            let placeholders: Vec<String> =
                (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {} FROM {} WHERE {} IN ({})",
                select.join(", "),
                quote_ident(schema.table()),
                ID_COLUMN,
                placeholders.join(", ")
            );

            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                let id: i64 = row.get(0)?;
                let mut values = Vec::with_capacity(fields.len());
                for (i, field) in fields.iter().enumerate() {
                    values.push((field.to_string(), row.get::<_, SqlValue>(i + 1)?));
                }
                Ok((id, StoredRecord { id, values }))
            })?;
            for row in rows {
                let (id, record) = row?;
                by_id.insert(id, record);
            }
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    pub fn count_records(&self, schema: &RecordSchema) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(schema.table())),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
