//! Store type definitions

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use serde::Serialize;

/// One uploaded CSV file awaiting or having completed import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedCsv {
    pub id: i64,
    /// Target record type identifier
    pub type_id: String,
    /// Stored file path, relative to the project root
    pub csv_file: String,
    pub created: DateTime<Utc>,
    /// Comma-joined identifiers of the records created from this file
    pub result_id_list: Option<String>,
}

impl UploadedCsv {
    /// Identifiers of the records created from this upload
    pub fn result_ids(&self) -> Vec<i64> {
        self.result_id_list
            .as_deref()
            .map(|list| {
                list.split(',')
                    .filter_map(|id| id.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// File name as uploaded, without the upload location prefix
    pub fn filename(&self, upload_to: &str) -> String {
        let prefix = format!("{}/", upload_to.trim_end_matches('/'));
        self.csv_file
            .strip_prefix(&prefix)
            .unwrap_or(&self.csv_file)
            .to_string()
    }
}

/// A persisted record, fields in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub values: Vec<(String, SqlValue)>,
}

impl StoredRecord {
    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.values.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    /// Field value rendered for display; empty for null or missing
    pub fn display(&self, field: &str) -> String {
        self.get(field).map(display_value).unwrap_or_default()
    }
}

/// Render an SQLite value for tables and exports
pub fn display_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
