//! SQLite-backed record store
//!
//! The store holds:
//! - the `uploads` table: one row per uploaded CSV (type, stored file,
//!   upload time, identifiers of the records created from it)
//! - one table per registered record type, created from its schema
//!
//! Record inserts run one statement per row with SQLite's implicit
//! transaction, so a failing row never rolls back earlier rows.

mod queries;
mod schema;
mod types;

pub use schema::create_table_sql;
pub use types::*;

use chrono::{DateTime, TimeZone, Utc};
use miette::Diagnostic;
use rusqlite::Connection;
use std::fs;
use thiserror::Error;

use crate::core::project::Project;
use crate::schema::RecordRegistry;

/// Store file location within a project
pub const STORE_FILE: &str = ".csvimp/records.db";

/// Current store layout version
const SCHEMA_VERSION: i32 = 1;

/// Errors raised by the record store
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Database error: {0}")]
    #[diagnostic(code(csvimp::store::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(code(csvimp::store::io))]
    Io(#[from] std::io::Error),

    #[error("Store layout version {found} is not supported (expected {expected})")]
    #[diagnostic(
        code(csvimp::store::version),
        help("The database was written by a different csvimp version")
    )]
    SchemaVersion { found: i32, expected: i32 },
}

/// The record store backed by SQLite
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open or create the store for a project
    pub fn open(project: &Project) -> Result<Self, StoreError> {
        let path = project.root().join(STORE_FILE);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        log::debug!("opened record store at {}", path.display());

        Self::with_connection(conn)
    }

    /// Open a throwaway store (tests, dry runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create or extend the table of every registered record type
    pub fn sync_tables(&self, registry: &RecordRegistry) -> Result<(), StoreError> {
        for (_, registered) in registry.iter() {
            self.ensure_table(registered.schema())?;
        }
        Ok(())
    }

    /// Underlying connection, for ad-hoc queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Parse a stored RFC 3339 timestamp
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, RecordSchema};
    use rusqlite::types::Value as SqlValue;
    use tempfile::tempdir;

    fn product_schema() -> RecordSchema {
        RecordSchema::new("product")
            .with_table("products")
            .with_field(FieldSpec::text("name").unique())
            .with_field(FieldSpec::float("price"))
    }

    #[test]
    fn test_store_creation_on_disk() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let store = RecordStore::open(&project).unwrap();

        assert!(project.root().join(STORE_FILE).exists());
        assert!(store.list_uploads().unwrap().is_empty());

        // Reopening keeps the layout version check happy
        drop(store);
        RecordStore::open(&project).unwrap();
    }

    #[test]
    fn test_upload_lifecycle() {
        let store = RecordStore::open_in_memory().unwrap();

        let first = store.insert_upload("product", "uploads/a.csv").unwrap();
        let second = store.insert_upload("product", "uploads/b.csv").unwrap();
        assert!(second.id > first.id);
        assert_eq!(first.result_id_list, None);

        // Newest first
        let listed = store.list_uploads().unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        store.set_result_ids(first.id, Some("3,4")).unwrap();
        let reloaded = store.get_upload(first.id).unwrap().unwrap();
        assert_eq!(reloaded.result_ids(), vec![3, 4]);

        assert!(store.delete_upload(first.id).unwrap());
        assert!(store.get_upload(first.id).unwrap().is_none());
        assert!(!store.delete_upload(first.id).unwrap());
    }

    #[test]
    fn test_record_insert_and_fetch_in_requested_order() {
        let store = RecordStore::open_in_memory().unwrap();
        let schema = product_schema();
        store.ensure_table(&schema).unwrap();

        let a = store
            .insert_record(
                &schema,
                &[
                    ("name", SqlValue::Text("A".into())),
                    ("price", SqlValue::Real(1.5)),
                ],
            )
            .unwrap();
        let b = store
            .insert_record(&schema, &[("name", SqlValue::Text("B".into()))])
            .unwrap();

        let records = store.fetch_records(&schema, &[b, a]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, b);
        assert_eq!(records[0].display("price"), "");
        assert_eq!(records[1].display("name"), "A");
        assert_eq!(records[1].display("price"), "1.5");
        assert_eq!(store.count_records(&schema).unwrap(), 2);
    }

    #[test]
    fn test_fetch_records_across_several_queries() {
        let store = RecordStore::open_in_memory().unwrap();
        let schema = RecordSchema::new("item").with_field(FieldSpec::integer("n"));
        store.ensure_table(&schema).unwrap();

        let count = queries::FETCH_CHUNK * 2 + 7;
        let ids: Vec<i64> = (0..count)
            .map(|n| {
                store
                    .insert_record(&schema, &[("n", SqlValue::Integer(n as i64))])
                    .unwrap()
            })
            .collect();

        let mut requested = ids.clone();
        requested.reverse();
        let records = store.fetch_records(&schema, &requested).unwrap();
        assert_eq!(records.len(), count);
        assert_eq!(records[0].id, ids[count - 1]);
        assert_eq!(records[count - 1].display("n"), "0");
    }

    #[test]
    fn test_unique_violation_surfaces_as_constraint_error() {
        let store = RecordStore::open_in_memory().unwrap();
        let schema = product_schema();
        store.ensure_table(&schema).unwrap();

        store
            .insert_record(&schema, &[("name", SqlValue::Text("A".into()))])
            .unwrap();
        let err = store
            .insert_record(&schema, &[("name", SqlValue::Text("A".into()))])
            .unwrap_err();
        assert_eq!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
    }

    #[test]
    fn test_ensure_table_adds_missing_columns() {
        let store = RecordStore::open_in_memory().unwrap();
        store.ensure_table(&product_schema()).unwrap();

        let extended = product_schema().with_field(FieldSpec::integer("stock"));
        store.ensure_table(&extended).unwrap();

        let id = store
            .insert_record(
                &extended,
                &[
                    ("name", SqlValue::Text("A".into())),
                    ("stock", SqlValue::Integer(7)),
                ],
            )
            .unwrap();
        let records = store.fetch_records(&extended, &[id]).unwrap();
        assert_eq!(records[0].display("stock"), "7");
    }
}
