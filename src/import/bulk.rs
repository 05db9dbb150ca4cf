//! Bulk record creation
//!
//! One record per row. A uniqueness violation marks the row as a duplicate
//! and the run continues; any other failure aborts the remaining rows.

use rusqlite::ffi;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::coerce::coerce_row;
use super::error::{ImportError, ValidationError};
use super::mapping::ColumnMapping;
use super::normalize::CsvDocument;
use super::policy::ImportContext;
use super::RowData;
use crate::core::store::RecordStore;
use crate::schema::{FieldKind, RecordSchema, RegisteredType};

/// What happens to the upload record once its rows are imported
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ResultPolicy {
    /// Keep the upload and store the created identifiers on it
    #[default]
    KeepWithResults,
    /// Delete the upload and its stored file
    DeleteAfterImport,
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates: usize,
    /// Identifiers of the created records, in input order
    pub created_ids: Vec<i64>,
}

impl ImportResult {
    /// Comma-joined identifiers, or `None` when nothing was created
    pub fn id_list(&self) -> Option<String> {
        if self.created_ids.is_empty() {
            return None;
        }
        Some(
            self.created_ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    pub fn imported_message(&self) -> Option<String> {
        (self.imported > 0).then(|| format!("Successfully imported {} records.", self.imported))
    }

    pub fn duplicates_message(&self) -> Option<String> {
        (self.duplicates > 0).then(|| {
            format!(
                "{} records skipped because of duplication.",
                self.duplicates
            )
        })
    }
}

/// What a bulk run saved, and the fatal error that stopped it early
#[derive(Debug)]
pub struct BulkRun {
    pub result: ImportResult,
    pub aborted: Option<ImportError>,
}

impl BulkRun {
    pub fn into_result(self) -> Result<ImportResult, ImportError> {
        match self.aborted {
            Some(e) => Err(e),
            None => Ok(self.result),
        }
    }
}

/// Result of persisting one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Created(i64),
    Duplicate,
}

/// Whether an SQLite error is a UNIQUE or PRIMARY KEY violation
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
}

/// Convert a coerced value into an SQLite value for a field kind
///
/// Returns `None` when a numeric field holds text that is not a number.
pub fn sql_value(kind: FieldKind, value: &Value) -> Option<SqlValue> {
    let converted = match (kind, value) {
        (_, Value::Null) => SqlValue::Null,
        (FieldKind::Integer, Value::String(s)) => SqlValue::Integer(s.trim().parse().ok()?),
        (FieldKind::Float, Value::String(s)) => SqlValue::Real(s.trim().parse().ok()?),
        (_, Value::String(s)) => SqlValue::Text(s.clone()),
        (FieldKind::Text, Value::Number(n)) => SqlValue::Text(n.to_string()),
        (FieldKind::Float, Value::Number(n)) => SqlValue::Real(n.as_f64()?),
        (_, Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64()?),
        },
        (FieldKind::Text, Value::Bool(b)) => SqlValue::Text(b.to_string()),
        (_, Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        (_, other) => SqlValue::Text(other.to_string()),
    };
    Some(converted)
}

/// Imports the rows of one document into one record type
pub struct BulkImporter<'a> {
    store: &'a RecordStore,
    registered: &'a RegisteredType,
    ctx: &'a ImportContext,
}

impl<'a> BulkImporter<'a> {
    pub fn new(
        store: &'a RecordStore,
        registered: &'a RegisteredType,
        ctx: &'a ImportContext,
    ) -> Self {
        Self {
            store,
            registered,
            ctx,
        }
    }

    fn schema(&self) -> &RecordSchema {
        self.registered.schema()
    }

    /// Run the validation hook over every row, collecting all messages
    pub fn validate_rows(
        &self,
        doc: &CsvDocument,
        mapping: &ColumnMapping,
    ) -> Result<(), ImportError> {
        let policy = self.registered.policy();
        let mut errors = Vec::new();

        for row in doc.rows() {
            let row = row?;
            errors.extend(policy.validate(&mapping.assemble(&row), row.line));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            log::debug!("{} validation message(s) for '{}'", errors.len(), self.ctx.type_id);
            Err(ValidationError::Rows(errors).into())
        }
    }

    /// Create one record per row
    ///
    /// Stops at the first fatal error. Rows saved before it stay persisted
    /// and are counted in the returned [`BulkRun`].
    pub fn run(&self, doc: &CsvDocument, mapping: &ColumnMapping) -> BulkRun {
        let policy = self.registered.policy();
        let mut result = ImportResult::default();
        let mut aborted = None;

        for row in doc.rows() {
            let outcome = row.map_err(ImportError::from).and_then(|row| {
                let data = policy.transform(self.ctx, mapping.assemble(&row));
                let data = coerce_row(self.schema(), data);
                self.persist_row(row.line, &data, result.imported)
                    .map(|outcome| (row.line, outcome))
            });

            match outcome {
                Ok((_, RowOutcome::Created(id))) => {
                    result.imported += 1;
                    result.created_ids.push(id);
                }
                Ok((line, RowOutcome::Duplicate)) => {
                    log::debug!("line {}: duplicate, skipped", line);
                    result.duplicates += 1;
                }
                Err(e) => {
                    log::warn!("import of '{}' aborted: {}", self.ctx.type_id, e);
                    aborted = Some(e);
                    break;
                }
            }
        }

        log::info!(
            "imported {} '{}' record(s), {} duplicate(s)",
            result.imported,
            self.ctx.type_id,
            result.duplicates
        );
        BulkRun { result, aborted }
    }

    /// Persist one coerced row
    ///
    /// `imported` is the number of records saved so far; it is carried in
    /// fatal errors so the caller can report what was kept.
    pub fn persist_row(
        &self,
        line: usize,
        data: &RowData,
        imported: usize,
    ) -> Result<RowOutcome, ImportError> {
        let schema = self.schema();
        let mut values: Vec<(&str, SqlValue)> = Vec::with_capacity(data.len());

        for (name, value) in data.iter() {
            let Some(field) = schema.field(name) else {
                continue;
            };
            let converted = sql_value(field.kind, value).ok_or_else(|| ImportError::InvalidNumber {
                line,
                field: name.to_string(),
                kind: field.kind,
                value: value.as_str().map(String::from).unwrap_or_else(|| value.to_string()),
                imported,
            })?;
            values.push((field.name.as_str(), converted));
        }

        match self.store.insert_record(schema, &values) {
            Ok(id) => Ok(RowOutcome::Created(id)),
            Err(e) if is_unique_violation(&e) => Ok(RowOutcome::Duplicate),
            Err(e) if is_constraint_violation(&e) => Err(ImportError::Integrity {
                line,
                message: e.to_string(),
                imported,
            }),
            Err(e) => Err(ImportError::Store(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::mapping::{propose, ColumnTransform, ColumnTranslator};
    use crate::import::policy::{DeclaredPolicy, NoopPolicy};
    use crate::schema::{FieldSpec, RecordRegistry};
    use serde_json::json;

    fn registry() -> RecordRegistry {
        let mut registry = RecordRegistry::new();
        registry
            .register(
                RecordSchema::new("product")
                    .with_field(FieldSpec::text("name").unique())
                    .with_field(FieldSpec::float("price"))
                    .with_field(FieldSpec::integer("stock").not_null()),
                None,
                Box::new(DeclaredPolicy::new(
                    Vec::new(),
                    vec![("stock".to_string(), "0".to_string())],
                )),
            )
            .unwrap();
        registry
    }

    fn setup() -> (RecordStore, RecordRegistry) {
        let store = RecordStore::open_in_memory().unwrap();
        let registry = registry();
        store.sync_tables(&registry).unwrap();
        (store, registry)
    }

    fn mapping_for(registered: &RegisteredType, doc: &CsvDocument) -> ColumnMapping {
        let translator = ColumnTranslator::Transform(ColumnTransform::LowerSnake);
        ColumnMapping::from_proposals(&propose(registered.schema(), &translator, doc.columns()))
    }

    #[test]
    fn test_duplicates_skipped_and_ids_in_input_order() {
        let (store, registry) = setup();
        let registered = registry.get("product").unwrap();
        let ctx = ImportContext::new("tester", "product");
        let doc =
            CsvDocument::parse(b"Name,Price\nWidget,\"1,200.50\"\nWidget,3\nGadget,\n").unwrap();

        let importer = BulkImporter::new(&store, registered, &ctx);
        let result = importer
            .run(&doc, &mapping_for(registered, &doc))
            .into_result()
            .unwrap();

        assert_eq!(result.imported, 2);
        assert_eq!(result.duplicates, 1);
        assert_eq!(result.created_ids.len(), 2);
        assert!(result.created_ids[0] < result.created_ids[1]);

        let records = store
            .fetch_records(registered.schema(), &result.created_ids)
            .unwrap();
        assert_eq!(records[0].display("name"), "Widget");
        assert_eq!(records[0].get("price"), Some(&SqlValue::Real(1200.5)));
        assert_eq!(records[0].get("stock"), Some(&SqlValue::Integer(0)));
        assert_eq!(records[1].display("name"), "Gadget");
        assert_eq!(records[1].get("price"), Some(&SqlValue::Null));
    }

    #[test]
    fn test_non_unique_constraint_aborts_remaining_rows() {
        let store = RecordStore::open_in_memory().unwrap();
        let mut registry = RecordRegistry::new();
        registry
            .register(
                RecordSchema::new("item")
                    .with_field(FieldSpec::text("name"))
                    .with_field(FieldSpec::integer("qty").not_null()),
                None,
                Box::new(NoopPolicy),
            )
            .unwrap();
        store.sync_tables(&registry).unwrap();
        let registered = registry.get("item").unwrap();
        let ctx = ImportContext::new("tester", "item");

        let doc = CsvDocument::parse(b"Name,Qty\na,1\nb,\nc,3\n").unwrap();
        let importer = BulkImporter::new(&store, registered, &ctx);
        let run = importer.run(&doc, &mapping_for(registered, &doc));

        assert!(matches!(
            run.aborted,
            Some(ImportError::Integrity {
                line: 2,
                imported: 1,
                ..
            })
        ));
        // Row 1 stays and is reported, row 3 was never attempted
        assert_eq!(run.result.imported, 1);
        assert_eq!(run.result.created_ids.len(), 1);
        assert_eq!(store.count_records(registered.schema()).unwrap(), 1);
    }

    #[test]
    fn test_unparsable_number_is_fatal() {
        let (store, registry) = setup();
        let registered = registry.get("product").unwrap();
        let ctx = ImportContext::new("tester", "product");
        let doc = CsvDocument::parse(b"Name,Price\nWidget,cheap\n").unwrap();

        let err = BulkImporter::new(&store, registered, &ctx)
            .run(&doc, &mapping_for(registered, &doc))
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidNumber { ref field, ref value, .. } if field == "price" && value == "cheap"
        ));
    }

    #[test]
    fn test_validate_rows_collects_every_message() {
        let store = RecordStore::open_in_memory().unwrap();
        let mut registry = RecordRegistry::new();
        registry
            .register(
                RecordSchema::new("person").with_field(FieldSpec::text("name")),
                None,
                Box::new(DeclaredPolicy::new(vec!["name".to_string()], Vec::new())),
            )
            .unwrap();
        store.sync_tables(&registry).unwrap();
        let registered = registry.get("person").unwrap();
        let ctx = ImportContext::new("tester", "person");

        let doc = CsvDocument::parse(b"Name\n\"\"\nBob\n  \n").unwrap();
        let err = BulkImporter::new(&store, registered, &ctx)
            .validate_rows(&doc, &mapping_for(registered, &doc))
            .unwrap_err();

        match err {
            ImportError::Validation(ValidationError::Rows(messages)) => {
                assert_eq!(
                    messages,
                    vec![
                        "Line 1: \"name\" is required.",
                        "Line 3: \"name\" is required."
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.count_records(registered.schema()).unwrap(), 0);
    }

    #[test]
    fn test_sql_value_conversion() {
        assert_eq!(sql_value(FieldKind::Integer, &json!("12345")), Some(SqlValue::Integer(12345)));
        assert_eq!(sql_value(FieldKind::Integer, &json!("1.5")), None);
        assert_eq!(sql_value(FieldKind::Float, &json!(" 2.5 ")), Some(SqlValue::Real(2.5)));
        assert_eq!(sql_value(FieldKind::Text, &json!(7)), Some(SqlValue::Text("7".into())));
        assert_eq!(sql_value(FieldKind::Other, &json!(true)), Some(SqlValue::Integer(1)));
        assert_eq!(sql_value(FieldKind::Float, &Value::Null), Some(SqlValue::Null));
    }

    #[test]
    fn test_result_messages_and_id_list() {
        let result = ImportResult {
            imported: 2,
            duplicates: 1,
            created_ids: vec![4, 6],
        };
        assert_eq!(result.id_list().as_deref(), Some("4,6"));
        assert_eq!(
            result.imported_message().as_deref(),
            Some("Successfully imported 2 records.")
        );
        assert_eq!(
            result.duplicates_message().as_deref(),
            Some("1 records skipped because of duplication.")
        );
        assert_eq!(ImportResult::default().id_list(), None);
        assert_eq!(ImportResult::default().imported_message(), None);
    }
}
