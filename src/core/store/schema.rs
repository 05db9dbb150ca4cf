//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{RecordStore, StoreError, SCHEMA_VERSION};
use crate::schema::record::{quote_ident, ID_COLUMN};
use crate::schema::RecordSchema;

impl RecordStore {
    /// Initialize the store's own tables
    pub(super) fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            -- Layout version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Uploaded CSV files
            CREATE TABLE IF NOT EXISTS uploads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type_id TEXT NOT NULL,
                csv_file TEXT NOT NULL,
                created TEXT NOT NULL,
                result_id_list TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_uploads_type ON uploads(type_id);
            "#,
        )?;

        let version: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match version {
            None => {
                self.conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(found) if found != SCHEMA_VERSION => {
                return Err(StoreError::SchemaVersion {
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Create the table for a record type, adding columns it lacks
    ///
    /// Columns added to an existing table only get their type; UNIQUE and
    /// NOT NULL cannot be added by ALTER TABLE.
    pub fn ensure_table(&self, schema: &RecordSchema) -> Result<(), StoreError> {
        self.conn.execute_batch(&create_table_sql(schema))?;

        let existing = self.table_columns(schema.table())?;
        for field in schema.fields() {
            if existing.iter().any(|c| c == &field.name) {
                continue;
            }
            if field.unique || !field.nullable {
                log::warn!(
                    "column '{}' added to existing table '{}' without its constraints",
                    field.name,
                    schema.table()
                );
            }
            self.conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                quote_ident(schema.table()),
                quote_ident(&field.name),
                field.kind.sql_type()
            ))?;
            log::info!("added column '{}' to table '{}'", field.name, schema.table());
        }

        Ok(())
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }
}

/// CREATE TABLE statement for a record type
pub fn create_table_sql(schema: &RecordSchema) -> String {
    let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", ID_COLUMN)];
    columns.extend(schema.fields().iter().map(|f| f.column_sql()));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        quote_ident(schema.table()),
        columns.join(",\n    ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    #[test]
    fn test_create_table_sql() {
        let schema = RecordSchema::new("product")
            .with_field(FieldSpec::text("name").unique().not_null())
            .with_field(FieldSpec::float("price"));

        insta::assert_snapshot!(create_table_sql(&schema), @r#"
        CREATE TABLE IF NOT EXISTS "product" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            "name" TEXT NOT NULL UNIQUE,
            "price" REAL
        );
        "#);
    }
}
