//! Record schema descriptors
//!
//! A [`RecordSchema`] is the explicit description of one record type: the
//! table it lives in and its ordered list of fields with their coarse kinds.
//! The mapper, coercer and bulk importer all work from this descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SchemaError;

/// Name of the implicit primary key column present on every record table
pub const ID_COLUMN: &str = "id";

/// Coarse field kind used to drive value coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text
    #[default]
    Text,
    /// Whole numbers
    Integer,
    /// Floating point numbers
    Float,
    /// Anything else; values are stored as given
    Other,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Other => "other",
        }
    }

    /// Integer and float fields get thousands-separator cleanup
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float)
    }

    /// SQLite column type (affinity) for this kind
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Integer => "INTEGER",
            FieldKind::Float => "REAL",
            FieldKind::Other => "BLOB",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" | "char" => Ok(FieldKind::Text),
            "integer" | "int" => Ok(FieldKind::Integer),
            "float" | "real" | "decimal" => Ok(FieldKind::Float),
            "other" => Ok(FieldKind::Other),
            _ => Err(format!(
                "Invalid field kind: '{}'. Use text, integer, float or other",
                s
            )),
        }
    }
}

fn default_nullable() -> bool {
    true
}

/// One persistable field of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    #[serde(default)]
    pub kind: FieldKind,

    /// Backed by a UNIQUE constraint; violations are counted as duplicates
    #[serde(default)]
    pub unique: bool,

    /// When false the column is NOT NULL and a null value aborts the import
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unique: false,
            nullable: true,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn other(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Other)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Column definition used in CREATE TABLE
    pub fn column_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.kind.sql_type());
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

/// Ordered schema of one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    type_id: String,
    table: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Create an empty schema whose table is named after the type
    pub fn new(type_id: impl Into<String>) -> Self {
        let type_id = type_id.into();
        Self {
            table: type_id.clone(),
            type_id,
            fields: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check that the table and every field name are safe SQL identifiers
    pub fn validate(&self) -> Result<(), SchemaError> {
        if !is_identifier(&self.table) {
            return Err(SchemaError::InvalidName {
                what: "table",
                name: self.table.clone(),
            });
        }
        if RESERVED_TABLES.contains(&self.table.as_str()) || self.table.starts_with("sqlite_") {
            return Err(SchemaError::ReservedTable(self.table.clone()));
        }

        for (idx, field) in self.fields.iter().enumerate() {
            if !is_identifier(&field.name) {
                return Err(SchemaError::InvalidName {
                    what: "field",
                    name: field.name.clone(),
                });
            }
            if field.name.eq_ignore_ascii_case(ID_COLUMN) {
                return Err(SchemaError::ReservedField {
                    type_id: self.type_id.clone(),
                    field: field.name.clone(),
                });
            }
            if self.fields[..idx].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    type_id: self.type_id.clone(),
                    field: field.name.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Tables owned by the store itself
const RESERVED_TABLES: &[&str] = &["uploads", "schema_version"];

/// ASCII identifier: letter or underscore, then letters, digits, underscores
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quote an identifier for SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
