//! Record type schemas and the registry that maps type identifiers to them

pub mod record;
pub mod registry;

pub use record::{FieldKind, FieldSpec, RecordSchema};
pub use registry::{RecordRegistry, RecordTypeConfig, RegisteredType};

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while building record schemas
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("Invalid {what} name '{name}'")]
    #[diagnostic(
        code(csvimp::schema::invalid_name),
        help("Names must start with a letter or underscore and contain only ASCII letters, digits and underscores")
    )]
    InvalidName { what: &'static str, name: String },

    #[error("Table name '{0}' is reserved")]
    #[diagnostic(code(csvimp::schema::reserved_table))]
    ReservedTable(String),

    #[error("Record type '{type_id}' declares reserved field '{field}'")]
    #[diagnostic(
        code(csvimp::schema::reserved_field),
        help("Every record table already has an 'id' primary key")
    )]
    ReservedField { type_id: String, field: String },

    #[error("Record type '{type_id}' declares field '{field}' more than once")]
    #[diagnostic(code(csvimp::schema::duplicate_field))]
    DuplicateField { type_id: String, field: String },

    #[error("Record type '{type_id}' refers to unknown field '{field}' in '{section}'")]
    #[diagnostic(code(csvimp::schema::unknown_field))]
    UnknownField {
        type_id: String,
        section: &'static str,
        field: String,
    },

    #[error("Record type '{0}' is already registered")]
    #[diagnostic(code(csvimp::schema::already_registered))]
    AlreadyRegistered(String),
}
