//! Import error taxonomy
//!
//! [`ValidationError`]s are user-correctable and raised before anything is
//! persisted. [`ImportError`] adds the fatal persistence failures. Duplicate
//! rows are never errors: the bulk importer counts them.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::store::StoreError;
use crate::schema::FieldKind;

/// User-correctable problems found before persistence
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error("No file selected: {} does not exist", .0.display())]
    #[diagnostic(code(csvimp::upload::missing_file))]
    MissingFile(PathBuf),

    #[error("Wrong file extension: '{0}'")]
    #[diagnostic(
        code(csvimp::upload::extension),
        help("Only files ending in .csv can be uploaded")
    )]
    WrongExtension(String),

    #[error("Can't process file. Are you sure this is a csv file? ({0})")]
    #[diagnostic(code(csvimp::upload::parse))]
    Parse(String),

    #[error("CSV is invalid. Fieldname \"{0}\" appears more than once.")]
    #[diagnostic(code(csvimp::upload::duplicate_column))]
    DuplicateColumn(String),

    #[error("CSV is invalid. Fieldname \"{0}\" is unknown.")]
    #[diagnostic(
        code(csvimp::upload::unknown_column),
        help("This record type only accepts the columns listed under 'columns' in its declaration")
    )]
    UnknownColumn(String),

    #[error("Unknown record type '{0}'")]
    #[diagnostic(
        code(csvimp::upload::unknown_type),
        help("Run `csvimp types` to list the importable record types")
    )]
    UnknownType(String),

    #[error("Select a valid choice for column \"{column}\": '{choice}' is not one of the available choices ({available})")]
    #[diagnostic(
        code(csvimp::mapping::invalid_choice),
        help("Run `csvimp map <upload>` to see the choices for each column")
    )]
    InvalidChoice {
        column: String,
        choice: String,
        available: String,
    },

    #[error("Column \"{0}\" does not exist in this CSV")]
    #[diagnostic(code(csvimp::mapping::unknown_override))]
    UnknownOverride(String),

    #[error("{}", format_row_errors(.0))]
    #[diagnostic(code(csvimp::import::rows))]
    Rows(Vec<String>),
}

fn format_row_errors(errors: &[String]) -> String {
    let header = if errors.len() == 1 {
        "1 row failed validation".to_string()
    } else {
        format!("{} rows failed validation", errors.len())
    };
    let mut out = header;
    for e in errors {
        out.push_str("\n  ");
        out.push_str(e);
    }
    out
}

/// Failures of an import run
#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("Line {line}: integrity error: {message} (import aborted after {imported} saved record(s))")]
    #[diagnostic(code(csvimp::import::integrity))]
    Integrity {
        line: usize,
        message: String,
        imported: usize,
    },

    #[error("Line {line}: '{value}' is not a valid {kind} value for field \"{field}\" (import aborted after {imported} saved record(s))")]
    #[diagnostic(code(csvimp::import::invalid_number))]
    InvalidNumber {
        line: usize,
        field: String,
        kind: FieldKind,
        value: String,
        imported: usize,
    },

    #[error("Upload {0} not found")]
    #[diagnostic(
        code(csvimp::import::upload_not_found),
        help("Run `csvimp list` to see uploaded files")
    )]
    UploadNotFound(i64),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(csvimp::io))]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_errors_are_reported_together() {
        let err = ValidationError::Rows(vec![
            "Line 1: \"name\" is required.".to_string(),
            "Line 3: \"name\" is required.".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 rows failed validation"));
        assert!(msg.contains("Line 1"));
        assert!(msg.contains("Line 3"));
    }

    #[test]
    fn test_unknown_column_names_the_column() {
        let err = ValidationError::UnknownColumn("Colour".to_string());
        assert_eq!(err.to_string(), "CSV is invalid. Fieldname \"Colour\" is unknown.");
    }
}
