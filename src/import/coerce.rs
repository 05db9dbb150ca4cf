//! Type-directed cleanup of raw cell values

use serde_json::Value;

use super::RowData;
use crate::schema::{FieldKind, RecordSchema};

/// Thousands separator stripped from numeric cells
const THOUSANDS_SEPARATOR: char = ',';

/// Coerce a row against a schema
///
/// Fields the schema does not know are dropped, so importing a subset of
/// columns (or a transform emitting helper keys) is not an error.
pub fn coerce_row(schema: &RecordSchema, row: RowData) -> RowData {
    row.into_iter()
        .filter_map(|(name, value)| match schema.field(&name) {
            Some(field) => Some((name, coerce_value(field.kind, value))),
            None => {
                log::trace!("dropping '{}': not a field of '{}'", name, schema.type_id());
                None
            }
        })
        .collect()
}

/// Coerce a single value for a field of the given kind
///
/// Whitespace-only strings become empty. Numeric fields lose their
/// thousands separators and an empty result becomes null. Non-string values
/// pass through unchanged.
pub fn coerce_value(kind: FieldKind, value: Value) -> Value {
    let Value::String(mut s) = value else {
        return value;
    };

    if s.chars().all(char::is_whitespace) {
        s.clear();
    }

    if kind.is_numeric() {
        s.retain(|c| c != THOUSANDS_SEPARATOR);
        if s.is_empty() {
            return Value::Null;
        }
    }

    Value::String(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    #[test]
    fn test_thousands_separators_stripped() {
        assert_eq!(coerce_value(FieldKind::Integer, json!("12,345")), json!("12345"));
        assert_eq!(coerce_value(FieldKind::Float, json!("1,234.50")), json!("1234.50"));
    }

    #[test]
    fn test_empty_numeric_becomes_null() {
        assert_eq!(coerce_value(FieldKind::Integer, json!("")), Value::Null);
        assert_eq!(coerce_value(FieldKind::Float, json!("   ")), Value::Null);
        assert_eq!(coerce_value(FieldKind::Float, json!(",")), Value::Null);
    }

    #[test]
    fn test_whitespace_only_text_becomes_empty() {
        assert_eq!(coerce_value(FieldKind::Text, json!("   ")), json!(""));
        assert_eq!(coerce_value(FieldKind::Text, json!(" a b ")), json!(" a b "));
        assert_eq!(coerce_value(FieldKind::Text, json!("1,000")), json!("1,000"));
    }

    #[test]
    fn test_non_string_values_pass_through() {
        assert_eq!(coerce_value(FieldKind::Integer, json!(42)), json!(42));
        assert_eq!(coerce_value(FieldKind::Other, json!({"a": 1})), json!({"a": 1}));
        assert_eq!(coerce_value(FieldKind::Text, Value::Null), Value::Null);
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let schema = RecordSchema::new("product")
            .with_field(FieldSpec::text("name"))
            .with_field(FieldSpec::integer("qty"));
        let row: RowData = [
            ("name", json!("Widget")),
            ("colour", json!("red")),
            ("qty", json!("1,000")),
        ]
        .into_iter()
        .collect();

        let row = coerce_row(&schema, row);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["name", "qty"]);
        assert_eq!(row.get("qty"), Some(&json!("1000")));
    }
}
