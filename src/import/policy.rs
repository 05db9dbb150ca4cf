//! Per-record-type import hooks
//!
//! A [`RecordImportPolicy`] is registered alongside each record type. Its
//! `validate` hook runs over every mapped row before anything is persisted;
//! its `transform` hook rewrites each row right before coercion.

use serde_json::Value;

use super::RowData;

/// Placeholder in declared defaults that expands to the acting user
pub const USER_PLACEHOLDER: &str = "$user";

/// Who is importing what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    pub user: String,
    pub type_id: String,
}

impl ImportContext {
    pub fn new(user: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            type_id: type_id.into(),
        }
    }
}

/// Optional hooks a record type may provide
pub trait RecordImportPolicy {
    /// Business-rule check for one mapped row; `line` counts data rows from 1
    fn validate(&self, _row: &RowData, _line: usize) -> Vec<String> {
        Vec::new()
    }

    /// Rewrite a mapped row; the result fully replaces the row
    fn transform(&self, _ctx: &ImportContext, row: RowData) -> RowData {
        row
    }
}

/// Policy with no hooks
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPolicy;

impl RecordImportPolicy for NoopPolicy {}

/// Policy built from a record type's `required` and `defaults` declarations
#[derive(Debug, Clone, Default)]
pub struct DeclaredPolicy {
    required: Vec<String>,
    defaults: Vec<(String, String)>,
}

impl DeclaredPolicy {
    pub fn new(required: Vec<String>, defaults: Vec<(String, String)>) -> Self {
        Self { required, defaults }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

impl RecordImportPolicy for DeclaredPolicy {
    fn validate(&self, row: &RowData, line: usize) -> Vec<String> {
        self.required
            .iter()
            .filter(|field| is_blank(row.get(field)))
            .map(|field| format!("Line {}: \"{}\" is required.", line, field))
            .collect()
    }

    fn transform(&self, ctx: &ImportContext, mut row: RowData) -> RowData {
        for (field, default) in &self.defaults {
            if is_blank(row.get(field)) {
                let value = if default == USER_PLACEHOLDER {
                    ctx.user.clone()
                } else {
                    default.clone()
                };
                row.insert(field.clone(), Value::String(value));
            }
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ImportContext {
        ImportContext::new("alice", "product")
    }

    #[test]
    fn test_noop_policy_is_identity() {
        let row: RowData = [("name", json!("Widget"))].into_iter().collect();
        assert!(NoopPolicy.validate(&row, 1).is_empty());
        assert_eq!(NoopPolicy.transform(&ctx(), row.clone()), row);
    }

    #[test]
    fn test_required_fields_reported_per_line() {
        let policy = DeclaredPolicy::new(vec!["name".into(), "sku".into()], Vec::new());
        let row: RowData = [("name", json!("  ")), ("sku", json!("A1"))]
            .into_iter()
            .collect();

        assert_eq!(policy.validate(&row, 4), vec!["Line 4: \"name\" is required."]);

        let row: RowData = [("name", json!("Widget"))].into_iter().collect();
        assert_eq!(policy.validate(&row, 2), vec!["Line 2: \"sku\" is required."]);
    }

    #[test]
    fn test_defaults_fill_blank_fields_and_expand_user() {
        let policy = DeclaredPolicy::new(
            Vec::new(),
            vec![
                ("currency".into(), "USD".into()),
                ("created_by".into(), USER_PLACEHOLDER.into()),
            ],
        );
        let row: RowData = [("name", json!("Widget")), ("currency", json!(""))]
            .into_iter()
            .collect();

        let row = policy.transform(&ctx(), row);
        assert_eq!(row.get_str("currency"), Some("USD"));
        assert_eq!(row.get_str("created_by"), Some("alice"));
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["name", "currency", "created_by"]);
    }

    #[test]
    fn test_defaults_keep_existing_values() {
        let policy = DeclaredPolicy::new(Vec::new(), vec![("currency".into(), "USD".into())]);
        let row: RowData = [("currency", json!("EUR"))].into_iter().collect();
        assert_eq!(policy.transform(&ctx(), row).get_str("currency"), Some("EUR"));
    }
}
