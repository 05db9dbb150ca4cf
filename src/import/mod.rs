//! CSV import pipeline
//!
//! normalize → map → transform → coerce → persist. Each stage lives in its
//! own module; [`service::ImportService`] strings them together for one
//! upload.

pub mod bulk;
pub mod coerce;
pub mod error;
pub mod mapping;
pub mod normalize;
pub mod notify;
pub mod policy;
pub mod service;

pub use bulk::{BulkImporter, ImportResult, ResultPolicy, RowOutcome};
pub use error::{ImportError, ValidationError};
pub use mapping::{ColumnMapping, ColumnProposal, ColumnTransform, FieldChoice};
pub use normalize::{CsvDocument, CsvRow};
pub use notify::{CollectingSink, Notice, NoticeLevel, NotificationSink};
pub use policy::{DeclaredPolicy, ImportContext, NoopPolicy, RecordImportPolicy};
pub use service::ImportService;

use serde_json::Value;

/// Order-preserving `field name → value` map for one row
///
/// Lookups are by name, iteration follows insertion order. Inserting an
/// existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    entries: Vec<(String, Value)>,
}

impl RowData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value of a field, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.entries.retain(|(k, v)| keep(k, v));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RowData {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = RowData::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl IntoIterator for RowData {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_data_preserves_order_and_replaces_in_place() {
        let mut row = RowData::new();
        row.insert("b", json!("1"));
        row.insert("a", json!("2"));
        row.insert("b", json!("3"));

        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(row.get_str("b"), Some("3"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_row_data_remove_and_retain() {
        let mut row: RowData = [("a", json!("1")), ("b", json!(null)), ("c", json!("3"))]
            .into_iter()
            .collect();
        assert_eq!(row.remove("a"), Some(json!("1")));
        assert!(!row.contains_key("a"));

        row.retain(|_, v| !v.is_null());
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["c"]);
    }
}
