//! Shared helper functions for CLI commands
//!
//! [`Session`] opens everything a command needs from the discovered project;
//! the formatting helpers keep list output consistent across commands.

use chrono::{DateTime, Local, Utc};
use console::style;
use miette::Result;
use rusqlite::types::Value as SqlValue;

use crate::cli::GlobalOpts;
use crate::core::{Config, ImporterSettings, Project, RecordStore, UploadStorage};
use crate::import::{ImportService, NotificationSink};
use crate::schema::RecordRegistry;

/// Everything a command needs to work on a project
pub struct Session {
    pub project: Project,
    pub config: Config,
    pub registry: RecordRegistry,
    pub settings: ImporterSettings,
    pub store: RecordStore,
    pub storage: UploadStorage,
}

impl Session {
    /// Discover the project, load its config and open the store
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = match &global.project {
            Some(path) => Project::discover_from(path),
            None => Project::discover(),
        }
        .map_err(|e| miette::miette!("{}", e))?;

        let config = Config::load(&project)?;
        let registry = config.registry()?;
        let settings = config.settings();

        let store = RecordStore::open(&project)?;
        store.sync_tables(&registry)?;
        let storage = UploadStorage::new(project.root(), settings.upload_to.clone());

        Ok(Self {
            project,
            config,
            registry,
            settings,
            store,
            storage,
        })
    }

    pub fn service(&self) -> ImportService<'_> {
        ImportService::new(&self.store, &self.registry, &self.storage, &self.settings)
    }
}

/// Prints import notices as styled lines
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl NotificationSink for ConsoleSink {
    fn info(&mut self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    fn warning(&mut self, message: &str) {
        println!("{} {}", style("!").yellow(), style(message).yellow());
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Format a stored timestamp in local time
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// JSON rendering of a stored value
pub fn sql_to_json(value: &SqlValue) -> serde_json::Value {
    match value {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Integer(i) => serde_json::Value::from(*i),
        SqlValue::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        SqlValue::Text(s) => serde_json::Value::String(s.clone()),
        SqlValue::Blob(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("ééééé", 4), "é...");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_sql_to_json() {
        assert_eq!(sql_to_json(&SqlValue::Null), serde_json::Value::Null);
        assert_eq!(sql_to_json(&SqlValue::Integer(3)), serde_json::json!(3));
        assert_eq!(sql_to_json(&SqlValue::Real(1.5)), serde_json::json!(1.5));
        assert_eq!(sql_to_json(&SqlValue::Real(f64::NAN)), serde_json::Value::Null);
        assert_eq!(sql_to_json(&SqlValue::Text("a".into())), serde_json::json!("a"));
    }
}
