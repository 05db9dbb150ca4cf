//! Configuration management with layered hierarchy

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::storage::{is_contained, DEFAULT_UPLOAD_TO};
use crate::core::Project;
use crate::import::{ColumnTransform, ResultPolicy};
use crate::schema::{RecordRegistry, RecordTypeConfig, SchemaError};

/// What the CLI shows once an import finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostImportView {
    /// The records created by the import
    #[default]
    Result,
    /// The upload list
    List,
    None,
}

/// csvimp configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Acting user for `$user` defaults
    pub author: Option<String>,

    /// Upload location relative to the project root
    pub upload_to: Option<String>,

    /// Record types that cannot be imported into
    pub excluded_types: Option<Vec<String>>,

    /// Column translation used when a type declares no column list
    pub column_transform: Option<ColumnTransform>,

    /// View shown after an import
    pub redirect: Option<PostImportView>,

    /// What happens to an upload once imported
    pub after_import: Option<ResultPolicy>,

    /// Importable record types
    pub record_types: BTreeMap<String, RecordTypeConfig>,
}

/// Errors raised while loading configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(csvimp::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    #[diagnostic(
        code(csvimp::config::yaml),
        help("Check the YAML syntax and the key names in the config file")
    )]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("Upload location '{0}' is outside the project")]
    #[diagnostic(
        code(csvimp::config::upload_to),
        help("Set upload_to to a directory inside the project, such as 'uploads'")
    )]
    UploadTo(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: &Project) -> Result<Self, ConfigError> {
        Self::load_layers(Self::global_config_path().as_deref(), project)
    }

    fn load_layers(global: Option<&Path>, project: &Project) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Global user config (~/.config/csvimp/config.yaml); a broken
        //    global file must not block every project
        if let Some(global_path) = global.filter(|p| p.exists()) {
            match Self::read_file(global_path) {
                Ok(global) => config.merge(global),
                Err(e) => log::warn!("ignoring global config: {}", e),
            }
        }

        // 2. Project config (.csvimp/config.yaml)
        let project_path = project.config_path();
        if project_path.exists() {
            config.merge(Self::read_file(&project_path)?);
        }

        // 3. Environment variables
        if let Ok(author) = std::env::var("CSVIMP_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(upload_to) = std::env::var("CSVIMP_UPLOAD_TO") {
            config.upload_to = Some(upload_to);
        }

        if let Some(upload_to) = config.upload_to.as_deref() {
            if !upload_to.trim_matches('/').is_empty() && !is_contained(upload_to) {
                return Err(ConfigError::UploadTo(upload_to.to_string()));
            }
        }

        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "csvimp")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.upload_to.is_some() {
            self.upload_to = other.upload_to;
        }
        if other.excluded_types.is_some() {
            self.excluded_types = other.excluded_types;
        }
        if other.column_transform.is_some() {
            self.column_transform = other.column_transform;
        }
        if other.redirect.is_some() {
            self.redirect = other.redirect;
        }
        if other.after_import.is_some() {
            self.after_import = other.after_import;
        }
        // Record types merge per type; a later layer replaces a whole declaration
        self.record_types.extend(other.record_types);
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Build the record type registry from the declared types
    pub fn registry(&self) -> Result<RecordRegistry, ConfigError> {
        Ok(RecordRegistry::from_config(&self.record_types)?)
    }

    /// Importer switches with defaults applied
    pub fn settings(&self) -> ImporterSettings {
        ImporterSettings {
            excluded_types: self.excluded_types.clone().unwrap_or_default(),
            column_transform: self.column_transform.unwrap_or_default(),
            redirect: self.redirect.unwrap_or_default(),
            result_policy: self.after_import.unwrap_or_default(),
            upload_to: self
                .upload_to
                .clone()
                .unwrap_or_else(|| DEFAULT_UPLOAD_TO.to_string()),
        }
    }
}

/// Global switches handed to the import pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterSettings {
    pub excluded_types: Vec<String>,
    pub column_transform: ColumnTransform,
    pub redirect: PostImportView,
    pub result_policy: ResultPolicy,
    pub upload_to: String,
}

impl Default for ImporterSettings {
    fn default() -> Self {
        Config::default().settings()
    }
}

impl ImporterSettings {
    pub fn is_excluded(&self, type_id: &str) -> bool {
        self.excluded_types.iter().any(|t| t == type_id)
    }
}
