//! Core module - project, configuration and persistence

pub mod config;
pub mod project;
pub mod storage;
pub mod store;

pub use config::{Config, ConfigError, ImporterSettings, PostImportView};
pub use project::{Project, ProjectError};
pub use storage::UploadStorage;
pub use store::{RecordStore, StoreError, StoredRecord, UploadedCsv};
