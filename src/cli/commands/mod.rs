//! CLI command implementations

pub mod completions;
pub mod import;
pub mod init;
pub mod list;
pub mod map;
pub mod result;
pub mod types;
pub mod upload;
