//! csvimp: bulk-create database records from uploaded CSV files
//!
//! An upload is normalized and stored, its columns are mapped to the fields
//! of a registered record type, and every row becomes one record. Rows that
//! violate a uniqueness constraint are counted as duplicates and skipped.

pub mod cli;
pub mod core;
pub mod import;
pub mod schema;
