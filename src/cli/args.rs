//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, import::ImportArgs, init::InitArgs, list::ListArgs,
    map::MapArgs, result::ResultArgs, types::TypesArgs, upload::UploadArgs,
};

#[derive(Parser)]
#[command(name = "csvimp")]
#[command(author, version, about = "Bulk-create database records from CSV files")]
#[command(long_about = "Upload a CSV file, map its columns to the fields of a record type, and create one record per row. Rows that break a uniqueness constraint are skipped as duplicates.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .csvimp/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new csvimp project
    Init(InitArgs),

    /// List importable record types and their fields
    Types(TypesArgs),

    /// Validate and store a CSV file for a record type
    Upload(UploadArgs),

    /// Show the proposed column mapping of an upload
    Map(MapArgs),

    /// Create records from an upload
    Import(ImportArgs),

    /// List uploads, newest first
    List(ListArgs),

    /// Show the records created from an upload
    Result(ResultArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
}
