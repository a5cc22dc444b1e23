//! Command-line parsing for the real-yield snapshot tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from lookup and table code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::PolicyKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ry", version, about = "TIPS real yield curve snapshots (FRED-based)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the yield table, print it (plus an ASCII chart) and optionally export it.
    Table(TableArgs),
    /// Launch the interactive TUI (chart + table).
    Tui(RunArgs),
}

/// Options shared by every command that builds a table.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Configuration TOML (defaults to the bundled FRED configuration).
    #[arg(short = 'c', long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Anchor date for relative target rules (YYYY-MM-DD, default: today).
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Override the lookup policy from the configuration.
    #[arg(long, value_enum)]
    pub policy: Option<PolicyKind>,

    /// Override the lookup window (days).
    #[arg(long)]
    pub max_days: Option<u32>,

    /// Resolve cells in parallel.
    #[arg(long)]
    pub parallel: bool,
}

/// Options for `ry table`.
#[derive(Debug, Args, Clone)]
pub struct TableArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Print the table as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,

    /// Export the table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the table (with run metadata and diagnostics) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}
