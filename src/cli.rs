//! CLI argument parsing for cyclestat

use crate::stats::Reducer;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for evaluation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text tables (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "cyclestat")]
#[command(version)]
#[command(
    about = "Cycle-accurate benchmark trace statistics grouped by semantic category",
    long_about = None
)]
pub struct Cli {
    /// Trace dump (JSON) to evaluate
    #[arg(short, long, value_name = "FILE")]
    pub trace: PathBuf,

    /// Benchmark id, or first and last id of an inclusive range
    #[arg(short, long, value_name = "ID", num_args = 1..=2, required = true)]
    pub ids: Vec<u64>,

    /// Grouping scheme (e.g. mlkem, mldsa)
    #[arg(short, long, value_name = "SCHEME")]
    pub scheme: String,

    /// Reducer applied across iterations
    #[arg(long = "stat", value_enum, default_value = "median")]
    pub stat: Reducer,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write a \DefineVar macro file
    #[arg(long = "macros", value_name = "FILE")]
    pub macros: Option<PathBuf>,

    /// Evaluation config (TOML)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Grouping schemes (TOML) replacing the built-in ones
    #[arg(long = "groupings", value_name = "FILE")]
    pub groupings: Option<PathBuf>,

    /// Worker threads for multiple selections
    #[arg(short, long, value_name = "N", default_value = "1")]
    pub jobs: usize,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Benchmark ids to evaluate, one selection each
    pub fn benchmark_ids(&self) -> anyhow::Result<Vec<u64>> {
        match self.ids.as_slice() {
            [id] => Ok(vec![*id]),
            [first, last] if first <= last => Ok((*first..=*last).collect()),
            [first, last] => anyhow::bail!(
                "Invalid id range {}..{}: first id must not exceed last",
                first,
                last
            ),
            _ => anyhow::bail!("Expected one benchmark id or a range of two"),
        }
    }
}
