//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dossier - Sort a folder of evidence into structured, per-category records.
#[derive(Debug, Parser)]
#[command(name = "dossier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DOSSIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (counts only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every supported file in the input directory
    Process(ProcessArgs),

    /// List the categories defined by the schema directory
    Schemas(SchemasArgs),

    /// Render extracted records as a footnoted markdown report
    Report(ReportArgs),
}

/// Arguments for the process command.
#[derive(Debug, Default, Parser)]
pub struct ProcessArgs {
    /// Directory of input documents
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Directory of <category>.json schema files
    #[arg(short, long)]
    pub schema_dir: Option<PathBuf>,

    /// Directory for raw-text sidecars
    #[arg(long)]
    pub text_output_dir: Option<PathBuf>,

    /// Directory for JSON artifacts
    #[arg(long)]
    pub json_output_dir: Option<PathBuf>,

    /// Write the aggregated result set to this file
    #[arg(short, long)]
    pub aggregate_output: Option<PathBuf>,

    /// Category used when classification is inconclusive
    #[arg(long)]
    pub default_category: Option<String>,

    /// Transcribe PDF pages with fewer characters than this from their image
    #[arg(long)]
    pub ocr_min_chars: Option<usize>,
}

/// Arguments for the schemas command.
#[derive(Debug, Default, Parser)]
pub struct SchemasArgs {
    /// Directory of <category>.json schema files
    #[arg(short, long)]
    pub schema_dir: Option<PathBuf>,
}

/// Arguments for the report command.
#[derive(Debug, Parser)]
pub struct ReportArgs {
    /// Aggregated result set written by `process`
    #[arg(short, long)]
    pub aggregate: Option<PathBuf>,

    /// Directory of JSON artifacts, read when no aggregate file exists
    #[arg(long)]
    pub json_output_dir: Option<PathBuf>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report title
    #[arg(short, long, default_value = DEFAULT_REPORT_TITLE)]
    pub title: String,
}

/// Title used when `--title` is not given
pub const DEFAULT_REPORT_TITLE: &str = "Evidence digest";

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => Self::Table,
            CliFormat::Json => Self::Json,
            CliFormat::Quiet => Self::Quiet,
        }
    }
}
