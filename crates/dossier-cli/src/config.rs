//! Configuration management for the CLI.
//!
//! The file has three tables, all optional:
//!
//! ```toml
//! [pipeline]
//! input_dir = "data/input_documents"
//! schema_dir = "schemas"
//!
//! [llm]
//! model = "gpt-4o"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [settings]
//! color = true
//! format = "table"
//! ```

use crate::cli::{ProcessArgs, ReportArgs, SchemasArgs};
use crate::error::{CliError, Result};
use dossier_llm::OpenAiConfig;
use dossier_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "dossier.toml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline directories and thresholds
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Model backend connection
    #[serde(default)]
    pub llm: OpenAiConfig,

    /// Output settings
    #[serde(default)]
    pub settings: Settings,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Per-user configuration file path, if the platform has a config dir.
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dossier").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `./dossier.toml` and then
    /// the per-user file are tried, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(CliError::Config(format!("config file {:?} not found", path)));
            }
            return Self::from_file(path);
        }

        let candidates = std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE)).chain(Self::user_path());
        for path in candidates {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Override file values with flags given on the command line.
    pub fn apply_process_args(&mut self, args: &ProcessArgs) {
        let pipeline = &mut self.pipeline;
        if let Some(dir) = &args.input_dir {
            pipeline.input_dir = dir.clone();
        }
        if let Some(dir) = &args.schema_dir {
            pipeline.schema_dir = dir.clone();
        }
        if let Some(dir) = &args.text_output_dir {
            pipeline.text_output_dir = dir.clone();
        }
        if let Some(dir) = &args.json_output_dir {
            pipeline.json_output_dir = dir.clone();
        }
        if let Some(path) = &args.aggregate_output {
            pipeline.aggregate_output = Some(path.clone());
        }
        if let Some(category) = &args.default_category {
            pipeline.default_category = category.clone();
        }
        if let Some(min_chars) = args.ocr_min_chars {
            pipeline.ocr_min_chars = min_chars;
        }
    }

    /// Override the schema directory for the schemas command.
    pub fn apply_schemas_args(&mut self, args: &SchemasArgs) {
        if let Some(dir) = &args.schema_dir {
            self.pipeline.schema_dir = dir.clone();
        }
    }

    /// Override where the report command reads extracted records from.
    pub fn apply_report_args(&mut self, args: &ReportArgs) {
        if let Some(path) = &args.aggregate {
            self.pipeline.aggregate_output = Some(path.clone());
        }
        if let Some(dir) = &args.json_output_dir {
            self.pipeline.json_output_dir = dir.clone();
        }
    }

    /// Check both the pipeline and backend sections.
    pub fn validate(&self) -> Result<()> {
        self.pipeline
            .validate()
            .map_err(|e| CliError::Config(format!("[pipeline] {}", e)))?;
        self.llm
            .validate()
            .map_err(|e| CliError::Config(format!("[llm] {}", e)))?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
