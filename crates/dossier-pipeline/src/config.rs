//! Configuration for the pipeline

use dossier_domain::category::OWNERSHIP_CONTROL;
use dossier_extract::DEFAULT_OCR_MIN_CHARS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory of `<category>.json` schema files
    pub schema_dir: PathBuf,

    /// Directory scanned by the batch driver
    pub input_dir: PathBuf,

    /// Directory holding `<stem>.txt` raw-text sidecars
    pub text_output_dir: PathBuf,

    /// Directory holding `<stem>.json` artifacts
    pub json_output_dir: PathBuf,

    /// Category used when classification is inconclusive
    pub default_category: String,

    /// PDF pages with fewer trimmed characters are transcribed from their image
    pub ocr_min_chars: usize,

    /// Directory holding the pdfium library used to render scanned pages;
    /// the system library is tried when unset
    pub pdfium_dir: Option<PathBuf>,

    /// Hard timeout for a single model call (seconds)
    pub call_timeout_secs: u64,

    /// Where to write the aggregated result set, if anywhere
    pub aggregate_output: Option<PathBuf>,
}

impl PipelineConfig {
    /// Get the per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let paths = [
            ("schema_dir", &self.schema_dir),
            ("input_dir", &self.input_dir),
            ("text_output_dir", &self.text_output_dir),
            ("json_output_dir", &self.json_output_dir),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        if self.default_category.trim().is_empty() {
            return Err("default_category must not be empty".to_string());
        }
        if self.ocr_min_chars == 0 {
            return Err("ocr_min_chars must be greater than 0".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("schemas"),
            input_dir: PathBuf::from("data/input_documents"),
            text_output_dir: PathBuf::from("data/text_output"),
            json_output_dir: PathBuf::from("data/json_output"),
            default_category: OWNERSHIP_CONTROL.to_string(),
            ocr_min_chars: DEFAULT_OCR_MIN_CHARS,
            pdfium_dir: None,
            call_timeout_secs: 120,
            aggregate_output: None,
        }
    }
}
