//! Error types for the pipeline

use dossier_extract::ExtractError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving files through the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No extractor registered for the file's extension
    #[error("Unsupported format: '{0}'")]
    UnsupportedFormat(String),

    /// Extraction requested for a missing or unknown category
    #[error("Invalid category: '{0}'")]
    InvalidCategory(String),

    /// Language-model backend error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Text extraction error
    #[error("Extraction error: {0}")]
    Extract(ExtractError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model call exceeded its time budget
    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    /// Missing or unusable configuration; fatal at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single file could not be processed
    #[error("Failed to process {path:?}: {reason}")]
    FileProcessing {
        /// Offending input file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },
}

impl From<ExtractError> for PipelineError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedFormat(ext) => PipelineError::UnsupportedFormat(ext),
            other => PipelineError::Extract(other),
        }
    }
}
