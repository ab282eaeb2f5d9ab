//! Error types for text extraction

use thiserror::Error;

/// Errors that can occur while turning a file into text
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No extractor is registered for the file's extension
    #[error("Unsupported format: '{0}'")]
    UnsupportedFormat(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF could not be parsed
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Vision transcription failed
    #[error("Vision transcription failed: {0}")]
    Vision(String),

    /// A scanned page could not be turned into an image
    #[error("Page rendering failed: {0}")]
    Render(String),

    /// Embedded image could not be decoded
    #[error("Image decoding failed: {0}")]
    Image(String),
}
