//! Plain text and markdown extractor.

use crate::{ExtractError, FormatExtractor};
use std::path::Path;

/// Extractor for plain text files.
pub struct TextFileExtractor;

impl TextFileExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextFileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatExtractor for TextFileExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn extensions(&self) -> &[&str] {
        &["txt", "md"]
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_extract_multiline_content() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("multi.md");
        let text = "# Title\nLine 2\n\nLine 4";
        std::fs::write(&file_path, text).unwrap();

        assert_eq!(TextFileExtractor::new().extract(&file_path).unwrap(), text);
    }

    #[test]
    fn test_extract_handles_empty_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("empty.txt");
        std::fs::write(&file_path, "").unwrap();

        assert_eq!(TextFileExtractor::new().extract(&file_path).unwrap(), "");
    }

    #[test]
    fn test_extract_nonexistent_file_fails() {
        let result = TextFileExtractor::new().extract(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }
}
