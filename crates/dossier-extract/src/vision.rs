//! Image transcription through a vision-capable language model.

use crate::{extension_of, ExtractError, FormatExtractor};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dossier_domain::traits::LlmProvider;
use dossier_domain::ChatMessage;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const TRANSCRIPTION_PROMPT: &str = "Transcribe ALL text visible in this image, including tables, \
headers and footnotes. Preserve the original layout as closely as plain text allows. \
Return only the transcription.";

/// Extractor for image files, backed by vision transcription.
pub struct ImageExtractor<L> {
    provider: Arc<L>,
}

impl<L> Clone for ImageExtractor<L> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<L> ImageExtractor<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    /// Create a new image extractor.
    pub fn new(provider: Arc<L>) -> Self {
        Self { provider }
    }

    /// Transcribe raw image bytes
    pub fn transcribe(&self, bytes: &[u8], mime_type: &str) -> Result<String, ExtractError> {
        debug!("Transcribing {} image ({} bytes)", mime_type, bytes.len());
        let message =
            ChatMessage::user(TRANSCRIPTION_PROMPT).with_image(mime_type, STANDARD.encode(bytes));
        self.provider
            .generate(&[message])
            .map_err(|e| ExtractError::Vision(e.to_string()))
    }
}

/// MIME type for an image path, by extension
pub fn mime_type_for(path: &Path) -> &'static str {
    match extension_of(path).as_deref() {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

impl<L> FormatExtractor for ImageExtractor<L>
where
    L: LlmProvider + Send + Sync,
    L::Error: Display,
{
    fn name(&self) -> &str {
        "image"
    }

    fn extensions(&self) -> &[&str] {
        &["jpg", "jpeg", "png"]
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        self.transcribe(&bytes, mime_type_for(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_domain::ContentPart;
    use dossier_llm::MockProvider;
    use tempfile::tempdir;

    #[test]
    fn test_mime_type_from_extension() {
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.jpeg")), "image/jpeg");
    }

    #[test]
    fn test_transcribe_sends_base64_image() {
        let provider = Arc::new(MockProvider::new("Invoice No. 42"));
        let extractor = ImageExtractor::new(Arc::clone(&provider));

        let text = extractor.transcribe(b"ABC", "image/png").unwrap();
        assert_eq!(text, "Invoice No. 42");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].had_image);
        assert!(requests[0].text.contains("Transcribe ALL text"));
    }

    #[test]
    fn test_image_payload_encoding() {
        let message = ChatMessage::user(TRANSCRIPTION_PROMPT)
            .with_image("image/png", STANDARD.encode(b"ABC"));
        match &message.parts[1] {
            ContentPart::Image { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data, "QUJD");
            }
            _ => panic!("Expected image part"),
        }
    }

    #[test]
    fn test_backend_error_is_reported() {
        let mut provider = MockProvider::default();
        provider.add_error("Transcribe");
        let extractor = ImageExtractor::new(Arc::new(provider));

        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("scan.jpg");
        std::fs::write(&file_path, [0xFF, 0xD8]).unwrap();

        assert!(matches!(extractor.extract(&file_path), Err(ExtractError::Vision(_))));
    }

    #[test]
    fn test_missing_image_file() {
        let extractor = ImageExtractor::new(Arc::new(MockProvider::default()));
        assert!(matches!(
            extractor.extract(Path::new("/nonexistent/scan.png")),
            Err(ExtractError::Io(_))
        ));
    }
}
