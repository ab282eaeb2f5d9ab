//! Extension-keyed registry of format extractors.

use crate::render::{system_renderer, PageRenderer};
use crate::{extension_of, ExtractError, ImageExtractor, PdfExtractor, TextFileExtractor};
use dossier_domain::traits::LlmProvider;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Capability shared by every format handler: file in, text out.
pub trait FormatExtractor: Send + Sync {
    /// Handler name, used in logs
    fn name(&self) -> &str;

    /// Lowercased extensions (without dot) this handler accepts
    fn extensions(&self) -> &[&str];

    /// Extract the full text of a file
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Registry mapping file extensions to format extractors.
pub struct ExtractorGateway {
    handlers: HashMap<String, Arc<dyn FormatExtractor>>,
}

impl ExtractorGateway {
    /// Create a new empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Gateway with the text, image and PDF handlers registered.
    ///
    /// Sparse PDF pages are rendered through the system pdfium when it can
    /// be loaded.
    pub fn with_defaults<L>(provider: Arc<L>, ocr_min_chars: usize) -> Self
    where
        L: LlmProvider + Send + Sync + 'static,
        L::Error: Display,
    {
        Self::with_renderer(provider, ocr_min_chars, system_renderer())
    }

    /// Default handlers, with an explicit page renderer (or none) for PDFs
    pub fn with_renderer<L>(
        provider: Arc<L>,
        ocr_min_chars: usize,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> Self
    where
        L: LlmProvider + Send + Sync + 'static,
        L::Error: Display,
    {
        let images = ImageExtractor::new(provider);
        let mut pdf = PdfExtractor::new(images.clone()).with_min_chars(ocr_min_chars);
        if let Some(renderer) = renderer {
            pdf = pdf.with_renderer(renderer);
        }

        let mut gateway = Self::new();
        gateway.register(TextFileExtractor::new());
        gateway.register(pdf);
        gateway.register(images);
        gateway
    }

    /// Register an extractor for every extension it declares.
    ///
    /// A later registration replaces an earlier one for the same extension.
    pub fn register<E: FormatExtractor + 'static>(&mut self, extractor: E) {
        let extractor: Arc<dyn FormatExtractor> = Arc::new(extractor);
        for ext in extractor.extensions() {
            self.handlers.insert(ext.to_lowercase(), Arc::clone(&extractor));
        }
    }

    /// Select the handler for a file by its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::UnsupportedFormat`] naming the extension.
    pub fn resolve(&self, path: &Path) -> Result<Arc<dyn FormatExtractor>, ExtractError> {
        let ext = extension_of(path).unwrap_or_default();
        self.handlers
            .get(&ext)
            .cloned()
            .ok_or(ExtractError::UnsupportedFormat(ext))
    }

    /// Whether some handler accepts this file
    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        self.resolve(path).is_ok()
    }

    /// Extract text from a file.
    pub fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let extractor = self.resolve(path)?;
        debug!("Extracting {:?} with {} extractor", path, extractor.name());
        extractor.extract(path)
    }

    /// Registered extensions, sorted
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.handlers.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for ExtractorGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_llm::MockProvider;
    use tempfile::tempdir;

    #[test]
    fn test_new_gateway_is_empty() {
        let gateway = ExtractorGateway::new();
        assert!(gateway.extensions().is_empty());
    }

    #[test]
    fn test_default_handlers() {
        let gateway = ExtractorGateway::with_defaults(Arc::new(MockProvider::default()), 50);
        assert_eq!(gateway.extensions(), vec!["jpeg", "jpg", "md", "pdf", "png", "txt"]);
        assert_eq!(gateway.resolve(Path::new("a.PDF")).unwrap().name(), "pdf");
        assert_eq!(gateway.resolve(Path::new("scan.jpeg")).unwrap().name(), "image");
        assert_eq!(gateway.resolve(Path::new("notes.md")).unwrap().name(), "text");
    }

    #[test]
    fn test_unsupported_extension_is_named() {
        let gateway = ExtractorGateway::with_defaults(Arc::new(MockProvider::default()), 50);
        match gateway.resolve(Path::new("/test/archive.zip")) {
            Err(ExtractError::UnsupportedFormat(ext)) => assert_eq!(ext, "zip"),
            _ => panic!("Expected UnsupportedFormat error"),
        }
        assert!(!gateway.supports(Path::new("no_extension")));
    }

    #[test]
    fn test_extract_text_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        std::fs::write(&file_path, "Hello, world!").unwrap();

        let mut gateway = ExtractorGateway::new();
        gateway.register(TextFileExtractor::new());

        assert_eq!(gateway.extract(&file_path).unwrap(), "Hello, world!");
    }

    #[test]
    fn test_extract_image_goes_through_vision() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("scan.png");
        std::fs::write(&file_path, [0x89, b'P', b'N', b'G']).unwrap();

        let provider = Arc::new(MockProvider::new("TRANSCRIBED"));
        let gateway = ExtractorGateway::with_defaults(Arc::clone(&provider), 50);

        assert_eq!(gateway.extract(&file_path).unwrap(), "TRANSCRIBED");
        assert!(provider.requests()[0].had_image);
    }
}
