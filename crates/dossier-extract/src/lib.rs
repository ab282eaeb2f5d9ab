//! # dossier-extract
//!
//! The extractor gateway: turns a source file into raw text.
//!
//! ## Supported Formats
//!
//! | Extractor | Extensions | Strategy |
//! |-----------|------------|----------|
//! | [`TextFileExtractor`] | `.txt`, `.md` | Direct UTF-8 read |
//! | [`ImageExtractor`] | `.jpg`, `.jpeg`, `.png` | Vision-model transcription |
//! | [`PdfExtractor`] | `.pdf` | Native text per page; sparse pages transcribed as images |
//!
//! ## Usage
//!
//! ```no_run
//! use dossier_extract::ExtractorGateway;
//! use dossier_llm::MockProvider;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let gateway = ExtractorGateway::with_defaults(Arc::new(MockProvider::default()), 50);
//! let text = gateway.extract(Path::new("evidence/letter.pdf")).unwrap();
//! ```
//!
//! A PDF page whose native text, trimmed, has fewer than `ocr_min_chars`
//! characters is treated as scanned. The page is rendered whole through
//! pdfium when the library can be loaded ([`PdfiumRenderer`]); otherwise its
//! largest decodable embedded image is used (JPEG, Flate samples in gray,
//! RGB or CMYK, CCITT fax). The image is written to a temporary file and
//! transcribed like any other image, and the file is removed when the page
//! is done, on success and on error alike. A sparse page that yields no
//! image fails the whole file so that it is retried on a later run.

mod error;
pub mod pdf;
pub mod registry;
pub mod render;
pub mod text;
pub mod vision;

pub use error::ExtractError;
pub use vision::ImageExtractor;
pub use pdf::{LopdfPages, PageImage, PageSource, PdfExtractor, DEFAULT_OCR_MIN_CHARS};
pub use registry::{ExtractorGateway, FormatExtractor};
pub use render::{system_renderer, PageRenderer, PdfiumRenderer};
pub use text::TextFileExtractor;

/// Lowercased extension of a path, without the dot
pub fn extension_of(path: &std::path::Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}
