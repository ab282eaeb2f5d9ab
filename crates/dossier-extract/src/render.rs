//! Full-page rasterisation of PDF pages.
//!
//! A scanned page is not always one embedded bitmap: it may be tiled, drawn
//! from vector outlines, or stored in an encoding nothing here decodes
//! (JBIG2, JPX). Rendering the page as a whole sidesteps all of that, so a
//! configured [`PageRenderer`] is the first choice for sparse pages.

use crate::pdf::PageImage;
use crate::ExtractError;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Width in pixels pages are rendered at
pub const DEFAULT_RENDER_WIDTH: i32 = 2000;

/// Rasterises a single page of a PDF document.
pub trait PageRenderer: Send + Sync {
    /// Render page `index` (0-based) of the document held in `pdf`
    fn render_page(&self, pdf: &[u8], index: usize) -> Result<PageImage, ExtractError>;
}

/// [`PageRenderer`] backed by a dynamically loaded pdfium library
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    target_width: i32,
}

impl PdfiumRenderer {
    /// Bind to the pdfium library installed on the system
    pub fn from_system() -> Result<Self, ExtractError> {
        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| ExtractError::Render(format!("pdfium not found: {}", e)))?;
        Ok(Self::from_bindings(bindings))
    }

    /// Bind to the pdfium library found in `dir`
    pub fn from_directory(dir: &Path) -> Result<Self, ExtractError> {
        let library = Pdfium::pdfium_platform_library_name_at_path(dir);
        let bindings = Pdfium::bind_to_library(&library)
            .map_err(|e| ExtractError::Render(format!("cannot load {:?}: {}", library, e)))?;
        Ok(Self::from_bindings(bindings))
    }

    fn from_bindings(bindings: Box<dyn PdfiumLibraryBindings>) -> Self {
        Self {
            pdfium: Pdfium::new(bindings),
            target_width: DEFAULT_RENDER_WIDTH,
        }
    }

    /// Override the render width; height follows the page's aspect ratio
    pub fn with_target_width(mut self, width: i32) -> Self {
        self.target_width = width;
        self
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_page(&self, pdf: &[u8], index: usize) -> Result<PageImage, ExtractError> {
        let page_error =
            |e: PdfiumError| ExtractError::Render(format!("page {}: {}", index + 1, e));

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ExtractError::Render(e.to_string()))?;
        let page_index = u16::try_from(index)
            .map_err(|_| ExtractError::Render(format!("page {} out of range", index + 1)))?;
        let page = document.pages().get(page_index).map_err(page_error)?;

        let config = PdfRenderConfig::new()
            .set_target_width(self.target_width)
            .set_maximum_height(self.target_width.saturating_mul(2));
        let bitmap = page.render_with_config(&config).map_err(page_error)?;

        let mut data = Vec::new();
        bitmap
            .as_image()
            .write_to(&mut std::io::Cursor::new(&mut data), ::image::ImageOutputFormat::Png)
            .map_err(|e| ExtractError::Image(format!("PNG encoding failed: {e}")))?;

        debug!("Rendered page {} ({} bytes)", index + 1, data.len());
        Ok(PageImage {
            data,
            mime_type: "image/png",
        })
    }
}

/// Process-wide renderer over the system pdfium, bound on first use.
///
/// `None` when no pdfium library can be loaded; sparse pages then fall back
/// to their embedded images.
pub fn system_renderer() -> Option<Arc<dyn PageRenderer>> {
    static RENDERER: OnceLock<Option<Arc<PdfiumRenderer>>> = OnceLock::new();

    RENDERER
        .get_or_init(|| match PdfiumRenderer::from_system() {
            Ok(renderer) => Some(Arc::new(renderer)),
            Err(e) => {
                warn!("PDF page rendering unavailable, using embedded page images only: {}", e);
                None
            }
        })
        .clone()
        .map(|renderer| renderer as Arc<dyn PageRenderer>)
}
