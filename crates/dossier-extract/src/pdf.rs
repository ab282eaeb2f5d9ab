//! PDF extractor with per-page OCR fallback.
//!
//! Uses lopdf for the native text layer. A page whose trimmed text is
//! shorter than the configured threshold is treated as scanned and imaged:
//! rendered whole when a [`PageRenderer`] is configured, otherwise taken
//! from its largest decodable embedded image. A sparse page that cannot be
//! imaged either way fails the file.

use crate::render::PageRenderer;
use crate::vision::ImageExtractor;
use crate::{ExtractError, FormatExtractor};
use dossier_domain::traits::LlmProvider;
use fax::decoder::{decode_g3, decode_g4, pels};
use fax::Color;
use flate2::read::ZlibDecoder;
use lopdf::xobject::PdfImage;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::fmt::Display;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pages with fewer trimmed characters than this are treated as scanned
pub const DEFAULT_OCR_MIN_CHARS: usize = 50;

/// Separator between per-page outputs
const PAGE_SEPARATOR: &str = "\n\n";

/// Image pulled out of a PDF page, ready for transcription
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// Encoded image bytes
    pub data: Vec<u8>,
    /// `image/jpeg` or `image/png`
    pub mime_type: &'static str,
}

/// Page-level view of a PDF document
pub trait PageSource {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Native text layer of a page (0-based index)
    fn page_text(&self, index: usize) -> Result<String, ExtractError>;

    /// Best embedded image for transcribing a page, if it has a decodable one
    fn page_image(&self, index: usize) -> Result<Option<PageImage>, ExtractError>;
}

/// [`PageSource`] backed by a parsed lopdf document
pub struct LopdfPages {
    doc: Document,
    pages: Vec<(u32, ObjectId)>,
}

impl LopdfPages {
    /// Parse a PDF file
    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let doc = Document::load(path).map_err(|e| ExtractError::Pdf(e.to_string()))?;
        Ok(Self::from_document(doc))
    }

    /// Parse a PDF held in memory
    pub fn load_mem(bytes: &[u8]) -> Result<Self, ExtractError> {
        let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
        Ok(Self::from_document(doc))
    }

    fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_iter().collect();
        Self { doc, pages }
    }

    fn page(&self, index: usize) -> Result<(u32, ObjectId), ExtractError> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| ExtractError::Pdf(format!("page index {} out of range", index)))
    }
}

impl PageSource for LopdfPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractError> {
        let (page_num, _) = self.page(index)?;
        self.doc
            .extract_text(&[page_num])
            .map_err(|e| ExtractError::Pdf(format!("page {}: {}", page_num, e)))
    }

    fn page_image(&self, index: usize) -> Result<Option<PageImage>, ExtractError> {
        let (page_num, page_id) = self.page(index)?;
        let images = match self.doc.get_page_images(page_id) {
            Ok(images) => images,
            Err(e) => {
                debug!("Failed to get images from page {}: {}", page_num, e);
                return Ok(None);
            }
        };

        // A scanned page is normally one full-page image; take the largest
        let mut candidates: Vec<_> = images.iter().collect();
        candidates.sort_by_key(|img| std::cmp::Reverse(img.width.saturating_mul(img.height)));

        Ok(candidates
            .into_iter()
            .find_map(|img| decode_pdf_image(&self.doc, img)))
    }
}

/// Decode an embedded image into something a vision model accepts.
fn decode_pdf_image(doc: &Document, pdf_image: &PdfImage) -> Option<PageImage> {
    let filters = pdf_image.filters.as_deref().unwrap_or_default();
    let names: Vec<&str> = filters.iter().map(String::as_str).collect();

    let decoded = match names.as_slice() {
        ["DCTDecode"] => Ok(PageImage {
            data: pdf_image.content.to_vec(),
            mime_type: "image/jpeg",
        }),
        ["FlateDecode", "DCTDecode"] => inflate(pdf_image.content).map(|data| PageImage {
            data,
            mime_type: "image/jpeg",
        }),
        ["FlateDecode"] => inflate(pdf_image.content)
            .and_then(|samples| raw_samples_to_image(pdf_image, samples))
            .and_then(encode_png),
        ["CCITTFaxDecode"] => ccitt_to_image(doc, pdf_image).and_then(encode_png),
        _ => Err(format!("unsupported image filter {:?}", names)),
    };

    match decoded {
        Ok(image) => Some(image),
        Err(e) => {
            debug!("Skipping embedded image {:?}: {}", pdf_image.id, e);
            None
        }
    }
}

fn inflate(content: &[u8]) -> Result<Vec<u8>, String> {
    let mut decompressed = Vec::new();
    ZlibDecoder::new(content)
        .read_to_end(&mut decompressed)
        .map_err(|e| format!("Decompression failed: {e}"))?;
    Ok(decompressed)
}

fn dimensions(pdf_image: &PdfImage) -> Result<(u32, u32), String> {
    let width = u32::try_from(pdf_image.width).map_err(|_| "negative width".to_string())?;
    let height = u32::try_from(pdf_image.height).map_err(|_| "negative height".to_string())?;
    Ok((width, height))
}

/// Build an image from decompressed 8-bit (or 1-bit gray) samples.
fn raw_samples_to_image(
    pdf_image: &PdfImage,
    samples: Vec<u8>,
) -> Result<::image::DynamicImage, String> {
    let (width, height) = dimensions(pdf_image)?;
    let pixels = width as usize * height as usize;
    let bits = pdf_image.bits_per_component.unwrap_or(8);

    // Calibrated and ICC spaces are read by their sample count
    let channels = match pdf_image.color_space.as_deref().unwrap_or("DeviceRGB") {
        "DeviceGray" | "Gray" | "CalGray" => 1,
        "DeviceRGB" | "RGB" | "CalRGB" => 3,
        "DeviceCMYK" | "CMYK" => 4,
        other if bits == 8 && pixels > 0 && samples.len() % pixels == 0 => {
            debug!("Color space '{}' read as {} channel(s)", other, samples.len() / pixels);
            samples.len() / pixels
        }
        other => return Err(format!("unsupported color space '{}'", other)),
    };

    let img = match (channels, bits) {
        (1, 1) => {
            let luma = unpack_bits(&samples, width, height);
            ::image::GrayImage::from_raw(width, height, luma).map(::image::DynamicImage::ImageLuma8)
        }
        (1, 8) => ::image::GrayImage::from_raw(width, height, samples)
            .map(::image::DynamicImage::ImageLuma8),
        (3, 8) => ::image::RgbImage::from_raw(width, height, samples)
            .map(::image::DynamicImage::ImageRgb8),
        (4, 8) => ::image::RgbImage::from_raw(width, height, cmyk_to_rgb(&samples))
            .map(::image::DynamicImage::ImageRgb8),
        _ => return Err(format!("{} channel(s) at {} bits unsupported", channels, bits)),
    };
    img.ok_or_else(|| "Failed to create image from raw data".to_string())
}

/// Expand 1-bit rows (padded to whole bytes) into 0/255 luma
fn unpack_bits(samples: &[u8], width: u32, height: u32) -> Vec<u8> {
    let width = width as usize;
    let stride = width.div_ceil(8);
    let mut luma = Vec::with_capacity(width * height as usize);
    for row in samples.chunks(stride).take(height as usize) {
        for x in 0..width {
            let bit = row.get(x / 8).map_or(0, |byte| (byte >> (7 - x % 8)) & 1);
            luma.push(if bit == 1 { 255 } else { 0 });
        }
    }
    luma
}

#[allow(clippy::many_single_char_names)]
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((cmyk.len() / 4) * 3);
    for chunk in cmyk.chunks_exact(4) {
        let c = f32::from(chunk[0]) / 255.0;
        let m = f32::from(chunk[1]) / 255.0;
        let y = f32::from(chunk[2]) / 255.0;
        let k = f32::from(chunk[3]) / 255.0;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            rgb.push((255.0 * (1.0 - c) * (1.0 - k)) as u8);
            rgb.push((255.0 * (1.0 - m) * (1.0 - k)) as u8);
            rgb.push((255.0 * (1.0 - y) * (1.0 - k)) as u8);
        }
    }
    rgb
}

/// `DecodeParms` of a CCITT image
struct FaxParams {
    k: i64,
    columns: u16,
    rows: Option<u16>,
    black_is_1: bool,
}

impl FaxParams {
    fn read(doc: &Document, pdf_image: &PdfImage) -> Result<Self, String> {
        let parms = decode_parms(doc, pdf_image.origin_dict);
        let int = |key: &[u8]| parms.and_then(|d| d.get(key).ok()).and_then(|o| o.as_i64().ok());

        let columns = int(b"Columns").unwrap_or(pdf_image.width);
        let rows = int(b"Rows").unwrap_or(pdf_image.height);
        Ok(Self {
            k: int(b"K").unwrap_or(0),
            columns: u16::try_from(columns).map_err(|_| format!("bad Columns {}", columns))?,
            rows: u16::try_from(rows).ok().filter(|rows| *rows > 0),
            black_is_1: parms
                .and_then(|d| d.get(b"BlackIs1").ok())
                .and_then(|o| o.as_bool().ok())
                .unwrap_or(false),
        })
    }
}

/// First dictionary among an image's decode parameters
fn decode_parms<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let (_, parms) = doc.dereference(dict.get(b"DecodeParms").ok()?).ok()?;
    match parms {
        Object::Dictionary(d) => Some(d),
        Object::Array(items) => items
            .iter()
            .filter_map(|item| doc.dereference(item).ok())
            .find_map(|(_, item)| item.as_dict().ok()),
        _ => None,
    }
}

/// Whether the image's `Decode` array is `[1 0]`
fn decode_inverted(dict: &Dictionary) -> bool {
    let Ok(decode) = dict.get(b"Decode").and_then(Object::as_array) else {
        return false;
    };
    match decode.first() {
        Some(Object::Integer(first)) => *first == 1,
        Some(Object::Real(first)) => (*first - 1.0).abs() < f32::EPSILON,
        _ => false,
    }
}

/// Decode a Group 3 or Group 4 fax image into luma.
fn ccitt_to_image(doc: &Document, pdf_image: &PdfImage) -> Result<::image::DynamicImage, String> {
    let params = FaxParams::read(doc, pdf_image)?;
    let inverted = decode_inverted(pdf_image.origin_dict);
    let width = params.columns;

    let mut luma = Vec::new();
    let mut rows: u32 = 0;
    let push_line = |transitions: &[u16]| {
        luma.extend(pels(transitions, width).map(|color| {
            // Sample bit as stored, then read through DeviceGray (1 = white)
            let bit = (color == Color::Black) == params.black_is_1;
            if bit != inverted { 255u8 } else { 0u8 }
        }));
        rows += 1;
    };

    let input = pdf_image.content.iter().copied();
    let finished = if params.k < 0 {
        decode_g4(input, width, params.rows, push_line)
    } else {
        decode_g3(input, push_line)
    };
    if finished.is_none() && rows == 0 {
        return Err("CCITT data could not be decoded".to_string());
    }

    ::image::GrayImage::from_raw(u32::from(width), rows, luma)
        .map(::image::DynamicImage::ImageLuma8)
        .ok_or_else(|| "CCITT rows do not match the image width".to_string())
}

fn encode_png(img: ::image::DynamicImage) -> Result<PageImage, String> {
    let mut data = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut data),
        ::image::ImageOutputFormat::Png,
    )
    .map_err(|e| format!("PNG encoding failed: {e}"))?;

    Ok(PageImage {
        data,
        mime_type: "image/png",
    })
}

/// Whether a page's native text is too sparse to trust
pub fn needs_ocr(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() < min_chars
}

/// Extractor for PDF files.
pub struct PdfExtractor<L> {
    images: ImageExtractor<L>,
    renderer: Option<Arc<dyn PageRenderer>>,
    min_chars: usize,
    temp_dir: Option<PathBuf>,
}

impl<L> PdfExtractor<L>
where
    L: LlmProvider + Send + Sync,
    L::Error: Display,
{
    /// Create a PDF extractor that transcribes scanned pages with `images`.
    pub fn new(images: ImageExtractor<L>) -> Self {
        Self {
            images,
            renderer: None,
            min_chars: DEFAULT_OCR_MIN_CHARS,
            temp_dir: None,
        }
    }

    /// Render sparse pages whole instead of relying on embedded images
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Override the scanned-page threshold
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Place page-image intermediates in `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Extract every page, concatenated with a blank line between pages.
    ///
    /// `pdf` is the raw document handed to the renderer.
    ///
    /// # Errors
    ///
    /// [`ExtractError::Render`] when a sparse page can be neither rendered
    /// nor recovered from an embedded image; a vision error for the page
    /// otherwise.
    pub fn extract_pages(
        &self,
        pages: &dyn PageSource,
        pdf: &[u8],
    ) -> Result<String, ExtractError> {
        let mut outputs = Vec::with_capacity(pages.page_count());

        for index in 0..pages.page_count() {
            let native = pages.page_text(index).unwrap_or_else(|e| {
                debug!("No text layer on page {}: {}", index + 1, e);
                String::new()
            });

            if !needs_ocr(&native, self.min_chars) {
                outputs.push(native);
                continue;
            }

            debug!("Page {} looks scanned, transcribing its image", index + 1);
            let image = self.page_image(pages, pdf, index)?;
            outputs.push(self.transcribe_page(&image)?);
        }

        Ok(outputs.join(PAGE_SEPARATOR))
    }

    /// Image of a sparse page: rendered if possible, else embedded
    fn page_image(
        &self,
        pages: &dyn PageSource,
        pdf: &[u8],
        index: usize,
    ) -> Result<PageImage, ExtractError> {
        if let Some(renderer) = &self.renderer {
            match renderer.render_page(pdf, index) {
                Ok(image) => return Ok(image),
                Err(e) => {
                    warn!("Rendering page {} failed, trying embedded images: {}", index + 1, e);
                }
            }
        }

        pages.page_image(index)?.ok_or_else(|| {
            ExtractError::Render(format!(
                "page {} has too little text and could not be imaged",
                index + 1
            ))
        })
    }

    /// Route a page image through the image path via a scoped temp file
    fn transcribe_page(&self, image: &PageImage) -> Result<String, ExtractError> {
        let suffix = if image.mime_type == "image/png" { ".png" } else { ".jpg" };
        let mut builder = tempfile::Builder::new();
        builder.prefix("dossier-page-").suffix(suffix);
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(&image.data)?;
        file.flush()?;

        let result = self.images.extract(file.path());
        // Dropping `file` on the early returns above removes it as well
        file.close()?;
        result
    }
}

impl<L> FormatExtractor for PdfExtractor<L>
where
    L: LlmProvider + Send + Sync,
    L::Error: Display,
{
    fn name(&self) -> &str {
        "pdf"
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        debug!("Extracting PDF: {:?}", path);
        let bytes = std::fs::read(path)?;
        let pages = LopdfPages::load_mem(&bytes)?;
        self.extract_pages(&pages, &bytes)
    }
}
