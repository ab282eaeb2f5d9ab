//! Integration tests for dossier-extract
//!
//! These tests run real files through the gateway with a scripted vision
//! backend. PDFs are generated with lopdf, scanned pages carrying an image
//! XObject in the encodings scanners actually produce.

use dossier_extract::{
    ExtractError, ExtractorGateway, LopdfPages, PageImage, PageRenderer, PageSource,
};
use dossier_llm::MockProvider;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const DENSE: &str = "Minutes of the annual general meeting held at the registered office.";

/// A dense page as lopdf reads it back; each text object ends a line
fn dense_page() -> String {
    format!("{DENSE}\n")
}

/// Image XObject placed full-page on a scanned page
struct Scan {
    dict: Dictionary,
    data: Vec<u8>,
}

impl Scan {
    fn new(
        width: i64,
        height: i64,
        color_space: &str,
        bits: i64,
        filter: &str,
        data: Vec<u8>,
    ) -> Self {
        Self {
            dict: dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => color_space,
                "BitsPerComponent" => bits,
                "Filter" => filter,
            },
            data,
        }
    }

    fn jpeg() -> Self {
        let img = image::RgbImage::from_pixel(16, 16, image::Rgb([240, 240, 240]));
        let mut data = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut data), image::ImageOutputFormat::Jpeg(80))
            .unwrap();
        Self::new(16, 16, "DeviceRGB", 8, "DCTDecode", data)
    }

    fn flate(color_space: &str, channels: usize) -> Self {
        Self::new(4, 4, color_space, 8, "FlateDecode", zlib(&vec![200; 16 * channels]))
    }

    fn ccitt_group4() -> Self {
        let mut encoder = fax::encoder::Encoder::new(fax::VecWriter::new());
        for row in 0..8 {
            let line = (0..32).map(|x| {
                if row == 3 && (8..24).contains(&x) {
                    fax::Color::Black
                } else {
                    fax::Color::White
                }
            });
            encoder.encode_line(line, 32).unwrap();
        }
        let data = encoder.finish().unwrap().finish();

        let mut scan = Self::new(32, 8, "DeviceGray", 1, "CCITTFaxDecode", data);
        scan.dict.set(
            "DecodeParms",
            dictionary! { "K" => -1, "Columns" => 32, "Rows" => 8 },
        );
        scan
    }
}

fn zlib(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Build a PDF with one page per entry: its text, and optionally a scan
fn build_pdf(pages: Vec<(&str, Option<Scan>)>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for (text, scan) in pages {
        let mut operations = Vec::new();
        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };

        if let Some(scan) = scan {
            let image_id = doc.add_object(Stream::new(scan.dict, scan.data));
            resources.set("XObject", dictionary! { "Im1" => image_id });
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![612.into(), 0.into(), 0.into(), 792.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ]);
        }
        if !text.is_empty() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ]);
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn text_pdf(pages: &[&str]) -> Vec<u8> {
    build_pdf(pages.iter().map(|text| (*text, None)).collect())
}

/// Renderer that records which pages it was asked for
#[derive(Default)]
struct RecordingRenderer {
    rendered: Mutex<Vec<usize>>,
}

impl PageRenderer for RecordingRenderer {
    fn render_page(&self, pdf: &[u8], index: usize) -> Result<PageImage, ExtractError> {
        assert!(pdf.starts_with(b"%PDF-"));
        self.rendered.lock().unwrap().push(index);
        Ok(PageImage {
            data: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png",
        })
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    path: PathBuf,
    provider: Arc<MockProvider>,
}

impl Fixture {
    fn new(pdf: Vec<u8>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.pdf");
        std::fs::write(&path, pdf).unwrap();
        Self {
            _dir: dir,
            path,
            provider: Arc::new(MockProvider::new("SCAN")),
        }
    }

    /// Gateway that has to make do with embedded images
    fn gateway(&self) -> ExtractorGateway {
        ExtractorGateway::with_renderer(Arc::clone(&self.provider), 50, None)
    }

    fn extract(&self) -> Result<String, ExtractError> {
        self.gateway().extract(&self.path)
    }
}

#[test]
fn test_page_count_from_generated_pdf() {
    let pages = LopdfPages::load_mem(&text_pdf(&["one", "two", "three"])).unwrap();
    assert_eq!(pages.page_count(), 3);
    // No embedded images on these pages
    assert!(pages.page_image(0).unwrap().is_none());
    assert!(pages.page_image(3).is_err());
}

#[test]
fn test_sparse_text_pages_rendered_and_transcribed() {
    let fixture = Fixture::new(text_pdf(&["p. 1", DENSE, "p. 3"]));
    let renderer = Arc::new(RecordingRenderer::default());
    let gateway = ExtractorGateway::with_renderer(
        Arc::clone(&fixture.provider),
        50,
        Some(renderer.clone() as Arc<dyn PageRenderer>),
    );

    let text = gateway.extract(&fixture.path).unwrap();

    assert_eq!(text, format!("SCAN\n\n{}\n\nSCAN", dense_page()));
    assert_eq!(*renderer.rendered.lock().unwrap(), vec![0, 2]);
    assert_eq!(fixture.provider.call_count(), 2);
    assert!(fixture.provider.requests().iter().all(|r| r.had_image));
}

#[test]
fn test_sparse_page_without_renderer_or_image_fails() {
    let fixture = Fixture::new(text_pdf(&["p. 1", "p. 2"]));

    assert!(matches!(fixture.extract(), Err(ExtractError::Render(_))));
    assert_eq!(fixture.provider.call_count(), 0);
}

#[test]
fn test_jpeg_scan_page_transcribed() {
    let fixture = Fixture::new(build_pdf(vec![("", Some(Scan::jpeg())), (DENSE, None)]));

    assert_eq!(fixture.extract().unwrap(), format!("SCAN\n\n{}", dense_page()));
    assert_eq!(fixture.provider.call_count(), 1);
    assert!(fixture.provider.requests()[0].had_image);
}

#[test]
fn test_flate_scan_pages_in_each_color_space() {
    let fixture = Fixture::new(build_pdf(vec![
        ("", Some(Scan::flate("DeviceGray", 1))),
        ("", Some(Scan::flate("DeviceRGB", 3))),
        (DENSE, None),
        ("", Some(Scan::flate("DeviceCMYK", 4))),
    ]));

    let expected = format!("SCAN\n\nSCAN\n\n{}\n\nSCAN", dense_page());
    assert_eq!(fixture.extract().unwrap(), expected);
    assert_eq!(fixture.provider.call_count(), 3);
}

#[test]
fn test_ccitt_scan_page_transcribed() {
    let fixture = Fixture::new(build_pdf(vec![("", Some(Scan::ccitt_group4()))]));

    let pages = LopdfPages::load_mem(&std::fs::read(&fixture.path).unwrap()).unwrap();
    let image = pages.page_image(0).unwrap().unwrap();
    assert_eq!(image.mime_type, "image/png");

    assert_eq!(fixture.extract().unwrap(), "SCAN");
    assert_eq!(fixture.provider.call_count(), 1);
}

#[test]
fn test_undecodable_scan_without_renderer_fails() {
    let jbig2 = Scan::new(32, 8, "DeviceGray", 1, "JBIG2Decode", vec![0; 16]);
    let fixture = Fixture::new(build_pdf(vec![("", Some(jbig2))]));

    assert!(matches!(fixture.extract(), Err(ExtractError::Render(_))));
    assert_eq!(fixture.provider.call_count(), 0);
}

#[test]
fn test_corrupt_pdf_reports_pdf_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("broken.pdf");
    std::fs::write(&path, b"this is not a pdf").unwrap();

    let gateway = ExtractorGateway::with_renderer(Arc::new(MockProvider::default()), 50, None);
    assert!(matches!(gateway.extract(&path), Err(ExtractError::Pdf(_))));
}

#[test]
fn test_unsupported_extension() {
    let gateway = ExtractorGateway::with_defaults(Arc::new(MockProvider::default()), 50);
    match gateway.extract(std::path::Path::new("notes.docx")) {
        Err(ExtractError::UnsupportedFormat(ext)) => assert_eq!(ext, "docx"),
        other => panic!("Expected UnsupportedFormat, got {:?}", other),
    }
}
