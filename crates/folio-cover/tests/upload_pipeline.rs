// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests for the upload pipeline: real PDF bytes through
// `PdfInfoReader`, page images through stub and file-backed renderers.

use std::cell::RefCell;

use folio_core::error::Result;
use folio_core::{CoverPalette, CoverSource, DocumentMetadata, FolioConfig, RasterImage};
use folio_cover::{MetadataSource, PageRenderer, PdfInfoReader, PrerenderedPage, UploadPipeline};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

/// Renders a plain white page and remembers what it was asked for.
struct RecordingRenderer {
    width: u32,
    height: u32,
    calls: RefCell<Vec<(u32, f32)>>,
}

impl RecordingRenderer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl PageRenderer for RecordingRenderer {
    fn render_page(&self, page_index: u32, scale: f32) -> Result<RasterImage> {
        self.calls.borrow_mut().push((page_index, scale));
        Ok(RasterImage::filled(self.width, self.height, [250, 250, 250, 255]))
    }
}

fn pdf_with_info(info: Dictionary) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[test]
fn pdf_metadata_drives_the_draft() {
    let bytes = pdf_with_info(dictionary! {
        "Title" => Object::string_literal("Dune - www.pdfdrive.com"),
        "Author" => Object::string_literal("Administrator"),
        "Creator" => Object::string_literal("Frank Herbert"),
        "Subject" => Object::string_literal("A desert planet saga"),
        "CreationDate" => Object::string_literal("D:19650801000000Z"),
    });
    let reader = PdfInfoReader::from_bytes(&bytes).unwrap();
    let renderer = RecordingRenderer::new(120, 180);

    let draft = UploadPipeline::default()
        .extract_draft("dune_watermark.pdf", &reader, Some(&renderer))
        .unwrap();

    assert_eq!(draft.title, "Dune");
    assert_eq!(draft.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(draft.publish_year, 1965);
    assert!(draft.description.starts_with(
        "A desert planet saga\n\nThis is \"Dune\" by Frank Herbert - a comprehensive book"
    ));
    assert_eq!(draft.cover_source, CoverSource::Extracted);
    assert_eq!(draft.metadata.creation_date.as_deref(), Some("D:19650801000000Z"));

    let cover = image::load_from_memory(draft.cover.bytes()).unwrap();
    assert_eq!((cover.width(), cover.height()), (120, 180));
}

#[test]
fn renderer_receives_configured_page_and_scale() {
    let mut config = FolioConfig::default();
    config.pipeline.render_scale = 2.0;
    let renderer = RecordingRenderer::new(40, 40);

    UploadPipeline::new(config)
        .extract_draft("book.pdf", &DocumentMetadata::default(), Some(&renderer))
        .unwrap();

    assert_eq!(*renderer.calls.borrow(), vec![(0, 2.0)]);
}

#[test]
fn filename_is_used_when_metadata_is_empty() {
    let draft = UploadPipeline::default()
        .extract_draft(
            "the-rust-programming-language (watermark) v2.pdf",
            &DocumentMetadata::default(),
            None,
        )
        .unwrap();

    assert_eq!(draft.title, "The Rust Programming Language");
    assert_eq!(draft.author, None);
    assert_eq!(draft.cover_source, CoverSource::Fallback);
    assert!(draft.description.starts_with(
        "This is \"The Rust Programming Language\" - a comprehensive book that offers"
    ));
}

#[test]
fn prerendered_png_becomes_the_cover() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page0.png");
    image::RgbaImage::from_pixel(64, 96, image::Rgba([30, 60, 90, 255]))
        .save(&path)
        .unwrap();

    let page = PrerenderedPage::new(&path);
    let draft = UploadPipeline::default()
        .extract_draft("scan.pdf", &DocumentMetadata::default(), Some(&page))
        .unwrap();

    assert_eq!(draft.cover_source, CoverSource::Extracted);
    let cover = image::load_from_memory(draft.cover.bytes()).unwrap();
    assert_eq!((cover.width(), cover.height()), (64, 96));
}

#[test]
fn palette_choice_changes_the_placeholder() {
    let fixed = UploadPipeline::default()
        .extract_draft("dune.pdf", &DocumentMetadata::default(), None)
        .unwrap();

    let mut config = FolioConfig::default();
    config.cover.palette = CoverPalette::Rotating;
    let rotating = UploadPipeline::new(config)
        .extract_draft("dune.pdf", &DocumentMetadata::default(), None)
        .unwrap();

    assert_eq!(fixed.cover_source, CoverSource::Fallback);
    assert_ne!(fixed.cover, rotating.cover);
}

#[test]
fn draft_serialises_for_the_book_form() {
    let source = DocumentMetadata {
        title: Some("Dune".into()),
        ..Default::default()
    };
    let draft = UploadPipeline::default()
        .extract_draft("dune.pdf", &source as &dyn MetadataSource, None)
        .unwrap();

    let json = serde_json::to_value(&draft).unwrap();
    assert_eq!(json["title"], "Dune");
    assert!(json["author"].is_null());
    assert_eq!(json["coverSource"], "fallback");
    assert!(json["publishYear"].is_i64());
    assert!(
        json["cover"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,")
    );
    assert_eq!(json["metadata"]["title"], "Dune");
}
