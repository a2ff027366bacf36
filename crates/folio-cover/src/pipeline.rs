// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload pipeline — turns one uploaded PDF into a pre-filled `BookDraft`.
//
// Steps: clean the filename, read and sanitise metadata, render the cover page
// and strip watermarks from it (or draw a placeholder), then derive title,
// author, description and publish year. Every upload is processed on its own;
// nothing is shared between calls.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use folio_core::error::{FolioError, Result};
use folio_core::{
    BookDraft, CoverSource, DocumentMetadata, EncodedImage, FolioConfig, PipelineConfig,
    RasterImage,
};
use tracing::{debug, info, instrument, warn};

use crate::cover::fallback::{FallbackCoverGenerator, UNTITLED};
use crate::image::codec;
use crate::image::watermark::WatermarkProcessor;
use crate::text::metadata::MetadataExtractor;
use crate::text::sanitize::TextSanitizer;

/// Anything that can report a document's `/Info`-style metadata.
pub trait MetadataSource {
    fn metadata(&self) -> Result<DocumentMetadata>;
}

impl MetadataSource for DocumentMetadata {
    fn metadata(&self) -> Result<DocumentMetadata> {
        Ok(self.clone())
    }
}

/// Rasterises a page of the uploaded document.
pub trait PageRenderer {
    /// Render the zero-based `page_index` at `scale` times its natural size.
    fn render_page(&self, page_index: u32, scale: f32) -> Result<RasterImage>;
}

/// A page image rendered ahead of time by an external tool.
///
/// Only page 0 exists; the scale is ignored since the image already has its
/// final resolution.
#[derive(Debug, Clone)]
pub struct PrerenderedPage {
    path: PathBuf,
}

impl PrerenderedPage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageRenderer for PrerenderedPage {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn render_page(&self, page_index: u32, _scale: f32) -> Result<RasterImage> {
        if page_index != 0 {
            return Err(FolioError::Render(format!(
                "pre-rendered image only holds page 0, asked for {page_index}"
            )));
        }
        let img = image::open(&self.path).map_err(|err| {
            FolioError::Render(format!("failed to open {}: {}", self.path.display(), err))
        })?;
        debug!(width = img.width(), height = img.height(), "Page image loaded");
        Ok(codec::from_dynamic(&img))
    }
}

/// Builds book drafts from uploads.
#[derive(Debug, Clone, Default)]
pub struct UploadPipeline {
    config: PipelineConfig,
    processor: WatermarkProcessor,
    generator: FallbackCoverGenerator,
}

impl UploadPipeline {
    pub fn new(config: FolioConfig) -> Self {
        Self {
            config: config.pipeline,
            processor: WatermarkProcessor::new(config.watermark),
            generator: FallbackCoverGenerator::new(config.cover),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce a draft for one upload.
    ///
    /// Metadata and rendering failures are absorbed; the only error that
    /// reaches the caller is a failure to encode the placeholder cover.
    #[instrument(skip(self, source, renderer))]
    pub fn extract_draft(
        &self,
        file_name: &str,
        source: &dyn MetadataSource,
        renderer: Option<&dyn PageRenderer>,
    ) -> Result<BookDraft> {
        let cleaned_name = TextSanitizer::clean_filename(file_name);
        let metadata = MetadataExtractor::extract_clean_metadata(source);

        let (cover, cover_source) = match self.extract_cover(renderer) {
            Some(cover) => (cover, CoverSource::Extracted),
            None => {
                let label = non_empty(&cleaned_name).unwrap_or(UNTITLED);
                (self.generator.generate(label, None)?, CoverSource::Fallback)
            }
        };

        let title = metadata
            .title
            .clone()
            .or_else(|| non_empty(&cleaned_name).map(str::to_string))
            .unwrap_or_else(|| UNTITLED.to_string());
        let author = metadata.author.clone();
        let description = build_description(
            &title,
            author.as_deref(),
            metadata.subject.as_deref(),
        );
        let publish_year =
            resolve_publish_year(metadata.creation_date.as_deref(), Utc::now().year());

        info!(%title, has_author = author.is_some(), ?cover_source, publish_year, "Draft ready");

        Ok(BookDraft {
            title,
            author,
            description,
            publish_year,
            cover,
            cover_source,
            metadata,
        })
    }

    /// Render and clean the cover page. `None` means the placeholder is needed.
    fn extract_cover(&self, renderer: Option<&dyn PageRenderer>) -> Option<EncodedImage> {
        let renderer = renderer?;
        let raster = renderer
            .render_page(self.config.cover_page, self.config.render_scale)
            .and_then(|raster| raster.validate().map(|_| raster));
        let raster = match raster {
            Ok(raster) => raster,
            Err(err) => {
                warn!(error = %err, "Cover page unusable, drawing placeholder");
                return None;
            }
        };
        match self.processor.process_to_jpeg(raster, self.config.jpeg_quality) {
            Ok(cover) => Some(cover),
            Err(err) => {
                warn!(error = %err, "Cover encoding failed, drawing placeholder");
                None
            }
        }
    }
}

/// Stock description text, leading with the subject when there is one.
pub fn build_description(title: &str, author: Option<&str>, subject: Option<&str>) -> String {
    let byline = author.map(|a| format!(" by {a}")).unwrap_or_default();
    match subject {
        Some(subject) => format!(
            "{subject}\n\nThis is \"{title}\"{byline} - a comprehensive book with valuable \
             content. Please update this description with more specific details about the \
             content and themes."
        ),
        None => format!(
            "This is \"{title}\"{byline} - a comprehensive book that offers valuable insights \
             and knowledge. Please update this description with more specific details about \
             the content, themes, and what readers can expect to learn from this book."
        ),
    }
}

/// Year of a PDF (`D:YYYY...`) or ISO date when it is after 1900, otherwise
/// `fallback`.
pub fn resolve_publish_year(date: Option<&str>, fallback: i32) -> i32 {
    date.and_then(parse_year)
        .filter(|year| *year > 1900)
        .unwrap_or(fallback)
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Some(pdf_date) = raw.strip_prefix("D:") {
        let digits = pdf_date.get(..4)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return digits.parse().ok();
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.year());
    }
    NaiveDate::parse_and_remainder(raw, "%Y-%m-%d")
        .ok()
        .map(|(date, _)| date.year())
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
