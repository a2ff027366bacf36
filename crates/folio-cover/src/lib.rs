// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-cover — Cover extraction for uploaded books.
//
// Provides watermark suppression on rendered page rasters, watermark/branding
// cleanup for titles, authors and filenames, author selection from document
// metadata, placeholder cover generation, and the upload pipeline that ties
// them together.

pub mod cover;
pub mod image;
pub mod pdf;
pub mod pipeline;
pub mod text;

// Re-export the primary structs so callers can use `folio_cover::WatermarkProcessor` etc.
pub use crate::cover::fallback::FallbackCoverGenerator;
pub use crate::image::watermark::{ImageBlock, WatermarkProcessor, WatermarkReport};
pub use crate::pdf::info::PdfInfoReader;
pub use crate::pipeline::{MetadataSource, PageRenderer, PrerenderedPage, UploadPipeline};
pub use crate::text::metadata::MetadataExtractor;
pub use crate::text::sanitize::TextSanitizer;
