// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio cover engine.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{FolioError, Result};

/// Bytes per RGBA pixel.
pub const RGBA_CHANNELS: usize = 4;

/// A rasterised page: `width * height` RGBA pixels in row-major order.
///
/// Construction through [`RasterImage::from_raw`] performs no checks, because
/// the buffer usually comes straight from an external renderer. Call
/// [`RasterImage::validate`] before indexing into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Build a raster and check the buffer length matches the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let raster = Self::from_raw(width, height, pixels);
        raster.validate()?;
        Ok(raster)
    }

    /// Wrap a buffer without validating it.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A raster where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * RGBA_CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self::from_raw(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Buffer length required for the given dimensions, or `None` on overflow.
    pub fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(RGBA_CHANNELS)
    }

    /// Check dimensions are non-zero and the buffer holds exactly one RGBA
    /// quadruple per pixel.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FolioError::MalformedRaster(format!(
                "zero dimension ({}x{})",
                self.width, self.height
            )));
        }
        let expected = Self::expected_len(self.width, self.height).ok_or_else(|| {
            FolioError::MalformedRaster(format!(
                "dimensions {}x{} overflow the address space",
                self.width, self.height
            ))
        })?;
        if self.pixels.len() != expected {
            return Err(FolioError::MalformedRaster(format!(
                "buffer holds {} bytes, expected {} for {}x{}",
                self.pixels.len(),
                expected,
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    /// Byte offset of pixel `(x, y)`. Callers must stay within bounds.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS
    }

    /// RGBA value at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        self.pixels
            .get(i..i + RGBA_CHANNELS)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Raw document-level metadata as reported by a PDF library.
///
/// Accepts both snake_case keys and the PDF `/Info` key names
/// (`Title`, `ModDate`, ...) when deserialised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    #[serde(alias = "Title")]
    pub title: Option<String>,
    #[serde(alias = "Author")]
    pub author: Option<String>,
    #[serde(alias = "Subject")]
    pub subject: Option<String>,
    #[serde(alias = "Creator")]
    pub creator: Option<String>,
    #[serde(alias = "Producer")]
    pub producer: Option<String>,
    #[serde(alias = "CreationDate", alias = "creationDate")]
    pub creation_date: Option<String>,
    #[serde(alias = "ModDate", alias = "modificationDate")]
    pub modification_date: Option<String>,
}

/// Metadata after watermark cleanup and author selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedMetadata {
    pub title: Option<String>,
    /// Only set when a genuine (non system-generated) author was found.
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

impl SanitizedMetadata {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// An encoded raster (JPEG, PNG) ready to hand to the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: &'static str,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime_type: &'static str, bytes: Vec<u8>) -> Self {
        Self { mime_type, bytes }
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:<mime>;base64,<payload>` form used by `<img src>` and the book API.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

impl Serialize for EncodedImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

/// Where a draft's cover came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverSource {
    /// First page rendered and passed through the watermark filters.
    Extracted,
    /// Placeholder drawn by the fallback generator.
    Fallback,
}

/// Pre-filled book form produced for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub title: String,
    /// Left empty rather than filled with a placeholder when unknown.
    pub author: Option<String>,
    pub description: String,
    pub publish_year: i32,
    pub cover: EncodedImage,
    pub cover_source: CoverSource,
    pub metadata: SanitizedMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_new_rejects_short_buffer() {
        let err = RasterImage::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, FolioError::MalformedRaster(_)));
    }

    #[test]
    fn raster_new_rejects_zero_dimension() {
        assert!(RasterImage::new(0, 10, Vec::new()).is_err());
        assert!(RasterImage::new(10, 0, Vec::new()).is_err());
    }

    #[test]
    fn raster_filled_has_expected_length_and_pixels() {
        let raster = RasterImage::filled(3, 2, [1, 2, 3, 4]);
        assert!(raster.validate().is_ok());
        assert_eq!(raster.pixels().len(), 24);
        assert_eq!(raster.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(raster.pixel(3, 0), None);
    }

    #[test]
    fn document_metadata_accepts_pdf_info_keys() {
        let json = r#"{ "Title": "Dune", "Author": "Frank Herbert", "ModDate": "D:2001" }"#;
        let meta: DocumentMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Dune"));
        assert_eq!(meta.author.as_deref(), Some("Frank Herbert"));
        assert_eq!(meta.modification_date.as_deref(), Some("D:2001"));
        assert!(meta.subject.is_none());
    }

    #[test]
    fn sanitized_metadata_serialises_camel_case() {
        let meta = SanitizedMetadata {
            creation_date: Some("D:2020".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["creationDate"], "D:2020");
        assert!(json["author"].is_null());
        assert!(!meta.is_empty());
        assert!(SanitizedMetadata::default().is_empty());
    }

    #[test]
    fn encoded_image_data_url() {
        let img = EncodedImage::new("image/jpeg", vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(img.to_data_url(), "data:image/jpeg;base64,/9j/");
        let json = serde_json::to_value(&img).unwrap();
        assert_eq!(json, "data:image/jpeg;base64,/9j/");
    }
}
