// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster codec — conversions between `RasterImage` and the `image` crate's
// buffers, and JPEG/PNG encoding of finished covers.

use std::io::Cursor;

use folio_core::error::{FolioError, Result};
use folio_core::{EncodedImage, RasterImage};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use tracing::debug;

pub const JPEG_MIME: &str = "image/jpeg";
pub const PNG_MIME: &str = "image/png";

/// Copy a validated raster into an `RgbaImage`.
pub fn to_rgba_image(raster: &RasterImage) -> Result<RgbaImage> {
    raster.validate()?;
    RgbaImage::from_raw(raster.width(), raster.height(), raster.pixels().to_vec()).ok_or_else(
        || {
            FolioError::MalformedRaster(format!(
                "buffer does not fit {}x{}",
                raster.width(),
                raster.height()
            ))
        },
    )
}

/// Wrap an `RgbaImage` as a raster without copying.
pub fn from_rgba_image(image: RgbaImage) -> RasterImage {
    let (width, height) = image.dimensions();
    RasterImage::from_raw(width, height, image.into_raw())
}

/// Convert any decoded image into an RGBA raster.
pub fn from_dynamic(image: &DynamicImage) -> RasterImage {
    from_rgba_image(image.to_rgba8())
}

/// Composite an RGBA image over an opaque white background.
///
/// JPEG carries no alpha channel, so faded pixels have to be resolved against
/// the page colour before encoding.
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let a = u16::from(a);
        let over = |c: u8| -> u8 { ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8 };
        Rgb([over(r), over(g), over(b)])
    })
}

/// Encode a raster as JPEG with the given quality (1-100).
pub fn encode_jpeg(raster: &RasterImage, quality: u8) -> Result<EncodedImage> {
    let rgba = to_rgba_image(raster)?;
    encode_rgba_jpeg(&rgba, quality)
}

/// Encode an `RgbaImage` as JPEG with the given quality (1-100).
pub fn encode_rgba_jpeg(image: &RgbaImage, quality: u8) -> Result<EncodedImage> {
    let rgb = flatten_onto_white(image);
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|err| FolioError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    debug!(bytes = buffer.len(), quality, "JPEG encoded");
    Ok(EncodedImage::new(JPEG_MIME, buffer))
}

/// Encode a raster as lossless PNG, alpha preserved.
pub fn encode_png(raster: &RasterImage) -> Result<EncodedImage> {
    let rgba = to_rgba_image(raster)?;
    let mut buffer = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|err| FolioError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(EncodedImage::new(PNG_MIME, buffer))
}
