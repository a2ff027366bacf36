// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark suppression — a fixed three-stage filter pipeline over a rendered
// page raster: translucent overlay fading, repeated-block fading, and a
// contrast boost. Every stage mutates the RGBA buffer in place and never
// changes its length.

use folio_core::error::{FolioError, Result};
use folio_core::{EncodedImage, RGBA_CHANNELS, RasterImage, WatermarkConfig};
use tracing::{debug, info, instrument, warn};

use crate::image::codec;

/// Counters describing what one pipeline run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatermarkReport {
    /// Pixels faded by the overlay stage.
    pub overlay_pixels: usize,
    /// Blocks faded at least once by the repetition stage.
    pub repeated_blocks: usize,
    /// Block pairs whose full similarity score had to be computed.
    pub block_comparisons: usize,
}

/// Best-effort watermark remover for rendered book pages.
///
/// The filters are heuristics. Real content that happens to be light and
/// translucent, or that repeats at block granularity, is faded as well.
/// Running the pipeline twice is not idempotent: the contrast stage shifts
/// colours, which changes the next run's similarity scores.
#[derive(Debug, Clone, Default)]
pub struct WatermarkProcessor {
    config: WatermarkConfig,
}

impl WatermarkProcessor {
    pub fn new(config: WatermarkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Run the full pipeline and return the cleaned raster.
    ///
    /// Never fails: if any stage reports an error the untouched input is
    /// returned and a warning is logged.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn process(&self, raster: RasterImage) -> RasterImage {
        let mut working = raster.clone();
        match self.try_process(&mut working) {
            Ok(report) => {
                info!(
                    overlay_pixels = report.overlay_pixels,
                    repeated_blocks = report.repeated_blocks,
                    "Watermark suppression complete"
                );
                working
            }
            Err(err) => {
                warn!(error = %err, "Watermark removal failed, using original image");
                raster
            }
        }
    }

    /// Run the pipeline and encode the result as JPEG.
    pub fn process_to_jpeg(&self, raster: RasterImage, quality: u8) -> Result<EncodedImage> {
        let cleaned = self.process(raster);
        codec::encode_jpeg(&cleaned, quality)
    }

    /// Run every stage in order on `raster`, propagating the first error.
    ///
    /// On error the buffer may be partially processed; [`Self::process`]
    /// works on a copy for that reason.
    pub fn try_process(&self, raster: &mut RasterImage) -> Result<WatermarkReport> {
        raster.validate()?;
        let overlay_pixels = self.suppress_translucent_overlays(raster)?;
        let (repeated_blocks, block_comparisons) = self.suppress_repeated_blocks(raster)?;
        self.enhance_contrast(raster)?;
        Ok(WatermarkReport {
            overlay_pixels,
            repeated_blocks,
            block_comparisons,
        })
    }

    // -- Stage 1: translucent overlays -----------------------------------------

    /// Fade light, partially transparent pixels. Opaque and near-invisible
    /// pixels are left alone.
    fn suppress_translucent_overlays(&self, raster: &mut RasterImage) -> Result<usize> {
        raster.validate()?;
        let floor = self.config.alpha_floor;
        let threshold = self.config.brightness_threshold;
        let reduction = self.config.alpha_reduction;

        let mut faded = 0usize;
        for px in raster.pixels_mut().chunks_exact_mut(RGBA_CHANNELS) {
            let alpha = px[3];
            if alpha <= floor || alpha == u8::MAX {
                continue;
            }
            let brightness = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
            if brightness > threshold {
                px[3] = alpha.saturating_sub(reduction);
                faded += 1;
            }
        }

        debug!(faded, "Overlay stage complete");
        Ok(faded)
    }

    // -- Stage 2: repeated blocks ----------------------------------------------

    /// Fade every block that closely resembles an earlier block in raster
    /// order. A block is faded once per earlier block it matches.
    ///
    /// Pairwise comparison is quadratic in the number of blocks. Pairs whose
    /// per-channel sums already differ by more than the similarity threshold
    /// allows are skipped without a full comparison.
    fn suppress_repeated_blocks(&self, raster: &mut RasterImage) -> Result<(usize, usize)> {
        raster.validate()?;
        let size = self.config.block_size;
        if size == 0 {
            return Err(FolioError::MalformedRaster("block size of zero".into()));
        }

        let cols = raster.width() / size;
        let rows = raster.height() / size;

        // Similarity only looks at RGB and this stage only writes alpha, so
        // sampling every block up front sees the same values as sampling lazily.
        let mut blocks = Vec::with_capacity(cols as usize * rows as usize);
        for row in 0..rows {
            for col in 0..cols {
                let block = ImageBlock::sample(raster, col * size, row * size, size)
                    .ok_or_else(|| {
                        FolioError::MalformedRaster(format!(
                            "block at ({}, {}) falls outside the buffer",
                            col * size,
                            row * size
                        ))
                    })?;
                blocks.push(block);
            }
        }
        if blocks.len() < 2 {
            return Ok((0, 0));
        }

        let max_diff = blocks[0].max_difference();
        let allowed = (1.0 - self.config.similarity_threshold) * max_diff;
        let mut hits = vec![0u32; blocks.len()];
        let mut comparisons = 0usize;

        for (i, earlier) in blocks.iter().enumerate() {
            for (later, hit) in blocks[i + 1..].iter().zip(hits[i + 1..].iter_mut()) {
                if earlier.channel_sum_distance(later) as f64 >= allowed {
                    continue;
                }
                comparisons += 1;
                if earlier.similarity(later) > self.config.similarity_threshold {
                    *hit += 1;
                }
            }
        }

        let reduction = u32::from(self.config.alpha_reduction);
        let mut faded = 0usize;
        for (block, &count) in blocks.iter().zip(&hits) {
            if count == 0 {
                continue;
            }
            let total = (count.saturating_mul(reduction)).min(u32::from(u8::MAX)) as u8;
            fade_block(raster, block.x, block.y, block.size, total);
            faded += 1;
        }

        debug!(
            blocks = blocks.len(),
            comparisons,
            faded,
            "Repetition stage complete"
        );
        Ok((faded, comparisons))
    }

    // -- Stage 3: contrast -----------------------------------------------------

    /// Stretch RGB channels around mid-grey. Alpha is untouched.
    fn enhance_contrast(&self, raster: &mut RasterImage) -> Result<()> {
        raster.validate()?;
        let table = contrast_table(self.config.contrast_level);
        for px in raster.pixels_mut().chunks_exact_mut(RGBA_CHANNELS) {
            px[0] = table[px[0] as usize];
            px[1] = table[px[1] as usize];
            px[2] = table[px[2] as usize];
        }
        Ok(())
    }
}

/// Lookup table for `factor * (c - 128) + 128`, clamped to the byte range.
fn contrast_table(factor: f32) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (value, slot) in table.iter_mut().enumerate() {
        let adjusted = factor * (value as f32 - 128.0) + 128.0;
        *slot = adjusted.round().clamp(0.0, 255.0) as u8;
    }
    table
}

/// Subtract `amount` from the alpha of every pixel in a square block.
fn fade_block(raster: &mut RasterImage, x: u32, y: u32, size: u32, amount: u8) {
    let width = raster.width();
    let height = raster.height();
    let x_end = (x + size).min(width);
    for row in y..(y + size).min(height) {
        let start = raster.offset(x, row);
        let end = raster.offset(x_end, row);
        for px in raster.pixels_mut()[start..end].chunks_exact_mut(RGBA_CHANNELS) {
            px[3] = px[3].saturating_sub(amount);
        }
    }
}

/// A square RGBA sample taken from a raster, used only for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    pub x: u32,
    pub y: u32,
    pub size: u32,
    data: Vec<u8>,
    channel_sums: [u64; 3],
}

impl ImageBlock {
    /// Copy the `size x size` block whose top-left corner is `(x, y)`.
    ///
    /// Returns `None` when the block does not fit inside the raster or the
    /// raster buffer is malformed.
    pub fn sample(raster: &RasterImage, x: u32, y: u32, size: u32) -> Option<Self> {
        if size == 0 || x.checked_add(size)? > raster.width() || y.checked_add(size)? > raster.height() {
            return None;
        }
        let row_bytes = size as usize * RGBA_CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * size as usize);
        for row in y..y + size {
            let start = raster.offset(x, row);
            data.extend_from_slice(raster.pixels().get(start..start + row_bytes)?);
        }

        let mut channel_sums = [0u64; 3];
        for px in data.chunks_exact(RGBA_CHANNELS) {
            channel_sums[0] += u64::from(px[0]);
            channel_sums[1] += u64::from(px[1]);
            channel_sums[2] += u64::from(px[2]);
        }

        Some(Self {
            x,
            y,
            size,
            data,
            channel_sums,
        })
    }

    /// Largest possible summed RGB difference against a block of equal size.
    pub fn max_difference(&self) -> f64 {
        (self.data.len() / RGBA_CHANNELS) as f64 * 3.0 * 255.0
    }

    /// Score in `0.0..=1.0`: one minus the summed absolute RGB difference over
    /// the largest possible difference. Alpha is ignored. Blocks of different
    /// sizes score zero.
    pub fn similarity(&self, other: &ImageBlock) -> f64 {
        if self.data.len() != other.data.len() || self.data.is_empty() {
            return 0.0;
        }
        let total: u64 = self
            .data
            .chunks_exact(RGBA_CHANNELS)
            .zip(other.data.chunks_exact(RGBA_CHANNELS))
            .map(|(a, b)| {
                u64::from(a[0].abs_diff(b[0]))
                    + u64::from(a[1].abs_diff(b[1]))
                    + u64::from(a[2].abs_diff(b[2]))
            })
            .sum();
        1.0 - total as f64 / self.max_difference()
    }

    /// Lower bound on the summed RGB difference, from per-channel totals.
    fn channel_sum_distance(&self, other: &ImageBlock) -> u64 {
        self.channel_sums
            .iter()
            .zip(&other.channel_sums)
            .map(|(a, b)| a.abs_diff(*b))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> WatermarkProcessor {
        WatermarkProcessor::default()
    }

    /// Paint a rectangle of one RGBA value into a raster.
    fn paint(raster: &mut RasterImage, x0: u32, y0: u32, w: u32, h: u32, rgba: [u8; 4]) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let i = raster.offset(x, y);
                raster.pixels_mut()[i..i + 4].copy_from_slice(&rgba);
            }
        }
    }

    #[test]
    fn all_zero_and_all_255_buffers_process_without_error() {
        for value in [0u8, 255u8] {
            let raster = RasterImage::filled(64, 48, [value; 4]);
            let mut working = raster.clone();
            assert!(processor().try_process(&mut working).is_ok());

            let out = processor().process(raster);
            assert_eq!(out.pixels().len(), 64 * 48 * 4);
        }
    }

    #[test]
    fn malformed_buffer_returns_original_unchanged() {
        let raster = RasterImage::from_raw(10, 10, vec![200; 37]);
        let out = processor().process(raster.clone());
        assert_eq!(out, raster);
    }

    #[test]
    fn zero_dimension_returns_original_unchanged() {
        let raster = RasterImage::from_raw(0, 10, Vec::new());
        let out = processor().process(raster.clone());
        assert_eq!(out, raster);
    }

    #[test]
    fn light_translucent_pixel_is_faded() {
        let mut raster = RasterImage::filled(1, 1, [230, 230, 230, 150]);
        let faded = processor().suppress_translucent_overlays(&mut raster).unwrap();
        assert_eq!(faded, 1);
        assert_eq!(raster.pixel(0, 0).unwrap()[3], 50);
    }

    #[test]
    fn opaque_dark_and_faint_pixels_are_untouched() {
        let cases = [
            [230, 230, 230, 255], // opaque
            [230, 230, 230, 50],  // at the invisibility floor
            [40, 40, 40, 150],    // translucent but dark
        ];
        for rgba in cases {
            let mut raster = RasterImage::filled(1, 1, rgba);
            processor().suppress_translucent_overlays(&mut raster).unwrap();
            assert_eq!(raster.pixel(0, 0).unwrap(), rgba);
        }
    }

    #[test]
    fn alpha_reduction_floors_at_zero() {
        let mut raster = RasterImage::filled(1, 1, [250, 250, 250, 60]);
        processor().suppress_translucent_overlays(&mut raster).unwrap();
        assert_eq!(raster.pixel(0, 0).unwrap()[3], 0);
    }

    #[test]
    fn identical_blocks_are_similar_and_opposites_are_not() {
        let white = RasterImage::filled(20, 20, [255, 255, 255, 255]);
        let black = RasterImage::filled(20, 20, [0, 0, 0, 255]);
        let a = ImageBlock::sample(&white, 0, 0, 20).unwrap();
        let b = ImageBlock::sample(&white, 0, 0, 20).unwrap();
        let c = ImageBlock::sample(&black, 0, 0, 20).unwrap();

        assert!((a.similarity(&b) - 1.0).abs() < 1e-9);
        assert!(a.similarity(&c).abs() < 1e-9);
    }

    #[test]
    fn similarity_ignores_alpha() {
        let opaque = RasterImage::filled(4, 4, [90, 120, 150, 255]);
        let clear = RasterImage::filled(4, 4, [90, 120, 150, 0]);
        let a = ImageBlock::sample(&opaque, 0, 0, 4).unwrap();
        let b = ImageBlock::sample(&clear, 0, 0, 4).unwrap();
        assert!((a.similarity(&b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn block_outside_raster_is_rejected() {
        let raster = RasterImage::filled(30, 30, [0, 0, 0, 255]);
        assert!(ImageBlock::sample(&raster, 20, 0, 20).is_none());
        assert!(ImageBlock::sample(&raster, 10, 10, 20).is_some());
    }

    #[test]
    fn repeated_block_after_the_first_is_faded() {
        // Two identical stamps on a dark, varied background.
        let mut raster = RasterImage::filled(60, 20, [0, 0, 0, 255]);
        paint(&mut raster, 0, 0, 20, 20, [200, 30, 30, 255]);
        paint(&mut raster, 20, 0, 20, 20, [20, 200, 20, 255]);
        paint(&mut raster, 40, 0, 20, 20, [200, 30, 30, 255]);

        let (faded, _) = processor().suppress_repeated_blocks(&mut raster).unwrap();
        assert_eq!(faded, 1);
        assert_eq!(raster.pixel(5, 5).unwrap()[3], 255, "first stamp keeps its alpha");
        assert_eq!(raster.pixel(25, 5).unwrap()[3], 255, "distinct block untouched");
        assert_eq!(raster.pixel(45, 5).unwrap()[3], 155, "repeat is faded by 100");
    }

    #[test]
    fn block_matching_several_earlier_blocks_is_faded_each_time() {
        let mut raster = RasterImage::filled(60, 20, [10, 10, 10, 255]);
        processor().suppress_repeated_blocks(&mut raster).unwrap();
        assert_eq!(raster.pixel(0, 0).unwrap()[3], 255);
        assert_eq!(raster.pixel(20, 0).unwrap()[3], 155);
        assert_eq!(raster.pixel(40, 0).unwrap()[3], 55);
    }

    #[test]
    fn partial_edge_blocks_are_not_compared() {
        // 30 px wide: one full block per row, remaining 10 px ignored.
        let mut raster = RasterImage::filled(30, 20, [10, 10, 10, 255]);
        let (faded, comparisons) = processor().suppress_repeated_blocks(&mut raster).unwrap();
        assert_eq!((faded, comparisons), (0, 0));
        assert_eq!(raster.pixel(25, 5).unwrap()[3], 255);
    }

    #[test]
    fn contrast_table_matches_formula() {
        let table = contrast_table(1.2);
        assert_eq!(table[128], 128);
        assert_eq!(table[0], 0); // -25.6 clamps to 0
        assert_eq!(table[255], 255);
        assert_eq!(table[200], 214); // 1.2 * 72 + 128 = 214.4
        assert_eq!(table[100], 94); // 1.2 * -28 + 128 = 94.4
    }

    #[test]
    fn contrast_leaves_alpha_alone() {
        let mut raster = RasterImage::filled(2, 2, [200, 100, 128, 77]);
        processor().enhance_contrast(&mut raster).unwrap();
        assert_eq!(raster.pixel(1, 1).unwrap(), [214, 94, 128, 77]);
    }

    #[test]
    fn light_translucent_rectangle_ends_at_or_below_alpha_50() {
        // 200x100 page of opaque varied content with a translucent overlay
        // covering 10% of the area.
        let (w, h) = (200u32, 100u32);
        let mut raster = RasterImage::filled(w, h, [0, 0, 0, 255]);
        for y in 0..h {
            for x in 0..w {
                let i = raster.offset(x, y);
                let v = ((x * 7 + y * 13) % 256) as u8;
                raster.pixels_mut()[i..i + 4].copy_from_slice(&[v, 255 - v, v / 2, 255]);
            }
        }
        paint(&mut raster, 40, 20, 50, 40, [230, 230, 230, 150]);

        let out = processor().process(raster);
        for y in 20..60 {
            for x in 40..90 {
                let alpha = out.pixel(x, y).unwrap()[3];
                assert!(alpha <= 50, "alpha {alpha} at ({x}, {y})");
            }
        }
    }

    #[test]
    fn process_to_jpeg_produces_jpeg_bytes() {
        let raster = RasterImage::filled(40, 40, [120, 130, 140, 255]);
        let encoded = processor().process_to_jpeg(raster, 90).unwrap();
        assert_eq!(encoded.mime_type(), "image/jpeg");
        assert_eq!(&encoded.bytes()[..2], &[0xFF, 0xD8]);
    }
}
