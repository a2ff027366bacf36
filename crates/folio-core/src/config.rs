// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration. Every section has defaults, so a JSON file only needs
// to name the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Top-level settings for the cover engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FolioConfig {
    /// Watermark filter thresholds.
    pub watermark: WatermarkConfig,
    /// Placeholder cover appearance.
    pub cover: CoverConfig,
    /// Upload pipeline behaviour.
    pub pipeline: PipelineConfig,
}

/// Thresholds for the three watermark filter stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Pixels with alpha at or below this are treated as invisible and left alone.
    pub alpha_floor: u8,
    /// Mean RGB brightness above which a translucent pixel counts as overlay.
    pub brightness_threshold: f32,
    /// Amount subtracted from alpha when a pixel or block is suppressed.
    pub alpha_reduction: u8,
    /// Edge length of the square blocks used for repetition detection.
    pub block_size: u32,
    /// Similarity score (0..=1) above which two blocks count as repeats.
    pub similarity_threshold: f64,
    /// Contrast multiplier applied to RGB channels in the last stage.
    pub contrast_level: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            alpha_floor: 50,
            brightness_threshold: 200.0,
            alpha_reduction: 100,
            block_size: 20,
            similarity_threshold: 0.9,
            contrast_level: 1.2,
        }
    }
}

/// Gradient selection for generated covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverPalette {
    /// Always the same indigo-to-purple gradient.
    #[default]
    Fixed,
    /// One of six colour pairs, chosen from the title.
    Rotating,
}

/// Settings for the placeholder cover generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub palette: CoverPalette,
    /// JPEG quality (1-100) for generated covers.
    pub jpeg_quality: u8,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            palette: CoverPalette::Fixed,
            jpeg_quality: 90,
        }
    }
}

/// Settings for the upload pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scale passed to the page renderer when rasterising the cover page.
    pub render_scale: f32,
    /// Zero-based index of the page used as the cover.
    pub cover_page: u32,
    /// JPEG quality (1-100) for extracted covers.
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            cover_page: 0,
            jpeg_quality: 90,
        }
    }
}

impl FolioConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject values the filters cannot work with.
    pub fn validate(&self) -> Result<()> {
        let wm = &self.watermark;
        if wm.block_size == 0 {
            return Err(FolioError::Config("watermark.block_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&wm.similarity_threshold) {
            return Err(FolioError::Config(format!(
                "watermark.similarity_threshold must be within 0..=1, got {}",
                wm.similarity_threshold
            )));
        }
        if !wm.contrast_level.is_finite() || wm.contrast_level < 0.0 {
            return Err(FolioError::Config(format!(
                "watermark.contrast_level must be a non-negative number, got {}",
                wm.contrast_level
            )));
        }
        if !self.pipeline.render_scale.is_finite() || self.pipeline.render_scale <= 0.0 {
            return Err(FolioError::Config(format!(
                "pipeline.render_scale must be > 0, got {}",
                self.pipeline.render_scale
            )));
        }
        for (name, quality) in [
            ("cover.jpeg_quality", self.cover.jpeg_quality),
            ("pipeline.jpeg_quality", self.pipeline.jpeg_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(FolioError::Config(format!(
                    "{name} must be within 1..=100, got {quality}"
                )));
            }
        }
        Ok(())
    }
}
