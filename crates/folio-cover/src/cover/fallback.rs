// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fallback cover generator — draws a gradient placeholder with the title and
// author when no usable page image exists.
//
// Text is drawn from the `font8x8` bitmap glyphs scaled up with filled
// rectangles, so no font files are needed at runtime.

use folio_core::error::Result;
use folio_core::{CoverConfig, CoverPalette, EncodedImage};
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut};
use imageproc::rect::Rect;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::image::codec;

pub const COVER_WIDTH: u32 = 400;
pub const COVER_HEIGHT: u32 = 600;

/// Title used when neither metadata nor filename yields one.
pub const UNTITLED: &str = "Untitled Book";

const GLYPH_SIZE: u32 = 8;
const TITLE_SCALE: u32 = 3;
const AUTHOR_SCALE: u32 = 2;
const TITLE_MAX_WIDTH: u32 = 350;
const TITLE_TOP: i32 = 200;
const TITLE_LINE_PITCH: i32 = 40;
const AUTHOR_TOP: i32 = 450;

const TILE_SIZE: u32 = 20;
const TILE_PITCH: usize = 40;
const RULE_X: (i32, i32) = (50, 350);
const RULE_Y: i32 = 350;
const RULE_THICKNESS: u32 = 2;

// White at 10%, 50%, 90% and full opacity.
const TILE_COLOUR: Rgba<u8> = Rgba([255, 255, 255, 26]);
const RULE_COLOUR: Rgba<u8> = Rgba([255, 255, 255, 128]);
const AUTHOR_COLOUR: Rgba<u8> = Rgba([255, 255, 255, 230]);
const TITLE_COLOUR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Top and bottom gradient stops.
pub type GradientStops = ([u8; 3], [u8; 3]);

const FIXED_GRADIENT: GradientStops = ([0x66, 0x7e, 0xea], [0x76, 0x4b, 0xa2]);

/// Blue, green, yellow, red, purple, cyan.
const ROTATING_GRADIENTS: [GradientStops; 6] = [
    ([0x3B, 0x82, 0xF6], [0x1E, 0x40, 0xAF]),
    ([0x10, 0xB9, 0x81], [0x04, 0x78, 0x57]),
    ([0xF5, 0x9E, 0x0B], [0xD9, 0x77, 0x06]),
    ([0xEF, 0x44, 0x44], [0xDC, 0x26, 0x26]),
    ([0x8B, 0x5C, 0xF6], [0x7C, 0x3A, 0xED]),
    ([0x06, 0xB6, 0xD4], [0x08, 0x91, 0xB2]),
];

/// Draws 400x600 placeholder covers.
#[derive(Debug, Clone, Default)]
pub struct FallbackCoverGenerator {
    config: CoverConfig,
}

impl FallbackCoverGenerator {
    pub fn new(config: CoverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoverConfig {
        &self.config
    }

    /// Gradient stops for a title under the configured palette.
    ///
    /// The rotating palette keys off the SHA-256 of the title, so a book keeps
    /// its colours across uploads.
    pub fn gradient_for(&self, title: &str) -> GradientStops {
        match self.config.palette {
            CoverPalette::Fixed => FIXED_GRADIENT,
            CoverPalette::Rotating => {
                let digest = Sha256::digest(title.as_bytes());
                ROTATING_GRADIENTS[usize::from(digest[0]) % ROTATING_GRADIENTS.len()]
            }
        }
    }

    /// Draw the cover in memory. An empty title is drawn as "Untitled Book";
    /// a blank author draws no byline.
    pub fn render(&self, title: &str, author: Option<&str>) -> RgbaImage {
        let title = match title.trim() {
            "" => UNTITLED,
            trimmed => trimmed,
        };
        let (top, bottom) = self.gradient_for(title);
        let mut canvas = Blend(vertical_gradient(top, bottom));

        for y in (0..COVER_HEIGHT).step_by(TILE_PITCH) {
            for x in (0..COVER_WIDTH).step_by(TILE_PITCH) {
                draw_filled_rect_mut(
                    &mut canvas,
                    Rect::at(x as i32, y as i32).of_size(TILE_SIZE, TILE_SIZE),
                    TILE_COLOUR,
                );
            }
        }

        let mut line_top = TITLE_TOP;
        for line in wrap_title(title, TITLE_MAX_WIDTH, TITLE_SCALE) {
            draw_centered_text(&mut canvas, &line, line_top, TITLE_SCALE, TITLE_COLOUR);
            line_top += TITLE_LINE_PITCH;
        }

        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(RULE_X.0, RULE_Y).of_size((RULE_X.1 - RULE_X.0) as u32, RULE_THICKNESS),
            RULE_COLOUR,
        );

        if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
            let byline = format!("by {author}");
            draw_centered_text(&mut canvas, &byline, AUTHOR_TOP, AUTHOR_SCALE, AUTHOR_COLOUR);
        }

        canvas.0
    }

    /// Draw the cover and encode it as JPEG.
    #[instrument(skip(self), fields(palette = ?self.config.palette))]
    pub fn generate(&self, title: &str, author: Option<&str>) -> Result<EncodedImage> {
        let cover = self.render(title, author);
        let encoded = codec::encode_rgba_jpeg(&cover, self.config.jpeg_quality)?;
        debug!(bytes = encoded.bytes().len(), "Fallback cover generated");
        Ok(encoded)
    }
}

fn vertical_gradient(top: [u8; 3], bottom: [u8; 3]) -> RgbaImage {
    let span = (COVER_HEIGHT - 1) as f32;
    RgbaImage::from_fn(COVER_WIDTH, COVER_HEIGHT, |_, y| {
        let t = y as f32 / span;
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba([mix(top[0], bottom[0]), mix(top[1], bottom[1]), mix(top[2], bottom[2]), 255])
    })
}

/// Rendered width in pixels of `text` at the given glyph scale.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE * scale
}

/// Greedy word wrap: a word moves to the next line when adding it would make
/// the current line wider than `max_width`. Over-long single words keep a
/// line of their own.
pub fn wrap_title(title: &str, max_width: u32, scale: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in title.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if text_width(&candidate, scale) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_centered_text(
    canvas: &mut Blend<RgbaImage>,
    text: &str,
    top: i32,
    scale: u32,
    colour: Rgba<u8>,
) {
    let width = text_width(text, scale) as i32;
    let mut left = (COVER_WIDTH as i32 - width) / 2;
    let cell = (GLYPH_SIZE * scale) as i32;
    for ch in text.chars() {
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1u8 << col) == 0 {
                    continue;
                }
                let x = left + (col * scale) as i32;
                let y = top + row as i32 * scale as i32;
                draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(scale, scale), colour);
            }
        }
        left += cell;
    }
}
