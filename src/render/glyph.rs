//! Text rasterisation
//!
//! Draws a caption string centred on a transparent canvas, filled with one
//! colour and outlined with another.

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::RgbaImage;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CaptionError, Result};

use super::style::{CaptionStyle, Rgba};

/// Number of parsed fonts kept in memory
const FONT_CACHE_SIZE: usize = 8;

/// Turns text plus style into a fixed-size RGBA image.
///
/// Unavailable fonts are reported as `RenderAssetMissing`; implementations
/// must not substitute another face.
pub trait GlyphRenderer: Send + Sync {
    fn render(&self, text: &str, style: &CaptionStyle) -> Result<RgbaImage>;
}

/// `fontdue`-backed renderer with a small cache of parsed fonts
pub struct FontdueRenderer {
    fonts: Mutex<LruCache<PathBuf, Arc<Font>>>,
}

impl FontdueRenderer {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(FONT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            fonts: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Load (or fetch from cache) the font at `path`
    pub fn font(&self, path: &Path) -> Result<Arc<Font>> {
        if let Some(font) = self.fonts.lock().get(path) {
            return Ok(font.clone());
        }

        let bytes = std::fs::read(path).map_err(|e| {
            CaptionError::RenderAssetMissing(format!("font {}: {}", path.display(), e))
        })?;
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| {
            CaptionError::RenderAssetMissing(format!("font {} is unreadable: {}", path.display(), e))
        })?;
        let font = Arc::new(font);

        tracing::debug!("Loaded font {}", path.display());
        self.fonts.lock().put(path.to_path_buf(), font.clone());
        Ok(font)
    }
}

impl Default for FontdueRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphRenderer for FontdueRenderer {
    fn render(&self, text: &str, style: &CaptionStyle) -> Result<RgbaImage> {
        let font = self.font(&style.font_path)?;
        let width = style.canvas_width as usize;
        let height = style.canvas_height as usize;

        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[font.as_ref()], &TextStyle::new(text, style.font_size, 0));

        let glyphs: Vec<_> = layout
            .glyphs()
            .iter()
            .filter(|g| g.width > 0 && g.height > 0)
            .cloned()
            .collect();

        let mut fill = vec![0.0_f32; width * height];

        if !glyphs.is_empty() {
            // Centre the ink box, not the advance box
            let min_x = glyphs.iter().map(|g| g.x).fold(f32::INFINITY, f32::min);
            let min_y = glyphs.iter().map(|g| g.y).fold(f32::INFINITY, f32::min);
            let max_x = glyphs
                .iter()
                .map(|g| g.x + g.width as f32)
                .fold(f32::NEG_INFINITY, f32::max);
            let max_y = glyphs
                .iter()
                .map(|g| g.y + g.height as f32)
                .fold(f32::NEG_INFINITY, f32::max);

            let ink_width = max_x - min_x;
            let ink_height = max_y - min_y;
            if ink_width > width as f32 || ink_height > height as f32 {
                tracing::warn!(
                    "Caption '{}' ({}x{}) does not fit the {}x{} canvas and will be clipped",
                    text,
                    ink_width.ceil(),
                    ink_height.ceil(),
                    width,
                    height
                );
            }

            let shift_x = (width as f32 - ink_width) / 2.0 - min_x;
            let shift_y = (height as f32 - ink_height) / 2.0 - min_y;

            for glyph in &glyphs {
                let (_, bitmap) = font.rasterize_config(glyph.key);
                blit_coverage(
                    &mut fill,
                    width,
                    height,
                    (glyph.x + shift_x).round() as i64,
                    (glyph.y + shift_y).round() as i64,
                    glyph.width,
                    glyph.height,
                    &bitmap,
                );
            }
        }

        let stroke = dilate(&fill, width, height, style.stroke_width);

        let mut canvas = RgbaImage::new(style.canvas_width, style.canvas_height);
        for (i, pixel) in canvas.pixels_mut().enumerate() {
            *pixel = image::Rgba(compose_pixel(
                fill[i],
                style.fill_color,
                stroke[i],
                style.stroke_color,
            ));
        }

        Ok(canvas)
    }
}

/// Max-blend an 8-bit coverage bitmap into a float mask, clipping at edges
#[allow(clippy::too_many_arguments)]
fn blit_coverage(
    mask: &mut [f32],
    mask_width: usize,
    mask_height: usize,
    x: i64,
    y: i64,
    glyph_width: usize,
    glyph_height: usize,
    bitmap: &[u8],
) {
    for row in 0..glyph_height {
        let py = y + row as i64;
        if py < 0 || py >= mask_height as i64 {
            continue;
        }
        for col in 0..glyph_width {
            let px = x + col as i64;
            if px < 0 || px >= mask_width as i64 {
                continue;
            }
            let coverage = bitmap[row * glyph_width + col] as f32 / 255.0;
            let idx = py as usize * mask_width + px as usize;
            if coverage > mask[idx] {
                mask[idx] = coverage;
            }
        }
    }
}

/// Grow a coverage mask by `radius` pixels using a disc
fn dilate(mask: &[f32], width: usize, height: usize, radius: u32) -> Vec<f32> {
    if radius == 0 {
        return vec![0.0; mask.len()];
    }

    let r = radius as i64;
    let offsets: Vec<(i64, i64)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
        .collect();

    let mut out = vec![0.0_f32; mask.len()];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut best = 0.0_f32;
            for &(dx, dy) in &offsets {
                let sx = x + dx;
                let sy = y + dy;
                if sx < 0 || sy < 0 || sx >= width as i64 || sy >= height as i64 {
                    continue;
                }
                let value = mask[sy as usize * width + sx as usize];
                if value > best {
                    best = value;
                    if best >= 1.0 {
                        break;
                    }
                }
            }
            out[y as usize * width + x as usize] = best;
        }
    }
    out
}

/// Fill over stroke over transparent, straight alpha
fn compose_pixel(fill_coverage: f32, fill: Rgba, stroke_coverage: f32, stroke: Rgba) -> Rgba {
    let fa = fill_coverage * fill[3] as f32 / 255.0;
    let sa = stroke_coverage * stroke[3] as f32 / 255.0;
    let alpha = fa + sa * (1.0 - fa);
    if alpha <= 0.0 {
        return [0, 0, 0, 0];
    }

    let channel = |i: usize| -> u8 {
        let value = (fill[i] as f32 * fa + stroke[i] as f32 * sa * (1.0 - fa)) / alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    [
        channel(0),
        channel(1),
        channel(2),
        (alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}
