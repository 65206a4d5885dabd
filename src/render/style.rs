//! Caption style descriptor

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::StyleConfig;
use crate::error::{CaptionError, Result};

/// Canvas width used when neither the config nor the video provide one
pub const FALLBACK_CANVAS_WIDTH: u32 = 1280;

/// Straight (non-premultiplied) RGBA colour
pub type Rgba = [u8; 4];

/// Everything needed to rasterise one caption
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_path: PathBuf,
    pub font_size: f32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub fill_color: Rgba,
    pub stroke_color: Rgba,
    pub stroke_width: u32,
}

impl CaptionStyle {
    /// Resolve a configured style.
    ///
    /// An unset canvas width follows the base video's frame width.
    pub fn from_config(config: &StyleConfig, video_width: Option<u32>) -> Result<Self> {
        let canvas_width = config
            .canvas_width
            .or(video_width.filter(|w| *w > 0))
            .unwrap_or(FALLBACK_CANVAS_WIDTH);

        if canvas_width == 0 || config.canvas_height == 0 {
            return Err(CaptionError::Config(format!(
                "caption canvas must be non-empty, got {}x{}",
                canvas_width, config.canvas_height
            )));
        }
        if !(config.font_size.is_finite() && config.font_size > 0.0) {
            return Err(CaptionError::Config(format!(
                "font_size must be positive, got {}",
                config.font_size
            )));
        }

        Ok(Self {
            font_path: config.font_path.clone(),
            font_size: config.font_size,
            canvas_width,
            canvas_height: config.canvas_height,
            fill_color: parse_color(&config.fill_color)?,
            stroke_color: parse_color(&config.stroke_color)?,
            stroke_width: config.stroke_width,
        })
    }
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})?$")
            .expect("colour pattern is valid")
    })
}

/// Parse `#RRGGBB` or `#RRGGBBAA`; alpha defaults to opaque
pub fn parse_color(value: &str) -> Result<Rgba> {
    let caps = color_pattern()
        .captures(value.trim())
        .ok_or_else(|| CaptionError::Config(format!("invalid colour '{}'", value)))?;

    let channel = |i: usize| -> u8 {
        caps.get(i)
            .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
            .unwrap_or(255)
    };

    Ok([channel(1), channel(2), channel(3), channel(4)])
}
