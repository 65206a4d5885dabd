//! Caption image builder
//!
//! Renders every caption chunk and writes it as `{index}.png` into the
//! run's scratch directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::caption::CaptionChunk;
use crate::error::{CaptionError, Result};

use super::glyph::GlyphRenderer;
use super::style::CaptionStyle;

/// A rendered caption on disk
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionImage {
    pub chunk_index: usize,
    pub width: u32,
    pub height: u32,
    pub path: PathBuf,
}

pub struct CaptionImageBuilder {
    renderer: Arc<dyn GlyphRenderer>,
    style: CaptionStyle,
}

impl CaptionImageBuilder {
    pub fn new(renderer: Arc<dyn GlyphRenderer>, style: CaptionStyle) -> Self {
        Self { renderer, style }
    }

    /// Render all chunks into `dir`, in chunk order.
    ///
    /// Every image has the style's canvas size; a renderer returning any
    /// other size is an error.
    pub fn build(&self, chunks: &[CaptionChunk], dir: &Path) -> Result<Vec<CaptionImage>> {
        let mut images = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let image = self.renderer.render(&chunk.text, &self.style)?;
            let (width, height) = image.dimensions();
            if (width, height) != (self.style.canvas_width, self.style.canvas_height) {
                return Err(CaptionError::GraphBuild(format!(
                    "caption {} rendered at {}x{}, expected {}x{}",
                    chunk.index, width, height, self.style.canvas_width, self.style.canvas_height
                )));
            }

            let path = dir.join(format!("{}.png", chunk.index));
            image.save_with_format(&path, image::ImageFormat::Png)?;

            images.push(CaptionImage {
                chunk_index: chunk.index,
                width,
                height,
                path,
            });
        }

        tracing::debug!(
            "Rendered {} caption images ({}x{}) into {}",
            images.len(),
            self.style.canvas_width,
            self.style.canvas_height,
            dir.display()
        );

        Ok(images)
    }
}
