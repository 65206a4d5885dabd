//! Caption rendering module
//!
//! Rasterises caption text into transparent overlay images.

pub mod glyph;
pub mod images;
pub mod style;

pub use glyph::{FontdueRenderer, GlyphRenderer};
pub use images::{CaptionImage, CaptionImageBuilder};
pub use style::{parse_color, CaptionStyle, Rgba};
