//! Caption timing module
//!
//! This module turns a word sequence into on-screen caption units:
//! - Grouping words into fixed-size chunks
//! - Allocating a contiguous `[start, end)` window to every chunk

pub mod chunker;
pub mod timeline;

pub use chunker::{chunk_words, CaptionChunk};
pub use timeline::{allocate, CaptionInterval, TimingStrategy};
