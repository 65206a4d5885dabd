//! Word chunker

use std::num::NonZeroUsize;

use crate::transcript::Word;

/// One on-screen caption: up to `K` consecutive words
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionChunk {
    /// 0-based position in the caption sequence
    pub index: usize,
    /// The chunk's words joined by single spaces
    pub text: String,
    /// Number of words in this chunk
    pub word_count: usize,
    /// Source segment of the chunk's first word
    pub anchor_segment: usize,
    /// Relative position of the first word inside its segment
    pub anchor_offset: f64,
}

impl CaptionChunk {
    /// Iterate the chunk's words in order
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ')
    }
}

/// Group words into chunks of `chunk_size`, in order.
///
/// The last chunk holds the remainder when the word count is not a
/// multiple of `chunk_size`; it is never padded or dropped.
pub fn chunk_words(words: &[Word], chunk_size: NonZeroUsize) -> Vec<CaptionChunk> {
    let chunks: Vec<CaptionChunk> = words
        .chunks(chunk_size.get())
        .enumerate()
        .map(|(index, group)| {
            let first = &group[0];
            CaptionChunk {
                index,
                text: group
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                word_count: group.len(),
                anchor_segment: first.segment,
                anchor_offset: first.offset,
            }
        })
        .collect();

    tracing::debug!(
        "Grouped {} words into {} captions of up to {}",
        words.len(),
        chunks.len(),
        chunk_size
    );

    chunks
}
