//! Composition plan
//!
//! The overlay chain is kept as structured nodes and only serialised to
//! ffmpeg's `-filter_complex` syntax at the last moment.

use std::fmt;
use std::path::PathBuf;

use crate::caption::CaptionInterval;
use crate::error::{CaptionError, Result};
use crate::render::CaptionImage;

/// Where a node reads its video from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRef {
    /// Video stream of input 0
    Base,
    /// Output of an earlier node in the chain
    Node(usize),
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Base => write!(f, "[0:v]"),
            StreamRef::Node(i) => write!(f, "[{}]", node_label(*i)),
        }
    }
}

/// Overlay positioning, shared by every node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayPlacement {
    /// Pixels between the caption canvas and the bottom of the frame
    pub bottom_margin: u32,
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        Self { bottom_margin: 50 }
    }
}

/// One overlay in the chain
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayNode {
    pub chunk_index: usize,
    pub activation_start: f64,
    pub activation_end: f64,
    pub video_input: StreamRef,
    /// ffmpeg input number of the caption image (base video is 0)
    pub image_input: usize,
    pub output_label: String,
}

impl OverlayNode {
    fn to_filter(&self, placement: &OverlayPlacement) -> String {
        format!(
            "{}[{}:v]overlay=x=(W-w)/2:y=H-h-{}:enable='gte(t,{:.6})*lt(t,{:.6})'[{}]",
            self.video_input,
            self.image_input,
            placement.bottom_margin,
            self.activation_start,
            self.activation_end,
            self.output_label
        )
    }
}

/// Everything the compositor needs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub base_video: PathBuf,
    pub nodes: Vec<OverlayNode>,
    pub images: Vec<CaptionImage>,
    pub placement: OverlayPlacement,
}

impl CompositionPlan {
    /// Build the chain: node 0 reads the base video, node `i` reads node `i-1`.
    ///
    /// `images` and `intervals` must be index-aligned and of equal length.
    pub fn build(
        base_video: impl Into<PathBuf>,
        images: Vec<CaptionImage>,
        intervals: &[CaptionInterval],
        placement: OverlayPlacement,
    ) -> Result<Self> {
        if images.len() != intervals.len() {
            return Err(CaptionError::GraphBuild(format!(
                "{} caption images but {} intervals",
                images.len(),
                intervals.len()
            )));
        }
        if images.is_empty() {
            return Err(CaptionError::GraphBuild(
                "nothing to overlay".to_string(),
            ));
        }

        let mut nodes = Vec::with_capacity(images.len());
        for (i, (image, interval)) in images.iter().zip(intervals).enumerate() {
            if image.chunk_index != i || interval.chunk_index != i {
                return Err(CaptionError::GraphBuild(format!(
                    "position {} holds image {} and interval {}",
                    i, image.chunk_index, interval.chunk_index
                )));
            }

            nodes.push(OverlayNode {
                chunk_index: i,
                activation_start: interval.start_secs,
                activation_end: interval.end_secs,
                video_input: if i == 0 {
                    StreamRef::Base
                } else {
                    StreamRef::Node(i - 1)
                },
                image_input: i + 1,
                output_label: node_label(i),
            });
        }

        Ok(Self {
            base_video: base_video.into(),
            nodes,
            images,
            placement,
        })
    }

    /// Label of the fully composed video stream
    pub fn output_label(&self) -> Option<&str> {
        self.nodes.last().map(|n| n.output_label.as_str())
    }

    /// Serialise the chain as a `-filter_complex` argument
    pub fn filter_graph(&self) -> String {
        self.nodes
            .iter()
            .map(|node| node.to_filter(&self.placement))
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn node_label(index: usize) -> String {
    format!("cap{}", index)
}
