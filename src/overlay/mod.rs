//! Overlay graph module

pub mod plan;

pub use plan::{CompositionPlan, OverlayNode, OverlayPlacement, StreamRef};
