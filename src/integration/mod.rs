//! Integration tests
//!
//! Cross-module tests that drive the whole caption pipeline and the HTTP
//! job flow against deterministic fakes.

pub mod fixtures;

mod e2e;
mod http_flow;
