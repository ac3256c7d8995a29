//! Trace normalization and handoff analysis
//!
//! This module turns a runtime's raw result into the inputs the lifecycle
//! manager consumes: an ordered [`TraceItem`](crate::types::TraceItem)
//! sequence, the completed-transfer chain, and the per-step spans.

pub mod adapter;
pub mod chain;

pub use adapter::normalize;
pub use chain::{extract_chain, split_spans};
