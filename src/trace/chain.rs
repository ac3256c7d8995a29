//! Handoff chain extraction and span segmentation
//!
//! Pure functions over the normalized item sequence. Extraction is a
//! deterministic function of input order: the same sequence always yields
//! the same chain.

use crate::types::identifiers::AgentName;
use crate::types::items::TraceItem;

/// Extract the ordered list of completed transfers from a trace
///
/// Only [`TraceItem::HandoffOutput`] represents a completed transfer;
/// a [`TraceItem::HandoffCall`] with no matching output is an abandoned or
/// rejected handoff and is silently dropped. Consecutive duplicate pairs are
/// preserved as distinct transfers: an agent may hand off, regain control,
/// and hand off again, and workflows with loops depend on both being counted.
#[must_use]
pub fn extract_chain(items: &[TraceItem]) -> Vec<(AgentName, AgentName)> {
    items
        .iter()
        .filter_map(|item| match item {
            TraceItem::HandoffOutput {
                source_agent,
                target_agent,
            } => Some((source_agent.clone(), target_agent.clone())),
            _ => None,
        })
        .collect()
}

/// Split a trace into per-step spans at handoff boundaries
///
/// Each completed transfer closes the span it ends (the `HandoffOutput` item
/// is inclusive on the earlier side). Always returns exactly one more span
/// than the trace has completed transfers, so spans line up one-to-one with
/// the steps the lifecycle manager creates.
#[must_use]
pub fn split_spans(items: &[TraceItem]) -> Vec<&[TraceItem]> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, item) in items.iter().enumerate() {
        if matches!(item, TraceItem::HandoffOutput { .. }) {
            spans.push(&items[start..=i]);
            start = i + 1;
        }
    }
    spans.push(&items[start..]);
    spans
}
