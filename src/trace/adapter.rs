//! Runtime result normalization
//!
//! Maps a runtime's raw execution records into the closed [`TraceItem`]
//! union, once, at the boundary. Original record order is preserved exactly;
//! order is the single source of truth for causality across items.

use crate::types::identifiers::AgentName;
use crate::types::items::{AgentExecutionResult, RuntimeItem, TraceItem};

/// Normalize a runtime result into an ordered trace item sequence
///
/// Unrecognized record kinds, and recognized kinds missing their required
/// fields, become [`TraceItem::Unknown`] with a warning so that unsupported
/// runtime versions degrade instead of aborting conversion. Structural failures
/// (a result without an item list) are caught earlier, in
/// [`AgentExecutionResult::from_value`].
#[must_use]
pub fn normalize(result: &AgentExecutionResult) -> Vec<TraceItem> {
    result.new_items.iter().map(normalize_item).collect()
}

/// Map one raw record into a trace item
fn normalize_item(item: &RuntimeItem) -> TraceItem {
    match canonical_kind(&item.kind) {
        Some("message") => match (&item.agent, &item.content) {
            (Some(agent), Some(content)) => TraceItem::Message {
                agent: AgentName::from(agent.clone()),
                content: content.clone(),
            },
            _ => degraded(item, "agent/content"),
        },
        Some("handoff_call") => match (&item.agent, &item.target) {
            (Some(agent), Some(target)) => TraceItem::HandoffCall {
                agent: AgentName::from(agent.clone()),
                target_name: AgentName::from(target.clone()),
            },
            _ => degraded(item, "agent/target"),
        },
        Some("handoff_output") => match (&item.source, &item.target) {
            (Some(source), Some(target)) => TraceItem::HandoffOutput {
                source_agent: AgentName::from(source.clone()),
                target_agent: AgentName::from(target.clone()),
            },
            _ => degraded(item, "source/target"),
        },
        Some("tool_call") => match (&item.agent, &item.tool_name) {
            (Some(agent), Some(tool_name)) => TraceItem::ToolCall {
                agent: AgentName::from(agent.clone()),
                tool_name: tool_name.clone(),
                args: item.args.clone().unwrap_or(serde_json::Value::Null),
            },
            _ => degraded(item, "agent/tool_name"),
        },
        Some("tool_output") => match &item.tool_name {
            Some(tool_name) => TraceItem::ToolOutput {
                tool_name: tool_name.clone(),
                result: item.result.clone().unwrap_or(serde_json::Value::Null),
            },
            None => degraded(item, "tool_name"),
        },
        _ => {
            log::debug!("Unrecognized trace item kind: {}", item.kind);
            TraceItem::Unknown {
                kind: item.kind.clone(),
            }
        }
    }
}

/// Map a runtime kind discriminator to its canonical name
///
/// Accepts both the snake_case wire names and the item class names some
/// runtimes expose as the discriminator.
fn canonical_kind(kind: &str) -> Option<&'static str> {
    match kind {
        "message" | "message_output_item" | "MessageOutputItem" => Some("message"),
        "handoff_call" | "handoff_call_item" | "HandoffCallItem" => Some("handoff_call"),
        "handoff_output" | "handoff_output_item" | "HandoffOutputItem" => Some("handoff_output"),
        "tool_call" | "tool_call_item" | "ToolCallItem" => Some("tool_call"),
        "tool_output" | "tool_call_output_item" | "ToolCallOutputItem" => Some("tool_output"),
        _ => None,
    }
}

/// Degrade a recognized kind with missing fields to `Unknown`
fn degraded(item: &RuntimeItem, missing: &str) -> TraceItem {
    log::warn!(
        "Trace item '{}' missing required fields ({missing}), tagging as unknown",
        item.kind
    );
    TraceItem::Unknown {
        kind: item.kind.clone(),
    }
}
