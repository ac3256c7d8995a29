//! Runtime result and trace item types
//!
//! This module contains the raw record types produced by an agent runtime and
//! the closed tagged union the rest of the pipeline consumes. Normalization
//! happens once, at the boundary; nothing downstream inspects runtime-specific
//! shapes again.

use serde::{Deserialize, Serialize};

use super::identifiers::AgentName;

// ============================================================================
// Raw Runtime Types
// ============================================================================

/// One raw execution record from the runtime
///
/// Runtimes discriminate records by a kind name and attach kind-specific
/// fields. Everything except the kind is optional here: records from newer
/// runtime versions carry fields this SDK does not know, and older versions
/// omit fields newer ones require. The adapter decides what each record
/// becomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeItem {
    /// Record kind discriminator (e.g. "message", "handoff_output")
    ///
    /// A record without one degrades to `Unknown` downstream instead of
    /// failing the whole result.
    #[serde(default)]
    pub kind: String,
    /// Agent that produced the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Transfer source agent (handoff records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Transfer target agent (handoff records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Tool name (tool records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Tool arguments (tool call records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
    /// Tool result (tool output records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Message content (message records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

/// Result of one runtime invocation
///
/// The opaque structure a runtime hands back after a logical trigger: the
/// agent that held control at the end, the terminal output, and the ordered
/// list of execution records produced along the way. Record order is the
/// single source of truth for causality; no timestamps are trusted across
/// items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    /// Agent holding control when the run ended
    pub last_agent: String,
    /// Terminal output reported by the runtime
    #[serde(default)]
    pub final_output: String,
    /// Ordered execution records
    pub new_items: Vec<RuntimeItem>,
}

impl AgentExecutionResult {
    /// Parse a JSON value into an `AgentExecutionResult`
    ///
    /// # Errors
    /// Returns [`TraceError::MalformedTrace`](crate::TraceError::MalformedTrace)
    /// if the value lacks the required structure (most importantly the item
    /// list), the one condition under which conversion aborts.
    pub fn from_value(data: serde_json::Value) -> crate::error::Result<Self> {
        serde_json::from_value(data.clone()).map_err(|e| {
            crate::error::TraceError::malformed_trace(
                format!("Failed to parse execution result: {e}"),
                Some(data),
            )
        })
    }
}

// ============================================================================
// Normalized Trace Items
// ============================================================================

/// One normalized trace item
///
/// Closed union over every record kind the pipeline understands. Produced
/// transiently by the adapter and consumed once by chain extraction and
/// event recording; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceItem {
    /// LLM message produced by an agent
    Message {
        /// Agent that produced the message
        agent: AgentName,
        /// Raw message content
        content: serde_json::Value,
    },
    /// Handoff requested but not yet confirmed
    ///
    /// Evidence of intent only. A call without a matching output is an
    /// abandoned or rejected handoff and never enters the chain.
    HandoffCall {
        /// Agent requesting the transfer
        agent: AgentName,
        /// Requested target agent
        target_name: AgentName,
    },
    /// Completed transfer of control
    HandoffOutput {
        /// Agent that gave up control
        source_agent: AgentName,
        /// Agent that received control
        target_agent: AgentName,
    },
    /// Tool invocation
    ToolCall {
        /// Agent invoking the tool
        agent: AgentName,
        /// Tool name
        tool_name: String,
        /// Raw tool arguments
        args: serde_json::Value,
    },
    /// Tool invocation result
    ToolOutput {
        /// Tool name
        tool_name: String,
        /// Raw tool result
        result: serde_json::Value,
    },
    /// Record kind this SDK does not recognize
    ///
    /// Unsupported runtime versions degrade to this instead of aborting
    /// conversion.
    Unknown {
        /// Original kind discriminator
        kind: String,
    },
}
