//! Session, step, and event record types
//!
//! Local renderings of the three-level hierarchy. The backend's stored
//! records are authoritative; these carry what this process created and
//! observed, and are what [`observe`](crate::session::SessionHandle::observe)
//! returns to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::{AgentName, EventId, SessionId, StepId};

// ============================================================================
// Step Types
// ============================================================================

/// Terminal state label for a finished step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Step ended by handing control to another agent
    HandoffOut,
    /// Step ran to completion holding control
    Completed,
    /// Step ended because the run failed
    Failed,
}

/// Free-text descriptive fields attached to a step
///
/// All optional; `None` fields are left untouched on update so partial
/// updates never erase earlier values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepFields {
    /// State description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Action description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Goal description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    /// Evaluation score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_score: Option<f64>,
    /// Evaluation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_description: Option<String>,
    /// Screenshot reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl StepFields {
    /// Merge non-empty fields from `other` into self
    pub fn merge(&mut self, other: &StepFields) {
        if other.state.is_some() {
            self.state = other.state.clone();
        }
        if other.action.is_some() {
            self.action = other.action.clone();
        }
        if other.goal.is_some() {
            self.goal = other.goal.clone();
        }
        if other.eval_score.is_some() {
            self.eval_score = other.eval_score;
        }
        if other.eval_description.is_some() {
            self.eval_description = other.eval_description.clone();
        }
        if other.screenshot.is_some() {
            self.screenshot = other.screenshot.clone();
        }
    }
}

/// One agent's span of control within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique step identifier
    pub id: StepId,
    /// Owning session
    pub session_id: SessionId,
    /// Ordinal position within the session (strictly increasing)
    pub ordinal: u64,
    /// Agent that held control during this step
    pub agent: AgentName,
    /// Descriptive fields
    pub fields: StepFields,
    /// Terminal state label, set when the step finishes
    pub outcome: Option<StepOutcome>,
    /// Whether a locally-initiated finish has been recorded
    ///
    /// Reflects only this process's finish calls; the backend record stays
    /// authoritative for the stored state.
    pub finished: bool,
    /// Ordered event identifiers recorded within this step
    pub events: Vec<EventId>,
    /// Agent that handed control to this step, if any
    pub handoff_from: Option<AgentName>,
    /// Agent this step handed control to, if any
    pub handoff_to: Option<AgentName>,
    /// When this step was created
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Event Types
// ============================================================================

/// Kind of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// One LLM call
    LlmCall,
    /// One tool invocation
    ToolCall,
}

/// One LLM or tool call recorded within a step
///
/// Payloads are carried verbatim: downstream consumers need the original
/// request/response for replay and debugging. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Owning step
    pub step_id: StepId,
    /// Event kind
    pub kind: EventKind,
    /// Raw input payload (tool arguments; absent for bare messages)
    pub input: Option<serde_json::Value>,
    /// Raw output payload (message content or tool result)
    pub output: Option<serde_json::Value>,
    /// Set when the matching output never arrived (truncated trace)
    pub incomplete: bool,
    /// When this event was recorded
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Session Types
// ============================================================================

/// Backend's view of a session at resume time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier
    pub session_id: SessionId,
    /// Whether the session was permanently closed
    pub closed: bool,
    /// Ordinal the next step must receive
    pub next_ordinal: u64,
}

/// Everything one run's conversion produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Steps created for this run, in ordinal order
    pub steps: Vec<Step>,
    /// Events recorded for this run, in observation order
    pub events: Vec<Event>,
    /// Ordered transfer pairs extracted from the trace
    pub handoffs: Vec<(AgentName, AgentName)>,
}
