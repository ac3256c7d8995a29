//! Backend boundary for session/step/event persistence
//!
//! The storage of sessions, steps, and events is an opaque remote service.
//! This module defines the narrow create/update/end contract the rest of the
//! SDK talks through, plus the two implementations: the HTTP client for the
//! analytics service and an in-memory double with the full semantics.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::identifiers::{EventId, SessionId, StepId};
use crate::types::records::{EventKind, SessionSnapshot, StepFields};

/// Session-level fields for update and end calls
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// Task description
    pub task: Option<String>,
    /// Session evaluation score
    pub eval_score: Option<f64>,
    /// Evaluation description
    pub eval_description: Option<String>,
    /// Whether the workflow succeeded
    pub successful: Option<bool>,
}

/// Persistence contract for the session/step/event hierarchy
///
/// No wire format is prescribed beyond these calls; the backend is a black
/// box reachable through them. `end_step` is idempotent: absorbing a double
/// finish is part of the contract, not an error.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a session and return its identifier
    async fn init_session(&self, name: &str, task: Option<&str>) -> Result<SessionId>;

    /// Look up a session for continuation
    ///
    /// Returns the backend's view of the session: whether it was permanently
    /// closed and the ordinal the next step must receive.
    async fn continue_session(&self, session_id: &SessionId) -> Result<SessionSnapshot>;

    /// Update session-level fields
    async fn update_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()>;

    /// Permanently close a session
    async fn end_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()>;

    /// Create a step in a session and return its identifier
    async fn create_step(&self, session_id: &SessionId, fields: &StepFields) -> Result<StepId>;

    /// Update a step's fields
    async fn update_step(&self, step_id: &StepId, fields: &StepFields) -> Result<()>;

    /// Finish a step, stamping final fields (idempotent)
    async fn end_step(&self, step_id: &StepId, fields: &StepFields) -> Result<()>;

    /// Create an event under a step
    async fn create_event(
        &self,
        step_id: &StepId,
        kind: EventKind,
        input: Option<&serde_json::Value>,
        output: Option<&serde_json::Value>,
        incomplete: bool,
    ) -> Result<EventId>;
}

pub use http::HttpBackend;
pub use memory::InMemoryBackend;
