//! In-memory backend
//!
//! A process-local [`Backend`] with the full contract semantics: ordinal
//! bookkeeping, idempotent step finish, closed-session rejection. Used by the
//! integration tests and useful as a sink when no analytics service is
//! configured.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{Backend, SessionUpdate};
use crate::error::{Result, TraceError};
use crate::types::identifiers::{EventId, SessionId, StepId};
use crate::types::records::{EventKind, SessionSnapshot, StepFields};

/// Stored session record
#[derive(Debug, Clone)]
pub struct StoredSession {
    /// Display name
    pub name: String,
    /// Task description
    pub task: Option<String>,
    /// Whether the session was permanently closed
    pub closed: bool,
    /// Steps in creation order
    pub step_ids: Vec<StepId>,
    /// Session evaluation score
    pub eval_score: Option<f64>,
    /// Whether the workflow succeeded
    pub successful: Option<bool>,
}

/// Stored step record
#[derive(Debug, Clone)]
pub struct StoredStep {
    /// Owning session
    pub session_id: SessionId,
    /// Accumulated fields
    pub fields: StepFields,
    /// Whether the step was finished
    pub finished: bool,
    /// Events in creation order
    pub event_ids: Vec<EventId>,
}

/// Stored event record
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// Owning step
    pub step_id: StepId,
    /// Event kind
    pub kind: EventKind,
    /// Raw input payload
    pub input: Option<serde_json::Value>,
    /// Raw output payload
    pub output: Option<serde_json::Value>,
    /// Whether the matching output never arrived
    pub incomplete: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    sessions: HashMap<SessionId, StoredSession>,
    steps: HashMap<StepId, StoredStep>,
    events: HashMap<EventId, StoredEvent>,
}

/// In-memory backend implementation
#[derive(Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
    continue_delay: Option<Duration>,
}

impl InMemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay `continue_session` responses by `delay`
    ///
    /// Simulates a slow remote lookup for deadline handling.
    #[must_use]
    pub fn with_continue_delay(mut self, delay: Duration) -> Self {
        self.continue_delay = Some(delay);
        self
    }

    /// Get a session record
    #[must_use]
    pub fn session(&self, session_id: &SessionId) -> Option<StoredSession> {
        self.store.lock().sessions.get(session_id).cloned()
    }

    /// Get a step record
    #[must_use]
    pub fn step(&self, step_id: &StepId) -> Option<StoredStep> {
        self.store.lock().steps.get(step_id).cloned()
    }

    /// Get a step's events in creation order
    #[must_use]
    pub fn step_events(&self, step_id: &StepId) -> Vec<StoredEvent> {
        let store = self.store.lock();
        store
            .steps
            .get(step_id)
            .map(|step| {
                step.event_ids
                    .iter()
                    .filter_map(|id| store.events.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of steps stored for a session
    #[must_use]
    pub fn step_count(&self, session_id: &SessionId) -> usize {
        self.store
            .lock()
            .sessions
            .get(session_id)
            .map_or(0, |s| s.step_ids.len())
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn init_session(&self, name: &str, task: Option<&str>) -> Result<SessionId> {
        let session_id = SessionId::from(Uuid::new_v4().to_string());
        self.store.lock().sessions.insert(
            session_id.clone(),
            StoredSession {
                name: name.to_string(),
                task: task.map(str::to_string),
                closed: false,
                step_ids: Vec::new(),
                eval_score: None,
                successful: None,
            },
        );
        Ok(session_id)
    }

    async fn continue_session(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        if let Some(delay) = self.continue_delay {
            tokio::time::sleep(delay).await;
        }
        let store = self.store.lock();
        let session = store
            .sessions
            .get(session_id)
            .ok_or_else(|| TraceError::session_not_found(session_id.as_str()))?;
        Ok(SessionSnapshot {
            session_id: session_id.clone(),
            closed: session.closed,
            next_ordinal: session.step_ids.len() as u64,
        })
    }

    async fn update_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()> {
        let mut store = self.store.lock();
        let session = store
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| TraceError::session_not_found(session_id.as_str()))?;
        if update.task.is_some() {
            session.task = update.task.clone();
        }
        if update.eval_score.is_some() {
            session.eval_score = update.eval_score;
        }
        if update.successful.is_some() {
            session.successful = update.successful;
        }
        Ok(())
    }

    async fn end_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()> {
        self.update_session(session_id, update).await?;
        let mut store = self.store.lock();
        if let Some(session) = store.sessions.get_mut(session_id) {
            session.closed = true;
        }
        Ok(())
    }

    async fn create_step(&self, session_id: &SessionId, fields: &StepFields) -> Result<StepId> {
        let mut store = self.store.lock();
        let session = store
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| TraceError::session_not_found(session_id.as_str()))?;
        if session.closed {
            return Err(TraceError::session_closed(session_id.as_str()));
        }
        let step_id = StepId::from(Uuid::new_v4().to_string());
        session.step_ids.push(step_id.clone());
        store.steps.insert(
            step_id.clone(),
            StoredStep {
                session_id: session_id.clone(),
                fields: fields.clone(),
                finished: false,
                event_ids: Vec::new(),
            },
        );
        Ok(step_id)
    }

    async fn update_step(&self, step_id: &StepId, fields: &StepFields) -> Result<()> {
        let mut store = self.store.lock();
        let step = store
            .steps
            .get_mut(step_id)
            .ok_or_else(|| TraceError::backend(format!("Unknown step: {step_id}")))?;
        step.fields.merge(fields);
        Ok(())
    }

    async fn end_step(&self, step_id: &StepId, fields: &StepFields) -> Result<()> {
        let mut store = self.store.lock();
        let step = store
            .steps
            .get_mut(step_id)
            .ok_or_else(|| TraceError::backend(format!("Unknown step: {step_id}")))?;
        if step.finished {
            log::debug!("Step {step_id} already finished, absorbing duplicate finish");
            return Ok(());
        }
        step.fields.merge(fields);
        step.finished = true;
        Ok(())
    }

    async fn create_event(
        &self,
        step_id: &StepId,
        kind: EventKind,
        input: Option<&serde_json::Value>,
        output: Option<&serde_json::Value>,
        incomplete: bool,
    ) -> Result<EventId> {
        let mut store = self.store.lock();
        let step = store
            .steps
            .get_mut(step_id)
            .ok_or_else(|| TraceError::backend(format!("Unknown step: {step_id}")))?;
        let event_id = EventId::from(Uuid::new_v4().to_string());
        step.event_ids.push(event_id.clone());
        store.events.insert(
            event_id.clone(),
            StoredEvent {
                step_id: step_id.clone(),
                kind,
                input: input.cloned(),
                output: output.cloned(),
                incomplete,
                created_at: Utc::now(),
            },
        );
        Ok(event_id)
    }
}
