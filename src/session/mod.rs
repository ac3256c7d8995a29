//! Session lifecycle and continuation
//!
//! A [`SessionHandle`] is the caller's grip on one workflow's persistent
//! identity: it owns the session's mutual-exclusion domain (ordinal counter
//! and open-step pointer), runs trace conversion against it, and can be
//! suspended into an opaque token and resumed in a later, unrelated process
//! with step ordering preserved across the gap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::backend::{Backend, SessionUpdate};
use crate::error::{Result, TraceError};
use crate::manager::{RunInput, SessionState, StepManager};
use crate::trace::adapter;
use crate::types::identifiers::{AgentName, SessionId, StepId};
use crate::types::items::AgentExecutionResult;
use crate::types::options::ObserverOptions;
use crate::types::records::{RunSummary, Step, StepFields};

// ============================================================================
// Continuation Token
// ============================================================================

/// Opaque token carrying a suspended session across process boundaries
///
/// The token is just the session identity; the ordinal counter is restored
/// from the backend at resume time, never trusted from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(SessionId);

impl ContinuationToken {
    /// Render the token for storage (environment variable, job metadata)
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for ContinuationToken {
    fn from(s: String) -> Self {
        Self(SessionId::from(s))
    }
}

impl From<&str> for ContinuationToken {
    fn from(s: &str) -> Self {
        Self(SessionId::from(s))
    }
}

// ============================================================================
// Session Handle
// ============================================================================

/// Handle to one open session
pub struct SessionHandle {
    backend: Arc<dyn Backend>,
    session_id: SessionId,
    manager: StepManager,
    state: Mutex<SessionState>,
    ended: AtomicBool,
}

impl SessionHandle {
    /// Create a new session on the backend
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn start(
        backend: Arc<dyn Backend>,
        name: &str,
        task: Option<&str>,
        options: ObserverOptions,
    ) -> Result<Self> {
        let session_id = backend.init_session(name, task).await?;
        log::info!("Session initialized: {session_id}");
        Ok(Self::assemble(backend, session_id, options, SessionState::starting_at(0)))
    }

    /// Resume a suspended session in a new process
    ///
    /// Restores the ordinal counter from the backend's snapshot so the next
    /// step continues the sequence. The lookup is bounded by the options'
    /// `lookup_timeout`.
    ///
    /// # Errors
    /// - [`TraceError::SessionClosed`] if the session was permanently closed
    /// - [`TraceError::SessionNotFound`] if the backend does not know the id
    /// - [`TraceError::SessionLookupTimeout`] if the lookup misses the deadline
    pub async fn resume(
        backend: Arc<dyn Backend>,
        token: &ContinuationToken,
        options: ObserverOptions,
    ) -> Result<Self> {
        let deadline = options.lookup_timeout;
        let snapshot = tokio::time::timeout(deadline, backend.continue_session(&token.0))
            .await
            .map_err(|_| TraceError::SessionLookupTimeout {
                waited_ms: deadline.as_millis() as u64,
            })??;
        if snapshot.closed {
            return Err(TraceError::session_closed(token.0.as_str()));
        }
        log::info!(
            "Session {} resumed at ordinal {}",
            token.0,
            snapshot.next_ordinal
        );
        Ok(Self::assemble(
            backend,
            token.0.clone(),
            options,
            SessionState::starting_at(snapshot.next_ordinal),
        ))
    }

    fn assemble(
        backend: Arc<dyn Backend>,
        session_id: SessionId,
        options: ObserverOptions,
        state: SessionState,
    ) -> Self {
        let manager = StepManager::new(Arc::clone(&backend), &options);
        Self {
            backend,
            session_id,
            manager,
            state: Mutex::new(state),
            ended: AtomicBool::new(false),
        }
    }

    /// This session's identifier
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Convert one run's result into steps and events under this session
    ///
    /// Holds the session's lock for the whole conversion: two runs
    /// continuing the same session serialize their ordinal allocation here.
    ///
    /// # Errors
    /// Returns [`TraceError::SessionClosed`] after [`end`](Self::end);
    /// otherwise propagates conversion and backend failures.
    pub async fn observe(
        &self,
        initial_agent: impl Into<AgentName>,
        result: &AgentExecutionResult,
        input: &RunInput,
    ) -> Result<RunSummary> {
        if self.ended.load(Ordering::Acquire) {
            return Err(TraceError::session_closed(self.session_id.as_str()));
        }
        let items = adapter::normalize(result);
        let mut state = self.state.lock().await;
        self.manager
            .run(
                &self.session_id,
                &mut state,
                &initial_agent.into(),
                &items,
                input,
                &result.final_output,
            )
            .await
    }

    /// Record a run that failed before producing a result
    ///
    /// Use this when the runtime raised instead of returning: the attempt is
    /// recorded as a single step finished with a failure outcome, keeping
    /// the session's step history honest about what happened.
    ///
    /// # Errors
    /// Returns [`TraceError::SessionClosed`] after [`end`](Self::end);
    /// otherwise propagates backend failures.
    pub async fn observe_failure(
        &self,
        initial_agent: impl Into<AgentName>,
        error_detail: &str,
        input: &RunInput,
    ) -> Result<Step> {
        if self.ended.load(Ordering::Acquire) {
            return Err(TraceError::session_closed(self.session_id.as_str()));
        }
        let mut state = self.state.lock().await;
        self.manager
            .run_failed(
                &self.session_id,
                &mut state,
                &initial_agent.into(),
                input,
                error_detail,
            )
            .await
    }

    /// Update a step's descriptive fields mid-session
    ///
    /// A step this process already finished is left untouched (warned, not
    /// an error); the backend record stays authoritative either way.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn update_step(&self, step_id: &StepId, fields: &StepFields) -> Result<()> {
        let state = self.state.lock().await;
        if state.finished_steps.contains(step_id) {
            log::warn!("Step {step_id} is finished, ignoring update");
            return Ok(());
        }
        drop(state);
        self.backend.update_step(step_id, fields).await
    }

    /// Update session-level fields
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn update(&self, update: &SessionUpdate) -> Result<()> {
        self.backend.update_session(&self.session_id, update).await
    }

    /// Suspend this session into a token for a later process
    ///
    /// Purely local: the backend keeps the session open and the token is the
    /// session identity.
    #[must_use]
    pub fn suspend(self) -> ContinuationToken {
        log::info!("Session {} suspended", self.session_id);
        ContinuationToken(self.session_id)
    }

    /// Permanently close this session
    ///
    /// Closing twice is a local no-op.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn end(&self, update: &SessionUpdate) -> Result<()> {
        if self.ended.swap(true, Ordering::AcqRel) {
            log::debug!("Session {} already ended, skipping", self.session_id);
            return Ok(());
        }
        self.backend.end_session(&self.session_id, update).await?;
        log::info!("Session {} ended", self.session_id);
        Ok(())
    }
}

// ============================================================================
// One-shot convenience
// ============================================================================

/// Observe a single run under a fresh session, then close it
///
/// The simplest entry point: creates a session named `session_name`,
/// converts `result`, and permanently closes the session.
///
/// # Errors
/// Propagates session and conversion failures.
pub async fn observe_once(
    backend: Arc<dyn Backend>,
    session_name: &str,
    initial_agent: impl Into<AgentName>,
    result: &AgentExecutionResult,
) -> Result<RunSummary> {
    let handle = SessionHandle::start(backend, session_name, None, ObserverOptions::default())
        .await?;
    let summary = handle
        .observe(initial_agent, result, &RunInput::default())
        .await?;
    handle.end(&SessionUpdate::default()).await?;
    Ok(summary)
}
