//! # Spanfold
//!
//! Observability SDK for multi-agent workflow runtimes. Spanfold consumes
//! the ordered execution trace one runtime invocation produces (messages,
//! tool calls, completed handoffs) and deterministically reconstructs a
//! three-level hierarchy: **Session** (a whole workflow), **Step** (one
//! agent's span of control), **Event** (one LLM or tool call within a step),
//! pushing the records to an analytics backend as it goes.
//!
//! ## Quick Start
//!
//! The simplest way to use the SDK is [`observe_once()`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use spanfold::{AgentExecutionResult, HttpBackend, ObserverOptions, observe_once};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(HttpBackend::new(&ObserverOptions::default())?);
//!
//!     // `raw` is the JSON your runtime reported for one run
//!     # let raw = serde_json::json!({"last_agent": "triage", "new_items": []});
//!     let result = AgentExecutionResult::from_value(raw)?;
//!     let summary = observe_once(backend, "support-workflow", "triage", &result).await?;
//!
//!     log::info!("Recorded {} step(s)", summary.steps.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Sessions Spanning Multiple Runs
//!
//! A [`SessionHandle`] keeps one workflow identity alive across any number
//! of runtime invocations, allocating strictly increasing step ordinals:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use spanfold::{SessionHandle, RunInput, InMemoryBackend, ObserverOptions};
//! # async fn example(result: &spanfold::AgentExecutionResult) -> spanfold::Result<()> {
//! let backend = Arc::new(InMemoryBackend::new());
//! let session = SessionHandle::start(
//!     backend,
//!     "nightly-triage",
//!     Some("Categorize new tickets"),
//!     ObserverOptions::default(),
//! )
//! .await?;
//!
//! let summary = session
//!     .observe("triage", result, &RunInput::from_prompt("Categorize this ticket"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### 2. Continuation Across Processes
//!
//! Suspend a session into an opaque token, carry it through job metadata or
//! an environment variable, and resume it in a process that shares nothing
//! with the first. The step ordinal sequence continues, never restarting:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use spanfold::{SessionHandle, ContinuationToken, InMemoryBackend, ObserverOptions};
//! # async fn example(session: SessionHandle, backend: Arc<InMemoryBackend>) -> spanfold::Result<()> {
//! let token = session.suspend();
//! // ...later, elsewhere...
//! let session = SessionHandle::resume(backend, &token, ObserverOptions::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### 3. Handoff Reconstruction
//!
//! Only *completed* transfers shape the hierarchy: a run whose trace carries
//! `k` handoff outputs yields exactly `k + 1` steps, each stamped with the
//! agents on either side of its boundaries. Abandoned handoff calls are
//! dropped silently, since the runtime may legitimately reject a transfer.
//!
//! ## Architecture
//!
//! - [`types`]: Core type definitions, newtypes, and builders
//! - [`trace`]: Runtime result normalization and handoff chain extraction
//! - [`manager`]: Step lifecycle state machine and event recording
//! - [`session`]: Session handles and cross-process continuation
//! - [`backend`]: Persistence boundary (HTTP client and in-memory double)
//! - [`error`]: Error types and handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, TraceError>`](Result). Only a
//! structurally malformed runtime result aborts a run's conversion; every
//! other anomaly (unknown item kinds, abandoned handoffs, tool calls whose
//! output never arrived, double finishes) degrades to flagged or partial
//! records so one broken trace segment never voids the rest of an
//! otherwise-valid hierarchy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod manager;
pub mod session;
pub mod trace;
pub mod types;

// Re-export commonly used types for external API
pub use backend::{Backend, HttpBackend, InMemoryBackend, SessionUpdate};
pub use error::{Result, TraceError};
pub use manager::{RunInput, SessionState, StepManager};
pub use session::{ContinuationToken, SessionHandle, observe_once};
pub use trace::{extract_chain, normalize, split_spans};

// Re-export type submodules for flat public API
pub use types::identifiers::{AgentName, EventId, SessionId, StepId};
pub use types::items::{AgentExecutionResult, RuntimeItem, TraceItem};
pub use types::options::{ObserverOptions, ObserverOptionsBuilder, RevisitPolicy};
pub use types::records::{
    Event, EventKind, RunSummary, SessionSnapshot, Step, StepFields, StepOutcome,
};

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
