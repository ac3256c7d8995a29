//! Per-session and per-run conversion state
//!
//! The "currently open step" is never global state: it lives in an explicit
//! run context owned by one conversion call, and the cross-run pieces
//! (ordinal counter, locally-finished set) live in [`SessionState`] behind
//! the session's mutex.

use std::collections::HashSet;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::types::identifiers::StepId;
use crate::types::records::{Event, StepFields};

/// Session-scoped mutable state, guarded by the session's mutex
///
/// Two runs continuing the same session serialize ordinal allocation through
/// this: the conversion of a run holds the lock for its whole duration.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Ordinal the next created step receives
    pub next_ordinal: u64,
    /// Steps this process has finished
    ///
    /// Local finishes only; the backend record stays authoritative.
    pub finished_steps: HashSet<StepId>,
}

impl SessionState {
    /// Create state with the ordinal counter at `next_ordinal`
    #[must_use]
    pub fn starting_at(next_ordinal: u64) -> Self {
        Self {
            next_ordinal,
            finished_steps: HashSet::new(),
        }
    }

    /// Allocate the next step ordinal
    pub fn allocate_ordinal(&mut self) -> u64 {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        ordinal
    }
}

/// Caller-supplied context for one run
///
/// The lifecycle manager derives the first step's descriptive fields from
/// the prompt/context that triggered the run; it does not compute them.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    /// Fields for the initial step (prompt-derived state/action/goal)
    pub initial_fields: StepFields,
}

impl RunInput {
    /// Build run input from a plain prompt string
    ///
    /// The prompt becomes the initial step's goal; state and action get
    /// agent-derived defaults at step creation.
    #[must_use]
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            initial_fields: StepFields {
                goal: Some(truncate(prompt, 200)),
                ..StepFields::default()
            },
        }
    }
}

/// Conversion state for one run: the open step and its in-flight events
///
/// `tasks` holds the spawned event-recording calls for the currently open
/// step, in observation order. Finishing the step drains them (bounded by
/// the flush timeout) before the terminal update is sent.
pub(crate) struct RunContext {
    /// Index of the currently open step in the run's step list
    pub open_step: usize,
    /// In-flight event recordings for the open step, observation order
    pub tasks: Vec<JoinHandle<Result<Event>>>,
}

/// Truncate a string for use in a descriptive field
#[must_use]
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
