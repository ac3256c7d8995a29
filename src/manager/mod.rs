//! Step lifecycle management
//!
//! Turns one run's (initial agent, handoff chain, item spans) into an
//! ordered run of step lifecycles: `Pending → Open → Finished`, one step per
//! agent segment, with handoff metadata stamped on both sides of every
//! completed transfer. Exactly `chain.len() + 1` steps are created per run;
//! a run with no handoffs produces exactly one.
//!
//! # Module Structure
//!
//! - `context` - Per-session and per-run conversion state
//! - `events` - Event recording within a step's span

pub mod context;
pub mod events;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::backend::Backend;
use crate::error::Result;
use crate::trace::chain;
use crate::types::identifiers::{AgentName, SessionId};
use crate::types::items::TraceItem;
use crate::types::options::{ObserverOptions, RevisitPolicy};
use crate::types::records::{Event, RunSummary, Step, StepFields, StepOutcome};

pub use context::{RunInput, SessionState};

use context::{RunContext, truncate};
use events::{drain_events, spawn_span_events};

/// Step lifecycle manager for one backend
///
/// Stateless between runs; all per-session state is passed in explicitly so
/// the caller's session mutex is the single mutual-exclusion domain for
/// ordinal allocation and the open-step pointer.
pub struct StepManager {
    backend: Arc<dyn Backend>,
    revisit_policy: RevisitPolicy,
    event_flush_timeout: Duration,
}

impl StepManager {
    /// Create a manager over `backend` with the given options
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, options: &ObserverOptions) -> Self {
        Self {
            backend,
            revisit_policy: options.revisit_policy,
            event_flush_timeout: options.event_flush_timeout,
        }
    }

    /// Convert one run's trace into steps and events
    ///
    /// The caller supplies the normalized items, the agent that held control
    /// at the start, the prompt-derived fields for the first step, and the
    /// runtime's terminal output (stamped on the last step's finish).
    ///
    /// # Errors
    /// Propagates backend failures for step creation and finish. Event
    /// recording failures and chain/agent naming discrepancies are absorbed
    /// with degraded output instead.
    pub async fn run(
        &self,
        session_id: &SessionId,
        state: &mut SessionState,
        initial_agent: &AgentName,
        items: &[TraceItem],
        input: &RunInput,
        final_output: &str,
    ) -> Result<RunSummary> {
        let handoffs = chain::extract_chain(items);
        let spans = chain::split_spans(items);

        let mut steps: Vec<Step> = Vec::new();
        let mut summary_events = Vec::new();
        let mut agent_steps: HashMap<AgentName, usize> = HashMap::new();

        // Step 0: the agent the caller handed the prompt to.
        let fields = initial_fields(initial_agent, input);
        self.open_step(
            session_id,
            state,
            &mut steps,
            initial_agent.clone(),
            fields,
            None,
        )
        .await?;
        agent_steps.insert(initial_agent.clone(), 0);
        let mut ctx = RunContext {
            open_step: 0,
            tasks: spawn_span_events(&self.backend, &steps[0].id, spans[0]),
        };

        for (i, (source, target)) in handoffs.iter().enumerate() {
            let current_agent = steps[ctx.open_step].agent.clone();
            if *source != current_agent {
                // The explicit handoff record wins over the inferred agent
                // identity, which may be stale.
                log::warn!(
                    "Handoff chain lists source '{source}' but the open step belongs to \
                     '{current_agent}'; proceeding with the handoff record"
                );
            }

            self.close_step(
                state,
                &mut steps,
                &mut summary_events,
                &mut ctx,
                StepOutcome::HandoffOut,
                departure_fields(&current_agent, target),
                Some(target.clone()),
            )
            .await?;

            let next_index = match (self.revisit_policy, agent_steps.get(target)) {
                (RevisitPolicy::ReuseRevisitedStep, Some(&index)) => {
                    log::debug!(
                        "Agent '{target}' regained control, reusing step {}",
                        steps[index].ordinal
                    );
                    steps[index].outcome = None;
                    index
                }
                _ => {
                    self.open_step(
                        session_id,
                        state,
                        &mut steps,
                        target.clone(),
                        arrival_fields(source, target),
                        Some(source.clone()),
                    )
                    .await?;
                    steps.len() - 1
                }
            };
            agent_steps.insert(target.clone(), next_index);
            ctx.open_step = next_index;
            ctx.tasks = spawn_span_events(&self.backend, &steps[next_index].id, spans[i + 1]);
        }

        let last_agent = steps[ctx.open_step].agent.clone();
        self.close_step(
            state,
            &mut steps,
            &mut summary_events,
            &mut ctx,
            StepOutcome::Completed,
            terminal_fields(&last_agent, final_output),
            None,
        )
        .await?;

        // Revisit reuse defers intermediate finishes to the end of the run.
        for index in 0..steps.len() {
            if !steps[index].finished {
                self.finish_on_backend(state, &mut steps, index).await?;
            }
        }

        Ok(RunSummary {
            steps,
            events: summary_events,
            handoffs,
        })
    }

    /// Record a run that failed before producing a result
    ///
    /// The runtime raised instead of returning a trace. The attempt is still
    /// part of the session's history: one step, finished immediately with
    /// [`StepOutcome::Failed`] and the error rendered into its fields.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn run_failed(
        &self,
        session_id: &SessionId,
        state: &mut SessionState,
        agent: &AgentName,
        input: &RunInput,
        error_detail: &str,
    ) -> Result<Step> {
        let mut steps = Vec::with_capacity(1);
        self.open_step(
            session_id,
            state,
            &mut steps,
            agent.clone(),
            initial_fields(agent, input),
            None,
        )
        .await?;
        steps[0].outcome = Some(StepOutcome::Failed);
        steps[0].fields.merge(&failure_fields(agent, error_detail));
        self.finish_on_backend(state, &mut steps, 0).await?;
        Ok(steps.remove(0))
    }

    /// Create a step in the `Open` state
    async fn open_step(
        &self,
        session_id: &SessionId,
        state: &mut SessionState,
        steps: &mut Vec<Step>,
        agent: AgentName,
        fields: StepFields,
        handoff_from: Option<AgentName>,
    ) -> Result<()> {
        let id = self.backend.create_step(session_id, &fields).await?;
        let ordinal = state.allocate_ordinal();
        log::debug!("Created step {id} (ordinal {ordinal}) for agent '{agent}'");
        steps.push(Step {
            id,
            session_id: session_id.clone(),
            ordinal,
            agent,
            fields,
            outcome: None,
            finished: false,
            events: Vec::new(),
            handoff_from,
            handoff_to: None,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Close the currently open step
    ///
    /// Drains the step's in-flight event recordings (bounded by the flush
    /// timeout), stamps outcome and handoff target, and finishes the step on
    /// the backend. When the revisit policy may re-open the step later, the
    /// backend finish is deferred to the end of the run instead.
    #[allow(clippy::too_many_arguments)]
    async fn close_step(
        &self,
        state: &mut SessionState,
        steps: &mut [Step],
        summary_events: &mut Vec<Event>,
        ctx: &mut RunContext,
        outcome: StepOutcome,
        final_fields: StepFields,
        handoff_to: Option<AgentName>,
    ) -> Result<()> {
        let index = ctx.open_step;
        let tasks = std::mem::take(&mut ctx.tasks);
        let drained = drain_events(tasks, self.event_flush_timeout, &steps[index].id).await;
        for event in drained {
            steps[index].events.push(event.id.clone());
            summary_events.push(event);
        }

        steps[index].outcome = Some(outcome);
        steps[index].fields.merge(&final_fields);
        if handoff_to.is_some() {
            steps[index].handoff_to = handoff_to;
        }

        let terminal = outcome != StepOutcome::HandoffOut;
        if terminal || self.revisit_policy == RevisitPolicy::NewStepPerTransfer {
            self.finish_on_backend(state, steps, index).await?;
        } else {
            self.backend
                .update_step(&steps[index].id, &steps[index].fields)
                .await?;
        }
        Ok(())
    }

    /// Record a step's finish on the backend, absorbing double finishes
    async fn finish_on_backend(
        &self,
        state: &mut SessionState,
        steps: &mut [Step],
        index: usize,
    ) -> Result<()> {
        let id = steps[index].id.clone();
        if !state.finished_steps.insert(id.clone()) {
            log::debug!("Step {id} already finished locally, skipping");
            steps[index].finished = true;
            return Ok(());
        }
        self.backend.end_step(&id, &steps[index].fields).await?;
        steps[index].finished = true;
        log::debug!("Finished step {id}");
        Ok(())
    }
}

// ============================================================================
// Default descriptive fields
// ============================================================================

/// Fields for the initial step, with agent-derived defaults where the
/// caller's input is silent
fn initial_fields(agent: &AgentName, input: &RunInput) -> StepFields {
    let mut fields = StepFields {
        state: Some(format!("Running {agent}")),
        action: Some(format!("Execute {agent}")),
        goal: Some("Process request".to_string()),
        ..StepFields::default()
    };
    fields.merge(&input.initial_fields);
    fields
}

/// Fields for a step created by an inbound transfer
fn arrival_fields(source: &AgentName, target: &AgentName) -> StepFields {
    StepFields {
        state: Some(format!("Handoff: {target}")),
        action: Some(format!("Transfer from {source}")),
        goal: Some("Continue processing request".to_string()),
        ..StepFields::default()
    }
}

/// Final fields for a step that handed control away
fn departure_fields(source: &AgentName, target: &AgentName) -> StepFields {
    StepFields {
        state: Some(format!("Transferred to {target}")),
        action: Some(format!("Handoff from {source}")),
        ..StepFields::default()
    }
}

/// Final fields for a step whose run raised instead of returning
fn failure_fields(agent: &AgentName, error_detail: &str) -> StepFields {
    StepFields {
        state: Some(format!("Error in {agent}")),
        action: Some("Agent execution failed".to_string()),
        goal: Some(truncate(error_detail, 200)),
        ..StepFields::default()
    }
}

/// Final fields for the step that held control when the run ended
fn terminal_fields(agent: &AgentName, final_output: &str) -> StepFields {
    StepFields {
        state: Some(format!("Finished {agent}")),
        action: Some(format!("Delivered by {agent}")),
        goal: if final_output.is_empty() {
            Some("Processing finished".to_string())
        } else {
            Some(truncate(final_output, 200))
        },
        ..StepFields::default()
    }
}
