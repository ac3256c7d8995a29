//! Event recording
//!
//! Maps the trace items inside one step's span to event records: each LLM
//! message becomes one event, and each tool call/output pair becomes a
//! single event holding both payloads. Payloads are carried verbatim, with
//! no summarization, so downstream consumers can replay the original
//! request/response.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::error::Result;
use crate::types::identifiers::StepId;
use crate::types::items::TraceItem;
use crate::types::records::{Event, EventKind};

/// One event to record, planned from a step's span
#[derive(Debug, Clone)]
pub(crate) struct PlannedEvent {
    pub kind: EventKind,
    pub input: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub incomplete: bool,
}

/// Plan the events for one step's span
///
/// Tool calls are matched to outputs by tool name, first-in-first-out, so a
/// span invoking the same tool twice pairs each output with the earliest
/// open call. A call whose output never arrives stays flagged `incomplete`
/// (truncated trace); an output with no open call is preserved the same way
/// rather than dropped.
pub(crate) fn plan_span_events(span: &[TraceItem]) -> Vec<PlannedEvent> {
    let mut planned: Vec<PlannedEvent> = Vec::new();
    let mut open_calls: HashMap<&str, VecDeque<usize>> = HashMap::new();

    for item in span {
        match item {
            TraceItem::Message { content, .. } => {
                planned.push(PlannedEvent {
                    kind: EventKind::LlmCall,
                    input: None,
                    output: Some(content.clone()),
                    incomplete: false,
                });
            }
            TraceItem::ToolCall {
                tool_name, args, ..
            } => {
                open_calls
                    .entry(tool_name.as_str())
                    .or_default()
                    .push_back(planned.len());
                planned.push(PlannedEvent {
                    kind: EventKind::ToolCall,
                    input: Some(args.clone()),
                    output: None,
                    incomplete: true,
                });
            }
            TraceItem::ToolOutput { tool_name, result } => {
                let matched = open_calls
                    .get_mut(tool_name.as_str())
                    .and_then(VecDeque::pop_front);
                match matched {
                    Some(index) => {
                        planned[index].output = Some(result.clone());
                        planned[index].incomplete = false;
                    }
                    None => {
                        log::warn!("Tool output for '{tool_name}' has no matching call");
                        planned.push(PlannedEvent {
                            kind: EventKind::ToolCall,
                            input: None,
                            output: Some(result.clone()),
                            incomplete: true,
                        });
                    }
                }
            }
            TraceItem::HandoffCall { .. }
            | TraceItem::HandoffOutput { .. }
            | TraceItem::Unknown { .. } => {}
        }
    }

    planned
}

/// Spawn the backend recording of a span's events
///
/// Each event is issued as its own task so recording overlaps the rest of
/// the conversion; the handles come back in observation order and are
/// drained when the owning step finishes.
pub(crate) fn spawn_span_events(
    backend: &Arc<dyn Backend>,
    step_id: &StepId,
    span: &[TraceItem],
) -> Vec<JoinHandle<Result<Event>>> {
    plan_span_events(span)
        .into_iter()
        .map(|planned| {
            let backend = Arc::clone(backend);
            let step_id = step_id.clone();
            tokio::spawn(async move {
                let id = backend
                    .create_event(
                        &step_id,
                        planned.kind,
                        planned.input.as_ref(),
                        planned.output.as_ref(),
                        planned.incomplete,
                    )
                    .await?;
                Ok(Event {
                    id,
                    step_id,
                    kind: planned.kind,
                    input: planned.input,
                    output: planned.output,
                    incomplete: planned.incomplete,
                    created_at: Utc::now(),
                })
            })
        })
        .collect()
}

/// Wait for a step's in-flight event recordings, bounded by `flush_timeout`
///
/// On timeout the step finishes anyway: the detached tasks keep running and
/// the backend records their events best-effort, they just drop out of the
/// local run summary. Individual recording failures are logged, never fatal.
pub(crate) async fn drain_events(
    tasks: Vec<JoinHandle<Result<Event>>>,
    flush_timeout: Duration,
    step_id: &StepId,
) -> Vec<Event> {
    if tasks.is_empty() {
        return Vec::new();
    }

    match tokio::time::timeout(flush_timeout, join_all(tasks)).await {
        Ok(results) => results
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(Ok(event)) => Some(event),
                Ok(Err(e)) => {
                    log::warn!("Failed to record event for step {step_id}: {e}");
                    None
                }
                Err(e) => {
                    log::error!("Event recording task for step {step_id} panicked: {e}");
                    None
                }
            })
            .collect(),
        Err(_) => {
            log::warn!(
                "Event recording for step {step_id} exceeded {}ms, finishing step anyway",
                flush_timeout.as_millis()
            );
            Vec::new()
        }
    }
}
