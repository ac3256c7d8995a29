//! Integration tests for event recording
//!
//! Checks the mapping of messages and tool activity into event records:
//! payloads carried verbatim, call/output pairing, incomplete flagging, and
//! which step each event lands on.

use std::sync::Arc;

use serde_json::json;
use spanfold::{
    AgentExecutionResult, EventKind, InMemoryBackend, ObserverOptions, RunInput, RuntimeItem,
    SessionHandle,
};

fn message(agent: &str, text: &str) -> RuntimeItem {
    RuntimeItem {
        kind: "message".to_string(),
        agent: Some(agent.to_string()),
        content: Some(json!(text)),
        ..RuntimeItem::default()
    }
}

fn tool_call(agent: &str, tool: &str, args: serde_json::Value) -> RuntimeItem {
    RuntimeItem {
        kind: "tool_call".to_string(),
        agent: Some(agent.to_string()),
        tool_name: Some(tool.to_string()),
        args: Some(args),
        ..RuntimeItem::default()
    }
}

fn tool_output(tool: &str, result: serde_json::Value) -> RuntimeItem {
    RuntimeItem {
        kind: "tool_output".to_string(),
        tool_name: Some(tool.to_string()),
        result: Some(result),
        ..RuntimeItem::default()
    }
}

fn handoff_output(source: &str, target: &str) -> RuntimeItem {
    RuntimeItem {
        kind: "handoff_output".to_string(),
        source: Some(source.to_string()),
        target: Some(target.to_string()),
        ..RuntimeItem::default()
    }
}

fn run_result(last_agent: &str, items: Vec<RuntimeItem>) -> AgentExecutionResult {
    AgentExecutionResult {
        last_agent: last_agent.to_string(),
        final_output: String::new(),
        new_items: items,
    }
}

async fn observe(
    backend: Arc<InMemoryBackend>,
    initial_agent: &str,
    items: Vec<RuntimeItem>,
) -> spanfold::RunSummary {
    let session = SessionHandle::start(backend, "events", None, ObserverOptions::default())
        .await
        .expect("session should start");
    session
        .observe(initial_agent, &run_result(initial_agent, items), &RunInput::default())
        .await
        .expect("conversion should succeed")
}

#[tokio::test]
async fn test_message_becomes_llm_event() {
    let backend = Arc::new(InMemoryBackend::new());
    let summary = observe(backend.clone(), "A", vec![message("A", "the answer")]).await;

    assert_eq!(summary.events.len(), 1);
    let event = &summary.events[0];
    assert_eq!(event.kind, EventKind::LlmCall);
    assert!(event.input.is_none());
    assert_eq!(event.output, Some(json!("the answer")));
    assert!(!event.incomplete);

    let stored = backend.step_events(&summary.steps[0].id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].output, Some(json!("the answer")));
}

#[tokio::test]
async fn test_tool_pair_becomes_single_event() {
    let backend = Arc::new(InMemoryBackend::new());
    let summary = observe(
        backend,
        "A",
        vec![
            tool_call("A", "search", json!({"q": "rust"})),
            tool_output("search", json!(["crates.io"])),
        ],
    )
    .await;

    assert_eq!(summary.events.len(), 1);
    let event = &summary.events[0];
    assert_eq!(event.kind, EventKind::ToolCall);
    assert_eq!(event.input, Some(json!({"q": "rust"})));
    assert_eq!(event.output, Some(json!(["crates.io"])));
    assert!(!event.incomplete);
}

#[tokio::test]
async fn test_unmatched_tool_call_is_incomplete() {
    // Truncated trace: the output never arrived. The event is recorded
    // flagged, not dropped.
    let backend = Arc::new(InMemoryBackend::new());
    let summary = observe(
        backend,
        "A",
        vec![tool_call("A", "search", json!({"q": "rust"}))],
    )
    .await;

    assert_eq!(summary.events.len(), 1);
    let event = &summary.events[0];
    assert!(event.incomplete);
    assert_eq!(event.input, Some(json!({"q": "rust"})));
    assert!(event.output.is_none());
}

#[tokio::test]
async fn test_same_tool_twice_pairs_in_order() {
    let backend = Arc::new(InMemoryBackend::new());
    let summary = observe(
        backend,
        "A",
        vec![
            tool_call("A", "search", json!({"q": "first"})),
            tool_call("A", "search", json!({"q": "second"})),
            tool_output("search", json!("result-one")),
            tool_output("search", json!("result-two")),
        ],
    )
    .await;

    assert_eq!(summary.events.len(), 2);
    assert_eq!(summary.events[0].input, Some(json!({"q": "first"})));
    assert_eq!(summary.events[0].output, Some(json!("result-one")));
    assert_eq!(summary.events[1].input, Some(json!({"q": "second"})));
    assert_eq!(summary.events[1].output, Some(json!("result-two")));
}

#[tokio::test]
async fn test_events_attach_to_their_step() {
    let backend = Arc::new(InMemoryBackend::new());
    let summary = observe(
        backend.clone(),
        "A",
        vec![
            message("A", "from-a"),
            handoff_output("A", "B"),
            message("B", "from-b"),
            tool_call("B", "deploy", json!({})),
            tool_output("deploy", json!("ok")),
        ],
    )
    .await;

    assert_eq!(summary.steps.len(), 2);
    assert_eq!(summary.steps[0].events.len(), 1);
    assert_eq!(summary.steps[1].events.len(), 2);

    let first_step_events = backend.step_events(&summary.steps[0].id);
    assert_eq!(first_step_events.len(), 1);
    assert_eq!(first_step_events[0].output, Some(json!("from-a")));

    let second_step_events = backend.step_events(&summary.steps[1].id);
    assert_eq!(second_step_events.len(), 2);
}

#[tokio::test]
async fn test_item_order_changes_event_order_not_membership() {
    // Reordering non-handoff items between the same boundaries must never
    // move them to a different step, only reorder them within it.
    let forward = vec![
        message("A", "one"),
        message("A", "two"),
        handoff_output("A", "B"),
        message("B", "three"),
    ];
    let swapped = vec![
        message("A", "two"),
        message("A", "one"),
        handoff_output("A", "B"),
        message("B", "three"),
    ];

    let summary_forward =
        observe(Arc::new(InMemoryBackend::new()), "A", forward).await;
    let summary_swapped =
        observe(Arc::new(InMemoryBackend::new()), "A", swapped).await;

    assert_eq!(summary_forward.steps[0].events.len(), 2);
    assert_eq!(summary_swapped.steps[0].events.len(), 2);
    assert_eq!(summary_forward.steps[1].events.len(), 1);
    assert_eq!(summary_swapped.steps[1].events.len(), 1);

    let outputs = |summary: &spanfold::RunSummary, step: usize| -> Vec<serde_json::Value> {
        summary
            .events
            .iter()
            .filter(|e| e.step_id == summary.steps[step].id)
            .map(|e| e.output.clone().unwrap())
            .collect()
    };
    assert_eq!(outputs(&summary_forward, 0), vec![json!("one"), json!("two")]);
    assert_eq!(outputs(&summary_swapped, 0), vec![json!("two"), json!("one")]);
}

#[tokio::test]
async fn test_handoff_items_produce_no_events() {
    let backend = Arc::new(InMemoryBackend::new());
    let summary = observe(
        backend,
        "A",
        vec![
            RuntimeItem {
                kind: "handoff_call".to_string(),
                agent: Some("A".to_string()),
                target: Some("B".to_string()),
                ..RuntimeItem::default()
            },
            handoff_output("A", "B"),
        ],
    )
    .await;

    assert_eq!(summary.steps.len(), 2);
    assert!(summary.events.is_empty());
}
