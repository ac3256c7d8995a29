//! Integration tests for the step lifecycle manager
//!
//! Converts synthetic runs against the in-memory backend and checks the
//! step counts, ordinals, and handoff stamps of the reconstructed hierarchy.

use std::sync::Arc;

use serde_json::json;
use spanfold::{
    AgentExecutionResult, AgentName, Backend, InMemoryBackend, ObserverOptions, RevisitPolicy,
    RunInput, SessionHandle, StepFields, StepOutcome, RuntimeItem,
};

fn message(agent: &str, text: &str) -> RuntimeItem {
    RuntimeItem {
        kind: "message".to_string(),
        agent: Some(agent.to_string()),
        content: Some(json!(text)),
        ..RuntimeItem::default()
    }
}

fn handoff_call(agent: &str, target: &str) -> RuntimeItem {
    RuntimeItem {
        kind: "handoff_call".to_string(),
        agent: Some(agent.to_string()),
        target: Some(target.to_string()),
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

fn run_result(last_agent: &str, final_output: &str, items: Vec<RuntimeItem>) -> AgentExecutionResult {
    AgentExecutionResult {
        last_agent: last_agent.to_string(),
        final_output: final_output.to_string(),
        new_items: items,
    }
}

async fn fresh_session(backend: Arc<InMemoryBackend>) -> SessionHandle {
    SessionHandle::start(backend, "test-session", None, ObserverOptions::default())
        .await
        .expect("session should start")
}

#[tokio::test]
async fn test_chain_cardinality() {
    let _ = env_logger::builder().is_test(true).try_init();
    let backend = Arc::new(InMemoryBackend::new());
    let session = fresh_session(backend.clone()).await;

    let result = run_result(
        "C",
        "done",
        vec![
            message("A", "one"),
            handoff_output("A", "B"),
            message("B", "two"),
            handoff_output("B", "C"),
            message("C", "three"),
        ],
    );

    let summary = session
        .observe("A", &result, &RunInput::default())
        .await
        .expect("conversion should succeed");

    assert_eq!(summary.handoffs.len(), 2);
    assert_eq!(summary.steps.len(), 3);
    let ordinals: Vec<u64> = summary.steps.iter().map(|s| s.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
    assert_eq!(backend.step_count(session.session_id()), 3);
}

#[tokio::test]
async fn test_no_handoff_yields_single_step() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = fresh_session(backend.clone()).await;

    let result = run_result("A", "done", vec![message("A", "solo")]);
    let summary = session
        .observe("A", &result, &RunInput::default())
        .await
        .expect("conversion should succeed");

    assert_eq!(summary.steps.len(), 1);
    let step = &summary.steps[0];
    assert!(step.handoff_from.is_none());
    assert!(step.handoff_to.is_none());
    assert!(step.finished);
    assert_eq!(step.outcome, Some(StepOutcome::Completed));
}

#[tokio::test]
async fn test_worked_example() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = fresh_session(backend.clone()).await;

    let result = run_result(
        "Eng",
        "Deployed the fix",
        vec![
            message("Recept", "routing"),
            handoff_call("Recept", "Tech"),
            handoff_output("Recept", "Tech"),
            message("Tech", "diagnosing"),
            handoff_call("Tech", "Eng"),
            handoff_output("Tech", "Eng"),
            message("Eng", "fixing"),
        ],
    );

    let summary = session
        .observe("Recept", &result, &RunInput::from_prompt("Fix the outage"))
        .await
        .expect("conversion should succeed");

    assert_eq!(summary.steps.len(), 3);

    let first = &summary.steps[0];
    assert_eq!(first.agent, AgentName::from("Recept"));
    assert!(first.handoff_from.is_none());
    assert_eq!(first.handoff_to, Some(AgentName::from("Tech")));
    assert_eq!(first.outcome, Some(StepOutcome::HandoffOut));
    assert_eq!(first.fields.goal.as_deref(), Some("Fix the outage"));

    let second = &summary.steps[1];
    assert_eq!(second.agent, AgentName::from("Tech"));
    assert_eq!(second.handoff_from, Some(AgentName::from("Recept")));
    assert_eq!(second.handoff_to, Some(AgentName::from("Eng")));

    let third = &summary.steps[2];
    assert_eq!(third.agent, AgentName::from("Eng"));
    assert_eq!(third.handoff_from, Some(AgentName::from("Tech")));
    assert!(third.handoff_to.is_none());
    assert_eq!(third.outcome, Some(StepOutcome::Completed));
    assert_eq!(third.fields.goal.as_deref(), Some("Deployed the fix"));
}

#[tokio::test]
async fn test_abandoned_handoff_yields_single_step() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = fresh_session(backend.clone()).await;

    let result = run_result(
        "A",
        "",
        vec![message("A", "thinking"), handoff_call("A", "B")],
    );

    let summary = session
        .observe("A", &result, &RunInput::default())
        .await
        .expect("conversion should succeed");

    assert!(summary.handoffs.is_empty());
    assert_eq!(summary.steps.len(), 1);
}

#[tokio::test]
async fn test_inconsistent_chain_trusts_handoff_record() {
    // The chain names a source that never held the open step. The explicit
    // record wins; conversion continues with the chain's own naming.
    let backend = Arc::new(InMemoryBackend::new());
    let session = fresh_session(backend.clone()).await;

    let result = run_result(
        "C",
        "done",
        vec![message("A", "one"), handoff_output("B", "C")],
    );

    let summary = session
        .observe("A", &result, &RunInput::default())
        .await
        .expect("conversion should continue despite the discrepancy");

    assert_eq!(summary.steps.len(), 2);
    assert_eq!(summary.steps[0].agent, AgentName::from("A"));
    assert_eq!(summary.steps[0].handoff_to, Some(AgentName::from("C")));
    assert_eq!(summary.steps[1].agent, AgentName::from("C"));
    assert_eq!(summary.steps[1].handoff_from, Some(AgentName::from("B")));
}

#[tokio::test]
async fn test_idempotent_finish() {
    let backend = Arc::new(InMemoryBackend::new());
    let session_id = backend
        .init_session("idempotency", None)
        .await
        .expect("session should initialize");

    let fields = StepFields {
        state: Some("first finish".to_string()),
        ..StepFields::default()
    };
    let step_id = backend
        .create_step(&session_id, &StepFields::default())
        .await
        .expect("step should be created");

    backend
        .end_step(&step_id, &fields)
        .await
        .expect("first finish should succeed");
    backend
        .end_step(
            &step_id,
            &StepFields {
                state: Some("second finish".to_string()),
                ..StepFields::default()
            },
        )
        .await
        .expect("second finish should be a no-op, not an error");

    let stored = backend.step(&step_id).expect("step should exist");
    assert!(stored.finished);
    assert_eq!(stored.fields.state.as_deref(), Some("first finish"));
}

#[tokio::test]
async fn test_failed_run_records_failed_step() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = fresh_session(backend.clone()).await;

    let step = session
        .observe_failure("A", "tool sandbox unreachable", &RunInput::default())
        .await
        .expect("failure should still be recorded");

    assert_eq!(step.outcome, Some(StepOutcome::Failed));
    assert!(step.finished);
    assert_eq!(step.fields.goal.as_deref(), Some("tool sandbox unreachable"));

    // The failed attempt consumed an ordinal; the next run continues after it.
    let summary = session
        .observe("A", &run_result("A", "ok", vec![message("A", "retry")]), &RunInput::default())
        .await
        .expect("conversion should succeed");
    assert_eq!(summary.steps[0].ordinal, 1);
}

#[tokio::test]
async fn test_revisited_agent_new_step_by_default() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = fresh_session(backend.clone()).await;

    let result = run_result(
        "A",
        "done",
        vec![
            message("A", "one"),
            handoff_output("A", "B"),
            message("B", "two"),
            handoff_output("B", "A"),
            message("A", "three"),
        ],
    );

    let summary = session
        .observe("A", &result, &RunInput::default())
        .await
        .expect("conversion should succeed");

    // Default policy: the revisit opens a third step for A.
    assert_eq!(summary.steps.len(), 3);
    assert_eq!(summary.steps[0].agent, summary.steps[2].agent);
}

#[tokio::test]
async fn test_revisited_agent_reuse_policy() {
    let backend = Arc::new(InMemoryBackend::new());
    let options = ObserverOptions::builder()
        .revisit_policy(RevisitPolicy::ReuseRevisitedStep)
        .build();
    let session = SessionHandle::start(backend.clone(), "reuse", None, options)
        .await
        .expect("session should start");

    let result = run_result(
        "A",
        "done",
        vec![
            message("A", "one"),
            handoff_output("A", "B"),
            message("B", "two"),
            handoff_output("B", "A"),
            message("A", "three"),
        ],
    );

    let summary = session
        .observe("A", &result, &RunInput::default())
        .await
        .expect("conversion should succeed");

    assert_eq!(summary.steps.len(), 2);
    assert_eq!(backend.step_count(session.session_id()), 2);
    // The reused step ends the run holding control.
    assert_eq!(summary.steps[0].outcome, Some(StepOutcome::Completed));
    assert!(summary.steps.iter().all(|s| s.finished));
}
