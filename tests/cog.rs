mod common;

use serde_json::json;

use cogflow::cog::{Cog, CogError};
use cogflow::runner::AgentRunError;
use cogflow::types::new_context;

use common::agents::{FixedAgent, LoggingAgent, ScriptedAgent, Step, new_event_log};
use common::memory::RecordingMemory;
use common::{test_agent_registry, test_memory_registry};

#[tokio::test]
async fn linear_flow_returns_the_whole_context() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: draft, type: test}
    - {id: review, type: test}
  flow:
    start: draft
    transitions:
      draft: review
      review:
        end: true
"#,
        )
        .agents(test_agent_registry(vec![
            ("draft", FixedAgent::new(json!({"text": "first pass"}))),
            ("review", FixedAgent::new(json!({"verdict": "approve"}))),
        ]))
        .build()
        .unwrap();

    let mut seed = new_context();
    seed.insert("topic".to_string(), json!("release notes"));
    let result = cog.run(seed).await.unwrap();

    assert_eq!(
        result,
        json!({
            "draft": {"text": "first pass"},
            "review": {"verdict": "approve"},
            "topic": "release notes",
        })
    );

    let trail = cog.tracked_trail();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].agent_id, "draft");
    assert_eq!(trail[0].execution_order, 1);
    assert_eq!(trail[1].agent_id, "review");
    assert_eq!(trail[1].execution_order, 2);
    assert!(trail[0].timestamp <= trail[1].timestamp);
    assert!(trail.iter().all(|e| e.error.is_none()));
}

#[tokio::test]
async fn end_dot_path_extracts_from_the_final_node_output() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: summarize, type: test}
  flow:
    start: summarize
    transitions:
      summarize:
        end: report.body
"#,
        )
        .agents(test_agent_registry(vec![(
            "summarize",
            FixedAgent::new(json!({"report": {"body": "all good", "score": 7}})),
        )]))
        .build()
        .unwrap();

    let result = cog.run(new_context()).await.unwrap();
    assert_eq!(result, json!("all good"));
}

#[tokio::test]
async fn missing_result_path_yields_null_not_an_error() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: summarize, type: test}
  flow:
    start: summarize
    transitions:
      summarize:
        end: report.missing
"#,
        )
        .agents(test_agent_registry(vec![(
            "summarize",
            FixedAgent::new(json!({"report": {"body": "all good"}})),
        )]))
        .build()
        .unwrap();

    assert_eq!(cog.run(new_context()).await.unwrap(), json!(null));
}

#[tokio::test]
async fn decision_routes_on_the_node_output() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: review, type: test}
    - {id: ship, type: test}
    - {id: rework, type: test}
  flow:
    start: review
    transitions:
      review:
        verdict:
          approve: ship
          default: rework
      ship:
        end: status
      rework:
        end: true
"#,
        )
        .agents(test_agent_registry(vec![
            ("review", FixedAgent::new(json!({"verdict": "APPROVE"}))),
            ("ship", FixedAgent::new(json!({"status": "shipped"}))),
            ("rework", FixedAgent::new(json!("should not run"))),
        ]))
        .build()
        .unwrap();

    assert_eq!(cog.run(new_context()).await.unwrap(), json!("shipped"));
}

#[tokio::test]
async fn visit_ceiling_breaks_the_cycle_through_the_fallback() {
    let looper = ScriptedAgent::new(vec![
        Step::Ok(json!({"decision": "again"})),
        Step::Ok(json!({"decision": "again"})),
        Step::Ok(json!({"decision": "again"})),
    ]);
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: refine, type: test}
    - {id: publish, type: test}
  flow:
    start: refine
    transitions:
      refine:
        decision:
          again: refine
          default: publish
        max_visits: 2
      publish:
        end: status
"#,
        )
        .agents(test_agent_registry(vec![
            ("refine", looper.clone() as _),
            ("publish", FixedAgent::new(json!({"status": "published"}))),
        ]))
        .build()
        .unwrap();

    assert_eq!(cog.run(new_context()).await.unwrap(), json!("published"));
    // Two in-ceiling visits plus the one that trips the fallback.
    assert_eq!(looper.calls(), 3);
}

#[tokio::test]
async fn visit_ceiling_without_fallback_halts_with_last_output() {
    let looper = ScriptedAgent::new(vec![
        Step::Ok(json!({"decision": "again", "round": 1})),
        Step::Ok(json!({"decision": "again", "round": 2})),
    ]);
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: refine, type: test}
  flow:
    start: refine
    transitions:
      refine:
        decision:
          again: refine
        max_visits: 1
"#,
        )
        .agents(test_agent_registry(vec![("refine", looper.clone() as _)]))
        .build()
        .unwrap();

    let result = cog.run(new_context()).await.unwrap();
    assert_eq!(result, json!({"decision": "again", "round": 2}));
    assert_eq!(looper.calls(), 2);
}

#[tokio::test]
async fn memory_hooks_wrap_the_triggering_node() {
    let log = new_event_log();
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: draft, type: test}
    - {id: review, type: test}
  flow:
    start: draft
    transitions:
      draft: review
      review:
        end: true
  memory:
    - id: episodic
      type: recall
      query_before: draft
      update_after: draft
"#,
        )
        .agents(test_agent_registry(vec![
            (
                "draft",
                LoggingAgent::new("draft", json!({"text": "draft"}), log.clone()) as _,
            ),
            (
                "review",
                LoggingAgent::new("review", json!({"verdict": "approve"}), log.clone()) as _,
            ),
        ]))
        .memory(test_memory_registry(vec![(
            "episodic",
            RecordingMemory::new("episodic", log.clone()) as _,
        )]))
        .build()
        .unwrap();

    let result = cog.run(new_context()).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "query:episodic".to_string(),
            "exec:draft".to_string(),
            "update:episodic".to_string(),
            "exec:review".to_string(),
        ]
    );
    // The queried store was merged into the context under the memory id.
    assert_eq!(
        result["episodic"],
        json!({"snippets": ["recall-episodic"]})
    );
}

#[tokio::test]
async fn failed_memory_query_degrades_to_an_empty_retrieval() {
    let log = new_event_log();
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: draft, type: test}
  flow:
    start: draft
    transitions:
      draft:
        end: true
  memory:
    - id: episodic
      type: recall
      query_before: draft
"#,
        )
        .agents(test_agent_registry(vec![(
            "draft",
            FixedAgent::new(json!({"text": "draft"})),
        )]))
        .memory(test_memory_registry(vec![(
            "episodic",
            RecordingMemory::failing_query("episodic", log.clone()) as _,
        )]))
        .build()
        .unwrap();

    let result = cog.run(new_context()).await.unwrap();
    // The run completed; the memory slot holds the untouched (empty) store.
    assert_eq!(result["episodic"], json!(null));
    assert_eq!(result["draft"], json!({"text": "draft"}));
}

#[tokio::test]
async fn failed_memory_update_fails_the_run() {
    let log = new_event_log();
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: draft, type: test}
  flow:
    start: draft
    transitions:
      draft:
        end: true
  memory:
    - id: ledger
      type: recall
      update_after: draft
"#,
        )
        .agents(test_agent_registry(vec![(
            "draft",
            FixedAgent::new(json!({"text": "draft"})),
        )]))
        .memory(test_memory_registry(vec![(
            "ledger",
            RecordingMemory::failing_update("ledger", log.clone()) as _,
        )]))
        .build()
        .unwrap();

    let err = cog.run(new_context()).await.unwrap_err();
    match err {
        CogError::Memory(hook) => {
            assert_eq!(hook.memory_id, "ledger");
            assert_eq!(hook.agent_id, "draft");
        }
        other => panic!("expected a memory hook error, got {other:?}"),
    }
}

#[tokio::test]
async fn exhausted_agent_fails_the_run_and_is_recorded() {
    let agent = ScriptedAgent::new(vec![
        Step::Err("one".into()),
        Step::Err("two".into()),
        Step::Err("three".into()),
    ]);
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: flaky, type: test}
  flow:
    start: flaky
    transitions:
      flaky:
        end: true
"#,
        )
        .agents(test_agent_registry(vec![("flaky", agent.clone() as _)]))
        .build()
        .unwrap();

    let err = cog.run(new_context()).await.unwrap_err();
    assert_eq!(agent.calls(), 3);
    assert!(matches!(err, CogError::Agent(AgentRunError::Agent(_))));

    let trail = cog.tracked_trail();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].agent_id, "flaky");
    assert_eq!(trail[0].output, json!(null));
    assert_eq!(trail[0].error.as_deref(), Some("three"));
}

#[tokio::test]
async fn step_ceiling_stops_unbounded_cycles() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: ping, type: test}
    - {id: pong, type: test}
  flow:
    start: ping
    transitions:
      ping: pong
      pong: ping
"#,
        )
        .agents(test_agent_registry(vec![
            ("ping", FixedAgent::new(json!("ping"))),
            ("pong", FixedAgent::new(json!("pong"))),
        ]))
        .step_ceiling(5)
        .build()
        .unwrap();

    let err = cog.run(new_context()).await.unwrap_err();
    assert!(matches!(err, CogError::StepCeilingExceeded { ceiling: 5 }));
}

#[tokio::test]
async fn document_can_disable_trail_logging() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: solo, type: test}
  flow:
    start: solo
    transitions:
      solo:
        end: true
  trail_logging: false
"#,
        )
        .agents(test_agent_registry(vec![(
            "solo",
            FixedAgent::new(json!("done")),
        )]))
        .build()
        .unwrap();

    cog.run(new_context()).await.unwrap();
    assert!(cog.tracked_trail().is_empty());
}

#[tokio::test]
async fn builder_override_wins_over_the_document_flag() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: solo, type: test}
  flow:
    start: solo
    transitions:
      solo:
        end: true
  trail_logging: false
"#,
        )
        .agents(test_agent_registry(vec![(
            "solo",
            FixedAgent::new(json!("done")),
        )]))
        .trail_logging(true)
        .build()
        .unwrap();

    cog.run(new_context()).await.unwrap();
    assert_eq!(cog.tracked_trail().len(), 1);
}

#[tokio::test]
async fn node_output_overwrites_a_colliding_seed_key() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: solo, type: test}
  flow:
    start: solo
    transitions:
      solo:
        end: true
"#,
        )
        .agents(test_agent_registry(vec![(
            "solo",
            FixedAgent::new(json!("fresh")),
        )]))
        .build()
        .unwrap();

    let mut seed = new_context();
    seed.insert("solo".to_string(), json!("stale"));
    let result = cog.run(seed).await.unwrap();
    assert_eq!(result, json!({"solo": "fresh"}));
}

#[tokio::test]
async fn runs_are_independent() {
    let cog = Cog::builder()
        .config_str(
            r#"
cog:
  agents:
    - {id: solo, type: test}
  flow:
    start: solo
    transitions:
      solo:
        end: true
"#,
        )
        .agents(test_agent_registry(vec![(
            "solo",
            FixedAgent::new(json!("done")),
        )]))
        .build()
        .unwrap();

    let mut seed = new_context();
    seed.insert("first".to_string(), json!(true));
    let first = cog.run(seed).await.unwrap();
    assert_eq!(first, json!({"first": true, "solo": "done"}));

    // Nothing from the first run leaks into the second.
    let second = cog.run(new_context()).await.unwrap();
    assert_eq!(second, json!({"solo": "done"}));
    assert_eq!(cog.tracked_trail().len(), 1);
}
