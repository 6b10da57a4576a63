mod common;

use std::sync::Arc;

use common::{actor, init_tracing, step};
use taskpilot::{
    ActionCacheEntry, Engine, EngineConfig, EngineError, Rejection, RunContext, RunnerFn,
    TaskOutput, TaskParams, TaskStatus, Variable,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Runner that completes immediately, echoing the variables it was given.
fn echo_engine(max_cache_entries: usize) -> Arc<Engine> {
    init_tracing();
    let runner = RunnerFn::arc(|ctx: RunContext| async move {
        let vars: Vec<String> = ctx.variables.iter().map(|v| format!("{}={}", v.key, v.value)).collect();
        Ok::<_, Rejection>(
            TaskOutput::completed(vars.join(","))
                .with_trace(vec![step(0, "go_to_url"), step(1, "click")]),
        )
    });
    let cfg = EngineConfig {
        max_cache_entries,
        ..EngineConfig::default()
    };
    Engine::builder(cfg, runner).build().expect("engine builds")
}

#[tokio::test]
async fn cache_evicts_oldest_task_first() -> TestResult {
    let engine = echo_engine(2);
    let mut ids = Vec::new();
    for n in 0..3 {
        let outcome = engine
            .execute_task(&format!("task {n}"), TaskParams::default(), Some(actor()))
            .await?;
        ids.push(outcome.task_id);
    }

    assert_eq!(engine.action_cache().len(), 2);
    assert!(engine.get_action_cache(ids[0].as_str()).is_none());
    assert!(engine.get_action_cache(ids[1].as_str()).is_some());
    assert!(engine.get_action_cache(ids[2].as_str()).is_some());
    assert_eq!(engine.action_cache().ids(), vec![ids[1].clone(), ids[2].clone()]);
    // Evicted tasks are unknown from then on.
    assert_eq!(engine.cancel(ids[0].as_str()), TaskStatus::Failed);
    assert_eq!(engine.cancel(ids[2].as_str()), TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn script_is_synthesized_from_the_cached_trace() -> TestResult {
    let engine = echo_engine(10);
    let outcome = engine
        .execute_task("log in", TaskParams::default(), Some(actor()))
        .await?;
    let id = outcome.task_id.as_str();

    let synth = |steps: &[ActionCacheEntry], task: Option<&str>| {
        let body: Vec<&str> = steps.iter().map(|s| s.action_type.as_str()).collect();
        format!("# {}\n{}", task.unwrap_or("?"), body.join("\n"))
    };
    let script = engine.create_script_from_action_cache(&synth, id);
    assert_eq!(script, Some(format!("# {id}\ngo_to_url\nclick")));
    assert_eq!(engine.create_script_from_action_cache(&synth, "missing"), None);
    Ok(())
}

#[tokio::test]
async fn variables_are_snapshotted_per_task() -> TestResult {
    let engine = echo_engine(10);
    engine.add_variable(Variable::new("user", "ada").with_description("login name"))?;
    engine.add_variable(Variable::new("env", "staging"))?;

    let first = engine.execute_task("a", TaskParams::default(), Some(actor())).await?;
    assert_eq!(first.output.as_deref(), Some("env=staging,user=ada"));

    assert!(engine.delete_variable("env")?);
    assert!(!engine.delete_variable("env")?);
    let second = engine.execute_task("b", TaskParams::default(), Some(actor())).await?;
    assert_eq!(second.output.as_deref(), Some("user=ada"));

    assert_eq!(engine.get_variable("user").map(|v| v.description), Some("login name".into()));
    assert_eq!(engine.get_variables().len(), 1);

    let err = engine.add_variable(Variable::new("bad key", "x")).unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput { .. }));
    assert!(engine.delete_variable("").is_err());
    Ok(())
}

#[tokio::test]
async fn output_schema_reaches_the_runner() -> TestResult {
    let runner = RunnerFn::arc(|ctx: RunContext| async move {
        let schema = ctx.task.output_schema().cloned().unwrap_or_default();
        Ok::<_, Rejection>(TaskOutput::completed(schema.to_string()))
    });
    let engine = Engine::builder(EngineConfig::default(), runner).build()?;
    let params = TaskParams::default().with_output_schema(serde_json::json!({ "type": "object" }));

    let outcome = engine.execute_task("extract", params, Some(actor())).await?;
    assert_eq!(outcome.output.as_deref(), Some(r#"{"type":"object"}"#));
    assert_eq!(outcome.status, TaskStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn runner_dispatches_registry_actions() -> TestResult {
    let runner = RunnerFn::arc(|ctx: RunContext| async move {
        let Some(complete) = ctx.actions.get("complete").cloned() else {
            return Err(Rejection::Value("complete action missing".into()));
        };
        let params = serde_json::json!({ "success": true, "text": "all done" });
        let result = complete.run(ctx.action_context(), params).await;
        let entry = ActionCacheEntry::new(0, "complete").with_outcome(result.success, result.message.clone());
        Ok(TaskOutput::completed(result.message).with_trace(vec![entry]))
    });
    let engine = Engine::builder(EngineConfig::default(), runner).build()?;

    let outcome = engine.execute_task("finish", TaskParams::default(), Some(actor())).await?;
    assert_eq!(outcome.output.as_deref(), Some("all done"));
    let cache = engine.get_action_cache(outcome.task_id.as_str()).expect("cached");
    assert!(cache.steps[0].success);

    let rendered = engine.format_action(&taskpilot::ActionInstance::new(
        "complete",
        serde_json::json!({ "success": true, "text": "all done" }),
    ));
    assert_eq!(rendered, "complete: all done");
    assert_eq!(engine.format_action(&taskpilot::ActionInstance::new("nope", serde_json::Value::Null)), "");
    Ok(())
}
