use std::sync::{Arc, Mutex};

use localflow::errors::LocalFlowError;
use localflow::exec::executor::{JobStatus, WorkflowExecutor};
use localflow_test_utils::builders::{test_config, JobBuilder, WorkflowBuilder};
use localflow_test_utils::fake_runner::{FakeRunner, Invocation};
use localflow_test_utils::init_tracing;

fn executor_with_fake(
    workflow: localflow::workflow::model::Workflow,
    fake: FakeRunner,
) -> WorkflowExecutor {
    WorkflowExecutor::new(workflow, test_config())
        .expect("workflow should validate")
        .with_shell_runner(Box::new(fake))
}

fn commands(invocations: &Arc<Mutex<Vec<Invocation>>>) -> Vec<String> {
    invocations
        .lock()
        .unwrap()
        .iter()
        .map(|i| i.command.clone())
        .collect()
}

#[test]
fn test_diamond_runs_shared_dependency_once() {
    init_tracing();
    // a <- b, a <- c, {b, c} <- d
    let workflow = WorkflowBuilder::new("diamond")
        .with_job(JobBuilder::new("a").step("echo a").build())
        .with_job(JobBuilder::new("b").needs("job_a").step("echo b").build())
        .with_job(JobBuilder::new("c").needs("job_a").step("echo c").build())
        .with_job(
            JobBuilder::new("d")
                .needs("job_b")
                .needs("job_c")
                .step("echo d")
                .build(),
        )
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_fake(workflow, FakeRunner::new(Arc::clone(&invocations)));

    assert!(executor.run().expect("run should not error"));

    let ran = commands(&invocations);
    assert_eq!(ran, vec!["echo a", "echo b", "echo c", "echo d"]);
}

#[test]
fn test_self_cycle_is_an_error() {
    init_tracing();
    let workflow = WorkflowBuilder::new("selfcycle")
        .with_job(JobBuilder::new("a").needs("job_a").step("echo a").build())
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_fake(workflow, FakeRunner::new(Arc::clone(&invocations)));

    let err = executor.run().expect_err("cycle should be detected");
    match err {
        LocalFlowError::CycleDetected { path } => {
            assert_eq!(path, vec!["job_a", "job_a"]);
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
    assert!(commands(&invocations).is_empty());
}

#[test]
fn test_chain_cycle_reports_full_path() {
    init_tracing();
    let workflow = WorkflowBuilder::new("chaincycle")
        .with_job(JobBuilder::new("a").needs("job_c").step("echo a").build())
        .with_job(JobBuilder::new("b").needs("job_a").step("echo b").build())
        .with_job(JobBuilder::new("c").needs("job_b").step("echo c").build())
        .build();

    let mut executor = executor_with_fake(
        workflow,
        FakeRunner::new(Arc::new(Mutex::new(Vec::new()))),
    );

    let err = executor.run().expect_err("cycle should be detected");
    match err {
        LocalFlowError::CycleDetected { path } => {
            assert_eq!(path.len(), 4);
            assert_eq!(path.first(), path.last());
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn test_skipped_job_satisfies_dependents() {
    init_tracing();
    let workflow = WorkflowBuilder::new("skipped")
        .with_job(
            JobBuilder::new("a")
                .condition("false")
                .step("echo a")
                .build(),
        )
        .with_job(JobBuilder::new("b").needs("job_a").step("echo b").build())
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_fake(workflow, FakeRunner::new(Arc::clone(&invocations)));

    assert!(executor.run().expect("run should not error"));
    assert_eq!(commands(&invocations), vec!["echo b"]);
    assert_eq!(executor.statuses().get("job_a"), Some(&JobStatus::Skipped));
    assert_eq!(executor.statuses().get("job_b"), Some(&JobStatus::Succeeded));
}

#[test]
fn test_failed_dependency_aborts_dependent() {
    init_tracing();
    // "early" sorts first and depends on "late", which fails. The dependent
    // is marked failed and the run stops there.
    let workflow = WorkflowBuilder::new("depfail")
        .with_job(
            JobBuilder::new("early")
                .needs("job_late")
                .step("echo early")
                .build(),
        )
        .with_job(JobBuilder::new("late").step("boom now").build())
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let fake = FakeRunner::new(Arc::clone(&invocations)).fail_on("boom");
    let mut executor = executor_with_fake(workflow, fake);

    assert!(!executor.run().expect("run should not error"));
    assert_eq!(commands(&invocations), vec!["boom now"]);
    assert_eq!(executor.statuses().get("job_late"), Some(&JobStatus::Failed));
    assert_eq!(executor.statuses().get("job_early"), Some(&JobStatus::Failed));
}

#[test]
fn test_run_stops_at_first_failure() {
    init_tracing();
    let workflow = WorkflowBuilder::new("shortcircuit")
        .with_job(JobBuilder::new("a").step("boom now").build())
        .with_job(JobBuilder::new("b").step("echo b").build())
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let fake = FakeRunner::new(Arc::clone(&invocations)).fail_on("boom");
    let mut executor = executor_with_fake(workflow, fake);

    assert!(!executor.run().expect("run should not error"));
    assert_eq!(commands(&invocations), vec!["boom now"]);
    assert!(!executor.statuses().contains_key("job_b"));
}

#[test]
fn test_condition_over_completed_dependency() {
    init_tracing();
    // b runs because a completed; c is skipped because "not job_a" is false.
    let workflow = WorkflowBuilder::new("conds")
        .with_job(JobBuilder::new("a").step("echo a").build())
        .with_job(
            JobBuilder::new("b")
                .needs("job_a")
                .condition("job_a")
                .step("echo b")
                .build(),
        )
        .with_job(
            JobBuilder::new("c")
                .needs("job_a")
                .condition("not job_a")
                .step("echo c")
                .build(),
        )
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_fake(workflow, FakeRunner::new(Arc::clone(&invocations)));

    assert!(executor.run().expect("run should not error"));
    assert_eq!(commands(&invocations), vec!["echo a", "echo b"]);
    assert_eq!(executor.statuses().get("job_c"), Some(&JobStatus::Skipped));
}

#[test]
fn test_step_without_command_fails_job() {
    init_tracing();
    let workflow = WorkflowBuilder::new("norun")
        .with_job(JobBuilder::new("a").step_without_command().build())
        .build();

    let mut executor = executor_with_fake(
        workflow,
        FakeRunner::new(Arc::new(Mutex::new(Vec::new()))),
    );

    assert!(!executor.run().expect("run should not error"));
    assert_eq!(executor.statuses().get("job_a"), Some(&JobStatus::Failed));
}

#[test]
fn test_env_layering_later_layers_win() {
    init_tracing();
    let workflow = WorkflowBuilder::new("envs")
        .with_env("FOO", "workflow")
        .with_env("BAR", "workflow")
        .with_job(JobBuilder::new("a").env("FOO", "job").step("echo a").build())
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_fake(workflow, FakeRunner::new(Arc::clone(&invocations)));

    assert!(executor.run().expect("run should not error"));

    let guard = invocations.lock().unwrap();
    let env = &guard[0].env;
    assert_eq!(env.get("FOO").map(String::as_str), Some("job"));
    assert_eq!(env.get("BAR").map(String::as_str), Some("workflow"));
}

#[test]
fn test_execute_job_by_name_pulls_in_dependencies() {
    init_tracing();
    let workflow = WorkflowBuilder::new("single")
        .with_job(JobBuilder::new("a").step("echo a").build())
        .with_job(JobBuilder::new("b").needs("job_a").step("echo b").build())
        .with_job(JobBuilder::new("c").step("echo c").build())
        .build();

    let invocations = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_fake(workflow, FakeRunner::new(Arc::clone(&invocations)));

    assert!(executor.execute_job("b").expect("run should not error"));
    assert_eq!(commands(&invocations), vec!["echo a", "echo b"]);
}

#[test]
fn test_unknown_job_is_an_error() {
    init_tracing();
    let workflow = WorkflowBuilder::new("missing")
        .with_job(JobBuilder::new("a").step("echo a").build())
        .build();

    let mut executor = executor_with_fake(
        workflow,
        FakeRunner::new(Arc::new(Mutex::new(Vec::new()))),
    );

    let err = executor.execute_job("nope").expect_err("job should not exist");
    assert!(matches!(err, LocalFlowError::JobNotFound(_)));
}

#[test]
fn test_validation_rejects_unknown_needs() {
    init_tracing();
    let workflow = WorkflowBuilder::new("badneeds")
        .with_job(JobBuilder::new("a").needs("job_ghost").step("echo a").build())
        .build();

    let err = WorkflowExecutor::new(workflow, test_config())
        .err()
        .expect("validation should fail");
    match err {
        LocalFlowError::Validation(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("job_ghost"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}
