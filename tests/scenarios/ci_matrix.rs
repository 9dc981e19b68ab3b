//! Test: CI Matrix - the four-job workflow end to end

use crate::helpers::*;
use orchestrator::core::{ConfigError, Platform, Status};

/// A failing lint check fails only the lint job
#[tokio::test]
async fn test_lint_failure_leaves_other_jobs_alone() {
    let runner = MockRunner::new().fail_on("cargo fmt", 1).shared();

    let run = run_workflow_with_mock(CI_WORKFLOW, runner.clone()).await;

    assert_eq!(run.status, Status::Failure);
    assert_job_failed_at(&run, "lint", 0);
    assert_job_succeeded(&run, "windows_stable");
    assert_job_succeeded(&run, "linux_stable");
    assert_job_succeeded(&run, "macos_stable");
    assert_eq!(run.succeeded(), 3);
    assert_eq!(run.failed(), 1);
}

/// A failed dependency install stops linux_stable before build and test
#[tokio::test]
async fn test_install_failure_stops_job() {
    let runner = MockRunner::new().fail_on("libvulkan-dev", 100).shared();

    let run = run_workflow_with_mock(CI_WORKFLOW, runner.clone()).await;

    assert_job_failed_at(&run, "linux_stable", 0);
    let result = run.result("linux_stable").unwrap();
    assert_eq!(result.steps[0].exit_code, Some(100));
    assert_eq!(result.attempted_steps(), 1);

    // Build and test were never invoked on linux
    let linux = runner.commands_on(Platform::Linux);
    assert!(!linux.iter().any(|c| c.contains("cargo build")));
    assert!(!linux.iter().any(|c| c.contains("cargo test")));

    // The other platforms still built and tested
    assert!(runner.commands_on(Platform::Macos).iter().any(|c| c.contains("cargo test")));
    assert!(runner.commands_on(Platform::Windows).iter().any(|c| c.contains("cargo test")));
}

/// Every job passing makes the run pass
#[tokio::test]
async fn test_all_jobs_succeed() {
    let runner = MockRunner::new().shared();

    let run = run_workflow_with_mock(CI_WORKFLOW, runner.clone()).await;

    assert_eq!(run.status, Status::Success);
    assert!(run.is_success());
    for name in ["lint", "windows_stable", "linux_stable", "macos_stable"] {
        assert_job_succeeded(&run, name);
    }
    // 1 lint + 2 windows + 3 linux + 2 macos
    assert_eq!(runner.calls().len(), 8);
}

/// An empty job list is rejected before anything runs
#[tokio::test]
async fn test_empty_job_list_is_rejected() {
    let runner = MockRunner::new().shared();
    let engine = mock_engine(MockEnvironment::new(runner.clone()), false);

    let result = engine.submit(vec![]).await;

    assert!(matches!(result, Err(ConfigError::NoJobs)));
    assert!(runner.calls().is_empty());
}

/// Results come back in declared order no matter which job finishes first
#[tokio::test]
async fn test_results_follow_declared_order() {
    let runner = MockRunner::new()
        .delay_on("cargo fmt", std::time::Duration::from_millis(50))
        .shared();

    let run = run_workflow_with_mock(CI_WORKFLOW, runner).await;

    let names: Vec<_> = run.results.iter().map(|r| r.job.as_str()).collect();
    assert_eq!(names, ["lint", "windows_stable", "linux_stable", "macos_stable"]);
}

/// Color preference reaches every command as environment variables
#[tokio::test]
async fn test_color_preference_is_passed_to_commands() {
    let runner = MockRunner::new().shared();
    let engine = mock_engine(MockEnvironment::new(runner.clone()), true);
    engine.submit(jobs_from_yaml(CI_WORKFLOW)).await.unwrap();

    for call in runner.calls() {
        assert_eq!(call.env.get("CARGO_TERM_COLOR").map(String::as_str), Some("always"));
        assert!(!call.env.contains_key("NO_COLOR"));
    }

    // Turning color off overrides the workflow's own CARGO_TERM_COLOR
    let runner = MockRunner::new().shared();
    let engine = mock_engine(MockEnvironment::new(runner.clone()), false);
    engine.submit(jobs_from_yaml(CI_WORKFLOW)).await.unwrap();

    for call in runner.calls() {
        assert_eq!(call.env.get("CARGO_TERM_COLOR").map(String::as_str), Some("never"));
        assert_eq!(call.env.get("NO_COLOR").map(String::as_str), Some("1"));
    }
}
