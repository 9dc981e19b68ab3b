//! Test: Step Ordering - steps run in declared order and stop at the first failure

use crate::helpers::*;
use orchestrator::core::{Platform, StepStatus};

const ORDERED: &str = r#"
env:
  TARGET: x86_64-unknown-linux-gnu

jobs:
  build:
    runs-on: ubuntu-22.04
    env:
      PROFILE: release
    steps:
      - run: echo one
      - name: Build
        run: cargo build --profile ${{ env.PROFILE }} --target ${{ env.TARGET }}
      - name: Test
        run: cargo test
        working-directory: crates/core
      - name: Package
        shell: sh
        run: tar czf out.tgz target
"#;

/// Commands reach the runner in step order, with expressions expanded
#[tokio::test]
async fn test_steps_run_in_order() {
    let runner = MockRunner::new().shared();

    let run = run_workflow_with_mock(ORDERED, runner.clone()).await;

    assert_job_succeeded(&run, "build");
    let commands = runner.commands_on(Platform::Linux);
    assert_eq!(commands.len(), 4);
    assert!(commands[0].ends_with("echo one"));
    assert!(commands[1].ends_with("cargo build --profile release --target x86_64-unknown-linux-gnu"));
    assert!(commands[2].ends_with("cargo test"));
    assert!(commands[3].starts_with("sh "));

    let result = run.result("build").unwrap();
    assert_eq!(result.steps[0].name, "Run echo one");
    assert_eq!(result.steps[0].stdout, commands[0]);
}

/// A failure in the middle skips everything after it
#[tokio::test]
async fn test_failure_skips_remaining_steps() {
    let runner = MockRunner::new().fail_on("cargo test", 101).shared();

    let run = run_workflow_with_mock(ORDERED, runner.clone()).await;

    assert_job_failed_at(&run, "build", 2);
    let result = run.result("build").unwrap();
    let statuses: Vec<_> = result.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        [
            StepStatus::Succeeded,
            StepStatus::Succeeded,
            StepStatus::Failed,
            StepStatus::Skipped
        ]
    );
    assert_eq!(result.steps[2].exit_code, Some(101));
    assert_eq!(result.steps[2].error.as_deref(), Some("exited with code 101"));
    assert!(result.steps[2].output().contains("simulated failure"));
    assert!(!runner.ran("tar czf"));
}

/// Step working directories are passed through to the runner
#[tokio::test]
async fn test_working_directory_is_resolved() {
    use orchestrator::core::{ExecutionOptions, JobContext};

    let jobs = jobs_from_yaml(ORDERED);
    let job = &jobs[0];
    let context = JobContext::new(job, ExecutionOptions::new().with_working_dir("/src"));

    assert_eq!(
        context.step_dir(&job.steps[2]),
        Some(std::path::PathBuf::from("/src/crates/core"))
    );
    assert_eq!(context.step_dir(&job.steps[0]), Some(std::path::PathBuf::from("/src")));
}
