//! Test utility functions for the orchestrator

#![allow(dead_code)]

use orchestrator::core::{
    ExecutionOptions, Job, JobResult, Platform, PipelineRun, StepStatus, WorkflowConfig,
};
use orchestrator::execution::{
    CommandOutput, CommandRunner, EnvironmentError, ExecutionEngine, Invocation, JobEnvironment,
    RunnerError,
};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One command the mock runner was asked to run
#[derive(Debug, Clone)]
pub struct Call {
    pub platform: Platform,
    pub command: String,
    pub env: BTreeMap<String, String>,
}

/// Mock runner that succeeds unless a command matches a scripted failure
#[derive(Default)]
pub struct MockRunner {
    failures: Vec<(String, i32)>,
    errors: Vec<String>,
    delays: Vec<(String, Duration)>,
    calls: Mutex<Vec<Call>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` exit with `code`
    pub fn fail_on(mut self, pattern: &str, code: i32) -> Self {
        self.failures.push((pattern.to_string(), code));
        self
    }

    /// Commands containing `pattern` cannot be started at all
    pub fn error_on(mut self, pattern: &str) -> Self {
        self.errors.push(pattern.to_string());
        self
    }

    /// Commands containing `pattern` take `delay` to finish
    pub fn delay_on(mut self, pattern: &str, delay: Duration) -> Self {
        self.delays.push((pattern.to_string(), delay));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every call, in the order commands were started
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands started on `platform`
    pub fn commands_on(&self, platform: Platform) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.platform == platform)
            .map(|c| c.command)
            .collect()
    }

    /// Whether any started command contains `pattern`
    pub fn ran(&self, pattern: &str) -> bool {
        self.calls().iter().any(|c| c.command.contains(pattern))
    }

    async fn invoke(
        &self,
        platform: Platform,
        invocation: &Invocation,
    ) -> Result<CommandOutput, RunnerError> {
        let command = invocation.command.to_string();
        self.calls.lock().unwrap().push(Call {
            platform,
            command: command.clone(),
            env: invocation.env.clone(),
        });

        if let Some((_, delay)) = self.delays.iter().find(|(p, _)| command.contains(p.as_str())) {
            tokio::time::sleep(*delay).await;
        }

        if self.errors.iter().any(|p| command.contains(p.as_str())) {
            return Err(RunnerError::Internal(format!("cannot start '{}'", command)));
        }

        match self.failures.iter().find(|(p, _)| command.contains(p.as_str())) {
            Some((_, code)) => Ok(CommandOutput {
                exit_code: Some(*code),
                stdout: command,
                stderr: "simulated failure".to_string(),
            }),
            None => Ok(CommandOutput::new(0, command)),
        }
    }
}

/// Runner handed to one job; tags calls with the job's platform
struct BoundRunner {
    platform: Platform,
    inner: Arc<MockRunner>,
}

#[async_trait]
impl CommandRunner for BoundRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        self.inner.invoke(self.platform, invocation).await
    }
}

/// Mock environment that can run every platform except the ones removed
pub struct MockEnvironment {
    runner: Arc<MockRunner>,
    unsupported: Vec<Platform>,
}

impl MockEnvironment {
    pub fn new(runner: Arc<MockRunner>) -> Self {
        Self {
            runner,
            unsupported: Vec::new(),
        }
    }

    pub fn without(mut self, platform: Platform) -> Self {
        self.unsupported.push(platform);
        self
    }
}

#[async_trait]
impl JobEnvironment for MockEnvironment {
    async fn provision(
        &self,
        platform: Platform,
    ) -> Result<Arc<dyn CommandRunner>, EnvironmentError> {
        if self.unsupported.contains(&platform) {
            return Err(EnvironmentError::Unsupported {
                platform,
                host: "mock".to_string(),
            });
        }
        Ok(Arc::new(BoundRunner {
            platform,
            inner: self.runner.clone(),
        }))
    }
}

/// Engine over a mock environment
pub fn mock_engine(environment: MockEnvironment, color: bool) -> ExecutionEngine {
    ExecutionEngine::new(environment, ExecutionOptions::new().with_color(color))
}

/// Parse a workflow and build its jobs
pub fn jobs_from_yaml(yaml: &str) -> Vec<Job> {
    WorkflowConfig::from_yaml(yaml)
        .and_then(|config| config.to_jobs())
        .unwrap_or_else(|e| panic!("Failed to parse workflow YAML: {}", e))
}

/// Run a workflow's jobs against a mock runner that supports every platform
pub async fn run_workflow_with_mock(yaml: &str, runner: Arc<MockRunner>) -> PipelineRun {
    let engine = mock_engine(MockEnvironment::new(runner), false);
    engine
        .submit(jobs_from_yaml(yaml))
        .await
        .unwrap_or_else(|e| panic!("Run was rejected: {}", e))
}

fn job<'a>(run: &'a PipelineRun, name: &str) -> &'a JobResult {
    run.result(name)
        .unwrap_or_else(|| panic!("Job '{}' not found in run", name))
}

/// Assert a job succeeded with every step run
pub fn assert_job_succeeded(run: &PipelineRun, name: &str) {
    let result = job(run, name);
    assert!(
        result.is_success(),
        "Job '{}' should have succeeded, but failed at {:?}: {:?}",
        name,
        result.failing_step,
        result.failed_step().map(|s| s.output()).or(result.error.clone())
    );
    assert_eq!(result.failing_step, None);
    assert!(
        result.steps.iter().all(|s| s.status == StepStatus::Succeeded),
        "Job '{}' has steps that did not succeed: {:?}",
        name,
        result.steps
    );
}

/// Assert a job failed at `index` and nothing after it ran
pub fn assert_job_failed_at(run: &PipelineRun, name: &str, index: usize) {
    let result = job(run, name);
    assert!(!result.is_success(), "Job '{}' should have failed", name);
    assert_eq!(
        result.failing_step,
        Some(index),
        "Job '{}' failed at the wrong step",
        name
    );
    for step in &result.steps[index + 1..] {
        assert_eq!(
            step.status,
            StepStatus::Skipped,
            "Step {} of '{}' ran after the failure",
            step.index,
            name
        );
    }
}

/// The four-job workflow used across scenarios
pub const CI_WORKFLOW: &str = r#"
name: CI

on:
  push:
    branches: [master]
  pull_request:
    branches: [master]

env:
  CARGO_TERM_COLOR: always

jobs:
  lint:
    runs-on: ubuntu-latest
    steps:
      - name: Check formatting
        run: cargo fmt --all -- --check

  windows_stable:
    runs-on: windows-latest
    steps:
      - name: Build
        run: cargo build --verbose
      - name: Run tests
        run: cargo test --verbose

  linux_stable:
    runs-on: ubuntu-latest
    steps:
      - name: Install dependencies
        uses: vendor/apt-install@v1
        with:
          packages: libvulkan-dev mesa-vulkan-drivers
      - name: Build
        run: cargo build --verbose
      - name: Run tests
        run: cargo test --verbose

  macos_stable:
    runs-on: macos-latest
    steps:
      - name: Build
        run: cargo build --verbose
      - name: Run tests
        run: cargo test --verbose
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_workflow_parses() {
        let jobs = jobs_from_yaml(CI_WORKFLOW);
        let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["lint", "windows_stable", "linux_stable", "macos_stable"]);
    }

    #[tokio::test]
    async fn test_mock_runner_scripted_failure() {
        let runner = MockRunner::new().fail_on("cargo fmt", 1).shared();
        let run = run_workflow_with_mock(CI_WORKFLOW, runner.clone()).await;

        assert_job_failed_at(&run, "lint", 0);
        assert_job_succeeded(&run, "macos_stable");
        assert!(runner.ran("cargo fmt"));
    }
}
