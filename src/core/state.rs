//! Execution results of steps, jobs and runs

use crate::core::{platform::Platform, trigger::Trigger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal status of a job or a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// Logical AND over a set of statuses; success when empty
    pub fn all<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
        if statuses.into_iter().all(|s| s.is_success()) {
            Status::Success
        } else {
            Status::Failure
        }
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Not attempted because an earlier step failed
    Skipped,
}

/// What happened to one step, with its captured output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Position in the job's step list
    pub index: usize,

    pub name: String,

    pub status: StepStatus,

    /// Exit code of the process, if one ran and exited normally
    pub exit_code: Option<i32>,

    pub stdout: String,

    pub stderr: String,

    /// Why the step failed when no exit code explains it
    pub error: Option<String>,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    pub fn skipped(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            status: StepStatus::Skipped,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Combined stdout and stderr
    pub fn output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

/// Result of running one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job: String,

    pub platform: Platform,

    pub status: Status,

    /// Index of the step that failed, if any
    pub failing_step: Option<usize>,

    /// One record per declared step
    pub steps: Vec<StepRecord>,

    /// Set when the job could not run at all (no environment for its platform)
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    /// Build a result from step records; the first failed record decides
    pub fn from_steps(
        job: impl Into<String>,
        platform: Platform,
        steps: Vec<StepRecord>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let failing_step = steps.iter().find(|s| s.is_failure()).map(|s| s.index);
        let status = if failing_step.is_some() {
            Status::Failure
        } else {
            Status::Success
        };

        Self {
            job: job.into(),
            platform,
            status,
            failing_step,
            steps,
            error: None,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// A job that failed before its first step
    pub fn aborted(
        job: impl Into<String>,
        platform: Platform,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job: job.into(),
            platform,
            status: Status::Failure,
            failing_step: None,
            steps: Vec::new(),
            error: Some(error.into()),
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Record of the failing step, if any
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.failing_step.and_then(|i| self.steps.get(i))
    }

    /// Number of steps that actually ran
    pub fn attempted_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status != StepStatus::Skipped)
            .count()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

/// One execution of a job set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique execution ID
    pub execution_id: Uuid,

    pub trigger: Trigger,

    /// Aggregate status: success iff every job succeeded
    pub status: Status,

    /// Results in declared job order
    pub results: Vec<JobResult>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn new(
        execution_id: Uuid,
        trigger: Trigger,
        results: Vec<JobResult>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let status = Status::all(results.iter().map(|r| r.status));
        Self {
            execution_id,
            trigger,
            status,
            results,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Result of a job by name
    pub fn result(&self, job: &str) -> Option<&JobResult> {
        self.results.iter().find(|r| r.job == job)
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}
