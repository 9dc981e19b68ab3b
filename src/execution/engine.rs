//! Main execution engine - orchestrates a whole pipeline run

use crate::{
    core::{
        job::validate_jobs, ConfigError, ExecutionOptions, Job, JobContext, JobResult, Platform,
        PipelineRun, Status, StepRecord, StepStatus, Trigger,
    },
    execution::{environment::JobEnvironment, executor::StepExecutor},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a pipeline run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: Uuid,
        jobs: usize,
    },
    JobStarted {
        job: String,
        platform: Platform,
    },
    StepStarted {
        job: String,
        index: usize,
        name: String,
    },
    StepOutput {
        job: String,
        index: usize,
        output: String,
    },
    StepFinished {
        job: String,
        index: usize,
        status: StepStatus,
    },
    JobFinished {
        job: String,
        status: Status,
        failing_step: Option<usize>,
        error: Option<String>,
    },
    RunFinished {
        execution_id: Uuid,
        status: Status,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Main pipeline execution engine
///
/// Cloning is cheap; clones share the environment and the handler list.
#[derive(Clone)]
pub struct ExecutionEngine {
    environment: Arc<dyn JobEnvironment>,
    options: ExecutionOptions,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl ExecutionEngine {
    pub fn new<E: JobEnvironment + 'static>(environment: E, options: ExecutionOptions) -> Self {
        Self {
            environment: Arc::new(environment),
            options,
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: ExecutionEvent) {
        let handlers = self.event_handlers.lock().await.clone();
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Run a job set started by hand
    pub async fn submit(&self, jobs: Vec<Job>) -> Result<PipelineRun, ConfigError> {
        self.submit_with_trigger(jobs, Trigger::Manual).await
    }

    /// Run every job concurrently and wait until all reach a terminal status
    ///
    /// Fails only when the job list itself is invalid, before any job starts.
    pub async fn submit_with_trigger(
        &self,
        jobs: Vec<Job>,
        trigger: Trigger,
    ) -> Result<PipelineRun, ConfigError> {
        validate_jobs(&jobs)?;

        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "Starting run {} ({}) with {} jobs",
            execution_id,
            trigger,
            jobs.len()
        );
        self.emit_event(ExecutionEvent::RunStarted {
            execution_id,
            jobs: jobs.len(),
        })
        .await;

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let engine = self.clone();
            let name = job.name.clone();
            let platform = job.platform;
            let handle = tokio::spawn(async move { engine.run_job(&job).await });
            handles.push((name, platform, handle));
        }

        // Awaiting in declared order keeps results ordered; the jobs themselves
        // are already running concurrently.
        let mut results = Vec::with_capacity(handles.len());
        for (name, platform, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Job {} task failed: {}", name, e);
                    JobResult::aborted(name, platform, format!("job task failed: {}", e), started_at)
                }
            };
            results.push(result);
        }

        let run = PipelineRun::new(execution_id, trigger, results, started_at);
        info!(
            "Run {} finished: {:?} ({} succeeded, {} failed)",
            execution_id,
            run.status,
            run.succeeded(),
            run.failed()
        );
        self.emit_event(ExecutionEvent::RunFinished {
            execution_id,
            status: run.status,
        })
        .await;

        Ok(run)
    }

    /// Run one job's steps in order, stopping at the first failure
    pub async fn run_job(&self, job: &Job) -> JobResult {
        let started_at = Utc::now();
        info!("Starting job {} on {}", job.name, job.platform);
        self.emit_event(ExecutionEvent::JobStarted {
            job: job.name.clone(),
            platform: job.platform,
        })
        .await;

        let runner = match self.environment.provision(job.platform).await {
            Ok(runner) => runner,
            Err(e) => {
                warn!("Job {} cannot run: {}", job.name, e);
                let result = JobResult::aborted(&job.name, job.platform, e.to_string(), started_at);
                self.emit_job_finished(&result).await;
                return result;
            }
        };

        let executor = StepExecutor::new(runner);
        let context = JobContext::new(job, self.options.clone());
        let mut records = Vec::with_capacity(job.steps.len());
        let mut failed = false;

        for (index, step) in job.steps.iter().enumerate() {
            if failed {
                records.push(StepRecord::skipped(index, step.name.clone()));
                continue;
            }

            self.emit_event(ExecutionEvent::StepStarted {
                job: job.name.clone(),
                index,
                name: step.name.clone(),
            })
            .await;

            let record = executor.execute(index, step, &context).await;

            let output = record.output();
            if !output.is_empty() {
                self.emit_event(ExecutionEvent::StepOutput {
                    job: job.name.clone(),
                    index,
                    output,
                })
                .await;
            }
            self.emit_event(ExecutionEvent::StepFinished {
                job: job.name.clone(),
                index,
                status: record.status,
            })
            .await;

            if record.is_failure() {
                warn!(
                    "Job {} failed at step {} ({}): {}",
                    job.name,
                    index,
                    step.name,
                    record.error.as_deref().unwrap_or("unknown error")
                );
                failed = true;
            }
            records.push(record);
        }

        let result = JobResult::from_steps(&job.name, job.platform, records, started_at);
        info!("Job {} finished: {:?}", job.name, result.status);
        self.emit_job_finished(&result).await;
        result
    }

    async fn emit_job_finished(&self, result: &JobResult) {
        self.emit_event(ExecutionEvent::JobFinished {
            job: result.job.clone(),
            status: result.status,
            failing_step: result.failing_step,
            error: result.error.clone(),
        })
        .await;
    }
}
