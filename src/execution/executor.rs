//! Step executor - turns steps into process invocations and runs them

use crate::{
    core::{JobContext, Step, StepAction, StepRecord, StepStatus},
    execution::runner::{CommandRunner, Invocation},
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What running a step amounts to
#[derive(Debug, Clone, PartialEq)]
pub enum StepPlan {
    /// Nothing to run; the effect is already present
    Builtin { note: String },
    /// Spawn a process
    Invoke(Invocation),
    /// The step cannot run as resolved
    Rejected { reason: String },
}

/// Executes the steps of one job on its runner
pub struct StepExecutor {
    runner: Arc<dyn CommandRunner>,
}

impl StepExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Resolve a step into what should be run for it
    pub fn plan(step: &Step, context: &JobContext) -> StepPlan {
        let env = context.step_env(step);
        let working_dir = context.step_dir(step);

        match &step.action {
            StepAction::Install { action, with } => {
                if action.is_builtin() {
                    return StepPlan::Builtin {
                        note: format!("{} is provided by the local checkout", action.slug()),
                    };
                }

                let with: BTreeMap<String, String> = with
                    .iter()
                    .map(|(k, v)| (k.clone(), context.render(v, &env)))
                    .collect();
                let packages = action.packages(&with);
                if packages.is_empty() || packages.iter().any(String::is_empty) {
                    return StepPlan::Rejected {
                        reason: format!("{} resolved to no packages to install", action),
                    };
                }
                let command = install_command(&packages, &with, context);

                let mut env = env;
                env.extend(with.iter().map(|(k, v)| (input_var(k), v.clone())));

                StepPlan::Invoke(Invocation {
                    command,
                    env,
                    working_dir,
                })
            }
            StepAction::Command { run, shell } => {
                let shell = shell.unwrap_or_else(|| context.platform.default_shell());
                let script = context.render(run, &env);

                StepPlan::Invoke(Invocation {
                    command: shell.command_line(&script),
                    env,
                    working_dir,
                })
            }
        }
    }

    /// Execute one step and record what happened
    pub async fn execute(&self, index: usize, step: &Step, context: &JobContext) -> StepRecord {
        info!("Executing step {} of {}: {}", index, context.job, step.name);

        let mut record = StepRecord {
            status: StepStatus::Succeeded,
            started_at: Some(Utc::now()),
            ..StepRecord::skipped(index, step.name.clone())
        };

        match Self::plan(step, context) {
            StepPlan::Builtin { note } => {
                debug!("Step {} of {} needs no work: {}", index, context.job, note);
                record.stdout = note;
            }
            StepPlan::Rejected { reason } => {
                error!("Step {} of {} rejected: {}", index, context.job, reason);
                record.status = StepStatus::Failed;
                record.error = Some(reason);
            }
            StepPlan::Invoke(invocation) => match self.runner.run(&invocation).await {
                Ok(output) => {
                    record.exit_code = output.exit_code;
                    if !output.success() {
                        record.status = StepStatus::Failed;
                        record.error = Some(match output.exit_code {
                            Some(code) => format!("exited with code {}", code),
                            None => "terminated by signal".to_string(),
                        });
                    }
                    record.stdout = output.stdout;
                    record.stderr = output.stderr;
                }
                Err(e) => {
                    error!("Step {} of {} could not run: {}", index, context.job, e);
                    record.status = StepStatus::Failed;
                    record.error = Some(e.to_string());
                }
            },
        }

        record.finished_at = Some(Utc::now());
        record
    }
}

/// Package-manager command for an install step
fn install_command(
    packages: &[String],
    with: &BTreeMap<String, String>,
    context: &JobContext,
) -> crate::core::platform::CommandLine {
    let extra_args: Vec<String> = with
        .get("args")
        .map(|a| a.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let elevate = with.get("sudo").map(|v| v != "false").unwrap_or(true);

    context.platform.package_manager().install_command(
        packages,
        with.get("version").map(String::as_str),
        &extra_args,
        elevate,
    )
}

/// Action inputs are exposed as `INPUT_<NAME>`
fn input_var(key: &str) -> String {
    format!("INPUT_{}", key.replace(' ', "_").to_uppercase())
}
