//! CLI command definitions

use crate::core::{Job, Platform, Trigger};
use clap::Args;
use std::path::PathBuf;

/// Run a workflow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Event that triggers the run
    #[arg(long, value_enum, default_value_t = EventArg::Manual)]
    pub event: EventArg,

    /// Branch pushed to, or base branch of the pull request
    #[arg(long)]
    pub branch: Option<String>,

    /// Only run these jobs (repeatable)
    #[arg(long)]
    pub job: Vec<String>,

    /// Only run jobs targeting this machine's platform
    #[arg(long)]
    pub host_only: bool,

    /// Print the run result as JSON
    #[arg(long)]
    pub json: bool,

    /// Color output of child processes (defaults to the workflow's CARGO_TERM_COLOR)
    #[arg(long, value_enum)]
    pub color: Option<ColorArg>,

    /// Directory jobs run in
    #[arg(long)]
    pub workdir: Option<PathBuf>,
}

/// Validate a workflow file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the jobs of a workflow
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Trigger event argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventArg {
    Push,
    PullRequest,
    Manual,
}

/// Color argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

impl RunCommand {
    /// Build the trigger from `--event` and `--branch`
    pub fn trigger(&self) -> Result<Trigger, String> {
        let branch = || {
            self.branch
                .clone()
                .ok_or_else(|| "--branch is required for push and pull-request events".to_string())
        };

        match self.event {
            EventArg::Push => Ok(Trigger::Push { branch: branch()? }),
            EventArg::PullRequest => Ok(Trigger::PullRequest { base: branch()? }),
            EventArg::Manual => Ok(Trigger::Manual),
        }
    }

    /// Keep the jobs selected by `--job` and `--host-only`
    pub fn select_jobs(&self, jobs: Vec<Job>, host: Option<Platform>) -> Result<Vec<Job>, String> {
        if let Some(unknown) = self.job.iter().find(|name| !jobs.iter().any(|j| &j.name == *name)) {
            return Err(format!("no job named '{}' in workflow", unknown));
        }

        Ok(jobs
            .into_iter()
            .filter(|j| self.job.is_empty() || self.job.contains(&j.name))
            .filter(|j| !self.host_only || Some(j.platform) == host)
            .collect())
    }
}

/// Decide whether child processes get colored output
///
/// An explicit `--color always|never` wins, then the workflow's own
/// preference, then whether our stdout is a color-capable terminal.
pub fn resolve_color(arg: Option<ColorArg>, workflow: Option<bool>) -> bool {
    match (arg, workflow) {
        (Some(ColorArg::Always), _) => true,
        (Some(ColorArg::Never), _) => false,
        (None, Some(preference)) => preference,
        (Some(ColorArg::Auto), _) | (None, None) => console::colors_enabled(),
    }
}
