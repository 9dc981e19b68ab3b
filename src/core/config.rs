//! Workflow configuration from YAML

use crate::core::{
    job::{validate_jobs, Job},
    platform::{Platform, Shell},
    step::{ActionRef, Step, StepAction},
    trigger::{BranchFilter, TriggerConfig},
};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that make it impossible to build the job list
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read workflow file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid workflow YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("job '{job}': {source}")]
    InvalidJob {
        job: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("job list is empty")]
    NoJobs,

    #[error("duplicate job name '{0}'")]
    DuplicateJob(String),

    #[error("job '{0}' has no steps")]
    EmptyJob(String),

    #[error("job '{job}' is missing required field '{field}'")]
    MissingField { job: String, field: &'static str },

    #[error("job '{job}' targets unsupported platform '{label}' (expected windows, linux or macos)")]
    UnknownPlatform { job: String, label: String },

    #[error("job '{job}' step {index}: {reason}")]
    InvalidStep {
        job: String,
        index: usize,
        reason: String,
    },

    #[error("invalid `on` section: {0}")]
    InvalidTrigger(String),
}

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    #[serde(default)]
    pub name: Option<String>,

    /// Trigger section, interpreted by [`WorkflowConfig::triggers`]
    #[serde(default, rename = "on")]
    on: Option<Value>,

    /// Environment shared by every job
    #[serde(default)]
    env: BTreeMap<String, Value>,

    /// Job definitions keyed by job name, in declaration order
    #[serde(default)]
    jobs: Mapping,
}

/// Job definition as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Runner label(s); the first one that names a platform wins
    #[serde(rename = "runs-on")]
    pub runs_on: RunsOn,

    #[serde(default)]
    pub env: BTreeMap<String, Value>,

    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// `runs-on` accepts a single label or a list of labels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunsOn {
    Label(String),
    Labels(Vec<String>),
}

impl RunsOn {
    fn labels(&self) -> Vec<&str> {
        match self {
            RunsOn::Label(label) => vec![label.as_str()],
            RunsOn::Labels(labels) => labels.iter().map(String::as_str).collect(),
        }
    }
}

/// Step definition as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Action reference for dependency installation
    #[serde(default)]
    pub uses: Option<String>,

    /// Parameters of the action
    #[serde(default)]
    pub with: BTreeMap<String, Value>,

    /// Shell command
    #[serde(default)]
    pub run: Option<String>,

    #[serde(default)]
    pub shell: Option<Shell>,

    #[serde(default)]
    pub env: BTreeMap<String, Value>,

    #[serde(default, rename = "working-directory")]
    pub working_directory: Option<String>,
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse workflow configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the workflow without running anything
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.triggers()?;
        self.to_jobs()?;
        Ok(())
    }

    /// Number of jobs declared
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Workflow-level environment as strings
    pub fn env(&self) -> BTreeMap<String, String> {
        stringify_map(&self.env)
    }

    /// Color preference declared through `CARGO_TERM_COLOR`, if any
    pub fn color_preference(&self) -> Option<bool> {
        match self.env().get("CARGO_TERM_COLOR").map(|v| v.to_ascii_lowercase()) {
            Some(v) if v == "always" => Some(true),
            Some(v) if v == "never" => Some(false),
            _ => None,
        }
    }

    /// Interpret the `on:` section
    ///
    /// Accepts `on: push`, `on: [push, pull_request]` and the mapping form with
    /// optional `branches` (with `!` negation) or `branches-ignore` lists. A
    /// missing section reacts to everything.
    pub fn triggers(&self) -> Result<TriggerConfig, ConfigError> {
        let Some(on) = &self.on else {
            return Ok(TriggerConfig::any());
        };

        let mut triggers = TriggerConfig {
            push: None,
            pull_request: None,
        };

        match on {
            Value::String(event) => set_event(&mut triggers, event, BranchFilter::any()),
            Value::Sequence(events) => {
                for event in events {
                    let event = event.as_str().ok_or_else(|| {
                        ConfigError::InvalidTrigger("event names must be strings".to_string())
                    })?;
                    set_event(&mut triggers, event, BranchFilter::any());
                }
            }
            Value::Mapping(events) => {
                for (event, filter) in events {
                    let event = event.as_str().ok_or_else(|| {
                        ConfigError::InvalidTrigger("event names must be strings".to_string())
                    })?;
                    set_event(&mut triggers, event, parse_branch_filter(event, filter)?);
                }
            }
            _ => {
                return Err(ConfigError::InvalidTrigger(
                    "expected an event name, a list or a mapping".to_string(),
                ))
            }
        }

        Ok(triggers)
    }

    /// Convert the configuration into typed jobs, in declaration order
    pub fn to_jobs(&self) -> Result<Vec<Job>, ConfigError> {
        let workflow_env = self.env();
        let mut jobs = Vec::with_capacity(self.jobs.len());

        for (key, value) in &self.jobs {
            let name = match key.as_str() {
                Some(name) => name.to_string(),
                None => {
                    return Err(ConfigError::MissingField {
                        job: format!("{:?}", key),
                        field: "name",
                    })
                }
            };

            let job_config: JobConfig =
                serde_yaml::from_value(value.clone()).map_err(|source| ConfigError::InvalidJob {
                    job: name.clone(),
                    source,
                })?;

            jobs.push(job_config.to_job(&name, &workflow_env)?);
        }

        validate_jobs(&jobs)?;
        Ok(jobs)
    }
}

impl JobConfig {
    fn to_job(&self, name: &str, workflow_env: &BTreeMap<String, String>) -> Result<Job, ConfigError> {
        let labels = self.runs_on.labels();
        let platform = labels
            .iter()
            .find_map(|label| Platform::from_runner_label(label))
            .ok_or_else(|| ConfigError::UnknownPlatform {
                job: name.to_string(),
                label: labels.join(", "),
            })?;

        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| step.to_step(name, index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut env = workflow_env.clone();
        env.extend(stringify_map(&self.env));

        Ok(Job {
            name: name.to_string(),
            platform,
            steps,
            env,
        })
    }
}

impl StepConfig {
    fn to_step(&self, job: &str, index: usize) -> Result<Step, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidStep {
            job: job.to_string(),
            index,
            reason,
        };

        let action = match (&self.uses, &self.run) {
            (Some(_), Some(_)) => return Err(invalid("step has both `uses` and `run`".to_string())),
            (None, None) => return Err(invalid("step needs either `uses` or `run`".to_string())),
            (Some(uses), None) => {
                if self.shell.is_some() {
                    return Err(invalid("`shell` only applies to `run` steps".to_string()));
                }
                let action = uses.parse::<ActionRef>().map_err(invalid)?;
                let with = stringify_map(&self.with);
                if !action.is_builtin() {
                    let packages = action.packages(&with);
                    if packages.is_empty() || packages.iter().any(String::is_empty) {
                        return Err(invalid(format!("`{}` names no package to install", action)));
                    }
                }
                StepAction::Install { action, with }
            }
            (None, Some(run)) => {
                if run.trim().is_empty() {
                    return Err(invalid("`run` command is empty".to_string()));
                }
                if !self.with.is_empty() {
                    return Err(invalid("`with` only applies to `uses` steps".to_string()));
                }
                let lines = run.lines().filter(|l| !l.trim().is_empty()).count();
                if lines > 1 && self.shell.is_some_and(|shell| !shell.runs_multiline()) {
                    return Err(invalid(
                        "`cmd` runs only the first line of a script; use one line or another shell"
                            .to_string(),
                    ));
                }
                StepAction::Command {
                    run: run.clone(),
                    shell: self.shell,
                }
            }
        };

        let name = match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => Step::default_name(&action),
        };

        Ok(Step {
            name,
            action,
            env: stringify_map(&self.env),
            working_directory: self.working_directory.clone(),
        })
    }
}

fn set_event(triggers: &mut TriggerConfig, event: &str, filter: BranchFilter) {
    match event {
        "push" => triggers.push = Some(filter),
        "pull_request" => triggers.pull_request = Some(filter),
        // Other events never start a run from this tool
        _ => {}
    }
}

fn parse_branch_filter(event: &str, value: &Value) -> Result<BranchFilter, ConfigError> {
    let map = match value {
        Value::Null => return Ok(BranchFilter::any()),
        Value::Mapping(map) => map,
        _ => {
            return Err(ConfigError::InvalidTrigger(format!(
                "`{}` must be a mapping",
                event
            )))
        }
    };

    let branches = branch_list(event, "branches", map.get("branches"))?;
    let ignore = branch_list(event, "branches-ignore", map.get("branches-ignore"))?;

    match (branches, ignore) {
        (Some(_), Some(_)) => Err(ConfigError::InvalidTrigger(format!(
            "`{}` cannot use both `branches` and `branches-ignore`",
            event
        ))),
        (Some(branches), None) => {
            if !branches.is_empty() && branches.iter().all(|b| b.starts_with('!')) {
                return Err(ConfigError::InvalidTrigger(format!(
                    "`{}` branches need at least one pattern that is not negated",
                    event
                )));
            }
            Ok(BranchFilter::only(branches))
        }
        (None, Some(ignore)) => {
            if ignore.iter().any(|b| b.starts_with('!')) {
                return Err(ConfigError::InvalidTrigger(format!(
                    "`{}` branches-ignore cannot hold negated patterns",
                    event
                )));
            }
            Ok(BranchFilter::except(ignore))
        }
        (None, None) => Ok(BranchFilter::any()),
    }
}

fn branch_list(
    event: &str,
    key: &str,
    value: Option<&Value>,
) -> Result<Option<Vec<String>>, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(branch)) => Ok(Some(vec![branch.clone()])),
        Some(Value::Sequence(list)) => list
            .iter()
            .map(|b| {
                value_to_string(b).ok_or_else(|| {
                    ConfigError::InvalidTrigger(format!("`{}` {} must be strings", event, key))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(ConfigError::InvalidTrigger(format!(
            "`{}` {} must be a list",
            event, key
        ))),
    }
}

/// Render a scalar YAML value the way it would appear in a shell
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn stringify_map(map: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| {
            let value = value_to_string(v)
                .unwrap_or_else(|| serde_yaml::to_string(v).unwrap_or_default().trim().to_string());
            (k.clone(), value)
        })
        .collect()
}
