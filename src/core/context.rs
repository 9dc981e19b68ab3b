//! Job context - environment, working directory and color preference

use crate::core::{job::Job, platform::Platform, step::Step};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Options that apply to every command the orchestrator starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Whether child processes should emit colored output
    pub color: bool,

    /// Directory jobs run in; the current directory when unset
    pub working_dir: Option<PathBuf>,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Environment variables that tell common tools about the color preference
    pub fn color_env(&self) -> Vec<(String, String)> {
        if self.color {
            vec![
                ("CARGO_TERM_COLOR".to_string(), "always".to_string()),
                ("CLICOLOR_FORCE".to_string(), "1".to_string()),
            ]
        } else {
            vec![
                ("CARGO_TERM_COLOR".to_string(), "never".to_string()),
                ("NO_COLOR".to_string(), "1".to_string()),
            ]
        }
    }
}

/// Execution context of one job
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job: String,

    pub platform: Platform,

    /// Job environment
    pub env: BTreeMap<String, String>,

    pub options: ExecutionOptions,
}

impl JobContext {
    pub fn new(job: &Job, options: ExecutionOptions) -> Self {
        Self {
            job: job.name.clone(),
            platform: job.platform,
            env: job.env.clone(),
            options,
        }
    }

    /// Full environment of a step
    ///
    /// Job entries, then step entries (expanded against the job's), then the
    /// color preference, which always wins.
    pub fn step_env(&self, step: &Step) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        for (key, value) in &step.env {
            let rendered = render_expressions(value, &self.env);
            env.insert(key.clone(), rendered);
        }
        env.extend(self.options.color_env());
        env
    }

    /// Working directory of a step
    pub fn step_dir(&self, step: &Step) -> Option<PathBuf> {
        match (&self.options.working_dir, &step.working_directory) {
            (Some(base), Some(dir)) => Some(base.join(dir)),
            (None, Some(dir)) => Some(PathBuf::from(dir)),
            (Some(base), None) => Some(base.clone()),
            (None, None) => None,
        }
    }

    /// Expand `${{ env.NAME }}` expressions against a step's environment
    pub fn render(&self, text: &str, env: &BTreeMap<String, String>) -> String {
        render_expressions(text, env)
    }
}

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("expression regex is valid")
    })
}

/// Unknown names expand to the empty string
fn render_expressions(text: &str, env: &BTreeMap<String, String>) -> String {
    expression_regex()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            env.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
