//! Job domain model

use crate::core::{config::ConfigError, platform::Platform, step::Step};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// An independently schedulable unit of work scoped to one platform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    /// Job identifier (the key in the workflow's `jobs` mapping)
    pub name: String,

    /// Platform the job runs on
    pub platform: Platform,

    /// Steps, executed strictly in order
    pub steps: Vec<Step>,

    /// Job environment (workflow-level entries merged under job-level ones)
    pub env: BTreeMap<String, String>,
}

impl Job {
    pub fn new(name: impl Into<String>, platform: Platform, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            platform,
            steps,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Check a job list before anything runs
///
/// The list must be non-empty, names unique, and every job must have steps.
pub fn validate_jobs(jobs: &[Job]) -> Result<(), ConfigError> {
    if jobs.is_empty() {
        return Err(ConfigError::NoJobs);
    }

    let mut seen = HashSet::new();
    for job in jobs {
        if job.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                job: job.name.clone(),
                field: "name",
            });
        }
        if !seen.insert(job.name.as_str()) {
            return Err(ConfigError::DuplicateJob(job.name.clone()));
        }
        if job.steps.is_empty() {
            return Err(ConfigError::EmptyJob(job.name.clone()));
        }
    }

    Ok(())
}
