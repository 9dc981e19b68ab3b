//! Core domain models for the orchestrator
//!
//! This module defines the fundamental data structures that represent
//! workflows, jobs, steps, and their results.

pub mod config;
pub mod context;
pub mod job;
pub mod platform;
pub mod state;
pub mod step;
pub mod trigger;

pub use config::{ConfigError, WorkflowConfig};
pub use context::{ExecutionOptions, JobContext};
pub use job::Job;
pub use platform::{Platform, Shell};
pub use state::*;
pub use step::{ActionRef, Step, StepAction};
pub use trigger::{BranchFilter, Trigger, TriggerConfig};
