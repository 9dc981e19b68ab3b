//! orchestrator - runs declarative CI job matrices across platforms

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use core::{ConfigError, Job, JobResult, PipelineRun, Platform, Status, Step, WorkflowConfig};
pub use execution::{CommandRunner, ExecutionEngine, ExecutionEvent, JobEnvironment, LocalEnvironment};
