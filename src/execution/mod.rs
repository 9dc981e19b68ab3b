//! Pipeline execution engine

pub mod engine;
pub mod environment;
pub mod executor;
pub mod runner;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use environment::{EnvironmentError, JobEnvironment, LocalEnvironment};
pub use executor::{StepExecutor, StepPlan};
pub use runner::{CommandOutput, CommandRunner, Invocation, RunnerError, ShellRunner};
