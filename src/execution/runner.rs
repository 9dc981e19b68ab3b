//! Command runners - spawn processes and capture their output

use crate::core::platform::CommandLine;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Error types for runner operations
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// A fully bound process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: CommandLine,

    /// Variables added to the inherited environment
    pub env: BTreeMap<String, String>,

    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            env: BTreeMap::new(),
            working_dir: None,
        }
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for command execution - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run an invocation to completion and capture its output
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError>;
}

/// Runs commands as child processes of this one
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        let program = &invocation.command.program;
        debug!("Spawning {}", invocation.command);

        let mut command = Command::new(program);
        command
            .args(&invocation.command.args)
            .envs(&invocation.env)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| RunnerError::Spawn {
            program: program.clone(),
            source,
        })?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            warn!(
                "{} exited with code {:?}: {}",
                program,
                result.exit_code,
                result.stderr.trim()
            );
        }
        debug!(
            "{} returned {} bytes of stdout, {} bytes of stderr",
            program,
            result.stdout.len(),
            result.stderr.len()
        );

        Ok(result)
    }
}
