//! Execution environments - where a job's commands actually run

use crate::core::Platform;
use crate::execution::runner::{CommandRunner, ShellRunner};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("no runner available for platform {platform} (this host is {host})")]
    Unsupported { platform: Platform, host: String },
}

/// Provides an isolated runner for each job
#[async_trait]
pub trait JobEnvironment: Send + Sync {
    /// Provision a runner for a job targeting `platform`
    async fn provision(&self, platform: Platform) -> Result<Arc<dyn CommandRunner>, EnvironmentError>;
}

/// Runs jobs on this machine when it matches the job's platform
#[derive(Debug, Clone)]
pub struct LocalEnvironment {
    host: Option<Platform>,
}

impl LocalEnvironment {
    pub fn new() -> Self {
        Self {
            host: Platform::host(),
        }
    }

    /// Pretend the host is `platform`
    pub fn with_host(platform: Platform) -> Self {
        Self {
            host: Some(platform),
        }
    }

    pub fn host(&self) -> Option<Platform> {
        self.host
    }
}

impl Default for LocalEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobEnvironment for LocalEnvironment {
    async fn provision(&self, platform: Platform) -> Result<Arc<dyn CommandRunner>, EnvironmentError> {
        if self.host == Some(platform) {
            debug!("Provisioning local runner for {}", platform);
            Ok(Arc::new(ShellRunner::new()))
        } else {
            Err(EnvironmentError::Unsupported {
                platform,
                host: self
                    .host
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| std::env::consts::OS.to_string()),
            })
        }
    }
}
