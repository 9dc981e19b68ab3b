//! Step domain model

use crate::core::platform::Shell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Actions whose effect is already present when running on a local checkout
const BUILTIN_ACTIONS: &[&str] = &[
    "actions/checkout",
    "actions-rs/toolchain",
    "dtolnay/rust-toolchain",
];

/// A single step in a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    /// Display name
    pub name: String,

    /// What the step does
    pub action: StepAction,

    /// Step-level environment, layered over the job's
    pub env: BTreeMap<String, String>,

    /// Directory the step runs in, relative to the job's working directory
    pub working_directory: Option<String>,
}

/// What a step does
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    /// Dependency installation through the platform package manager (`uses:`)
    Install {
        action: ActionRef,
        with: BTreeMap<String, String>,
    },
    /// Shell command (`run:`)
    Command {
        run: String,
        shell: Option<Shell>,
    },
}

/// Reference to an action, `owner/name@version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRef {
    pub owner: Option<String>,
    pub name: String,
    pub version: Option<String>,
}

impl ActionRef {
    /// `owner/name` without the version
    pub fn slug(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}/{}", owner, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether the action needs no work on a local checkout
    pub fn is_builtin(&self) -> bool {
        let slug = self.slug();
        BUILTIN_ACTIONS.iter().any(|b| b.eq_ignore_ascii_case(&slug))
    }

    /// Packages an install step asks for
    ///
    /// `with.packages` (whitespace separated) wins over `with.package`; with
    /// neither, the action's own name is the package.
    pub fn packages(&self, with: &BTreeMap<String, String>) -> Vec<String> {
        match (with.get("packages"), with.get("package")) {
            (Some(list), _) => list.split_whitespace().map(str::to_string).collect(),
            (None, Some(package)) => vec![package.trim().to_string()],
            (None, None) => vec![self.name.clone()],
        }
    }
}

impl FromStr for ActionRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (path, version) = match s.split_once('@') {
            Some((path, version)) if !version.is_empty() => (path, Some(version.to_string())),
            Some(_) => return Err(format!("action reference '{}' has an empty version", s)),
            None => (s, None),
        };

        let (owner, name) = match path.split_once('/') {
            Some((owner, name)) => (Some(owner.to_string()), name.to_string()),
            None => (None, path.to_string()),
        };

        if name.is_empty() || owner.as_deref() == Some("") {
            return Err(format!("malformed action reference '{}'", s));
        }

        Ok(ActionRef {
            owner,
            name,
            version,
        })
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

impl Step {
    /// A shell command step
    pub fn command(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Command {
                run: run.into(),
                shell: None,
            },
            env: BTreeMap::new(),
            working_directory: None,
        }
    }

    /// A dependency-installation step
    pub fn install(name: impl Into<String>, action: ActionRef, with: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Install { action, with },
            env: BTreeMap::new(),
            working_directory: None,
        }
    }

    /// Name shown when the workflow gives none, e.g. `Run cargo build`
    pub fn default_name(action: &StepAction) -> String {
        match action {
            StepAction::Install { action, .. } => format!("Run {}", action),
            StepAction::Command { run, .. } => {
                let first_line = run.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
                format!("Run {}", first_line)
            }
        }
    }

    pub fn with_shell(mut self, shell: Shell) -> Self {
        if let StepAction::Command { shell: s, .. } = &mut self.action {
            *s = Some(shell);
        }
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}
