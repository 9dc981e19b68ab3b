//! Trigger events and branch filters

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The external event that starts a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Trigger {
    /// Push to a branch
    Push { branch: String },
    /// Pull request targeting a base branch
    PullRequest { base: String },
    /// Started by hand; always matches
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Push { branch } => write!(f, "push to {}", branch),
            Trigger::PullRequest { base } => write!(f, "pull request into {}", base),
            Trigger::Manual => f.write_str("manual"),
        }
    }
}

/// Branch filter of one event kind; empty means every branch
///
/// `branches` patterns are checked in order and the last match decides, so a
/// `!pattern` entry excludes branches an earlier pattern included.
/// `ignore` (from `branches-ignore`) excludes every branch it matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchFilter {
    pub branches: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

impl BranchFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn only<I, S>(branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            branches: branches.into_iter().map(Into::into).collect(),
            ignore: Vec::new(),
        }
    }

    pub fn except<I, S>(ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            branches: Vec::new(),
            ignore: ignore.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, branch: &str) -> bool {
        if self.ignore.iter().any(|p| branch_matches(p, branch)) {
            return false;
        }
        if self.branches.is_empty() {
            return true;
        }

        self.branches.iter().fold(false, |included, pattern| {
            match pattern.strip_prefix('!') {
                Some(negated) if branch_matches(negated, branch) => false,
                Some(_) => included,
                None => included || branch_matches(pattern, branch),
            }
        })
    }
}

/// Events a workflow reacts to (the `on:` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerConfig {
    pub push: Option<BranchFilter>,
    pub pull_request: Option<BranchFilter>,
}

impl TriggerConfig {
    /// React to every push and pull request
    pub fn any() -> Self {
        Self {
            push: Some(BranchFilter::any()),
            pull_request: Some(BranchFilter::any()),
        }
    }

    /// Check if a trigger should start a run
    pub fn matches(&self, trigger: &Trigger) -> bool {
        match trigger {
            Trigger::Push { branch } => self.push.as_ref().is_some_and(|f| f.matches(branch)),
            Trigger::PullRequest { base } => {
                self.pull_request.as_ref().is_some_and(|f| f.matches(base))
            }
            Trigger::Manual => true,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::any()
    }
}

/// Match a branch against a filter pattern
///
/// `*` matches within one path segment, `**` across segments, `?` one character.
fn branch_matches(pattern: &str, branch: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return pattern == branch;
    }

    let mut expr = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                expr.push_str(".*");
            }
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');

    Regex::new(&expr).map(|re| re.is_match(branch)).unwrap_or(false)
}
