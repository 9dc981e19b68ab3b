//! Scenario-based tests for the orchestrator

mod ci_matrix;
mod install_steps;
mod step_ordering;
