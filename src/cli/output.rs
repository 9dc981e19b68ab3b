//! CLI output formatting

use crate::{
    core::{JobResult, PipelineRun, Status, StepStatus, Trigger},
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

const DEFAULT_WIDTH: usize = 60;

/// Create a progress bar counting finished jobs
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Horizontal rule sized to the terminal
pub fn separator() -> String {
    let width = term_size::dimensions()
        .map(|(w, _)| w.min(100))
        .unwrap_or(DEFAULT_WIDTH);
    style("─".repeat(width)).dim().to_string()
}

/// Format a job or run status for display
pub fn format_status(status: Status) -> String {
    match status {
        Status::Success => style("SUCCESS").green().to_string(),
        Status::Failure => style("FAILURE").red().to_string(),
    }
}

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Succeeded => style("OK").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted { execution_id, jobs } => format!(
            "{} Starting {} jobs ({})",
            ROCKET,
            style(jobs).bold(),
            style(short_id(execution_id)).dim()
        ),
        ExecutionEvent::JobStarted { job, platform } => format!(
            "{} {} on {}",
            SPINNER,
            style(job).cyan(),
            style(platform).dim()
        ),
        ExecutionEvent::StepStarted { job, index, name } => format!(
            "  {} {} #{} {}",
            SPINNER,
            style(job).dim(),
            index,
            name
        ),
        ExecutionEvent::StepOutput { job, index, output } => format!(
            "  {} Output from {} #{}:\n{}",
            INFO,
            style(job).dim(),
            index,
            output.trim_end()
        ),
        ExecutionEvent::StepFinished { job, index, status } => {
            let icon = match status {
                StepStatus::Succeeded => CHECK,
                StepStatus::Failed => CROSS,
                StepStatus::Skipped => SKIP,
            };
            format!(
                "  {} {} #{} {}",
                icon,
                style(job).dim(),
                index,
                format_step_status(*status)
            )
        }
        ExecutionEvent::JobFinished {
            job,
            status,
            failing_step,
            error,
        } => match (status, failing_step, error) {
            (Status::Success, _, _) => format!("{} {}", CHECK, style(job).green()),
            (Status::Failure, Some(index), _) => format!(
                "{} {} failed at step {}",
                CROSS,
                style(job).red(),
                index
            ),
            (Status::Failure, None, Some(error)) => {
                format!("{} {}: {}", CROSS, style(job).red(), style(error).dim())
            }
            (Status::Failure, None, None) => format!("{} {}", CROSS, style(job).red()),
        },
        ExecutionEvent::RunFinished {
            execution_id,
            status,
        } => {
            let status_str = match status {
                Status::Success => format!("{} completed", style("successfully").green()),
                Status::Failure => style("failed").red().to_string(),
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(short_id(execution_id)).dim(),
                status_str
            )
        }
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// One line per job, plus the failing step's output when there is one
pub fn format_job_result(result: &JobResult) -> String {
    let icon = if result.is_success() { CHECK } else { CROSS };
    let mut line = format!(
        "{} {:<24} {:<8} {} ({}/{} steps, {}ms)",
        icon,
        style(&result.job).bold(),
        result.platform,
        format_status(result.status),
        result.attempted_steps(),
        result.steps.len(),
        result.duration().num_milliseconds().max(0)
    );

    if let Some(step) = result.failed_step() {
        line.push_str(&format!(
            "\n    step {} '{}' failed: {}",
            step.index,
            step.name,
            step.error.as_deref().unwrap_or("unknown error")
        ));
        let output = step.output();
        if !output.trim().is_empty() {
            for out in format_output(output.trim_end(), 10).lines() {
                line.push_str(&format!("\n      {}", style(out).dim()));
            }
        }
    } else if let Some(error) = &result.error {
        line.push_str(&format!("\n    {}", style(error).red()));
    }

    line
}

/// Summary table printed after a run
pub fn format_run_summary(run: &PipelineRun) -> String {
    let mut lines = vec![separator()];
    lines.extend(run.results.iter().map(format_job_result));
    lines.push(separator());

    let icon = if run.is_success() { CHECK } else { CROSS };
    lines.push(format!(
        "{} {} ({} succeeded, {} failed) - {}",
        icon,
        format_status(run.status),
        style(run.succeeded()).green(),
        style(run.failed()).red(),
        style(&run.trigger).dim()
    ));
    lines.join("\n")
}

/// JSON reported instead of a run when the workflow ignores the trigger
pub fn not_triggered_json(trigger: &Trigger) -> serde_json::Value {
    serde_json::json!({ "triggered": false, "trigger": trigger })
}
