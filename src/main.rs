use anyhow::{Context, Result};
use orchestrator::cli::commands::{resolve_color, ListCommand, RunCommand, ValidateCommand};
use orchestrator::cli::output::*;
use orchestrator::cli::{Cli, Command};
use orchestrator::core::{ExecutionOptions, WorkflowConfig};
use orchestrator::execution::{ExecutionEngine, ExecutionEvent, LocalEnvironment};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; stdout is reserved for results
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_workflow(cmd, cli.stream).await?,
        Command::Validate(cmd) => validate_workflow(cmd)?,
        Command::List(cmd) => list_jobs(cmd)?,
    }

    Ok(())
}

async fn run_workflow(cmd: &RunCommand, stream: bool) -> Result<()> {
    let config = WorkflowConfig::from_file(&cmd.file).context("Failed to load workflow")?;
    let trigger = cmd.trigger().map_err(anyhow::Error::msg)?;

    if !cmd.json {
        println!(
            "{} Loaded workflow: {}",
            INFO,
            style(config.name.as_deref().unwrap_or(&cmd.file)).bold()
        );
    }

    if !config.triggers()?.matches(&trigger) {
        if cmd.json {
            println!("{}", serde_json::to_string_pretty(&not_triggered_json(&trigger))?);
        } else {
            println!("{} Workflow is not triggered by {}", WARN, style(&trigger).yellow());
        }
        return Ok(());
    }

    let environment = LocalEnvironment::new();
    let jobs = cmd
        .select_jobs(config.to_jobs()?, environment.host())
        .map_err(anyhow::Error::msg)?;

    let color = resolve_color(cmd.color, config.color_preference());
    let mut options = ExecutionOptions::new().with_color(color);
    if let Some(dir) = &cmd.workdir {
        options = options.with_working_dir(dir);
    }

    let engine = ExecutionEngine::new(environment, options);

    let progress = create_progress_bar(jobs.len());
    if cmd.json {
        progress.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let bar = progress.clone();
    let quiet = cmd.json;
    engine
        .add_event_handler(move |event| {
            if let ExecutionEvent::JobFinished { job, .. } = &event {
                bar.inc(1);
                bar.set_message(job.clone());
            }
            if quiet {
                return;
            }
            match &event {
                ExecutionEvent::StepOutput { output, .. } if stream => {
                    bar.suspend(|| println!("{}", format_output(output, 20)));
                }
                ExecutionEvent::StepOutput { .. } => {}
                _ => bar.suspend(|| println!("{}", format_execution_event(&event))),
            }
        })
        .await;

    let run = engine
        .submit_with_trigger(jobs, trigger)
        .await
        .context("Failed to start run")?;
    progress.finish_and_clear();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        println!("\n{}", format_run_summary(&run));
    }

    if !run.is_success() {
        error!("{} of {} jobs failed", run.failed(), run.results.len());
        std::process::exit(1);
    }

    Ok(())
}

fn validate_workflow(cmd: &ValidateCommand) -> Result<()> {
    if !cmd.json {
        println!("{} Validating workflow...", INFO);
    }

    let result = WorkflowConfig::from_file(&cmd.file).and_then(|config| {
        let jobs = config.to_jobs()?;
        let triggers = config.triggers()?;
        Ok((config, jobs, triggers))
    });

    match result {
        Ok((config, jobs, triggers)) => {
            if cmd.json {
                let data = serde_json::json!({
                    "valid": true,
                    "name": config.name,
                    "triggers": triggers,
                    "jobs": jobs,
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Workflow configuration is valid!", CHECK);
                if let Some(name) = &config.name {
                    println!("  Name: {}", style(name).bold());
                }
                println!("  Jobs: {}", style(jobs.len()).cyan());
                println!(
                    "  Steps: {}",
                    style(jobs.iter().map(|j| j.steps.len()).sum::<usize>()).cyan()
                );
                println!("  Environment: {}", style(config.env().len()).cyan());
            }
            Ok(())
        }
        Err(e) => {
            if cmd.json {
                let data = serde_json::json!({ "valid": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Validation failed:", CROSS);
                println!("  {}", style(e).red());
            }
            std::process::exit(1);
        }
    }
}

fn list_jobs(cmd: &ListCommand) -> Result<()> {
    let config = WorkflowConfig::from_file(&cmd.file).context("Failed to load workflow")?;
    let jobs = config.to_jobs()?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    println!("{} Jobs in {}:", INFO, style(&cmd.file).bold());
    for job in &jobs {
        println!(
            "  {} ({}, {} steps)",
            style(&job.name).bold(),
            style(job.platform).cyan(),
            job.steps.len()
        );
        for (index, step) in job.steps.iter().enumerate() {
            println!("    {} {}", style(index).dim(), step.name);
        }
    }

    Ok(())
}
