use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::cli::StateCommand;
use crate::state::State;
use crate::ui;

pub fn run(ctx: &Context, cmd: StateCommand) -> Result<()> {
    match cmd {
        StateCommand::Show => show(ctx),
        StateCommand::Clear => clear(),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let state = State::load()?;
    ui::header("Resource State");
    ui::kv("State file", &State::path()?.display().to_string());
    ui::kv("Last updated", &state.last_updated.to_rfc3339());

    ui::section("Resources");
    if state.resources.is_empty() {
        ui::dim("Nothing provisioned");
    }
    for (id, resource) in &state.resources {
        let icon = if resource.provisioned {
            "✓".green()
        } else {
            "○".dimmed()
        };
        println!("  {icon} {id}");
        if ctx.verbose > 0 {
            if let Some(data) = &resource.data {
                ui::dim(&data.to_string());
            }
        }
    }

    ui::section("Workflow runs");
    if state.workflow_runs.is_empty() {
        ui::dim("No runs recorded");
    }
    for run in &state.workflow_runs {
        ui::dim(&format!(
            "#{} runner {} {} at {}",
            run.pk,
            run.workflow_runner_id,
            run.status,
            run.updated_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    println!();
    ui::info(&format!(
        "{} provisioned, {} run transitions",
        state.provisioned_count(),
        state.workflow_runs.len()
    ));
    Ok(())
}

fn clear() -> Result<()> {
    let mut state = State::load()?;
    let forgotten = state.resources.len();
    state.resources.clear();
    state.workflow_runs.clear();
    state.touch()?;
    ui::success(&format!("Forgot {forgotten} resources"));
    ui::warn("Provisioned infrastructure was not touched");
    Ok(())
}
