use actionkit::{ActionExecutor, Component};
use anyhow::{Context as _, Result, bail};
use entitystore::{ChangeSetPk, EditSessionPk, Visibility};
use intel::InferOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use workflow::{HttpBackend, LocalBackend, WorkflowRunResponse, WorkflowRunner, WorkflowStatus};

use crate::Context;
use crate::cli::WorkflowCommand;
use crate::commands::apply::configured_provider;
use crate::config::Config;
use crate::graph::Graph;
use crate::state::State;
use crate::ui;

pub fn run(ctx: &Context, cmd: WorkflowCommand) -> Result<()> {
    match cmd {
        WorkflowCommand::Run {
            id,
            change_set,
            edit_session,
            graph,
            endpoint,
        } => {
            let visibility = visibility(change_set, edit_session)?;
            run_workflow(ctx, id, visibility, graph, endpoint)
        }
        WorkflowCommand::List => list(),
    }
}

/// Visibility for the given change set and edit session ids
pub fn visibility(change_set: Option<i64>, edit_session: Option<i64>) -> Result<Visibility> {
    match (change_set, edit_session) {
        (None, None) => Ok(Visibility::head()),
        (Some(cs), None) => Ok(Visibility::change_set(ChangeSetPk(cs))),
        (Some(cs), Some(es)) => Ok(Visibility::edit_session(ChangeSetPk(cs), EditSessionPk(es))),
        (None, Some(_)) => bail!("An edit session needs its change set"),
    }
}

fn run_workflow(
    ctx: &Context,
    id: i64,
    visibility: Visibility,
    graph: Option<PathBuf>,
    endpoint: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let timeout = Duration::from_secs(config.workflow.timeout_secs);
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let endpoint = endpoint.or_else(|| config.workflow.endpoint.clone());
    let response = match endpoint {
        Some(endpoint) => {
            log::info!("dispatching workflow {id} to {endpoint}");
            let runner = WorkflowRunner::new(Arc::new(HttpBackend::new(&endpoint, timeout)), timeout);
            runtime.block_on(runner.run(id, visibility))
        }
        None => run_locally(&config, &runtime, id, visibility, graph, timeout)?,
    }
    .with_context(|| format!("Workflow {id} did not complete"))?;

    print_response(ctx, &response);

    match response.workflow_runner_state.status {
        WorkflowStatus::Failure => bail!("Workflow {id} failed"),
        _ => Ok(()),
    }
}

/// Run through a [`LocalBackend`], persisting resources and history
/// whether or not the run succeeds
fn run_locally(
    config: &Config,
    runtime: &tokio::runtime::Runtime,
    id: i64,
    visibility: Visibility,
    graph: Option<PathBuf>,
    timeout: Duration,
) -> Result<workflow::Result<WorkflowRunResponse>> {
    if config.find_workflow(id).is_none() {
        ui::warn(&format!("Workflow {id} is not defined in config.toml"));
    }

    let mut state = State::load()?;
    let system = config.system(None);

    let components: Vec<Component> = match graph {
        Some(path) => {
            let entities = Graph::load(&path)?.entities;
            super::infer_entities(entities, &InferOptions::default())?
                .entities
                .iter()
                .map(|e| {
                    Component::from_entity(e, &system).with_resource(state.resource(e.id.as_str()))
                })
                .collect()
        }
        None => Vec::new(),
    };

    let backend = Arc::new(
        LocalBackend::new(ActionExecutor::new(configured_provider(config)))
            .with_definitions(config.workflows.clone())
            .with_components(components)
            .with_history(state.workflow_runs.clone()),
    );
    let runner = WorkflowRunner::new(backend.clone(), timeout);
    let result = runtime.block_on(runner.run(id, visibility));

    for component in runtime.block_on(backend.components()) {
        state.record_resource(&component.id, component.resource);
    }
    state.workflow_runs = backend.history();
    state.touch()?;

    Ok(result)
}

fn print_response(ctx: &Context, response: &WorkflowRunResponse) {
    let runner = &response.workflow_runner_state;
    ui::header("Workflow Run");
    ui::kv("runner", &runner.workflow_runner_id.to_string());
    ui::kv("status", &runner.status.to_string());
    if ctx.verbose > 0 {
        ui::kv("created", &runner.created_at.to_rfc3339());
        ui::kv("updated", &runner.updated_at.to_rfc3339());
    }

    if !ctx.quiet {
        ui::section("Logs");
        let total = response.logs.len();
        for (i, line) in response.logs.iter().enumerate() {
            ui::step(i + 1, total, line);
        }
    }
}

fn list() -> Result<()> {
    let config = Config::load()?;
    ui::header("Workflows");

    if config.workflows.is_empty() {
        println!();
        ui::info("No workflows configured");
        ui::dim("Add [[workflows]] entries to config.toml");
        return Ok(());
    }

    for definition in &config.workflows {
        ui::section(&format!("{} ({})", definition.name, definition.id));
        for step in &definition.steps {
            ui::dim(&format!("{} {}", step.action, step.component));
        }
    }
    Ok(())
}
