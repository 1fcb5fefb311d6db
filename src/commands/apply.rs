use actionkit::{Action, ActionExecutor, CliProvider, Component, Provider};
use anyhow::{Context as _, Result, bail};
use dialoguer::Confirm;
use intel::InferOptions;
use std::io::IsTerminal;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::Config;
use crate::graph::Graph;
use crate::state::State;
use crate::ui;

/// Provider from config: the command line as built, or through a wrapper
pub fn configured_provider(config: &Config) -> Box<dyn Provider> {
    match &config.provider.program {
        Some(program) => Box::new(CliProvider::with_program(program.as_str())),
        None => Box::new(CliProvider::new()),
    }
}

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = Config::load()?;
    let system = config.system(args.system.as_deref());
    let mut state = State::load()?;
    let action = Action::from(args.action);

    let graph = Graph::load(&args.graph)?;
    let inferred = Graph {
        entities: super::infer_entities(graph.entities, &InferOptions::default())?.entities,
    };
    let entity = inferred.find(&args.entity)?;

    let mut component = Component::from_entity(entity, &system)
        .with_resource(state.resource(entity.id.as_str()));
    let executor = ActionExecutor::new(configured_provider(&config));

    if !ctx.quiet {
        ui::info(&format!(
            "{action} {} ({}) for {system}",
            component.name, component.kind
        ));
    }

    if action == Action::Delete && component.is_provisioned() && !args.yes && !confirm_delete(&component)? {
        ui::info("Cancelled");
        return Ok(());
    }

    match executor.apply(&mut component, action) {
        Ok(data) => {
            state.record_resource(&component.id, component.resource.clone());
            state.touch()?;
            ui::success(&format!("{action} {}: done", component.name));
            if ctx.verbose > 0 && !data.is_null() {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("{}: {e}", e.category().description()));
            ui::dim(e.advice());
            Err(e).with_context(|| format!("Failed to {action} {}", component.name))
        }
    }
}

/// Ask before destroying a provisioned resource
fn confirm_delete(component: &Component) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!("Refusing to delete {} without a terminal; pass --yes", component.name);
    }
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete {} ({})?", component.name, component.kind))
        .default(false)
        .interact()?;
    Ok(confirmed)
}
