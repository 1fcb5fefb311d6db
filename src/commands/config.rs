use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::paths;
use crate::ui;

pub fn run(_ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(),
        ConfigCommand::Dir => {
            println!("{}", paths::config_dir()?.display());
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    ui::header("Configuration");

    let path = Config::path()?;
    ui::kv("Config file", &path.display().to_string());
    if !path.exists() {
        ui::dim("Not found, using defaults");
    }

    let config = Config::load()?;

    ui::section("General");
    ui::kv("system", &config.system);
    ui::kv(
        "provider.program",
        config.provider.program.as_deref().unwrap_or("(as invoked)"),
    );

    ui::section("Qualification");
    ui::kv(
        "timeout_secs",
        &config.qualification.timeout_secs.to_string(),
    );
    ui::kv("required", &list_or_none(&config.qualification.required));
    ui::kv("command", &list_or_none(&config.qualification.command));

    ui::section("Workflows");
    ui::kv("timeout_secs", &config.workflow.timeout_secs.to_string());
    ui::kv(
        "endpoint",
        config.workflow.endpoint.as_deref().unwrap_or("(local)"),
    );
    ui::kv("defined", &config.workflows.len().to_string());
    Ok(())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(" ")
    }
}
