use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use entitystore::{Entity, SystemName};
use indicatif::{ProgressBar, ProgressStyle};
use intel::{
    Check, CommandCheck, InferOptions, QualificationLog, QualificationRunner, QualificationStatus,
    RequiredProperties,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::Context;
use crate::cli::QualifyArgs;
use crate::config::Config;
use crate::graph::Graph;
use crate::ui;

/// Checks configured for `system`
pub fn configured_checks(config: &Config, system: &SystemName) -> Result<Vec<Arc<dyn Check>>> {
    let mut checks: Vec<Arc<dyn Check>> = Vec::new();

    let required = config.required_paths()?;
    if !required.is_empty() {
        checks.push(Arc::new(RequiredProperties::new(required, system.clone())));
    }

    if let Some((program, args)) = config.qualification.command.split_first() {
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program.as_str());
        checks.push(Arc::new(CommandCheck::new(
            name,
            program,
            args.to_vec(),
            system.clone(),
        )));
    }

    Ok(checks)
}

/// Run every check on every entity and collect the events
///
/// All entities start before any result is read, so checks on different
/// entities overlap. `progress` advances once per finished entity.
pub async fn qualify_all(
    entities: Vec<Entity>,
    checks: &[Arc<dyn Check>],
    timeout: Duration,
    progress: &ProgressBar,
) -> Result<QualificationLog> {
    let runner = QualificationRunner::new(timeout);
    let subscriptions: Vec<_> = entities
        .into_iter()
        .map(|entity| runner.run_all(Arc::new(entity), checks))
        .collect();

    let mut log = QualificationLog::new();
    for subscription in subscriptions {
        for event in subscription.collect().await {
            log.record(event)?;
        }
        progress.inc(1);
    }
    Ok(log)
}

fn status_label(status: QualificationStatus) -> colored::ColoredString {
    match status {
        QualificationStatus::Success => "success".green(),
        QualificationStatus::Failure => "failure".red(),
        QualificationStatus::Error => "error".red().bold(),
        QualificationStatus::Running => "running".yellow(),
    }
}

pub fn run(ctx: &Context, args: QualifyArgs) -> Result<()> {
    let config = Config::load()?;
    let system = config.system(args.system.as_deref());
    let graph = Graph::load(&args.graph)?;

    let checks = configured_checks(&config, &system)?;
    if checks.is_empty() {
        ui::warn("No qualification checks configured");
        ui::dim("Set qualification.required or qualification.command in config.toml");
        return Ok(());
    }

    let report = super::infer_entities(graph.entities, &InferOptions::default())?;
    let entities: Vec<Entity> = match &args.entity {
        Some(key) => {
            let inferred = Graph {
                entities: report.entities,
            };
            vec![inferred.find(key)?.clone()]
        }
        None => report.entities,
    };

    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.qualification.timeout_secs));
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let progress = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(entities.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress.set_message(format!("{} checks", checks.len()));
    let log = runtime.block_on(qualify_all(entities.clone(), &checks, timeout, &progress));
    progress.finish_and_clear();
    let log = log?;

    ui::header(&format!("Qualification ({system})"));

    let mut unqualified = 0;
    for entity in &entities {
        ui::section(&format!("{} ({})", entity.name, entity.id));
        for qualification in log.for_entity(&entity.id) {
            println!(
                "  {} {}",
                status_label(qualification.status),
                qualification.check_name
            );
            if let Some(output) = qualification.output.as_deref().filter(|o| !o.is_empty()) {
                if qualification.status != QualificationStatus::Success || ctx.verbose > 0 {
                    for line in output.lines() {
                        ui::dim(line);
                    }
                }
            }
        }
        if !log.is_qualified(&entity.id) {
            unqualified += 1;
        }
    }

    println!();
    if unqualified > 0 {
        bail!("{unqualified} of {} entities failed qualification", entities.len());
    }
    ui::success(&format!("{} entities qualified", entities.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualificationConfig;

    fn config(required: &[&str], command: &[&str]) -> Config {
        Config {
            qualification: QualificationConfig {
                required: required.iter().map(ToString::to_string).collect(),
                command: command.iter().map(ToString::to_string).collect(),
                ..QualificationConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_no_checks_by_default() {
        let checks = configured_checks(&Config::default(), &SystemName::baseline()).unwrap();
        assert!(checks.is_empty());
    }

    #[test]
    fn test_configured_checks() {
        let config = config(&["metadata.name"], &["/usr/bin/kubeval", "--strict"]);
        let checks = configured_checks(&config, &SystemName::baseline()).unwrap();
        let names: Vec<&str> = checks.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["required-properties", "kubeval"]);
    }

    #[tokio::test]
    async fn test_qualify_all_records_terminal_status() {
        let config = config(&["metadata.name"], &[]);
        let checks = configured_checks(&config, &SystemName::baseline()).unwrap();
        let named = Entity::new("ns", "k8sNamespace", "prod")
            .with_property("metadata.name".parse().unwrap(), "prod");
        let bare = Entity::new("img", "dockerImage", "web");

        let log = qualify_all(
            vec![named, bare],
            &checks,
            Duration::from_secs(5),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        assert!(log.is_qualified(&"ns".into()));
        assert!(!log.is_qualified(&"img".into()));
        let failed = log.get(&"img".into(), "required-properties").unwrap();
        assert_eq!(failed.status, QualificationStatus::Failure);
    }
}
