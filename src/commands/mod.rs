pub mod apply;
pub mod config;
pub mod diff;
pub mod infer;
pub mod qualify;
pub mod state;
pub mod workflow;

use crate::ui;
use anyhow::{Context as _, Result};
use entitystore::Entity;
use intel::{GraphReport, InferOptions, InferenceRegistry};

/// Infer a graph with the built-in rules, reporting failed entities
///
/// Failed entities keep their input value; callers decide whether that is
/// fatal.
pub fn infer_entities(entities: Vec<Entity>, opts: &InferOptions) -> Result<GraphReport> {
    let registry = InferenceRegistry::builtin();
    let report = intel::infer_graph(entities, &registry, opts).context("Inference failed")?;

    for failure in &report.failures {
        ui::warn(&format!("{}: {}", failure.entity_id, failure.error));
    }
    if !report.converged {
        ui::warn(&format!(
            "Inference did not settle after {} passes",
            report.passes
        ));
    }
    Ok(report)
}
