//! Property diff between two graphs

use anyhow::Result;
use entitystore::{Diff, DiffSummary, Entity, EntityId, PropertyTree};
use intel::InferOptions;
use std::collections::{BTreeMap, BTreeSet};

use crate::Context;
use crate::cli::DiffArgs;
use crate::graph::Graph;
use crate::ui;

/// Diff of every entity present in either graph, keyed by id
///
/// An entity missing on one side diffs against an empty tree, so its
/// properties show up as pure additions or removals. Unchanged entities are
/// left out.
pub fn diff_graphs(baseline: &[Entity], proposed: &[Entity]) -> BTreeMap<EntityId, Diff> {
    let empty = PropertyTree::new();
    let before: BTreeMap<&EntityId, &PropertyTree> =
        baseline.iter().map(|e| (&e.id, &e.properties)).collect();
    let after: BTreeMap<&EntityId, &PropertyTree> =
        proposed.iter().map(|e| (&e.id, &e.properties)).collect();

    let ids: BTreeSet<&EntityId> = before.keys().chain(after.keys()).copied().collect();
    ids.into_iter()
        .filter_map(|id| {
            let old = before.get(id).copied().unwrap_or(&empty);
            let new = after.get(id).copied().unwrap_or(&empty);
            let diff = entitystore::diff(old, new);
            (!diff.is_empty()).then(|| (id.clone(), diff))
        })
        .collect()
}

pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let mut baseline = Graph::load(&args.baseline)?.entities;
    let mut proposed = Graph::load(&args.proposed)?.entities;

    if args.infer {
        let opts = InferOptions::default();
        baseline = super::infer_entities(baseline, &opts)?.entities;
        proposed = super::infer_entities(proposed, &opts)?.entities;
    }

    let mut diffs = diff_graphs(&baseline, &proposed);
    if let Some(key) = &args.entity {
        diffs.retain(|id, _| {
            id.as_str() == key
                || baseline
                    .iter()
                    .chain(&proposed)
                    .any(|e| &e.id == id && &e.name == key)
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }

    ui::header("Property Diff");

    if diffs.is_empty() {
        println!();
        ui::success("No changes");
        return Ok(());
    }

    let mut total = DiffSummary::default();
    for (id, diff) in &diffs {
        let name = proposed
            .iter()
            .chain(&baseline)
            .find(|e| &e.id == id)
            .map_or(id.as_str(), |e| e.name.as_str());
        ui::section(&format!("{name} ({id})"));
        for entry in diff.iter() {
            ui::diff_entry(entry);
        }

        let summary = diff.summary();
        total.additions += summary.additions;
        total.removals += summary.removals;
        total.modifications += summary.modifications;
    }

    if !ctx.quiet {
        println!();
        ui::info(&format!(
            "{} entities changed: {} added, {} removed, {} modified",
            diffs.len(),
            total.additions,
            total.removals,
            total.modifications
        ));
    }
    Ok(())
}
