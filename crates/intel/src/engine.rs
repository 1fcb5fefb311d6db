//! Inference engine - rule registry and graph passes

use crate::context::InferContext;
use crate::error::{InferError, Result};
use crate::rules::{self, InferFn};
use entitystore::{Entity, EntityId, EntityStore, Visibility};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Rules keyed by entity type
///
/// Types with no registered rule pass through inference unchanged.
#[derive(Debug, Clone, Default)]
pub struct InferenceRegistry {
    rules: BTreeMap<String, InferFn>,
}

impl InferenceRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Kubernetes and Docker rules installed
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (entity_type, rule) in rules::kubernetes::rules()
            .into_iter()
            .chain(rules::docker::rules())
        {
            registry.register(entity_type, rule);
        }
        registry
    }

    /// Register (or replace) the rule for an entity type
    pub fn register(&mut self, entity_type: &str, rule: InferFn) {
        self.rules.insert(entity_type.to_string(), rule);
    }

    pub fn has_rule(&self, entity_type: &str) -> bool {
        self.rules.contains_key(entity_type)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Infer one entity against a context
    ///
    /// The input is never modified; the result is a new entity.
    pub fn infer(&self, entity: &Entity, ctx: &InferContext<'_>) -> Result<Entity> {
        let mut inferred = entity.clone();
        if let Some(rule) = self.rules.get(&entity.entity_type) {
            rule(&mut inferred, ctx)?;
        }
        Ok(inferred)
    }
}

/// Options for a graph pass
#[derive(Debug, Clone)]
pub struct InferOptions {
    /// Number of worker threads
    pub jobs: usize,
    /// Upper bound on passes before giving up on a fixed point
    pub max_passes: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            max_passes: 8,
        }
    }
}

/// An entity whose rule failed in the final pass
#[derive(Debug)]
pub struct EntityFailure {
    pub entity_id: EntityId,
    pub error: InferError,
}

/// Outcome of inferring a whole graph
#[derive(Debug, Default)]
pub struct GraphReport {
    /// Every input entity, inferred where its rule succeeded
    pub entities: Vec<Entity>,
    pub failures: Vec<EntityFailure>,
    /// Passes run until the graph stopped changing
    pub passes: usize,
    pub converged: bool,
}

impl GraphReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }
}

/// Infer every entity in a graph
///
/// Each pass infers all entities in parallel against a snapshot of the
/// previous pass, so rules read a consistent graph. Passes repeat until the
/// output equals the input, which makes the result a fixed point: running
/// it again changes nothing. A failing entity keeps its previous value and
/// does not stop the others.
pub fn infer_graph(
    entities: Vec<Entity>,
    registry: &InferenceRegistry,
    opts: &InferOptions,
) -> Result<GraphReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| InferError::ThreadPool(e.to_string()))?;

    let mut current = entities;
    current.sort_by(|a, b| a.id.cmp(&b.id));
    let mut report = GraphReport::default();

    for pass in 1..=opts.max_passes.max(1) {
        let results: Vec<Result<Entity>> = {
            let ctx = InferContext::new(current.iter());
            pool.install(|| {
                current
                    .par_iter()
                    .map(|entity| registry.infer(entity, &ctx))
                    .collect()
            })
        };

        let mut next = Vec::with_capacity(current.len());
        let mut failures = Vec::new();
        for (previous, result) in current.iter().zip(results) {
            match result {
                Ok(entity) => next.push(entity),
                Err(error) => {
                    log::debug!("pass {pass}: {error}");
                    failures.push(EntityFailure {
                        entity_id: previous.id.clone(),
                        error,
                    });
                    next.push(previous.clone());
                }
            }
        }

        report.passes = pass;
        report.failures = failures;
        if next == current {
            report.converged = true;
            break;
        }
        current = next;
    }

    if !report.converged {
        log::warn!(
            "inference did not settle after {} passes",
            report.passes
        );
    }
    log::info!(
        "inferred {} entities in {} passes ({} failed)",
        current.len(),
        report.passes,
        report.failures.len()
    );

    report.entities = current;
    Ok(report)
}

/// Infer everything visible in `vis` and write changed entities back
///
/// Writes go through the store's normal update path, so at head they land
/// directly and inside an edit session they stay isolated. Returns the
/// report; failed entities are left as they were.
pub fn infer_store(
    store: &mut EntityStore,
    vis: Visibility,
    registry: &InferenceRegistry,
    opts: &InferOptions,
) -> Result<GraphReport> {
    let before: Vec<Entity> = store.entities(vis)?.into_iter().cloned().collect();
    let report = infer_graph(before.clone(), registry, opts)?;

    let before: BTreeMap<&EntityId, &Entity> = before.iter().map(|e| (&e.id, e)).collect();
    for entity in &report.entities {
        if before.get(&entity.id).is_some_and(|old| *old != entity) {
            store.update_entity(vis, entity.clone())?;
        }
    }
    Ok(report)
}
