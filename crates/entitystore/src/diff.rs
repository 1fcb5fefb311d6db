//! Diff computation for property trees

use crate::tree::PropertyTree;
use crate::types::{PropertyPath, PropertyValue, SystemName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One `(path, system)` whose value differs between two trees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub path: PropertyPath,
    pub system: SystemName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<PropertyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<PropertyValue>,
}

impl DiffEntry {
    /// Check if this entry represents an addition
    pub fn is_addition(&self) -> bool {
        self.old_value.is_none() && self.new_value.is_some()
    }

    /// Check if this entry represents a removal
    pub fn is_removal(&self) -> bool {
        self.old_value.is_some() && self.new_value.is_none()
    }

    /// Check if this entry represents a modification
    pub fn is_modification(&self) -> bool {
        self.old_value.is_some() && self.new_value.is_some()
    }
}

/// Ordered delta between two property trees (path, then system)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diff {
    entries: Vec<DiffEntry>,
}

impl Diff {
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiffEntry> {
        self.entries.iter()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_entries(&self.entries)
    }
}

impl IntoIterator for Diff {
    type Item = DiffEntry;
    type IntoIter = std::vec::IntoIter<DiffEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Compare resolved values of every `(path, system)` across both trees
///
/// Systems present on only one side are compared against the other side's
/// baseline fallback, so an override equal to baseline is not a change.
pub fn diff(baseline: &PropertyTree, session: &PropertyTree) -> Diff {
    let paths: BTreeSet<&PropertyPath> = baseline.paths().chain(session.paths()).collect();

    let mut entries = Vec::new();
    for path in paths {
        let systems: BTreeSet<SystemName> = baseline
            .get_for_all_systems(path)
            .into_keys()
            .chain(session.get_for_all_systems(path).into_keys())
            .collect();

        for system in systems {
            let old_value = baseline.get(path, &system);
            let new_value = session.get(path, &system);
            if old_value != new_value {
                entries.push(DiffEntry {
                    path: path.clone(),
                    system,
                    old_value: old_value.cloned(),
                    new_value: new_value.cloned(),
                });
            }
        }
    }

    Diff { entries }
}

/// Compare stored values without baseline fallback
///
/// Used when replaying one side's writes onto another; every entry is a
/// concrete set (`new_value` present) or delete (`new_value` absent).
pub(crate) fn leaf_changes(before: &PropertyTree, after: &PropertyTree) -> Vec<DiffEntry> {
    let keys: BTreeSet<(&PropertyPath, &SystemName)> = before
        .leaves()
        .map(|(p, s, _)| (p, s))
        .chain(after.leaves().map(|(p, s, _)| (p, s)))
        .collect();

    keys.into_iter()
        .filter_map(|(path, system)| {
            let old_value = before.get_exact(path, system);
            let new_value = after.get_exact(path, system);
            (old_value != new_value).then(|| DiffEntry {
                path: path.clone(),
                system: system.clone(),
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
            })
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of values added
    pub additions: usize,
    /// Number of values removed
    pub removals: usize,
    /// Number of values changed in place
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of entries
    pub fn from_entries(entries: &[DiffEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            if entry.is_addition() {
                summary.additions += 1;
            } else if entry.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
