//! Change sets, edit sessions and visibility

use crate::types::{ChangeSetPk, EditSessionPk};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a change set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSetStatus {
    Open,
    Applied,
    Abandoned,
}

impl fmt::Display for ChangeSetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Applied => write!(f, "applied"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// An isolated branch of proposed entity mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub pk: ChangeSetPk,
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    pub status: ChangeSetStatus,
}

impl ChangeSet {
    pub fn is_open(&self) -> bool {
        self.status == ChangeSetStatus::Open
    }
}

/// Lifecycle of an edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditSessionStatus {
    Open,
    Saved,
    Canceled,
}

impl fmt::Display for EditSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Saved => write!(f, "saved"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// A working copy nested inside a change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    pub pk: EditSessionPk,
    pub change_set_pk: ChangeSetPk,
    pub status: EditSessionStatus,
}

impl EditSession {
    pub fn is_open(&self) -> bool {
        self.status == EditSessionStatus::Open
    }
}

/// The change-set/edit-session context a read or write happens in
///
/// Both fields unset means head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(rename = "change_set_id", default, skip_serializing_if = "Option::is_none")]
    pub change_set_pk: Option<ChangeSetPk>,
    #[serde(rename = "edit_session_id", default, skip_serializing_if = "Option::is_none")]
    pub edit_session_pk: Option<EditSessionPk>,
}

impl Visibility {
    pub fn head() -> Self {
        Self::default()
    }

    pub fn change_set(pk: ChangeSetPk) -> Self {
        Self {
            change_set_pk: Some(pk),
            edit_session_pk: None,
        }
    }

    pub fn edit_session(change_set_pk: ChangeSetPk, edit_session_pk: EditSessionPk) -> Self {
        Self {
            change_set_pk: Some(change_set_pk),
            edit_session_pk: Some(edit_session_pk),
        }
    }

    pub fn is_head(&self) -> bool {
        self.change_set_pk.is_none() && self.edit_session_pk.is_none()
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.change_set_pk, self.edit_session_pk) {
            (None, None) => write!(f, "head"),
            (Some(cs), None) => write!(f, "change set {cs}"),
            (Some(cs), Some(es)) => write!(f, "change set {cs} / edit session {es}"),
            (None, Some(es)) => write!(f, "edit session {es} (no change set)"),
        }
    }
}
