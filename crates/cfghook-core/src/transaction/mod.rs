//! # cfghook Transactions
//!
//! Types describing one configuration transaction and the commit pipeline
//! that drives it through the plugin phases.
//!
//! A [`TransactionContext`] is built for each commit cycle from a change set
//! and consumed by [`Dispatcher::commit`](crate::plugin_system::Dispatcher::commit)
//! or [`Dispatcher::validate`](crate::plugin_system::Dispatcher::validate).
//! Dependency callbacks receive a [`CommitData`] view of the changes they
//! cover.
pub mod commit;
pub mod context;
pub mod error;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::handle::Handle;

pub use commit::{CommitData, TransactionSummary};
pub use context::{TransactionContext, TransactionId, TransactionState};
pub use error::TransactionError;

/// Values stored under one key, by leaf name
pub type ValueVec = BTreeMap<String, serde_json::Value>;

/// Kind of change made to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitOp {
    Add,
    Delete,
    Change,
}

impl CommitOp {
    /// Operation that undoes this one
    pub fn invert(self) -> Self {
        match self {
            CommitOp::Add => CommitOp::Delete,
            CommitOp::Delete => CommitOp::Add,
            CommitOp::Change => CommitOp::Change,
        }
    }
}

impl fmt::Display for CommitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitOp::Add => "ADD",
            CommitOp::Delete => "DELETE",
            CommitOp::Change => "CHANGE",
        };
        f.write_str(name)
    }
}

/// One changed key of a change set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyChange {
    pub op: CommitOp,
    pub key: String,
    /// Values before the change (empty for ADD)
    #[serde(default)]
    pub source_values: ValueVec,
    /// Values after the change (empty for DELETE)
    #[serde(default)]
    pub target_values: ValueVec,
}

impl KeyChange {
    pub fn add(key: impl Into<String>, target_values: ValueVec) -> Self {
        Self {
            op: CommitOp::Add,
            key: key.into(),
            source_values: ValueVec::new(),
            target_values,
        }
    }

    pub fn delete(key: impl Into<String>, source_values: ValueVec) -> Self {
        Self {
            op: CommitOp::Delete,
            key: key.into(),
            source_values,
            target_values: ValueVec::new(),
        }
    }

    pub fn change(key: impl Into<String>, source_values: ValueVec, target_values: ValueVec) -> Self {
        Self {
            op: CommitOp::Change,
            key: key.into(),
            source_values,
            target_values,
        }
    }
}

/// Serialized form of a change set, as read by the command line host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Source snapshot; defaults to the running database
    #[serde(default)]
    pub source: Option<String>,
    /// Target snapshot; defaults to the candidate database
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub changes: Vec<KeyChange>,
}

impl ChangeSet {
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Fresh transaction over this change set
    pub fn into_context(self, handle: &Handle) -> TransactionContext {
        let source = self.source.unwrap_or_else(|| handle.running_db().to_string());
        let target = self.target.unwrap_or_else(|| handle.candidate_db().to_string());
        TransactionContext::new(source, target, self.changes)
    }
}

#[cfg(test)]
mod tests;
