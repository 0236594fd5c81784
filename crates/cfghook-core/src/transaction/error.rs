//! Errors that fail a transaction.
use thiserror::Error;

use crate::dependency::DependencyKind;
use crate::plugin_system::plugin::{HookError, HookKind};
use crate::transaction::{CommitOp, TransactionState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// A phase hook failed; later plugins were not called for that phase
    #[error("Plugin '{plugin}' vetoed {phase}: {source}")]
    PhaseVeto {
        phase: HookKind,
        plugin: String,
        #[source]
        source: HookError,
    },

    /// A validate or commit dependency callback failed
    #[error("{kind} dependency of plugin '{plugin}' failed on '{key}' ({op}): {source}")]
    Callback {
        plugin: String,
        kind: DependencyKind,
        key: String,
        op: CommitOp,
        #[source]
        source: HookError,
    },

    /// A phase entry point was called out of order; no plugin was called
    #[error("Cannot run {phase} in transaction state {state}")]
    InvalidState { phase: HookKind, state: TransactionState },
}

impl TransactionError {
    /// Plugin responsible for the failure, if any
    pub fn plugin(&self) -> Option<&str> {
        match self {
            TransactionError::PhaseVeto { plugin, .. } | TransactionError::Callback { plugin, .. } => Some(plugin),
            TransactionError::InvalidState { .. } => None,
        }
    }
}
