use std::any::Any;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::plugin_system::plugin::HookKind;
use crate::transaction::KeyChange;
use crate::transaction::error::TransactionError;

pub type TransactionId = u64;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Where a transaction is in its phase sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Idle,
    Begun,
    Validated,
    Completed,
    Ended,
    /// A begin, validate or complete step failed. Only abort is accepted.
    Vetoed,
    Aborted,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Idle => "idle",
            TransactionState::Begun => "begun",
            TransactionState::Validated => "validated",
            TransactionState::Completed => "completed",
            TransactionState::Ended => "ended",
            TransactionState::Vetoed => "vetoed",
            TransactionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Everything the phase hooks of one transaction see.
///
/// Hooks receive `&TransactionContext`. The carry-over argument is the one
/// mutable slot: a plugin may stash a value in `begin` and pick it up in a
/// later phase of the same transaction.
pub struct TransactionContext {
    id: TransactionId,
    source_db: String,
    target_db: String,
    changes: Vec<KeyChange>,
    arg: RwLock<Option<Box<dyn Any + Send + Sync>>>,
    state: TransactionState,
}

impl TransactionContext {
    /// New transaction in the `Idle` state with a process-unique id
    pub fn new(source_db: impl Into<String>, target_db: impl Into<String>, changes: Vec<KeyChange>) -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
            source_db: source_db.into(),
            target_db: target_db.into(),
            changes,
            arg: RwLock::new(None),
            state: TransactionState::Idle,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn source_db(&self) -> &str {
        &self.source_db
    }

    pub fn target_db(&self) -> &str {
        &self.target_db
    }

    pub fn changes(&self) -> &[KeyChange] {
        &self.changes
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TransactionState) {
        self.state = state;
    }

    /// Fail with `InvalidState` unless the transaction is in one of `allowed`
    pub(crate) fn expect_state(&self, phase: HookKind, allowed: &[TransactionState]) -> Result<(), TransactionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TransactionError::InvalidState {
                phase,
                state: self.state,
            })
        }
    }

    /// Store the carry-over argument, replacing any previous one
    pub fn set_arg<T: Any + Send + Sync>(&self, value: T) {
        let mut arg = self.arg.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *arg = Some(Box::new(value));
    }

    /// Run `f` against the carry-over argument if it has type `T`
    pub fn with_arg<T: Any + Send + Sync, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let arg = self.arg.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        arg.as_ref().and_then(|value| value.downcast_ref::<T>()).map(f)
    }

    pub fn has_arg(&self) -> bool {
        let arg = self.arg.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        arg.is_some()
    }

    pub fn clear_arg(&self) {
        let mut arg = self.arg.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *arg = None;
    }
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContext")
            .field("id", &self.id)
            .field("source_db", &self.source_db)
            .field("target_db", &self.target_db)
            .field("changes", &self.changes.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
