use std::any::Any;
use std::fmt;

use log::{error, info, warn};

use crate::dependency::Invocation;
use crate::kernel::handle::Handle;
use crate::plugin_system::Dispatcher;
use crate::transaction::{
    CommitOp, KeyChange, TransactionContext, TransactionError, TransactionId, TransactionState, ValueVec,
};

/// What a dependency callback sees of the changes it covers.
///
/// Source fields describe the key before the change and are set for DELETE
/// and CHANGE; target fields describe it after and are set for ADD and
/// CHANGE. For a tree dependency the keys are the subtree root and
/// `changes` lists every covered change.
#[derive(Clone)]
pub struct CommitData<'a> {
    pub source_db: &'a str,
    pub target_db: &'a str,
    pub source_key: Option<&'a str>,
    pub target_key: Option<&'a str>,
    pub source_values: Option<&'a ValueVec>,
    pub target_values: Option<&'a ValueVec>,
    /// Argument the dependency was registered with
    pub arg: Option<&'a (dyn Any + Send + Sync)>,
    pub changes: Vec<&'a KeyChange>,
}

impl<'a> CommitData<'a> {
    /// View of `ctx` for one commit vector entry
    pub fn for_invocation(ctx: &'a TransactionContext, invocation: &Invocation<'a>) -> Self {
        let dependency = invocation.dependency;
        let changes: Vec<&'a KeyChange> = invocation
            .changes
            .iter()
            .filter_map(|&pos| ctx.changes().get(pos))
            .collect();
        let anchor = changes.iter().copied().find(|change| change.key == dependency.key());
        let key = anchor.map_or(dependency.key(), |change| change.key.as_str());
        let op = invocation.op;

        Self {
            source_db: ctx.source_db(),
            target_db: ctx.target_db(),
            source_key: (op != CommitOp::Add).then_some(key),
            target_key: (op != CommitOp::Delete).then_some(key),
            source_values: anchor.filter(|_| op != CommitOp::Add).map(|change| &change.source_values),
            target_values: anchor.filter(|_| op != CommitOp::Delete).map(|change| &change.target_values),
            arg: dependency.arg(),
            changes,
        }
    }

    /// Same changes seen from the other side, used to undo them
    pub fn reversed(&self) -> Self {
        Self {
            source_db: self.target_db,
            target_db: self.source_db,
            source_key: self.target_key,
            target_key: self.source_key,
            source_values: self.target_values,
            target_values: self.source_values,
            arg: self.arg,
            changes: self.changes.clone(),
        }
    }

    /// Registration argument downcast to `T`
    pub fn arg_as<T: Any>(&self) -> Option<&'a T> {
        self.arg.and_then(|arg| arg.downcast_ref::<T>())
    }
}

impl fmt::Debug for CommitData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitData")
            .field("source_db", &self.source_db)
            .field("target_db", &self.target_db)
            .field("source_key", &self.source_key)
            .field("target_key", &self.target_key)
            .field("source_values", &self.source_values)
            .field("target_values", &self.target_values)
            .field("changes", &self.changes.len())
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful commit or validate cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub id: TransactionId,
    pub state: TransactionState,
    pub changes: usize,
    /// Dependency callbacks invoked
    pub callbacks: usize,
}

impl TransactionSummary {
    fn new(ctx: &TransactionContext, callbacks: usize) -> Self {
        Self {
            id: ctx.id(),
            state: ctx.state(),
            changes: ctx.changes().len(),
            callbacks,
        }
    }
}

impl Dispatcher {
    /// Run one full commit cycle over `ctx`: begin, validating dependencies,
    /// complete, commit dependencies, end.
    ///
    /// A failure before end aborts the transaction on every plugin and is
    /// returned. A failure in end is returned without aborting.
    pub fn commit(&self, handle: &Handle, mut ctx: TransactionContext) -> Result<TransactionSummary, TransactionError> {
        info!(
            "Commit transaction {} ({} -> {}, {} change(s))",
            ctx.id(),
            ctx.source_db(),
            ctx.target_db(),
            ctx.changes().len()
        );

        let outcome = self.run_validation(handle, &mut ctx).and_then(|validated| {
            self.apply_commit_vector(handle, &ctx).map(|committed| validated + committed)
        });
        let callbacks = match outcome {
            Ok(callbacks) => callbacks,
            Err(err) => return Err(self.fail(handle, &mut ctx, err)),
        };

        if let Err(err) = self.transaction_end(handle, &mut ctx) {
            error!("Transaction {} failed in end: {}", ctx.id(), err);
            return Err(err);
        }
        info!("Transaction {} committed", ctx.id());
        Ok(TransactionSummary::new(&ctx, callbacks))
    }

    /// Run begin, validating dependencies and complete without committing.
    pub fn validate(&self, handle: &Handle, mut ctx: TransactionContext) -> Result<TransactionSummary, TransactionError> {
        info!("Validate transaction {} ({} change(s))", ctx.id(), ctx.changes().len());
        match self.run_validation(handle, &mut ctx) {
            Ok(callbacks) => {
                info!("Transaction {} validated", ctx.id());
                Ok(TransactionSummary::new(&ctx, callbacks))
            }
            Err(err) => Err(self.fail(handle, &mut ctx, err)),
        }
    }

    fn fail(&self, handle: &Handle, ctx: &mut TransactionContext, err: TransactionError) -> TransactionError {
        error!("Transaction {} failed: {}", ctx.id(), err);
        if let Err(abort_err) = self.transaction_abort(handle, ctx) {
            warn!("Transaction {} could not be aborted: {}", ctx.id(), abort_err);
        }
        err
    }

    /// begin, validating callbacks, complete. Returns the callbacks invoked.
    fn run_validation(&self, handle: &Handle, ctx: &mut TransactionContext) -> Result<usize, TransactionError> {
        self.transaction_begin(handle, ctx)?;

        let checked = {
            let vector = self.dependencies().commit_vector(ctx.changes(), true);
            let result = vector.iter().try_for_each(|invocation| self.invoke(handle, ctx, invocation));
            result.map(|()| vector.len())
        };
        let callbacks = checked.inspect_err(|_| ctx.set_state(TransactionState::Vetoed))?;
        ctx.set_state(TransactionState::Validated);

        self.transaction_complete(handle, ctx)?;
        Ok(callbacks)
    }

    /// Commit callbacks: DELETE invocations in reverse order, then ADD and
    /// CHANGE invocations in order. On failure everything applied so far is
    /// reverted.
    fn apply_commit_vector(&self, handle: &Handle, ctx: &TransactionContext) -> Result<usize, TransactionError> {
        let vector = self.dependencies().commit_vector(ctx.changes(), false);
        let (deletes, updates): (Vec<&Invocation<'_>>, Vec<&Invocation<'_>>) =
            vector.iter().partition(|invocation| invocation.op == CommitOp::Delete);

        let mut applied_deletes: Vec<&Invocation<'_>> = Vec::with_capacity(deletes.len());
        for invocation in deletes.iter().rev() {
            if let Err(err) = self.invoke(handle, ctx, invocation) {
                self.revert(handle, ctx, &applied_deletes);
                return Err(err);
            }
            applied_deletes.push(*invocation);
        }

        let mut applied_updates: Vec<&Invocation<'_>> = Vec::with_capacity(updates.len());
        for invocation in &updates {
            if let Err(err) = self.invoke(handle, ctx, invocation) {
                self.revert(handle, ctx, &applied_updates);
                self.revert(handle, ctx, &applied_deletes);
                return Err(err);
            }
            applied_updates.push(*invocation);
        }

        Ok(vector.len())
    }

    fn invoke(&self, handle: &Handle, ctx: &TransactionContext, invocation: &Invocation<'_>) -> Result<(), TransactionError> {
        let data = CommitData::for_invocation(ctx, invocation);
        self.invoke_commit_callback(handle, invocation.dependency, invocation.op, &data)
    }

    /// Undo applied invocations, last applied first, with the inverted
    /// operation and swapped sides
    fn revert(&self, handle: &Handle, ctx: &TransactionContext, applied: &[&Invocation<'_>]) {
        for invocation in applied.iter().rev() {
            let data = CommitData::for_invocation(ctx, invocation).reversed();
            let op = invocation.op.invert();
            if let Err(err) = self.invoke_commit_callback(handle, invocation.dependency, op, &data) {
                warn!("Error in rollback, trying to continue: {}", err);
            }
        }
    }
}
