//! # cfghook-core
//!
//! Plugin loading and transaction-lifecycle dispatch for a configuration
//! backend. Plugins are discovered in directories, loaded once, and called in
//! a fixed order across init, start, reset, exit and the phases of each
//! configuration transaction. Plugins register dependency callbacks on
//! configuration keys, which the commit pipeline invokes for every change set.
pub mod config;
pub mod dependency;
pub mod kernel;
pub mod plugin_system;
pub mod transaction;
pub mod utils;

pub use config::BackendConfig;
pub use dependency::{Dependency, DependencyKind, Registrar};
pub use kernel::error::Error as KernelError;
pub use kernel::{Backend, Handle};
pub use plugin_system::{Dispatcher, HookError, HookKind, HookResult, Plugin, PluginManager};
pub use transaction::{ChangeSet, CommitData, CommitOp, KeyChange, TransactionContext};

#[cfg(test)]
mod tests;
