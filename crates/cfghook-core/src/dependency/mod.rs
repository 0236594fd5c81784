//! # cfghook Dependency Table
//!
//! A *dependency* is a callback a plugin installs against a configuration key
//! or subtree. Dependencies are registered through a [`Registrar`] handed to a
//! plugin during its init hook, so every registration is attributed to the
//! plugin that made it.
//!
//! - **[`table`]**: storage, indexing by key and computation of the commit
//!   vector for a change set.
//! - **[`registrar`]**: the registration capability scoped to one plugin.
//! - **[`key`]**: key path validation and subtree matching.
//! - **[`error`]**: [`DependencyError`].
pub mod error;
pub mod key;
pub mod registrar;
pub mod table;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::kernel::handle::Handle;
use crate::plugin_system::plugin::HookResult;
use crate::transaction::{CommitData, CommitOp};

pub use error::DependencyError;
pub use registrar::Registrar;
pub use table::{DependencyTable, Invocation};

/// Sequential registration id; breaks priority ties
pub type DependencyId = u64;

/// Callback invoked when a change set touches a dependency's key
pub type CommitCallback = Arc<dyn Fn(&Handle, CommitOp, &CommitData<'_>) -> HookResult + Send + Sync>;

/// Opaque argument handed back to the callback on every invocation
pub type DependencyArg = Arc<dyn Any + Send + Sync>;

/// The four registration flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Exact key, invoked during the commit step
    Key,
    /// Key and everything below it, invoked during the commit step
    Tree,
    /// Exact key, invoked during validation
    ValidateKey,
    /// Key and everything below it, invoked during validation
    ValidateTree,
}

impl DependencyKind {
    pub fn is_tree(&self) -> bool {
        matches!(self, DependencyKind::Tree | DependencyKind::ValidateTree)
    }

    pub fn is_validate(&self) -> bool {
        matches!(self, DependencyKind::ValidateKey | DependencyKind::ValidateTree)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DependencyKind::Key => "key",
            DependencyKind::Tree => "tree",
            DependencyKind::ValidateKey => "validate-key",
            DependencyKind::ValidateTree => "validate-tree",
        };
        f.write_str(name)
    }
}

/// A registered callback, owned by the plugin that registered it
pub struct Dependency {
    id: DependencyId,
    plugin: String,
    priority: u16,
    kind: DependencyKind,
    callback: CommitCallback,
    arg: Option<DependencyArg>,
    key: String,
}

impl Dependency {
    pub fn id(&self) -> DependencyId {
        self.id
    }

    /// Name of the owning plugin
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Lower priorities are invoked first
    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn arg(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.arg.as_deref()
    }

    pub fn callback(&self) -> &CommitCallback {
        &self.callback
    }

    /// Whether a change to `key` triggers this dependency
    pub fn matches(&self, key: &str) -> bool {
        if self.kind.is_tree() { key::covers(&self.key, key) } else { self.key == key }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.id)
            .field("plugin", &self.plugin)
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("has_arg", &self.arg.is_some())
            .finish()
    }
}
