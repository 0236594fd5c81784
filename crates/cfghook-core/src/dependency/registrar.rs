use std::sync::Arc;

use crate::dependency::error::DependencyError;
use crate::dependency::table::DependencyTable;
use crate::dependency::{DependencyArg, DependencyId, DependencyKind};
use crate::kernel::handle::Handle;
use crate::plugin_system::plugin::HookResult;
use crate::transaction::{CommitData, CommitOp};

/// Registration capability bound to one plugin.
///
/// A plugin receives its registrar when its init hook runs. Every dependency
/// registered through it is owned by that plugin.
pub struct Registrar<'a> {
    plugin: &'a str,
    table: &'a mut DependencyTable,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(plugin: &'a str, table: &'a mut DependencyTable) -> Self {
        Self { plugin, table }
    }

    /// Name of the plugin registrations are attributed to
    pub fn plugin(&self) -> &str {
        self.plugin
    }

    pub fn register<F>(
        &mut self,
        kind: DependencyKind,
        priority: u16,
        callback: F,
        arg: Option<DependencyArg>,
        key: &str,
    ) -> Result<DependencyId, DependencyError>
    where
        F: Fn(&Handle, CommitOp, &CommitData<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.table.insert(self.plugin, kind, priority, Arc::new(callback), arg, key)
    }

    /// Invoke `callback` in the commit step when `key` itself changes
    pub fn register_key<F>(&mut self, priority: u16, callback: F, arg: Option<DependencyArg>, key: &str) -> Result<DependencyId, DependencyError>
    where
        F: Fn(&Handle, CommitOp, &CommitData<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.register(DependencyKind::Key, priority, callback, arg, key)
    }

    /// Invoke `callback` in the commit step when anything at or below `key` changes
    pub fn register_tree<F>(&mut self, priority: u16, callback: F, arg: Option<DependencyArg>, key: &str) -> Result<DependencyId, DependencyError>
    where
        F: Fn(&Handle, CommitOp, &CommitData<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.register(DependencyKind::Tree, priority, callback, arg, key)
    }

    pub fn register_validate_key<F>(&mut self, priority: u16, callback: F, arg: Option<DependencyArg>, key: &str) -> Result<DependencyId, DependencyError>
    where
        F: Fn(&Handle, CommitOp, &CommitData<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.register(DependencyKind::ValidateKey, priority, callback, arg, key)
    }

    pub fn register_validate_tree<F>(&mut self, priority: u16, callback: F, arg: Option<DependencyArg>, key: &str) -> Result<DependencyId, DependencyError>
    where
        F: Fn(&Handle, CommitOp, &CommitData<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.register(DependencyKind::ValidateTree, priority, callback, arg, key)
    }
}

impl std::fmt::Debug for Registrar<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar").field("plugin", &self.plugin).finish_non_exhaustive()
    }
}
