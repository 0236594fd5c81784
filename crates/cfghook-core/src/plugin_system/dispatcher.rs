use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use log::{debug, error, info, log_enabled, warn, Level};

use crate::dependency::{Dependency, DependencyError, DependencyTable, Registrar};
use crate::kernel::handle::Handle;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::plugin::{HookError, HookKind, HookResult, Plugin};
use crate::plugin_system::registry::PluginRegistry;
use crate::transaction::{CommitData, CommitOp, TransactionContext, TransactionError, TransactionState};
use crate::utils::panic_message;

/// Run one hook, turning a panic into a hook failure
pub(crate) fn call_hook<F>(plugin: &str, hook: impl std::fmt::Display, f: F) -> HookResult
where
    F: FnOnce() -> HookResult,
{
    debug!("Calling {}.{}()", plugin, hook);
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(HookError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Sequences lifecycle calls across every registered plugin.
///
/// The dispatcher owns the plugin registry and the dependency table. Fan-out
/// always follows registration order and skips plugins without the hook.
pub struct Dispatcher {
    // Dependency callbacks may live in plugin libraries, so they drop first.
    dependencies: DependencyTable,
    registry: PluginRegistry,
    /// Registered plugins whose init hook failed
    failed_init: HashSet<String>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            dependencies: DependencyTable::new(),
            registry: PluginRegistry::new(),
            failed_init: HashSet::new(),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn dependencies(&self) -> &DependencyTable {
        &self.dependencies
    }

    /// Register `plugin` and run its init hook with a registrar bound to it.
    ///
    /// A name collision or an init failure is fatal. Plugins initialized
    /// before are left as they are. A plugin whose init fails stays
    /// registered but is never sent `plugin_exit`.
    pub fn init_plugin(&mut self, handle: &Handle, plugin: Plugin) -> Result<(), PluginSystemError> {
        let name = plugin.name().to_string();
        if let Err(e) = self.registry.register_plugin(plugin) {
            error!("Failed to register plugin '{}': {}", name, e);
            return Err(e);
        }

        let Some(plugin) = self.registry.get_plugin(&name) else {
            return Ok(());
        };
        let Some(init) = plugin.hooks().init.as_ref() else {
            return Ok(());
        };
        let mut registrar = Registrar::new(plugin.name(), &mut self.dependencies);
        let outcome = call_hook(plugin.name(), HookKind::Init, || init(handle, &mut registrar));
        outcome.map_err(|source| {
            error!("Plugin '{}' failed to initialize: {}", name, source);
            self.failed_init.insert(name.clone());
            PluginSystemError::HookFailed {
                plugin: name.clone(),
                hook: HookKind::Init,
                source,
            }
        })
    }

    /// Register and initialize in-process plugins, in order. Returns the
    /// number of registered plugins.
    pub fn plugin_init<I>(&mut self, handle: &Handle, plugins: I) -> Result<usize, PluginSystemError>
    where
        I: IntoIterator<Item = Plugin>,
    {
        for plugin in plugins {
            self.init_plugin(handle, plugin)?;
        }
        Ok(self.registry.plugin_count())
    }

    /// Load each artifact and initialize it before loading the next.
    /// Returns the number of registered plugins.
    pub fn load_all(&mut self, handle: &Handle, loader: &PluginLoader, paths: &[impl AsRef<Path>]) -> Result<usize, PluginSystemError> {
        for path in paths {
            let plugin = loader.load(path.as_ref()).inspect_err(|e| error!("{}", e))?;
            self.init_plugin(handle, plugin)?;
        }
        info!("{} plugin(s) registered", self.registry.plugin_count());
        Ok(self.registry.plugin_count())
    }

    /// Call every start hook; the first failure stops the fan-out.
    pub fn plugin_start(&self, handle: &Handle, args: &[String]) -> Result<(), PluginSystemError> {
        for plugin in self.registry.with_hook(HookKind::Start) {
            let Some(start) = plugin.hooks().start.as_ref() else {
                continue;
            };
            call_hook(plugin.name(), HookKind::Start, || start(handle, args))
                .map_err(|source| self.startup_failure(plugin, HookKind::Start, source))?;
        }
        Ok(())
    }

    /// Call every reset hook; the first failure stops the fan-out.
    pub fn plugin_reset(&self, handle: &Handle) -> Result<(), PluginSystemError> {
        for plugin in self.registry.with_hook(HookKind::Reset) {
            let Some(reset) = plugin.hooks().reset.as_ref() else {
                continue;
            };
            call_hook(plugin.name(), HookKind::Reset, || reset(handle))
                .map_err(|source| self.startup_failure(plugin, HookKind::Reset, source))?;
        }
        Ok(())
    }

    /// Notify every plugin of shutdown. Failures are logged and every plugin
    /// is called, except those whose init failed. Returns the number of
    /// failed exit hooks.
    pub fn plugin_exit(&self, handle: &Handle) -> usize {
        let mut failures = 0;
        for plugin in self.registry.with_hook(HookKind::Exit) {
            let Some(exit) = plugin.hooks().exit.as_ref() else {
                continue;
            };
            if self.failed_init.contains(plugin.name()) {
                debug!("Skipping {}.{}(): never initialized", plugin.name(), HookKind::Exit);
                continue;
            }
            if let Err(e) = call_hook(plugin.name(), HookKind::Exit, || exit(handle)) {
                warn!("Plugin '{}' failed in {}: {}", plugin.name(), HookKind::Exit, e);
                failures += 1;
            }
        }
        failures
    }

    fn startup_failure(&self, plugin: &Plugin, hook: HookKind, source: HookError) -> PluginSystemError {
        error!("Plugin '{}' failed in {}: {}", plugin.name(), hook, source);
        PluginSystemError::HookFailed {
            plugin: plugin.name().to_string(),
            hook,
            source,
        }
    }

    /// Fan a phase out until the first failure
    fn run_phase(&self, handle: &Handle, ctx: &TransactionContext, phase: HookKind) -> Result<(), TransactionError> {
        for plugin in self.registry.with_hook(phase) {
            let Some(hook) = plugin.hooks().phase(phase) else {
                continue;
            };
            call_hook(plugin.name(), phase, || hook(handle, ctx)).map_err(|source| {
                warn!("Transaction {}: plugin '{}' vetoed {}: {}", ctx.id(), plugin.name(), phase, source);
                TransactionError::PhaseVeto {
                    phase,
                    plugin: plugin.name().to_string(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    pub fn transaction_begin(&self, handle: &Handle, ctx: &mut TransactionContext) -> Result<(), TransactionError> {
        ctx.expect_state(HookKind::Begin, &[TransactionState::Idle])?;
        ctx.set_state(TransactionState::Begun);
        self.run_phase(handle, ctx, HookKind::Begin)
            .inspect_err(|_| ctx.set_state(TransactionState::Vetoed))
    }

    pub fn transaction_complete(&self, handle: &Handle, ctx: &mut TransactionContext) -> Result<(), TransactionError> {
        ctx.expect_state(HookKind::Complete, &[TransactionState::Begun, TransactionState::Validated])?;
        self.run_phase(handle, ctx, HookKind::Complete)
            .inspect_err(|_| ctx.set_state(TransactionState::Vetoed))?;
        ctx.set_state(TransactionState::Completed);
        Ok(())
    }

    pub fn transaction_end(&self, handle: &Handle, ctx: &mut TransactionContext) -> Result<(), TransactionError> {
        ctx.expect_state(HookKind::End, &[TransactionState::Completed])?;
        self.run_phase(handle, ctx, HookKind::End)?;
        ctx.set_state(TransactionState::Ended);
        Ok(())
    }

    /// Call every abort hook. Hook failures are logged and ignored. Returns
    /// the number of failed abort hooks.
    pub fn transaction_abort(&self, handle: &Handle, ctx: &mut TransactionContext) -> Result<usize, TransactionError> {
        ctx.expect_state(
            HookKind::Abort,
            &[
                TransactionState::Begun,
                TransactionState::Validated,
                TransactionState::Completed,
                TransactionState::Vetoed,
            ],
        )?;
        let mut failures = 0;
        for plugin in self.registry.with_hook(HookKind::Abort) {
            let Some(abort) = plugin.hooks().abort.as_ref() else {
                continue;
            };
            if let Err(e) = call_hook(plugin.name(), HookKind::Abort, || abort(handle, ctx)) {
                warn!("Transaction {}: plugin '{}' failed in {}: {}", ctx.id(), plugin.name(), HookKind::Abort, e);
                failures += 1;
            }
        }
        ctx.set_state(TransactionState::Aborted);
        Ok(failures)
    }

    /// Registrar for a registered plugin. An unknown name is a lookup error
    /// and leaves the table unchanged.
    pub fn registrar_for(&mut self, name: &str) -> Result<Registrar<'_>, DependencyError> {
        match self.registry.get_plugin(name) {
            Some(plugin) => Ok(Registrar::new(plugin.name(), &mut self.dependencies)),
            None => Err(DependencyError::UnknownPlugin { name: name.to_string() }),
        }
    }

    /// Invoke one dependency callback with `op` over `data`
    pub fn invoke_commit_callback(
        &self,
        handle: &Handle,
        dependency: &Dependency,
        op: CommitOp,
        data: &CommitData<'_>,
    ) -> Result<(), TransactionError> {
        if log_enabled!(Level::Debug) {
            for change in &data.changes {
                if op != CommitOp::Add {
                    debug!("-{}", change.key);
                }
                if op != CommitOp::Delete {
                    debug!("+{}", change.key);
                }
            }
        }

        let label = format!("{}@{}", dependency.kind(), dependency.key());
        let callback = dependency.callback();
        call_hook(dependency.plugin(), label, || callback(handle, op, data)).map_err(|source| {
            TransactionError::Callback {
                plugin: dependency.plugin().to_string(),
                kind: dependency.kind(),
                key: dependency.key().to_string(),
                op,
                source,
            }
        })
    }

    /// Drop all dependencies, then all plugins
    pub fn teardown(&mut self) {
        let plugins = self.registry.plugin_count();
        self.dependencies.clear();
        self.registry.clear();
        self.failed_init.clear();
        debug!("Dispatcher torn down ({} plugin(s) released)", plugins);
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.dependencies.clear();
        self.registry.clear();
    }
}
