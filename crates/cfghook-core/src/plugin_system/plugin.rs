use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;

use crate::dependency::{DependencyError, Registrar};
use crate::kernel::constants;
use crate::kernel::handle::Handle;
use crate::transaction::TransactionContext;

/// The eight lifecycle hooks a plugin may implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Init,
    Start,
    Exit,
    Reset,
    Begin,
    Complete,
    End,
    Abort,
}

impl HookKind {
    pub const ALL: [HookKind; 8] = [
        HookKind::Init,
        HookKind::Start,
        HookKind::Exit,
        HookKind::Reset,
        HookKind::Begin,
        HookKind::Complete,
        HookKind::End,
        HookKind::Abort,
    ];

    /// Well-known symbol name of the hook in a plugin library
    pub fn symbol(&self) -> &'static str {
        match self {
            HookKind::Init => constants::PLUGIN_INIT,
            HookKind::Start => constants::PLUGIN_START,
            HookKind::Exit => constants::PLUGIN_EXIT,
            HookKind::Reset => constants::PLUGIN_RESET,
            HookKind::Begin => constants::PLUGIN_BEGIN,
            HookKind::Complete => constants::PLUGIN_COMPLETE,
            HookKind::End => constants::PLUGIN_END,
            HookKind::Abort => constants::PLUGIN_ABORT,
        }
    }

    /// Whether the hook belongs to a transaction phase
    pub fn is_transaction_phase(&self) -> bool {
        matches!(self, HookKind::Begin | HookKind::Complete | HookKind::End | HookKind::Abort)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Failure reported by a single hook or dependency callback
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A library hook returned a negative status
    #[error("returned status {0}")]
    Status(i32),
    #[error("{0}")]
    Message(String),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl HookError {
    pub fn msg(message: impl Into<String>) -> Self {
        HookError::Message(message.into())
    }

    /// Map a C-style status code: negative is failure
    pub fn from_status(status: i32) -> HookResult {
        if status < 0 { Err(HookError::Status(status)) } else { Ok(()) }
    }
}

impl From<DependencyError> for HookError {
    fn from(err: DependencyError) -> Self {
        HookError::Message(err.to_string())
    }
}

pub type HookResult = std::result::Result<(), HookError>;

pub type InitHook = Box<dyn Fn(&Handle, &mut Registrar<'_>) -> HookResult + Send + Sync>;
pub type StartHook = Box<dyn Fn(&Handle, &[String]) -> HookResult + Send + Sync>;
/// Shape shared by the exit and reset hooks
pub type HandleHook = Box<dyn Fn(&Handle) -> HookResult + Send + Sync>;
pub type TransactionHook = Box<dyn Fn(&Handle, &TransactionContext) -> HookResult + Send + Sync>;

/// Optional hook slots, resolved once when the plugin is built or loaded
#[derive(Default)]
pub struct PluginHooks {
    pub init: Option<InitHook>,
    pub start: Option<StartHook>,
    pub exit: Option<HandleHook>,
    pub reset: Option<HandleHook>,
    pub begin: Option<TransactionHook>,
    pub complete: Option<TransactionHook>,
    pub end: Option<TransactionHook>,
    pub abort: Option<TransactionHook>,
}

impl PluginHooks {
    pub fn has(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::Init => self.init.is_some(),
            HookKind::Start => self.start.is_some(),
            HookKind::Exit => self.exit.is_some(),
            HookKind::Reset => self.reset.is_some(),
            HookKind::Begin => self.begin.is_some(),
            HookKind::Complete => self.complete.is_some(),
            HookKind::End => self.end.is_some(),
            HookKind::Abort => self.abort.is_some(),
        }
    }

    /// Transaction-phase hook slot for `kind`, `None` for the other hooks
    pub(crate) fn phase(&self, kind: HookKind) -> Option<&TransactionHook> {
        match kind {
            HookKind::Begin => self.begin.as_ref(),
            HookKind::Complete => self.complete.as_ref(),
            HookKind::End => self.end.as_ref(),
            HookKind::Abort => self.abort.as_ref(),
            _ => None,
        }
    }
}

/// A registered plugin: a unique name and its optional hooks.
///
/// A plugin loaded from a shared library keeps the library open. Fields drop
/// in declaration order, so the hooks (which call into the library) are
/// released before the library is closed.
pub struct Plugin {
    name: String,
    hooks: PluginHooks,
    path: Option<PathBuf>,
    library: Option<Library>,
}

impl Plugin {
    /// Start building an in-process plugin
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            name: name.into(),
            hooks: PluginHooks::default(),
        }
    }

    pub(crate) fn from_library(name: String, path: &Path, hooks: PluginHooks, library: Library) -> Self {
        Self {
            name,
            hooks,
            path: Some(path.to_path_buf()),
            library: Some(library),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hooks(&self) -> &PluginHooks {
        &self.hooks
    }

    pub fn has_hook(&self, kind: HookKind) -> bool {
        self.hooks.has(kind)
    }

    /// Hooks this plugin implements, in lifecycle order
    pub fn implemented_hooks(&self) -> Vec<HookKind> {
        HookKind::ALL.into_iter().filter(|kind| self.has_hook(*kind)).collect()
    }

    /// Artifact the plugin was loaded from, `None` for in-process plugins
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("hooks", &self.implemented_hooks())
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for plugins compiled into the host
pub struct PluginBuilder {
    name: String,
    hooks: PluginHooks,
}

impl PluginBuilder {
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle, &mut Registrar<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.init = Some(Box::new(hook));
        self
    }

    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle, &[String]) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.start = Some(Box::new(hook));
        self
    }

    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.exit = Some(Box::new(hook));
        self
    }

    pub fn on_reset<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.reset = Some(Box::new(hook));
        self
    }

    pub fn on_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle, &TransactionContext) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.begin = Some(Box::new(hook));
        self
    }

    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle, &TransactionContext) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.complete = Some(Box::new(hook));
        self
    }

    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle, &TransactionContext) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.end = Some(Box::new(hook));
        self
    }

    pub fn on_abort<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Handle, &TransactionContext) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.abort = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Plugin {
        Plugin {
            name: self.name,
            hooks: self.hooks,
            path: None,
            library: None,
        }
    }
}
