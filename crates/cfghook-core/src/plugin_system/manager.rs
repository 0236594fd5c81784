use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::dependency::{DependencyId, DependencyKind};
use crate::kernel::component::BackendComponent;
use crate::kernel::error::Result;
use crate::kernel::handle::Handle;
use crate::plugin_system::dispatcher::Dispatcher;
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::plugin::{HookKind, Plugin};
use crate::transaction::{TransactionContext, TransactionSummary};

/// Registration of one dependency, as shown to operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub id: DependencyId,
    pub kind: DependencyKind,
    pub priority: u16,
    pub key: String,
}

/// A registered plugin, as shown to operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub path: Option<PathBuf>,
    pub hooks: Vec<HookKind>,
    pub dependencies: Vec<DependencyInfo>,
}

/// Plugin manager component interface
#[async_trait]
pub trait PluginManager: BackendComponent {
    /// Load and initialize one plugin artifact
    async fn load_plugin(&self, path: &Path) -> Result<()>;

    /// Load and initialize every plugin of a directory; returns the number of
    /// registered plugins
    async fn load_plugins_from_directory(&self, dir: &Path) -> Result<usize>;

    /// Register and initialize a plugin built into the host
    async fn register_static_plugin(&self, plugin: Plugin) -> Result<()>;

    async fn plugin_names(&self) -> Vec<String>;

    async fn plugin_count(&self) -> usize;

    async fn plugin_info(&self) -> Vec<PluginInfo>;

    /// Run the reset hooks
    async fn reset(&self) -> Result<()>;

    async fn commit(&self, ctx: TransactionContext) -> Result<TransactionSummary>;

    async fn validate(&self, ctx: TransactionContext) -> Result<TransactionSummary>;
}

/// Default implementation of plugin manager.
///
/// Wraps the [`Dispatcher`] in an async mutex so only one lifecycle or
/// transaction call runs at a time.
#[derive(Clone)]
pub struct DefaultPluginManager {
    name: &'static str,
    handle: Arc<Handle>,
    loader: PluginLoader,
    dispatcher: Arc<Mutex<Dispatcher>>,
    start_args: Arc<Mutex<Vec<String>>>,
}

impl DefaultPluginManager {
    /// Manager loading from the directories configured in `handle`
    pub fn new(handle: Arc<Handle>) -> Self {
        let loader = PluginLoader::from_config(handle.config());
        Self {
            name: "DefaultPluginManager",
            handle,
            loader,
            dispatcher: Arc::new(Mutex::new(Dispatcher::new())),
            start_args: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> &Arc<Handle> {
        &self.handle
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// Get reference to the dispatcher Arc<Mutex>
    pub fn dispatcher(&self) -> &Arc<Mutex<Dispatcher>> {
        &self.dispatcher
    }

    /// Arguments handed to the start hooks when the component starts
    pub async fn set_start_args(&self, args: Vec<String>) {
        *self.start_args.lock().await = args;
    }
}

impl Debug for DefaultPluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultPluginManager")
            .field("name", &self.name)
            .field("plugin_dirs", &self.loader.plugin_dirs())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BackendComponent for DefaultPluginManager {
    fn name(&self) -> &'static str {
        self.name
    }

    /// Load every configured plugin directory, system directory first
    async fn initialize(&self) -> Result<()> {
        log::info!("Initializing Plugin Manager...");
        let mut total = 0;
        for dir in self.loader.plugin_dirs() {
            total = self.load_plugins_from_directory(dir).await?;
        }
        log::info!("Plugin Manager initialized with {} plugin(s)", total);
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        log::info!("Starting Plugin Manager - starting plugins...");
        let args = self.start_args.lock().await.clone();
        let dispatcher = self.dispatcher.lock().await;
        dispatcher.plugin_start(&self.handle, &args)?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        log::info!("Stopping Plugin Manager - shutting down plugins...");
        let mut dispatcher = self.dispatcher.lock().await;
        let failures = dispatcher.plugin_exit(&self.handle);
        if failures > 0 {
            log::warn!("{} plugin(s) failed to exit cleanly", failures);
        }
        dispatcher.teardown();
        Ok(())
    }
}

#[async_trait]
impl PluginManager for DefaultPluginManager {
    async fn load_plugin(&self, path: &Path) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        dispatcher.load_all(&self.handle, &self.loader, &[path])?;
        Ok(())
    }

    async fn load_plugins_from_directory(&self, dir: &Path) -> Result<usize> {
        let paths = self.loader.discover_dir(dir).await?;
        log::info!("Loading {} plugin(s) from {}", paths.len(), dir.display());
        let mut dispatcher = self.dispatcher.lock().await;
        Ok(dispatcher.load_all(&self.handle, &self.loader, &paths)?)
    }

    async fn register_static_plugin(&self, plugin: Plugin) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        dispatcher.init_plugin(&self.handle, plugin)?;
        Ok(())
    }

    async fn plugin_names(&self) -> Vec<String> {
        self.dispatcher.lock().await.registry().plugin_names()
    }

    async fn plugin_count(&self) -> usize {
        self.dispatcher.lock().await.registry().plugin_count()
    }

    async fn plugin_info(&self) -> Vec<PluginInfo> {
        let dispatcher = self.dispatcher.lock().await;
        dispatcher
            .registry()
            .iter()
            .map(|plugin| PluginInfo {
                name: plugin.name().to_string(),
                path: plugin.path().map(Path::to_path_buf),
                hooks: plugin.implemented_hooks(),
                dependencies: dispatcher
                    .dependencies()
                    .dependencies_of(plugin.name())
                    .into_iter()
                    .map(|dep| DependencyInfo {
                        id: dep.id(),
                        kind: dep.kind(),
                        priority: dep.priority(),
                        key: dep.key().to_string(),
                    })
                    .collect(),
            })
            .collect()
    }

    async fn reset(&self) -> Result<()> {
        let dispatcher = self.dispatcher.lock().await;
        dispatcher.plugin_reset(&self.handle)?;
        Ok(())
    }

    async fn commit(&self, ctx: TransactionContext) -> Result<TransactionSummary> {
        let dispatcher = self.dispatcher.lock().await;
        Ok(dispatcher.commit(&self.handle, ctx)?)
    }

    async fn validate(&self, ctx: TransactionContext) -> Result<TransactionSummary> {
        let dispatcher = self.dispatcher.lock().await;
        Ok(dispatcher.validate(&self.handle, ctx)?)
    }
}
