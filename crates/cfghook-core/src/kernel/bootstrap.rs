use std::any::TypeId;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::BackendConfig;
use crate::kernel::component::{BackendComponent, ComponentRegistry};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::kernel::handle::Handle;
use crate::plugin_system::{DefaultPluginManager, Plugin, PluginManager};
use crate::transaction::{ChangeSet, TransactionSummary};

/// The plugin backend: owns the handle and the components, and drives their
/// lifecycle.
pub struct Backend {
    initialized: bool,
    started: bool,
    handle: Arc<Handle>,
    components: Arc<Mutex<ComponentRegistry>>,
    component_init_order: Vec<TypeId>,
    plugin_manager: Arc<DefaultPluginManager>,
}

impl Backend {
    pub fn new(config: BackendConfig) -> Self {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        let handle = Arc::new(Handle::new(config));
        log::info!("Using plugin directory: {}", handle.backend_dir().display());

        let mut registry = ComponentRegistry::new();
        let mut init_order = Vec::new();

        let plugin_manager = Arc::new(DefaultPluginManager::new(handle.clone()));
        registry.register_instance(plugin_manager.clone());
        init_order.push(TypeId::of::<DefaultPluginManager>());

        Backend {
            initialized: false,
            started: false,
            handle,
            components: Arc::new(Mutex::new(registry)),
            component_init_order: init_order,
            plugin_manager,
        }
    }

    pub fn handle(&self) -> &Arc<Handle> {
        &self.handle
    }

    pub fn plugin_manager(&self) -> &Arc<DefaultPluginManager> {
        &self.plugin_manager
    }

    pub async fn get_component<T: BackendComponent + 'static>(&self) -> Option<Arc<T>> {
        self.components.lock().await.get_concrete::<T>()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Register an in-process plugin. Must happen before `initialize` for the
    /// plugin to precede the directory plugins.
    pub async fn register_plugin(&self, plugin: Plugin) -> Result<()> {
        self.plugin_manager.register_static_plugin(plugin).await
    }

    /// Initialize every component, loading and initializing all plugins, then
    /// run the reset hooks when `reset_on_start` is configured.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::RunPreCheck,
                component_name: None,
                message: "Backend already initialized".to_string(),
                source: None,
            });
        }

        log::info!("Initializing components...");
        for component in self.ordered_components(KernelLifecyclePhase::Initialize).await? {
            log::info!("Initializing component: {}", component.name());
            component
                .initialize()
                .await
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Initialize, component.name(), e))?;
        }
        self.initialized = true;

        if self.handle.config().reset_on_start {
            self.reset().await?;
        }
        log::info!("Component initialization complete.");
        Ok(())
    }

    /// Run the reset hooks of every plugin
    pub async fn reset(&self) -> Result<()> {
        log::info!("Resetting plugins...");
        self.plugin_manager
            .reset()
            .await
            .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Reset, self.plugin_manager.name(), e))
    }

    /// Start every component; plugins receive `args` in their start hook.
    pub async fn start(&mut self, args: &[String]) -> Result<()> {
        if !self.initialized || self.started {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Start,
                component_name: None,
                message: "Backend must be initialized and not yet started".to_string(),
                source: None,
            });
        }

        self.plugin_manager.set_start_args(args.to_vec()).await;
        log::info!("Starting components...");
        for component in self.ordered_components(KernelLifecyclePhase::Start).await? {
            log::info!("Starting component: {}", component.name());
            component
                .start()
                .await
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Start, component.name(), e))?;
        }
        self.started = true;
        log::info!("Component start complete.");
        Ok(())
    }

    /// Initialize then start
    pub async fn run(&mut self, args: &[String]) -> Result<()> {
        self.initialize().await?;
        self.start(args).await
    }

    /// Run one commit cycle over `changes`
    pub async fn commit(&self, changes: ChangeSet) -> Result<TransactionSummary> {
        self.ensure_initialized()?;
        let ctx = changes.into_context(&self.handle);
        self.plugin_manager.commit(ctx).await
    }

    /// Run one validate cycle over `changes`
    pub async fn validate(&self, changes: ChangeSet) -> Result<TransactionSummary> {
        self.ensure_initialized()?;
        let ctx = changes.into_context(&self.handle);
        self.plugin_manager.validate(ctx).await
    }

    /// Stop components in reverse order. Every component is stopped; the first
    /// failure is returned.
    pub async fn shutdown(&mut self) -> Result<()> {
        log::info!("Shutting down components...");
        let mut first_error = None;
        for component in self.ordered_components(KernelLifecyclePhase::Shutdown).await?.into_iter().rev() {
            log::info!("Stopping component: {}", component.name());
            if let Err(e) = component.stop().await {
                log::error!("Error stopping component {}: {}", component.name(), e);
                first_error.get_or_insert(Error::lifecycle(KernelLifecyclePhase::Shutdown, component.name(), e));
            }
        }
        self.initialized = false;
        self.started = false;
        log::info!("Component shutdown complete.");
        first_error.map_or(Ok(()), Err)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::RunPreCheck,
                component_name: None,
                message: "Backend is not initialized".to_string(),
                source: None,
            })
        }
    }

    async fn ordered_components(&self, phase: KernelLifecyclePhase) -> Result<Vec<Arc<dyn BackendComponent>>> {
        let registry = self.components.lock().await;
        self.component_init_order
            .iter()
            .map(|type_id| {
                registry.get_component_by_id(type_id).ok_or_else(|| {
                    log::error!("Component instance not found for TypeId {:?} during {}", type_id, phase);
                    Error::KernelLifecycleError {
                        phase,
                        component_name: None,
                        message: "Instance missing from registry".to_string(),
                        source: None,
                    }
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("initialized", &self.initialized)
            .field("started", &self.started)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
