use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use crate::config::BackendConfig;

type SharedData = HashMap<String, Box<dyn Any + Send + Sync>>;

/// Backend state handed to every plugin hook and dependency callback.
///
/// The handle is created once by the host and outlives every plugin. Plugins
/// only ever see `&Handle`; the shared data map is the one place they may
/// publish values for other plugins or for later phases.
pub struct Handle {
    config: BackendConfig,
    data: RwLock<SharedData>,
}

impl Handle {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Directory holding application plugins
    pub fn backend_dir(&self) -> &Path {
        &self.config.backend_dir
    }

    /// Snapshot identity of the committed configuration
    pub fn running_db(&self) -> &str {
        &self.config.running_db
    }

    /// Snapshot identity of the configuration being committed
    pub fn candidate_db(&self) -> &str {
        &self.config.candidate_db
    }

    /// Set a shared data value, replacing any previous value under `key`
    pub fn set_data<T: Any + Send + Sync>(&self, key: &str, value: T) {
        let mut data = self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        data.insert(key.to_string(), Box::new(value));
    }

    /// Run `f` against the value stored under `key` if it has type `T`
    pub fn with_data<T: Any + Send + Sync, R>(&self, key: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        let data = self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        data.get(key).and_then(|value| value.downcast_ref::<T>()).map(f)
    }

    /// Clone out the value stored under `key`
    pub fn get_data<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.with_data(key, T::clone)
    }

    pub fn remove_data(&self, key: &str) -> bool {
        let mut data = self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        data.remove(key).is_some()
    }

    pub fn has_data(&self, key: &str) -> bool {
        let data = self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        data.contains_key(key)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("config", &self.config)
            .finish_non_exhaustive() // Shared data is type-erased
    }
}
