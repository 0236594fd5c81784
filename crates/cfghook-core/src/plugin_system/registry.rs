use std::collections::HashMap;

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::plugin::{HookKind, Plugin};

/// Ordered, name-keyed collection of registered plugins.
///
/// Iteration follows insertion order, which is the order every lifecycle
/// fan-out uses.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. A name already present is rejected and the registry
    /// is left unchanged.
    pub fn register_plugin(&mut self, plugin: Plugin) -> Result<(), PluginSystemError> {
        if self.index.contains_key(plugin.name()) {
            return Err(PluginSystemError::DuplicatePlugin {
                name: plugin.name().to_string(),
            });
        }
        self.index.insert(plugin.name().to_string(), self.plugins.len());
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get_plugin(&self, name: &str) -> Option<&Plugin> {
        self.index.get(name).map(|&pos| &self.plugins[pos])
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Plugins in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    /// Plugins implementing `kind`, in registration order
    pub fn with_hook(&self, kind: HookKind) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter().filter(move |plugin| plugin.has_hook(kind))
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|plugin| plugin.name().to_string()).collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Drop every plugin, unloading dynamic libraries in reverse load order
    pub fn clear(&mut self) {
        self.index.clear();
        while let Some(plugin) = self.plugins.pop() {
            drop(plugin);
        }
    }
}
