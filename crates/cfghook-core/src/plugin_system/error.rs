//! # cfghook Plugin System Errors
//!
//! [`PluginSystemError`] covers everything that can go wrong while discovering,
//! loading and registering plugins, and the fatal startup hooks (init, start,
//! reset). All of these halt startup.
use std::path::PathBuf;

use crate::plugin_system::plugin::{HookError, HookKind};

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin loading failed for '{plugin}' ({path}): {source}")]
    LoadError {
        plugin: String,
        path: PathBuf,
        #[source]
        source: PluginSystemErrorSource,
    },

    #[error("Plugin '{name}' is already registered")]
    DuplicatePlugin { name: String },

    #[error("Plugin directory '{path}' cannot be read: {source}")]
    PluginDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    HookFailed {
        plugin: String,
        hook: HookKind,
        #[source]
        source: HookError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemErrorSource {
    #[error(transparent)]
    Library(#[from] libloading::Error),
    #[error("panic while loading: {0}")]
    Panicked(String),
}

impl PluginSystemError {
    /// Name of the plugin the error is about
    pub fn plugin(&self) -> Option<&str> {
        match self {
            PluginSystemError::LoadError { plugin, .. } | PluginSystemError::HookFailed { plugin, .. } => Some(plugin),
            PluginSystemError::DuplicatePlugin { name } => Some(name),
            PluginSystemError::PluginDirectory { .. } => None,
        }
    }
}
