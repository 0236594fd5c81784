//! # cfghook Plugin System
//!
//! Discovery, loading and lifecycle dispatch of backend plugins.
//!
//! A plugin is a name plus up to eight optional hooks (see [`HookKind`]). It is
//! either loaded from a shared library exporting the well-known hook symbols
//! or built in-process with [`Plugin::builder`]. Both kinds go through the same
//! registration path and share one name space.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`plugin`]**: the [`Plugin`] descriptor, its hook slots and [`HookError`].
//! - **[`abi`]**: symbol signatures for plugin libraries and pointer helpers
//!   for plugin authors.
//! - **[`loader`]**: finds artifacts in the plugin directories and loads them.
//! - **[`registry`]**: the ordered, name-keyed [`PluginRegistry`].
//! - **[`dispatcher`]**: the [`Dispatcher`], sequencing init, start, reset, exit
//!   and the transaction phases across plugins.
//! - **[`manager`]**: the [`DefaultPluginManager`] backend component.
//! - **[`error`]**: [`PluginSystemError`](error::PluginSystemError).
pub mod abi;
pub mod dispatcher;
pub mod error;
pub mod loader;
pub mod manager;
pub mod plugin;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use error::PluginSystemError;
pub use loader::PluginLoader;
pub use manager::{DefaultPluginManager, DependencyInfo, PluginInfo, PluginManager};
pub use plugin::{HookError, HookKind, HookResult, Plugin, PluginBuilder, PluginHooks};
pub use registry::PluginRegistry;

// Test module declaration
#[cfg(test)]
mod tests;
