//! # cfghook Kernel Errors
//!
//! Defines the top-level error type of the backend kernel.
//!
//! [`Error`] wraps the typed errors of each subsystem (plugin system,
//! dependency table, transactions, configuration) and adds lifecycle errors
//! raised by the [`Backend`](crate::kernel::bootstrap::Backend) itself.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::dependency::error::DependencyError;
use crate::plugin_system::error::PluginSystemError;
use crate::transaction::error::TransactionError;

/// Error type for the cfghook backend
#[derive(Debug, ThisError)]
pub enum Error {
    /// Plugin loading, registration or startup hook failure
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Dependency registration failure
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// A commit or validate cycle failed
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        message: String,
        #[source]
        source: Option<Box<Error>>, // Can wrap another kernel error or a subsystem error
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Bootstrap")]
    Bootstrap,
    #[error("Initialize")]
    Initialize,
    #[error("Start")]
    Start,
    #[error("Reset")]
    Reset,
    #[error("RunPreCheck")]
    RunPreCheck,
    #[error("Shutdown")]
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl Error {
    /// Wrap an error as a failure of `phase` in the named component.
    pub fn lifecycle(phase: KernelLifecyclePhase, component_name: &str, source: Error) -> Self {
        Error::KernelLifecycleError {
            phase,
            component_name: Some(component_name.to_string()),
            message: format!("Component '{}' failed: {}", component_name, source),
            source: Some(Box::new(source)),
        }
    }
}
