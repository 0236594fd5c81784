//! Errors raised while registering dependencies.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// No registered plugin has this name; nothing was registered
    #[error("No registered plugin named '{name}'")]
    UnknownPlugin { name: String },

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },
}
