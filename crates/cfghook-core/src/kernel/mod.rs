//! # cfghook Kernel
//!
//! The `kernel` module holds the backend object and what every other part of
//! the crate shares.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Backend Bootstrapping**: the [`Backend`](bootstrap::Backend) owns the
//!   handle and the plugin manager component and runs their lifecycle.
//! - **Component Lifecycle**: the [`BackendComponent`](component::BackendComponent)
//!   trait and the [`ComponentRegistry`](component::ComponentRegistry).
//! - **Handle**: the [`Handle`](handle::Handle) passed to every plugin call.
//! - **Core Constants**: names and hook symbols in `constants`.
//! - **Error Handling**: the kernel [`Error`](error::Error) and `Result` alias.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;
pub mod handle;

pub use bootstrap::Backend;
pub use component::{BackendComponent, ComponentRegistry};
pub use error::{Error, Result};
pub use handle::Handle;
