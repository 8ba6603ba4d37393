//! Lifecycle Hooks Module
//!
//! Two-phase startup for injected classes, run by `Injector::ready`.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Registration (classes, actions, handlers, params)
//!    ↓
//! 2. Route materialization (instances injected)
//!    ↓
//! 3. OnLoad (all Class instances, concurrently)   ← Lifecycle Hook
//!    ↓  every on_load settled
//! 4. OnReady (all Class instances, detached)      ← Lifecycle Hook
//!    ↓
//! 5. Registry cleared and frozen
//!    ↓
//! 6. Server Start ... shutdown_signal()
//! ```

mod error;
mod manager;
mod shutdown;
mod traits;

pub use error::{LifecycleError, Result};
pub use manager::LifecycleManager;
pub use shutdown::shutdown_signal;
pub use traits::{OnLoad, OnReady};
