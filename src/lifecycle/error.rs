//! Lifecycle-specific error types

use thiserror::Error;

/// Errors that can occur while starting the application
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A hook returned an error or panicked
    #[error("Hook execution failed for {service}: {message}")]
    HookFailed {
        /// Injection key of the instance whose hook failed
        service: String,
        /// Error message
        message: String,
    },

    /// `Injector::ready` was called a second time
    #[error("The injector is already ready, lifecycle hooks only run once")]
    AlreadyReady,
}

impl LifecycleError {
    /// Create a hook failure error
    pub fn hook_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HookFailed {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
