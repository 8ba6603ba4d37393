//! Lifecycle Manager
//!
//! Runs the two startup phases over the hooks collected from injected classes.

use super::{LifecycleError, OnLoad, OnReady, Result};
use std::sync::Arc;
use tokio::task::JoinSet;

/// A hook together with the injection key it belongs to
struct LifecycleHook<T: ?Sized> {
    service: Arc<T>,
    name: String,
}

impl<T: ?Sized> LifecycleHook<T> {
    fn new(service: Arc<T>, name: impl Into<String>) -> Self {
        Self {
            service,
            name: name.into(),
        }
    }
}

/// Manages the `on_load` / `on_ready` hooks of the injected classes
///
/// # Example
///
/// ```rust,ignore
/// let mut manager = LifecycleManager::new();
/// manager.register_on_load(domain.clone(), "Domain.User");
/// manager.register_on_ready(domain, "Domain.User");
///
/// manager.call_on_load().await?;
/// manager.launch_on_ready();
/// ```
#[derive(Default)]
pub struct LifecycleManager {
    on_load_hooks: Vec<LifecycleHook<dyn OnLoad>>,
    on_ready_hooks: Vec<LifecycleHook<dyn OnReady>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_on_load(&mut self, service: Arc<dyn OnLoad>, name: impl Into<String>) {
        self.on_load_hooks.push(LifecycleHook::new(service, name));
    }

    pub fn register_on_ready(&mut self, service: Arc<dyn OnReady>, name: impl Into<String>) {
        self.on_ready_hooks.push(LifecycleHook::new(service, name));
    }

    /// Execute every `on_load` hook concurrently.
    ///
    /// Returns only once all of them have settled. The first failure observed
    /// is reported after the rest have finished.
    pub async fn call_on_load(&self) -> Result<()> {
        tracing::info!("Calling OnLoad hooks...");

        let mut tasks = JoinSet::new();
        for hook in &self.on_load_hooks {
            let service = Arc::clone(&hook.service);
            let name = hook.name.clone();
            tracing::debug!("Loading: {}", name);
            tasks.spawn(async move {
                let result = service.on_load().await;
                (name, result)
            });
        }

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            let error = match joined {
                Ok((name, Ok(()))) => {
                    tracing::debug!("Loaded: {}", name);
                    continue;
                }
                Ok((name, Err(e))) => {
                    tracing::error!("OnLoad failed for {}: {}", name, e);
                    LifecycleError::hook_failed(name, e.to_string())
                }
                Err(e) => {
                    tracing::error!("OnLoad task aborted: {}", e);
                    LifecycleError::hook_failed("on_load", e.to_string())
                }
            };
            failure.get_or_insert(error);
        }

        if let Some(error) = failure {
            return Err(error);
        }

        tracing::info!(
            "OnLoad complete ({} hooks executed)",
            self.on_load_hooks.len()
        );
        Ok(())
    }

    /// Launch every `on_ready` hook as a detached task.
    pub fn launch_on_ready(&self) {
        tracing::info!("Launching OnReady hooks...");

        for hook in &self.on_ready_hooks {
            let service = Arc::clone(&hook.service);
            let name = hook.name.clone();
            tokio::spawn(async move {
                if let Err(e) = service.on_ready().await {
                    tracing::error!("OnReady failed for {}: {}", name, e);
                }
            });
        }

        tracing::info!(
            "OnReady launched ({} hooks)",
            self.on_ready_hooks.len()
        );
    }

    pub fn on_load_hook_count(&self) -> usize {
        self.on_load_hooks.len()
    }

    pub fn on_ready_hook_count(&self) -> usize {
        self.on_ready_hooks.len()
    }
}
