//! Lifecycle hook capabilities
//!
//! A class opts into a hook by implementing the trait and declaring it on its
//! `ClassDefinition` (`with_on_load`, `with_on_ready`). Only instances
//! injected as `InjectType::Class` take part.

use crate::error::HandlerError;
use async_trait::async_trait;

/// First startup phase.
///
/// Every `on_load` runs concurrently and all of them settle before any
/// `on_ready` starts. Use it to open connections or warm caches.
///
/// # Example
///
/// ```rust,ignore
/// use actionwire::lifecycle::OnLoad;
/// use async_trait::async_trait;
///
/// #[async_trait]
/// impl OnLoad for UserDomain {
///     async fn on_load(&self) -> Result<(), actionwire::HandlerError> {
///         self.pool.connect().await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait OnLoad: Send + Sync {
    async fn on_load(&self) -> Result<(), HandlerError>;
}

/// Second startup phase.
///
/// Launched once every `on_load` has settled. The calls are not awaited and
/// carry no ordering between instances; failures are only logged.
#[async_trait]
pub trait OnReady: Send + Sync {
    async fn on_ready(&self) -> Result<(), HandlerError>;
}
