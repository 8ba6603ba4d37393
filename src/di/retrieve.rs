use crate::di::Injector;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A lazily resolved handle to an injected instance.
///
/// Components receive the `Injector` while they are constructed, before the
/// instances they depend on necessarily exist. A `Retrieve<T>` captured at that
/// point resolves on first access and caches the instance once it is found.
/// Misses are not cached.
///
/// # Example
///
/// ```rust,ignore
/// struct UsersAction {
///     users: Retrieve<UserDomain>,
/// }
///
/// impl UsersAction {
///     fn new(injector: &Injector) -> Self {
///         Self { users: Retrieve::new(injector, "Domain.User") }
///     }
/// }
/// ```
pub struct Retrieve<T: 'static + Send + Sync> {
    injector: Injector,
    key: String,
    instance: OnceLock<Arc<T>>,
}

impl<T: 'static + Send + Sync> Retrieve<T> {
    pub fn new(injector: &Injector, key: impl Into<String>) -> Self {
        Self {
            injector: injector.clone(),
            key: key.into(),
            instance: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The instance, or `None` while nothing of type `T` is injected under the key.
    pub fn get(&self) -> Option<Arc<T>> {
        if let Some(instance) = self.instance.get() {
            return Some(Arc::clone(instance));
        }

        let resolved = self.injector.get::<T>(&self.key)?;
        Some(Arc::clone(self.instance.get_or_init(|| resolved)))
    }
}

impl<T: 'static + Send + Sync> Clone for Retrieve<T> {
    fn clone(&self) -> Self {
        let instance = OnceLock::new();
        if let Some(resolved) = self.instance.get() {
            let _ = instance.set(Arc::clone(resolved));
        }
        Self {
            injector: self.injector.clone(),
            key: self.key.clone(),
            instance,
        }
    }
}

impl<T: 'static + Send + Sync> fmt::Debug for Retrieve<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrieve")
            .field("key", &self.key)
            .field("resolved", &self.instance.get().is_some())
            .finish()
    }
}
