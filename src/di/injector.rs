use crate::error::InjectionError;
use crate::lifecycle::{LifecycleError, LifecycleManager};
use crate::middleware::Middleware;
use crate::registry::{ClassInstance, Identity, MarkerKind, MetadataRegistry};
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strum_macros::{Display, EnumString};

/// Type-erased shared value.
pub type AnyInstance = Arc<dyn Any + Send + Sync>;

/// Producer invoked once by `InjectType::FunctionResult`.
pub type Factory = Arc<dyn Fn() -> AnyInstance + Send + Sync>;

/// How an injected value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum InjectType {
    Class,
    Function,
    FunctionResult,
    Variable,
    Middleware,
}

/// What is handed to `Injector::inject`.
#[derive(Clone)]
pub enum InjectValue {
    /// A registered class, constructed by the injector.
    Class(Identity),
    /// A ready value, stored as is.
    Value(AnyInstance),
    /// A producer whose result is stored.
    Factory(Factory),
}

impl InjectValue {
    pub fn class(identity: impl Into<Identity>) -> Self {
        InjectValue::Class(identity.into())
    }

    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        InjectValue::Value(Arc::new(value))
    }

    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        InjectValue::Factory(Arc::new(move || Arc::new(factory()) as AnyInstance))
    }
}

#[derive(Clone)]
enum Stored {
    Class(ClassInstance),
    Value(AnyInstance),
}

#[derive(Clone)]
struct InstanceRecord {
    stored: Stored,
    kind: InjectType,
}

impl InstanceRecord {
    fn instance(&self) -> &AnyInstance {
        match &self.stored {
            Stored::Class(instance) => instance.value(),
            Stored::Value(value) => value,
        }
    }
}

struct InjectorInner {
    registry: MetadataRegistry,
    instances: DashMap<String, InstanceRecord>,
    ready: AtomicBool,
}

/// Singleton instance resolver.
///
/// Cloning is cheap and every clone shares the same instance map.
///
/// # Example
///
/// ```rust,ignore
/// let injector = Injector::new(registry.clone());
/// injector.inject_class("Domain.User", "UserDomain")?;
/// injector.inject_variable("Configuration", config)?;
///
/// let domain = injector.get::<UserDomain>("Domain.User");
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

impl Injector {
    pub fn new(registry: MetadataRegistry) -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                registry,
                instances: DashMap::new(),
                ready: AtomicBool::new(false),
            }),
        }
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.inner.registry
    }

    /// Store a value under `key`.
    ///
    /// `Class` and `Middleware` construct the registered class once; a second
    /// injection under the same key keeps the first instance. `Variable` and
    /// `Function` store the value, `FunctionResult` stores what the factory
    /// returns; these three always overwrite.
    pub fn inject(
        &self,
        key: impl Into<String>,
        value: InjectValue,
        kind: InjectType,
    ) -> Result<(), InjectionError> {
        let key = key.into();

        match (kind, value) {
            (InjectType::Class | InjectType::Middleware, InjectValue::Class(identity)) => {
                self.inject_instance(key, identity, kind)
            }
            (InjectType::Variable | InjectType::Function, InjectValue::Value(value)) => {
                self.store(key, Stored::Value(value), kind);
                Ok(())
            }
            (InjectType::FunctionResult, InjectValue::Factory(factory)) => {
                let value = factory();
                self.store(key, Stored::Value(value), kind);
                Ok(())
            }
            (kind, _) => Err(InjectionError::Unsupported {
                key,
                kind: kind.to_string(),
            }),
        }
    }

    pub fn inject_class(
        &self,
        key: impl Into<String>,
        identity: impl Into<Identity>,
    ) -> Result<(), InjectionError> {
        self.inject(key, InjectValue::Class(identity.into()), InjectType::Class)
    }

    pub fn inject_middleware(
        &self,
        key: impl Into<String>,
        identity: impl Into<Identity>,
    ) -> Result<(), InjectionError> {
        self.inject(key, InjectValue::Class(identity.into()), InjectType::Middleware)
    }

    pub fn inject_variable<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), InjectionError> {
        self.inject(key, InjectValue::value(value), InjectType::Variable)
    }

    pub fn inject_function<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        function: T,
    ) -> Result<(), InjectionError> {
        self.inject(key, InjectValue::value(function), InjectType::Function)
    }

    pub fn inject_function_result<T, F>(
        &self,
        key: impl Into<String>,
        factory: F,
    ) -> Result<(), InjectionError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.inject(key, InjectValue::factory(factory), InjectType::FunctionResult)
    }

    fn inject_instance(
        &self,
        key: String,
        identity: Identity,
        kind: InjectType,
    ) -> Result<(), InjectionError> {
        if identity.is_empty() {
            return Err(InjectionError::MissingValue { key });
        }

        if self.inner.instances.contains_key(&key) {
            tracing::debug!("'{}' is already injected, keeping the existing instance", key);
            return Ok(());
        }

        let registry = self.registry();
        let marker = match registry.marker_kind(&identity) {
            Some(MarkerKind::Class) => registry.class(&identity),
            Some(other) => {
                return Err(InjectionError::MarkerMismatch {
                    identity: identity.to_string(),
                    marker: other.to_string(),
                });
            }
            None => None,
        };
        let Some(marker) = marker else {
            return Err(InjectionError::Unsupported {
                key,
                kind: kind.to_string(),
            });
        };

        // Constructors may call back into the injector, no map guard is held here.
        let instance = marker.instantiate(self);
        self.inner.instances.entry(key).or_insert(InstanceRecord {
            stored: Stored::Class(instance),
            kind,
        });
        Ok(())
    }

    fn store(&self, key: String, stored: Stored, kind: InjectType) {
        tracing::debug!("Injecting '{}' as {}", key, kind);
        self.inner
            .instances
            .insert(key, InstanceRecord { stored, kind });
    }

    /// The instance stored under `key`, if it is a `T`.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.inner.instances.get(key)?.instance().clone();
        value.downcast::<T>().ok()
    }

    /// Resolve a named middleware.
    ///
    /// Classes answer through the middleware capability they declared. Values
    /// must hold an `Arc<dyn Middleware>`.
    pub fn get_middleware(&self, key: &str) -> Option<Arc<dyn Middleware>> {
        let record = self.inner.instances.get(key)?.clone();
        match record.stored {
            Stored::Class(instance) => instance.middleware().cloned(),
            Stored::Value(value) => value
                .downcast::<Arc<dyn Middleware>>()
                .ok()
                .map(|middleware| Arc::clone(&*middleware)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.instances.contains_key(key)
    }

    pub fn instance_type(&self, key: &str) -> Option<InjectType> {
        self.inner.instances.get(key).map(|record| record.kind)
    }

    pub fn len(&self) -> usize {
        self.inner.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.instances.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Run the startup hooks and freeze the registry.
    ///
    /// Every `on_load` of the injected classes settles before any `on_ready`
    /// is launched. A failing `on_load` stops here and leaves the registry
    /// untouched.
    pub async fn ready(&self) -> Result<(), LifecycleError> {
        if self.inner.ready.swap(true, Ordering::SeqCst) {
            return Err(LifecycleError::AlreadyReady);
        }

        let mut manager = LifecycleManager::new();
        let classes: Vec<(String, ClassInstance)> = self
            .inner
            .instances
            .iter()
            .filter(|entry| entry.kind == InjectType::Class)
            .filter_map(|entry| match &entry.stored {
                Stored::Class(instance) => Some((entry.key().clone(), instance.clone())),
                Stored::Value(_) => None,
            })
            .collect();

        for (key, instance) in classes {
            if let Some(hook) = instance.on_load() {
                manager.register_on_load(Arc::clone(hook), key.clone());
            }
            if let Some(hook) = instance.on_ready() {
                manager.register_on_ready(Arc::clone(hook), key);
            }
        }

        manager.call_on_load().await?;
        manager.launch_on_ready();

        self.registry().clear();
        tracing::info!("Injector ready, {} instances", self.len());
        Ok(())
    }
}
