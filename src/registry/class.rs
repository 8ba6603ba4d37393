use crate::di::Injector;
use crate::lifecycle::{OnLoad, OnReady};
use crate::middleware::Middleware;
use crate::registry::Identity;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// The marker a registered component carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MarkerKind {
    Class,
    Action,
}

type Constructor = Arc<dyn Fn(&Injector) -> ClassInstance + Send + Sync>;

/// A constructed class together with the capabilities it declared.
#[derive(Clone)]
pub struct ClassInstance {
    value: Arc<dyn Any + Send + Sync>,
    on_load: Option<Arc<dyn OnLoad>>,
    on_ready: Option<Arc<dyn OnReady>>,
    middleware: Option<Arc<dyn Middleware>>,
}

impl ClassInstance {
    pub fn value(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.value
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    pub fn on_load(&self) -> Option<&Arc<dyn OnLoad>> {
        self.on_load.as_ref()
    }

    pub fn on_ready(&self) -> Option<&Arc<dyn OnReady>> {
        self.on_ready.as_ref()
    }

    pub fn middleware(&self) -> Option<&Arc<dyn Middleware>> {
        self.middleware.as_ref()
    }
}

impl fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInstance")
            .field("on_load", &self.on_load.is_some())
            .field("on_ready", &self.on_ready.is_some())
            .field("middleware", &self.middleware.is_some())
            .finish_non_exhaustive()
    }
}

/// Type-erased constructor stored in the `injections` family.
#[derive(Clone)]
pub struct ClassMarker {
    identity: Identity,
    construct: Constructor,
}

impl ClassMarker {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn kind(&self) -> MarkerKind {
        MarkerKind::Class
    }

    pub(crate) fn instantiate(&self, injector: &Injector) -> ClassInstance {
        (self.construct)(injector)
    }
}

impl fmt::Debug for ClassMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMarker")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

fn as_on_load<T: OnLoad + 'static>(instance: Arc<T>) -> Arc<dyn OnLoad> {
    instance
}

fn as_on_ready<T: OnReady + 'static>(instance: Arc<T>) -> Arc<dyn OnReady> {
    instance
}

fn as_middleware<T: Middleware + 'static>(instance: Arc<T>) -> Arc<dyn Middleware> {
    instance
}

/// Typed description of an injectable class.
///
/// The constructor runs at most once per injection key. Capabilities are
/// opted into explicitly, which is what lets the injector run lifecycle hooks
/// and resolve named middlewares without inspecting the instance.
///
/// # Example
///
/// ```rust,ignore
/// let definition = ClassDefinition::new("UserDomain", |injector| UserDomain::new(injector))
///     .with_on_load()
///     .with_on_ready();
/// registry.register_class(definition)?;
/// ```
pub struct ClassDefinition<T> {
    identity: Identity,
    constructor: Arc<dyn Fn(&Injector) -> T + Send + Sync>,
    on_load: Option<fn(Arc<T>) -> Arc<dyn OnLoad>>,
    on_ready: Option<fn(Arc<T>) -> Arc<dyn OnReady>>,
    middleware: Option<fn(Arc<T>) -> Arc<dyn Middleware>>,
}

impl<T: Send + Sync + 'static> ClassDefinition<T> {
    pub fn new<F>(identity: impl Into<Identity>, constructor: F) -> Self
    where
        F: Fn(&Injector) -> T + Send + Sync + 'static,
    {
        Self {
            identity: identity.into(),
            constructor: Arc::new(constructor),
            on_load: None,
            on_ready: None,
            middleware: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Run `OnLoad::on_load` during the first startup phase.
    pub fn with_on_load(mut self) -> Self
    where
        T: OnLoad,
    {
        self.on_load = Some(as_on_load::<T> as fn(Arc<T>) -> Arc<dyn OnLoad>);
        self
    }

    /// Run `OnReady::on_ready` once every `on_load` has settled.
    pub fn with_on_ready(mut self) -> Self
    where
        T: OnReady,
    {
        self.on_ready = Some(as_on_ready::<T> as fn(Arc<T>) -> Arc<dyn OnReady>);
        self
    }

    /// Expose the instance as a named middleware.
    pub fn with_middleware(mut self) -> Self
    where
        T: Middleware,
    {
        self.middleware = Some(as_middleware::<T> as fn(Arc<T>) -> Arc<dyn Middleware>);
        self
    }

    pub(crate) fn into_marker(self) -> ClassMarker {
        let ClassDefinition {
            identity,
            constructor,
            on_load,
            on_ready,
            middleware,
        } = self;

        let construct: Constructor = Arc::new(move |injector: &Injector| {
            let instance = Arc::new(constructor(injector));
            let on_load = on_load.map(|cast| cast(Arc::clone(&instance)));
            let on_ready = on_ready.map(|cast| cast(Arc::clone(&instance)));
            let middleware = middleware.map(|cast| cast(Arc::clone(&instance)));
            ClassInstance {
                value: instance,
                on_load,
                on_ready,
                middleware,
            }
        });

        ClassMarker {
            identity,
            construct,
        }
    }
}
