use crate::action::HandlerArgs;
use crate::error::HandlerError;
use crate::middleware::MiddlewareRef;
use crate::registry::Identity;
use axum::http::Method;
use axum::routing::MethodFilter;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// HTTP verbs an action handler can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn filter(self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }

    pub fn as_method(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Where a handler argument is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum ParamSource {
    #[strum(serialize = "request")]
    Request,
    #[strum(serialize = "response")]
    Response,
    #[strum(serialize = "next")]
    Next,
    #[strum(serialize = "request.body")]
    Body,
    #[strum(serialize = "request.query")]
    Query,
    #[strum(serialize = "request.params")]
    Params,
}

/// One parameter marker: argument `index` of handler `handler` comes from `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub index: usize,
    pub handler: String,
    pub source: ParamSource,
}

impl ParamBinding {
    pub fn new(index: usize, handler: impl Into<String>, source: ParamSource) -> Self {
        Self {
            index,
            handler: handler.into(),
            source,
        }
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

type ErasedHandler =
    Arc<dyn Fn(Arc<dyn Any + Send + Sync>, HandlerArgs) -> HandlerFuture + Send + Sync>;

/// A routed method of an action.
///
/// The handler receives the action instance and its arguments in index order.
/// It answers through the bound `ResponseWriter`.
#[derive(Clone)]
pub struct ActionFunction {
    pub name: String,
    pub method: HttpMethod,
    pub child: Option<String>,
    pub middlewares: Vec<MiddlewareRef>,
    handler: ErasedHandler,
}

impl ActionFunction {
    pub fn new<T, F, Fut>(method: HttpMethod, name: impl Into<String>, handler: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let name = name.into();
        let handler_name = name.clone();
        let handler: ErasedHandler = Arc::new(
            move |instance: Arc<dyn Any + Send + Sync>, args: HandlerArgs| -> HandlerFuture {
                match instance.downcast::<T>() {
                    Ok(instance) => Box::pin(handler(instance, args)),
                    Err(_) => {
                        let name = handler_name.clone();
                        Box::pin(async move {
                            Err(anyhow::anyhow!(
                                "Handler '{name}' is bound to an action of another type"
                            ))
                        })
                    }
                }
            },
        );

        Self {
            name,
            method,
            child: None,
            middlewares: Vec::new(),
            handler,
        }
    }

    pub fn get<T, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::new(HttpMethod::Get, name, handler)
    }

    pub fn post<T, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::new(HttpMethod::Post, name, handler)
    }

    pub fn put<T, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::new(HttpMethod::Put, name, handler)
    }

    pub fn patch<T, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::new(HttpMethod::Patch, name, handler)
    }

    pub fn delete<T, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, HandlerArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::new(HttpMethod::Delete, name, handler)
    }

    /// Path below the action's mount point (`/` when unset).
    pub fn child(mut self, path: impl Into<String>) -> Self {
        self.child = Some(path.into());
        self
    }

    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    pub(crate) fn invoke(
        &self,
        instance: Arc<dyn Any + Send + Sync>,
        args: HandlerArgs,
    ) -> HandlerFuture {
        (self.handler)(instance, args)
    }
}

impl fmt::Debug for ActionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionFunction")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("child", &self.child)
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

/// Class-level action marker: mount path, the single instance and the
/// middlewares applied to every handler of the action.
pub struct ActionDefinition {
    pub(crate) identity: Identity,
    pub(crate) path: String,
    pub(crate) instance: Arc<dyn Any + Send + Sync>,
    pub(crate) middlewares: Vec<MiddlewareRef>,
}

impl ActionDefinition {
    pub fn new<T: Send + Sync + 'static>(
        identity: impl Into<Identity>,
        path: impl Into<String>,
        instance: T,
    ) -> Self {
        Self {
            identity: identity.into(),
            path: path.into(),
            instance: Arc::new(instance),
            middlewares: Vec::new(),
        }
    }

    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Everything recorded for one action, possibly still partial.
///
/// Handler markers may be recorded before the class-level marker, in which
/// case `instance` and `path` stay empty until the action itself registers.
#[derive(Clone, Default)]
pub struct ActionDescriptor {
    pub instance: Option<Arc<dyn Any + Send + Sync>>,
    pub path: Option<String>,
    pub functions: Vec<ActionFunction>,
    pub middlewares: Vec<MiddlewareRef>,
}

impl ActionDescriptor {
    pub fn has_target(&self) -> bool {
        self.instance.is_some()
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("has_target", &self.has_target())
            .field("path", &self.path)
            .field("functions", &self.functions)
            .field("middlewares", &self.middlewares)
            .finish()
    }
}
