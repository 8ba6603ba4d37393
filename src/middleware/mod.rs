//! Middleware capability and chain.
//!
//! A middleware sees the request before the handler and the response after
//! it. It either answers itself or passes the request on through [`Next`].
//! Errors are not answered here: they travel back up the chain and end in
//! the configured `ErrorHandler`.

mod layer;
mod logging;
mod rate_limit;

pub use layer::{MiddlewareLayer, MiddlewareService};
pub use logging::{REQUEST_LOGGER, RequestLogger};
pub use rate_limit::RateLimiter;

use crate::di::Injector;
use crate::error::HandlerError;
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Standard return type for middlewares
pub type MiddlewareResult = Result<Response, HandlerError>;

type BoxFuture = Pin<Box<dyn Future<Output = MiddlewareResult> + Send>>;

/// Represents the rest of the chain
pub struct Next {
    run: Box<dyn FnOnce(Request<Body>) -> BoxFuture + Send>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the rest of the chain
    pub async fn run(self, request: Request<Body>) -> MiddlewareResult {
        (self.run)(request).await
    }
}

/// The Middleware capability
///
/// # Example
/// ```rust,ignore
/// struct RequireToken;
///
/// #[async_trait]
/// impl Middleware for RequireToken {
///     async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
///         if request.headers().contains_key("x-token") {
///             next.run(request).await
///         } else {
///             Ok(StatusCode::UNAUTHORIZED.into_response())
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult;
}

/// A middleware backed by an async closure, see [`from_fn`].
#[derive(Clone)]
pub struct FnMiddleware<F> {
    f: F,
}

/// Build a middleware from an async closure.
///
/// ```rust,ignore
/// let tag = middleware::from_fn(|request, next: Next| async move {
///     let mut response = next.run(request).await?;
///     response.headers_mut().insert("x-served-by", HeaderValue::from_static("actionwire"));
///     Ok(response)
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request<Body>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MiddlewareResult> + Send + 'static,
{
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        (self.f)(request, next).await
    }
}

/// A middleware as declared on an action, a handler, a static rule or the
/// configuration.
#[derive(Clone)]
pub enum MiddlewareRef {
    /// Resolved through the injector when the routes are materialized.
    Named(String),
    /// Used as is.
    Function {
        name: String,
        middleware: Arc<dyn Middleware>,
    },
}

impl MiddlewareRef {
    pub fn named(key: impl Into<String>) -> Self {
        MiddlewareRef::Named(key.into())
    }

    pub fn function(name: impl Into<String>, middleware: impl Middleware) -> Self {
        MiddlewareRef::Function {
            name: name.into(),
            middleware: Arc::new(middleware),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MiddlewareRef::Named(name) => name,
            MiddlewareRef::Function { name, .. } => name,
        }
    }

    /// `None` when a named middleware is not injected or lacks the capability.
    pub fn resolve(&self, injector: &Injector) -> Option<Arc<dyn Middleware>> {
        match self {
            MiddlewareRef::Named(key) => injector.get_middleware(key),
            MiddlewareRef::Function { middleware, .. } => Some(Arc::clone(middleware)),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(key: &str) -> Self {
        MiddlewareRef::Named(key.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(key: String) -> Self {
        MiddlewareRef::Named(key)
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareRef::Named(key) => f.debug_tuple("Named").field(key).finish(),
            MiddlewareRef::Function { name, .. } => {
                f.debug_struct("Function").field("name", name).finish_non_exhaustive()
            }
        }
    }
}

/// Resolve `refs` in order, logging the ones that cannot be resolved.
pub(crate) fn resolve_all(
    refs: &[MiddlewareRef],
    injector: &Injector,
) -> Vec<Arc<dyn Middleware>> {
    refs.iter()
        .filter_map(|middleware| {
            let resolved = middleware.resolve(injector);
            if resolved.is_none() {
                tracing::warn!(
                    "Middleware '{}' is not injected or does not expose the middleware capability, skipping",
                    middleware.name()
                );
            }
            resolved
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClassDefinition, MetadataRegistry};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    struct Deny;

    #[async_trait]
    impl Middleware for Deny {
        async fn handle(&self, _request: Request<Body>, _next: Next) -> MiddlewareResult {
            Ok(StatusCode::FORBIDDEN.into_response())
        }
    }

    #[tokio::test]
    async fn test_named_middleware_resolves_through_injector() {
        let registry = MetadataRegistry::new();
        registry
            .register_class(ClassDefinition::new("Deny", |_| Deny).with_middleware())
            .unwrap();
        let injector = Injector::new(registry);
        injector.inject_middleware("Deny", "Deny").unwrap();
        injector.inject_variable("port", 3000u16).unwrap();

        let resolved = resolve_all(&["Deny".into(), "port".into(), "missing".into()], &injector);
        assert_eq!(resolved.len(), 1);

        let next = Next::new(|_| Box::pin(async { Ok(StatusCode::OK.into_response()) }));
        let response = resolved[0].handle(Request::new(Body::empty()), next).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_injected_value_middleware() {
        let injector = Injector::new(MetadataRegistry::new());
        let value: Arc<dyn Middleware> = Arc::new(Deny);
        injector.inject_function("Deny", value).unwrap();

        assert!(MiddlewareRef::named("Deny").resolve(&injector).is_some());
    }

    #[tokio::test]
    async fn test_from_fn_passes_through() {
        let middleware = from_fn(|request, next: Next| async move { next.run(request).await });
        let next = Next::new(|_| Box::pin(async { Ok(StatusCode::ACCEPTED.into_response()) }));

        let response = middleware.handle(Request::new(Body::empty()), next).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
