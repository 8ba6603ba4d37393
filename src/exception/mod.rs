//! Request-time error and fall-through handling.
//!
//! Every failure inside a request chain (handler error, middleware error or
//! panic) ends up in the configured [`ErrorHandler`]. Requests no route
//! answered end up in the [`NotFoundHandler`].

use crate::common::ApiResponse;
use crate::error::HandlerError;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::sync::Arc;

/// What an error handler knows about the failed request.
#[derive(Debug, Clone, Default)]
pub struct RequestSummary {
    pub method: Method,
    pub uri: Uri,
}

impl RequestSummary {
    pub fn of<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
        }
    }
}

/// Turns a request-time failure into a response.
pub trait ErrorHandler: Send + Sync + 'static {
    fn catch(&self, request: &RequestSummary, error: HandlerError) -> Response;
}

impl<F> ErrorHandler for F
where
    F: Fn(&RequestSummary, HandlerError) -> Response + Send + Sync + 'static,
{
    fn catch(&self, request: &RequestSummary, error: HandlerError) -> Response {
        self(request, error)
    }
}

/// Logs the error and answers 500 without leaking it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn catch(&self, request: &RequestSummary, error: HandlerError) -> Response {
        tracing::error!(
            method = %request.method,
            uri = %request.uri,
            "Request failed: {:#}",
            error
        );
        ApiResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            .into_response()
    }
}

/// Answers requests that matched no route.
#[async_trait]
pub trait NotFoundHandler: Send + Sync + 'static {
    async fn not_found(&self, request: Request<Body>) -> Response;
}

#[async_trait]
impl<F, Fut> NotFoundHandler for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn not_found(&self, request: Request<Body>) -> Response {
        self(request).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNotFoundHandler;

#[async_trait]
impl NotFoundHandler for DefaultNotFoundHandler {
    async fn not_found(&self, request: Request<Body>) -> Response {
        tracing::debug!("No route for {} {}", request.method(), request.uri());
        ApiResponse::failure(StatusCode::NOT_FOUND, "Route not found").into_response()
    }
}

/// The pair of handlers shared by every materialized route.
#[derive(Clone)]
pub struct Handlers {
    pub error: Arc<dyn ErrorHandler>,
    pub not_found: Arc<dyn NotFoundHandler>,
}

impl Handlers {
    pub fn new(error: Arc<dyn ErrorHandler>, not_found: Arc<dyn NotFoundHandler>) -> Self {
        Self { error, not_found }
    }

    pub fn catch(&self, request: &RequestSummary, error: HandlerError) -> Response {
        self.error.catch(request, error)
    }

    pub async fn not_found(&self, request: Request<Body>) -> Response {
        self.not_found.not_found(request).await
    }
}

impl Default for Handlers {
    fn default() -> Self {
        Self::new(Arc::new(DefaultErrorHandler), Arc::new(DefaultNotFoundHandler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_default_error_handler_hides_details() {
        let handlers = Handlers::default();
        let response = handlers.catch(
            &RequestSummary::default(),
            anyhow::anyhow!("password table missing"),
        );

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal Server Error");
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_closure_handlers() {
        let error = |_: &RequestSummary, _: HandlerError| StatusCode::BAD_GATEWAY.into_response();
        let not_found = |_: Request<Body>| async { StatusCode::GONE.into_response() };
        let handlers = Handlers::new(Arc::new(error), Arc::new(not_found));

        let response = handlers.catch(&RequestSummary::default(), anyhow::anyhow!("boom"));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = handlers.not_found(Request::new(Body::empty())).await;
        assert_eq!(response.status(), StatusCode::GONE);
    }
}
