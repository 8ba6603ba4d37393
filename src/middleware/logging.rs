use crate::middleware::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use axum::{body::Body, http::Request};
use std::time::Instant;

/// Records method, path, status and latency of each request.
///
/// Enabled with [`ConfigurationBuilder::log_requests`], which puts it outside
/// every other global middleware.
///
/// [`ConfigurationBuilder::log_requests`]: crate::config::ConfigurationBuilder::log_requests
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

pub const REQUEST_LOGGER: &str = "request-logger";

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let started = Instant::now();

        let outcome = next.run(request).await;
        let latency = started.elapsed();

        match &outcome {
            Ok(response) if response.status().is_server_error() => tracing::warn!(
                %method, %path, status = response.status().as_u16(), ?latency, "request answered"
            ),
            Ok(response) => tracing::info!(
                %method, %path, status = response.status().as_u16(), ?latency, "request answered"
            ),
            Err(error) => tracing::warn!(
                %method, %path, ?latency, "request failed: {:#}", error
            ),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_outcome_passes_through_untouched() {
        let ok = Next::new(|_| Box::pin(async { Ok(StatusCode::ACCEPTED.into_response()) }));
        let response = RequestLogger
            .handle(Request::new(Body::empty()), ok)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let failing = Next::new(|_| Box::pin(async { MiddlewareResult::Err(anyhow::anyhow!("upstream gone")) }));
        let error = RequestLogger
            .handle(Request::new(Body::empty()), failing)
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "upstream gone");
    }
}
