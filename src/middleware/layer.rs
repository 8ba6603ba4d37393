use crate::exception::{ErrorHandler, RequestSummary};
use crate::middleware::{Middleware, MiddlewareResult, Next};
use axum::{body::Body, http::Request, response::Response};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Tower layer running a chain of middlewares in front of a service.
///
/// The first middleware wraps all the others. An error from any of them, or
/// from the inner service, is answered by the error handler.
#[derive(Clone)]
pub struct MiddlewareLayer {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl MiddlewareLayer {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, error_handler: Arc<dyn ErrorHandler>) -> Self {
        Self {
            middlewares: Arc::new(middlewares),
            error_handler,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl<S> Layer<S> for MiddlewareLayer {
    type Service = MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            inner,
            middlewares: Arc::clone(&self.middlewares),
            error_handler: Arc::clone(&self.error_handler),
        }
    }
}

#[derive(Clone)]
pub struct MiddlewareService<S> {
    inner: S,
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl<S> Service<Request<Body>> for MiddlewareService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The inner service is driven through `oneshot` on a clone.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let middlewares = Arc::clone(&self.middlewares);
        let error_handler = Arc::clone(&self.error_handler);
        let inner = self.inner.clone();

        Box::pin(async move {
            let summary = RequestSummary::of(&request);

            let mut chain = Next::new(move |request| {
                Box::pin(async move {
                    let response = inner.oneshot(request).await.unwrap_or_else(|never| match never {});
                    MiddlewareResult::Ok(response)
                })
            });

            for index in (0..middlewares.len()).rev() {
                let middlewares = Arc::clone(&middlewares);
                let next = chain;
                chain = Next::new(move |request| {
                    Box::pin(async move { middlewares[index].handle(request, next).await })
                });
            }

            match chain.run(request).await {
                Ok(response) => Ok(response),
                Err(error) => Ok(error_handler.catch(&summary, error)),
            }
        })
    }
}
