use crate::action::{HandlerArgs, NextSignal, NextState, RequestContext, ResponseWriter};
use crate::common::ApiResponse;
use crate::exception::{Handlers, RequestSummary};
use crate::registry::{ActionFunction, ParamSource};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Largest request body buffered for a handler.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Tower service invoking one handler of one action.
#[derive(Clone)]
pub struct ActionEndpoint {
    instance: Arc<dyn Any + Send + Sync>,
    function: Arc<ActionFunction>,
    layout: Arc<Vec<Option<ParamSource>>>,
    handlers: Handlers,
    body_limit: usize,
}

impl ActionEndpoint {
    pub fn new(
        instance: Arc<dyn Any + Send + Sync>,
        function: ActionFunction,
        layout: Vec<Option<ParamSource>>,
        handlers: Handlers,
    ) -> Self {
        Self {
            instance,
            function: Arc::new(function),
            layout: Arc::new(layout),
            handlers,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    async fn dispatch(self, request: Request<Body>) -> Response {
        let summary = RequestSummary::of(&request);

        let context = match RequestContext::from_request(request, self.body_limit).await {
            Ok(context) => Arc::new(context),
            Err(error) => return self.handlers.catch(&summary, error),
        };

        let writer = ResponseWriter::new();
        let signal = NextSignal::new();
        let args = HandlerArgs::resolve(&self.layout, &context, &writer, &signal);

        if let Err(error) = self.function.invoke(Arc::clone(&self.instance), args).await {
            return self.handlers.catch(&summary, error);
        }

        if let Some(response) = writer.take() {
            return response;
        }

        match signal.take() {
            NextState::Failed(error) => self.handlers.catch(&summary, error),
            NextState::Proceed => self.handlers.not_found(context.to_request()).await,
            NextState::Idle => {
                tracing::warn!(
                    "Handler '{}' returned without a response for {} {}",
                    self.function.name,
                    summary.method,
                    summary.uri
                );
                ApiResponse::failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "No response was added for this route",
                )
                .into_response()
            }
        }
    }
}

impl Service<Request<Body>> for ActionEndpoint {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let endpoint = self.clone();
        Box::pin(async move { Ok(endpoint.dispatch(request).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use axum::body::to_bytes;
    use tower::ServiceExt;

    struct Users;

    async fn silent(_users: Arc<Users>, _args: HandlerArgs) -> HandlerResult {
        Ok(())
    }

    async fn echo(_users: Arc<Users>, args: HandlerArgs) -> HandlerResult {
        let body = args.body(1).cloned().unwrap_or_default();
        args.response(0)
            .ok_or_else(|| anyhow::anyhow!("missing response"))?
            .json(StatusCode::CREATED, body)
    }

    async fn skip(_users: Arc<Users>, args: HandlerArgs) -> HandlerResult {
        if let Some(next) = args.next(0) {
            next.proceed();
        }
        Ok(())
    }

    fn endpoint(function: ActionFunction, layout: Vec<Option<ParamSource>>) -> ActionEndpoint {
        ActionEndpoint::new(Arc::new(Users), function, layout, Handlers::default())
    }

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_silent_handler_gets_synthetic_500() {
        let response = endpoint(ActionFunction::get("silent", silent), vec![])
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_of(response).await["message"],
            "No response was added for this route"
        );
    }

    #[tokio::test]
    async fn test_written_response_is_returned() {
        let layout = vec![Some(ParamSource::Response), Some(ParamSource::Body)];
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"name":"alice"}"#))
            .unwrap();

        let response = endpoint(ActionFunction::post("echo", echo), layout)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_of(response).await["name"], "alice");
    }

    #[tokio::test]
    async fn test_handler_error_goes_to_error_handler() {
        let response = endpoint(ActionFunction::post("echo", echo), vec![])
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(response).await["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_proceed_falls_through_to_not_found() {
        let response = endpoint(ActionFunction::get("skip", skip), vec![Some(ParamSource::Next)])
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
