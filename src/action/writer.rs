use crate::error::HandlerError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The response slot a handler answers through.
///
/// Only one response can be sent per request.
#[derive(Clone, Default)]
pub struct ResponseWriter {
    slot: Arc<Mutex<Option<Response>>>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, response: impl IntoResponse) -> Result<(), HandlerError> {
        let mut slot = lock(&self.slot);
        if slot.is_some() {
            anyhow::bail!("A response was already sent for this request");
        }
        *slot = Some(response.into_response());
        Ok(())
    }

    pub fn json<T: Serialize>(&self, status: StatusCode, body: T) -> Result<(), HandlerError> {
        self.send((status, Json(body)))
    }

    pub fn status(&self, status: StatusCode) -> Result<(), HandlerError> {
        self.send(status)
    }

    pub fn is_sent(&self) -> bool {
        lock(&self.slot).is_some()
    }

    pub(crate) fn take(&self) -> Option<Response> {
        lock(&self.slot).take()
    }
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("sent", &self.is_sent())
            .finish()
    }
}

/// What a handler asked the chain to do after it returned.
#[derive(Debug, Default)]
pub enum NextState {
    #[default]
    Idle,
    /// Continue as if this route had not matched.
    Proceed,
    /// Hand the error to the error handler.
    Failed(HandlerError),
}

/// The `next` argument of a handler.
#[derive(Clone, Default)]
pub struct NextSignal {
    state: Arc<Mutex<NextState>>,
}

impl NextSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proceed(&self) {
        *lock(&self.state) = NextState::Proceed;
    }

    pub fn fail(&self, error: impl Into<HandlerError>) {
        *lock(&self.state) = NextState::Failed(error.into());
    }

    pub(crate) fn take(&self) -> NextState {
        std::mem::take(&mut *lock(&self.state))
    }
}

impl fmt::Debug for NextSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*lock(&self.state) {
            NextState::Idle => "idle",
            NextState::Proceed => "proceed",
            NextState::Failed(_) => "failed",
        };
        f.debug_struct("NextSignal").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_send_is_rejected() {
        let writer = ResponseWriter::new();
        writer.json(StatusCode::OK, serde_json::json!({ "success": true })).unwrap();

        assert!(writer.is_sent());
        assert!(writer.status(StatusCode::CREATED).is_err());
        assert_eq!(writer.take().unwrap().status(), StatusCode::OK);
    }

    #[test]
    fn test_clones_share_state() {
        let signal = NextSignal::new();
        signal.clone().fail(anyhow::anyhow!("denied"));
        assert!(matches!(signal.take(), NextState::Failed(_)));
        assert!(matches!(signal.take(), NextState::Idle));
    }
}
