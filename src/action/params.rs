use crate::action::{NextSignal, ResponseWriter};
use crate::error::HandlerError;
use crate::registry::{ParamBinding, ParamSource};
use axum::body::{Body, Bytes};
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::{Extensions, HeaderMap, Method, Request, Uri, Version};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The incoming request as handed to action handlers.
///
/// The body is buffered so the context can be shared between arguments.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub extensions: Extensions,
    pub body: Bytes,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RequestContext {
    pub async fn from_request(request: Request<Body>, body_limit: usize) -> Result<Self, HandlerError> {
        let (mut parts, body) = request.into_parts();

        let params: HashMap<String, String> = RawPathParams::from_request_parts(&mut parts, &())
            .await
            .map(|raw| {
                raw.iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        let body = axum::body::to_bytes(body, body_limit).await?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
            params,
            query,
        })
    }

    /// The body as JSON. An empty body is `null`, anything unparsable a string.
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Rebuild a request, used when a handler falls through.
    pub(crate) fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        *request.extensions_mut() = self.extensions.clone();
        request
    }
}

/// One positional handler argument.
#[derive(Debug, Clone)]
pub enum Param {
    Request(Arc<RequestContext>),
    Response(ResponseWriter),
    Next(NextSignal),
    Body(Value),
    Query(HashMap<String, String>),
    Params(HashMap<String, String>),
    /// No marker for this position.
    Unbound,
}

impl Param {
    pub fn source(&self) -> Option<ParamSource> {
        match self {
            Param::Request(_) => Some(ParamSource::Request),
            Param::Response(_) => Some(ParamSource::Response),
            Param::Next(_) => Some(ParamSource::Next),
            Param::Body(_) => Some(ParamSource::Body),
            Param::Query(_) => Some(ParamSource::Query),
            Param::Params(_) => Some(ParamSource::Params),
            Param::Unbound => None,
        }
    }
}

/// Arguments of one handler call, in parameter index order.
#[derive(Debug, Clone, Default)]
pub struct HandlerArgs {
    params: Vec<Param>,
}

impl HandlerArgs {
    pub fn new(params: Vec<Param>) -> Self {
        Self { params }
    }

    /// Positional layout of `handler`'s parameters.
    ///
    /// Bindings are applied in ascending index order; a later binding for the
    /// same index replaces an earlier one. Gaps stay unbound.
    pub fn layout(bindings: &[ParamBinding], handler: &str) -> Vec<Option<ParamSource>> {
        let mut own: Vec<&ParamBinding> = bindings
            .iter()
            .filter(|binding| binding.handler == handler)
            .collect();
        own.sort_by_key(|binding| binding.index);

        let mut layout = Vec::new();
        for binding in own {
            if layout.len() <= binding.index {
                layout.resize(binding.index + 1, None);
            }
            layout[binding.index] = Some(binding.source);
        }
        layout
    }

    pub(crate) fn resolve(
        layout: &[Option<ParamSource>],
        context: &Arc<RequestContext>,
        writer: &ResponseWriter,
        signal: &NextSignal,
    ) -> Self {
        let params = layout
            .iter()
            .map(|source| match source {
                Some(ParamSource::Request) => Param::Request(Arc::clone(context)),
                Some(ParamSource::Response) => Param::Response(writer.clone()),
                Some(ParamSource::Next) => Param::Next(signal.clone()),
                Some(ParamSource::Body) => Param::Body(context.json()),
                Some(ParamSource::Query) => Param::Query(context.query.clone()),
                Some(ParamSource::Params) => Param::Params(context.params.clone()),
                None => Param::Unbound,
            })
            .collect();
        Self { params }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Param> {
        self.params.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn into_params(self) -> Vec<Param> {
        self.params
    }

    pub fn request(&self, index: usize) -> Option<&Arc<RequestContext>> {
        match self.get(index)? {
            Param::Request(context) => Some(context),
            _ => None,
        }
    }

    pub fn response(&self, index: usize) -> Option<&ResponseWriter> {
        match self.get(index)? {
            Param::Response(writer) => Some(writer),
            _ => None,
        }
    }

    pub fn next(&self, index: usize) -> Option<&NextSignal> {
        match self.get(index)? {
            Param::Next(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn body(&self, index: usize) -> Option<&Value> {
        match self.get(index)? {
            Param::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn query(&self, index: usize) -> Option<&HashMap<String, String>> {
        match self.get(index)? {
            Param::Query(query) => Some(query),
            _ => None,
        }
    }

    pub fn params(&self, index: usize) -> Option<&HashMap<String, String>> {
        match self.get(index)? {
            Param::Params(params) => Some(params),
            _ => None,
        }
    }
}
