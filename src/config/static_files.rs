use crate::middleware::MiddlewareRef;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::BoxCloneSyncService;

/// Service answering requests below a static mount point.
pub type StaticService = BoxCloneSyncService<Request<Body>, Response, Infallible>;

/// Builds the static service for a resolved directory.
pub type StaticHandlerFactory = Arc<dyn Fn(PathBuf) -> StaticService + Send + Sync>;

pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// Options passed to the default file server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticOptions {
    pub append_index_html_on_directories: bool,
    pub buf_chunk_size: Option<usize>,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            append_index_html_on_directories: true,
            buf_chunk_size: None,
        }
    }
}

/// Token bucket settings for a static rule.
///
/// Clients are keyed by peer address. `trust_forwarded_for` switches to the
/// first `x-forwarded-for` entry and only belongs behind a proxy that
/// overwrites that header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitOptions {
    pub requests_per_second: f64,
    pub burst: u32,
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl RateLimitOptions {
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            requests_per_second,
            burst,
            trust_forwarded_for: false,
        }
    }

    pub fn trust_forwarded_for(mut self) -> Self {
        self.trust_forwarded_for = true;
        self
    }
}

/// A static file rule.
///
/// `directory` segments are joined below the application root. Unless
/// `disable_index_router` is set, any GET below `path` that matches no file
/// is answered with the index file.
#[derive(Clone, Serialize, Deserialize)]
pub struct StaticFiles {
    pub path: String,
    #[serde(default)]
    pub directory: Vec<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub options: StaticOptions,
    #[serde(default)]
    pub rate_limit: Option<RateLimitOptions>,
    #[serde(default)]
    pub disable_index_router: bool,
    #[serde(default)]
    pub index_file_name: Option<String>,
    #[serde(skip)]
    pub middlewares: Vec<MiddlewareRef>,
    #[serde(skip)]
    pub custom_static_handler: Option<StaticHandlerFactory>,
}

impl StaticFiles {
    pub fn new<I, S>(path: impl Into<String>, directory: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            directory: directory.into_iter().map(Into::into).collect(),
            subdomain: None,
            options: StaticOptions::default(),
            rate_limit: None,
            disable_index_router: false,
            index_file_name: None,
            middlewares: Vec::new(),
            custom_static_handler: None,
        }
    }

    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    pub fn options(mut self, options: StaticOptions) -> Self {
        self.options = options;
        self
    }

    pub fn rate_limit(mut self, options: RateLimitOptions) -> Self {
        self.rate_limit = Some(options);
        self
    }

    pub fn disable_index_router(mut self) -> Self {
        self.disable_index_router = true;
        self
    }

    pub fn index_file_name(mut self, name: impl Into<String>) -> Self {
        self.index_file_name = Some(name.into());
        self
    }

    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    pub fn custom_static_handler<F>(mut self, factory: F) -> Self
    where
        F: Fn(PathBuf) -> StaticService + Send + Sync + 'static,
    {
        self.custom_static_handler = Some(Arc::new(factory));
        self
    }

    pub fn index_file(&self) -> &str {
        self.index_file_name.as_deref().unwrap_or(DEFAULT_INDEX_FILE)
    }

    /// The subdomain gate, ignoring surrounding whitespace.
    pub fn subdomain_gate(&self) -> &str {
        self.subdomain.as_deref().map(str::trim).unwrap_or_default()
    }
}

impl fmt::Debug for StaticFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFiles")
            .field("path", &self.path)
            .field("directory", &self.directory)
            .field("subdomain", &self.subdomain)
            .field("options", &self.options)
            .field("rate_limit", &self.rate_limit)
            .field("disable_index_router", &self.disable_index_router)
            .field("index_file_name", &self.index_file_name)
            .field("middlewares", &self.middlewares)
            .field("custom_static_handler", &self.custom_static_handler.is_some())
            .finish()
    }
}
