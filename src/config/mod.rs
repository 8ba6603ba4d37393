//! Application configuration.
//!
//! A [`Configuration`] is built once before the routes are materialized and
//! never changes afterwards. Its serializable part can come from a TOML file
//! through [`ConfigFile`].

mod loader;
mod static_files;

pub use loader::{API_PREFIX_ENV, ConfigFile};
pub use static_files::{
    DEFAULT_INDEX_FILE, RateLimitOptions, StaticFiles, StaticHandlerFactory, StaticOptions,
    StaticService,
};

use crate::action::DEFAULT_BODY_LIMIT;
use crate::error::{ConfigError, HandlerError};
use crate::exception::{
    DefaultErrorHandler, DefaultNotFoundHandler, ErrorHandler, Handlers, NotFoundHandler,
    RequestSummary,
};
use crate::middleware::{MiddlewareRef, REQUEST_LOGGER, RequestLogger};
use crate::router::path;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type DebugFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional sinks for discovery messages and recovered errors.
///
/// Without a hook, messages go to `tracing` at debug and error level.
#[derive(Clone, Default)]
pub struct DebugHooks {
    log: Option<DebugFn>,
    error: Option<DebugFn>,
}

impl DebugHooks {
    pub fn log(&self, message: &str) {
        match &self.log {
            Some(hook) => hook(message),
            None => tracing::debug!("{}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match &self.error {
            Some(hook) => hook(message),
            None => tracing::error!("{}", message),
        }
    }
}

impl fmt::Debug for DebugHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugHooks")
            .field("log", &self.log.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Read-only settings shared by the materializer and the dispatchers.
#[derive(Clone)]
pub struct Configuration {
    root_file: PathBuf,
    api_prefix: String,
    debug: DebugHooks,
    static_files: Vec<StaticFiles>,
    middlewares: Vec<MiddlewareRef>,
    handlers: Handlers,
    body_limit: usize,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    pub fn root_file(&self) -> &Path {
        &self.root_file
    }

    /// Directory the conventional folders are looked up in.
    pub fn root(&self) -> &Path {
        match self.root_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Extension a discovered file must have to be considered a module.
    pub fn extension(&self) -> Option<&str> {
        self.root_file.extension().and_then(|extension| extension.to_str())
    }

    /// The api prefix, normalized (`/` for an empty prefix).
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn absolute_path<I, S>(&self, segments: I) -> PathBuf
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        segments
            .into_iter()
            .fold(self.root().to_path_buf(), |path, segment| path.join(segment))
    }

    pub fn debug(&self) -> &DebugHooks {
        &self.debug
    }

    pub fn static_files(&self) -> &[StaticFiles] {
        &self.static_files
    }

    /// Middlewares wrapping the whole application.
    pub fn middlewares(&self) -> &[MiddlewareRef] {
        &self.middlewares
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("root_file", &self.root_file)
            .field("api_prefix", &self.api_prefix)
            .field("debug", &self.debug)
            .field("static_files", &self.static_files)
            .field("middlewares", &self.middlewares)
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Configuration`].
///
/// # Example
///
/// ```rust,ignore
/// let configuration = Configuration::builder()
///     .root_file("app/main.rs")
///     .api_prefix("/api")
///     .static_files(StaticFiles::new("/", ["public"]))
///     .log_requests()
///     .build()?;
/// ```
#[derive(Default)]
pub struct ConfigurationBuilder {
    root_file: Option<PathBuf>,
    api_prefix: Option<String>,
    debug: DebugHooks,
    static_files: Vec<StaticFiles>,
    middlewares: Vec<MiddlewareRef>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    not_found_handler: Option<Arc<dyn NotFoundHandler>>,
    body_limit: Option<usize>,
    log_requests: bool,
}

impl ConfigurationBuilder {
    pub fn root_file(mut self, root_file: impl Into<PathBuf>) -> Self {
        self.root_file = Some(root_file.into());
        self
    }

    pub fn api_prefix(mut self, api_prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(api_prefix.into());
        self
    }

    pub fn debug_log<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.debug.log = Some(Arc::new(hook));
        self
    }

    pub fn debug_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.debug.error = Some(Arc::new(hook));
        self
    }

    /// Add a static file rule.
    pub fn static_files(mut self, rule: StaticFiles) -> Self {
        self.static_files.push(rule);
        self
    }

    /// Add a middleware wrapping the whole application.
    pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RequestSummary, HandlerError) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn not_found_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.not_found_handler = Some(Arc::new(handler));
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    /// Log every request through [`RequestLogger`], outside all other global
    /// middlewares.
    pub fn log_requests(mut self) -> Self {
        self.log_requests = true;
        self
    }

    pub fn build(self) -> Result<Configuration, ConfigError> {
        let root_file = self
            .root_file
            .filter(|root_file| !root_file.as_os_str().is_empty())
            .ok_or(ConfigError::MissingRoot)?;
        let api_prefix = self.api_prefix.ok_or(ConfigError::MissingApiPrefix)?;

        let handlers = Handlers::new(
            self.error_handler
                .unwrap_or_else(|| Arc::new(DefaultErrorHandler)),
            self.not_found_handler
                .unwrap_or_else(|| Arc::new(DefaultNotFoundHandler)),
        );

        let mut middlewares = self.middlewares;
        if self.log_requests {
            middlewares.insert(0, MiddlewareRef::function(REQUEST_LOGGER, RequestLogger));
        }

        Ok(Configuration {
            root_file,
            api_prefix: path::normalize(&api_prefix),
            debug: self.debug,
            static_files: self.static_files,
            middlewares,
            handlers,
            body_limit: self.body_limit.unwrap_or(DEFAULT_BODY_LIMIT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_root_and_extension_come_from_root_file() {
        let configuration = Configuration::builder()
            .root_file("app/src/main.rs")
            .api_prefix("api/")
            .build()
            .unwrap();

        assert_eq!(configuration.root(), Path::new("app/src"));
        assert_eq!(configuration.extension(), Some("rs"));
        assert_eq!(configuration.api_prefix(), "/api");
        assert_eq!(
            configuration.absolute_path(["domain", "entities"]),
            PathBuf::from("app/src/domain/entities")
        );
    }

    #[test]
    fn test_bare_root_file_uses_current_directory() {
        let configuration = Configuration::builder()
            .root_file("main.rs")
            .api_prefix("")
            .build()
            .unwrap();

        assert_eq!(configuration.root(), Path::new("."));
        assert_eq!(configuration.api_prefix(), "/");
    }

    #[test]
    fn test_missing_fields_are_fatal() {
        assert!(matches!(
            Configuration::builder().api_prefix("/api").build(),
            Err(ConfigError::MissingRoot)
        ));
        assert!(matches!(
            Configuration::builder().root_file("main.rs").build(),
            Err(ConfigError::MissingApiPrefix)
        ));
    }

    #[test]
    fn test_debug_hooks_receive_messages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let configuration = Configuration::builder()
            .root_file("main.rs")
            .api_prefix("/api")
            .debug_error(move |message| sink.lock().unwrap().push(message.to_string()))
            .build()
            .unwrap();

        configuration.debug().error("could not load actions/users.rs");
        configuration.debug().log("silently traced");

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["could not load actions/users.rs".to_string()]
        );
    }

    #[test]
    fn test_request_logger_is_the_outermost_global_middleware() {
        let configuration = Configuration::builder()
            .root_file("main.rs")
            .api_prefix("/api")
            .middleware("Middleware.Auth")
            .log_requests()
            .build()
            .unwrap();

        let names: Vec<&str> = configuration
            .middlewares()
            .iter()
            .map(MiddlewareRef::name)
            .collect();
        assert_eq!(names, vec![REQUEST_LOGGER, "Middleware.Auth"]);
    }
}
