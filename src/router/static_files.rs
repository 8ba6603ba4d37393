//! Static/Subdomain Dispatcher
//!
//! Answers every request the api routes did not match. Rules are tried from
//! the most specific subdomain to the least specific one; a request reaches a
//! rule only when its host passes the rule's subdomain gate and its path is
//! below the rule's mount.

use crate::config::{Configuration, StaticFiles, StaticService};
use crate::di::Injector;
use crate::error::MaterializeError;
use crate::exception::Handlers;
use crate::middleware::{self, Middleware, MiddlewareLayer, RateLimiter};
use crate::router::path;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::convert::Infallible;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};
use tower_http::services::{ServeDir, ServeFile};

/// Fail when a static mount would shadow the api prefix.
pub fn validate(rules: &[StaticFiles], api_prefix: &str) -> Result<(), MaterializeError> {
    for rule in rules {
        if !rule.disable_index_router && path::overlaps(&rule.path, api_prefix) {
            return Err(MaterializeError::StaticPathCollision {
                path: path::normalize(&rule.path),
                prefix: path::normalize(api_prefix),
            });
        }
    }
    Ok(())
}

/// Whether the host's labels, joined again, start with `subdomain`.
///
/// This is a plain prefix test: `admin` also admits `administration.example.com`.
pub fn host_matches(host: Option<&str>, subdomain: &str) -> bool {
    let subdomain = subdomain.trim();
    if subdomain.is_empty() {
        return true;
    }
    let Some(host) = host else {
        return false;
    };

    let hostname = host.split(':').next().unwrap_or_default();
    let labels: Vec<&str> = hostname
        .split('.')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .collect();
    labels.join(".").starts_with(subdomain)
}

fn host_of(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().host())
}

struct StaticRoute {
    mount: String,
    subdomain: String,
    fall_through: bool,
    service: StaticService,
}

/// Fallback service of the application router.
#[derive(Clone)]
pub struct StaticDispatcher {
    routes: Arc<Vec<StaticRoute>>,
    handlers: Handlers,
}

impl StaticDispatcher {
    pub fn new(configuration: &Configuration, injector: &Injector) -> Self {
        let handlers = configuration.handlers().clone();

        let mut rules: Vec<&StaticFiles> = configuration.static_files().iter().collect();
        rules.sort_by(|a, b| b.subdomain_gate().len().cmp(&a.subdomain_gate().len()));

        let routes = rules
            .into_iter()
            .map(|rule| {
                let route = build_route(rule, configuration, injector, &handlers);
                configuration.debug().log(&format!(
                    "Static files route loaded {} (subdomain '{}')",
                    route.mount, route.subdomain
                ));
                route
            })
            .collect();

        Self {
            routes: Arc::new(routes),
            handlers,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    async fn dispatch(self, request: Request<Body>) -> Response {
        if request.method() == Method::GET || request.method() == Method::HEAD {
            let host = host_of(&request);

            for route in self.routes.iter() {
                if !host_matches(host, &route.subdomain) {
                    continue;
                }
                let Some(rest) = path::strip_mount(request.uri().path(), &route.mount) else {
                    continue;
                };
                let Some(forwarded) = forward(&request, &rest) else {
                    continue;
                };

                let response = route
                    .service
                    .clone()
                    .oneshot(forwarded)
                    .await
                    .unwrap_or_else(|never| match never {});

                if response.status() == StatusCode::NOT_FOUND && route.fall_through {
                    continue;
                }
                return response;
            }
        }

        self.handlers.not_found(request).await
    }
}

impl Service<Request<Body>> for StaticDispatcher {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(request).await) })
    }
}

/// A bodiless copy of a GET/HEAD request with its path moved below the mount.
fn forward(request: &Request<Body>, path: &str) -> Option<Request<Body>> {
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let uri: Uri = path_and_query.parse().ok()?;

    let mut forwarded = Request::new(Body::empty());
    *forwarded.method_mut() = request.method().clone();
    *forwarded.uri_mut() = uri;
    *forwarded.version_mut() = request.version();
    *forwarded.headers_mut() = HeaderMap::clone(request.headers());
    *forwarded.extensions_mut() = request.extensions().clone();
    Some(forwarded)
}

fn build_route(
    rule: &StaticFiles,
    configuration: &Configuration,
    injector: &Injector,
    handlers: &Handlers,
) -> StaticRoute {
    let directory = configuration.absolute_path(&rule.directory);

    let base = match &rule.custom_static_handler {
        Some(factory) => factory(directory),
        None => serve_directory(rule, &directory),
    };

    let mut chain: Vec<Arc<dyn Middleware>> = Vec::new();
    if let Some(options) = &rule.rate_limit {
        chain.push(Arc::new(RateLimiter::new(options)));
    }
    chain.extend(middleware::resolve_all(&rule.middlewares, injector));

    let service = if chain.is_empty() {
        base
    } else {
        BoxCloneSyncService::new(
            MiddlewareLayer::new(chain, Arc::clone(&handlers.error)).layer(base),
        )
    };

    StaticRoute {
        mount: path::normalize(&rule.path),
        subdomain: rule.subdomain_gate().to_string(),
        fall_through: rule.disable_index_router,
        service,
    }
}

fn serve_directory(rule: &StaticFiles, directory: &Path) -> StaticService {
    let mut serve_dir = ServeDir::new(directory)
        .append_index_html_on_directories(rule.options.append_index_html_on_directories);
    if let Some(size) = rule.options.buf_chunk_size {
        serve_dir = serve_dir.with_buf_chunk_size(size);
    }

    if rule.disable_index_router {
        BoxCloneSyncService::new(ServiceExt::<Request<Body>>::map_response(
            serve_dir,
            |response| response.into_response(),
        ))
    } else {
        let index = ServeFile::new(directory.join(rule.index_file()));
        BoxCloneSyncService::new(ServiceExt::<Request<Body>>::map_response(
            serve_dir.fallback(index),
            |response| response.into_response(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_is_rejected_unless_index_router_disabled() {
        let rules = vec![StaticFiles::new("/api/assets", ["public"])];
        assert!(matches!(
            validate(&rules, "/api"),
            Err(MaterializeError::StaticPathCollision { .. })
        ));

        let rules = vec![StaticFiles::new("/api/assets", ["public"]).disable_index_router()];
        assert!(validate(&rules, "/api").is_ok());

        let rules = vec![StaticFiles::new("/", ["public"])];
        assert!(validate(&rules, "/api").is_ok());
    }

    #[test]
    fn test_host_matching_is_a_label_prefix() {
        assert!(host_matches(Some("admin.app.example.com"), "admin.app"));
        assert!(host_matches(Some("admin.app.example.com:8080"), "admin"));
        assert!(host_matches(Some("administration.example.com"), "admin"));
        assert!(!host_matches(Some("www.example.com"), "admin"));
        assert!(!host_matches(None, "admin"));
        assert!(host_matches(None, ""));
        assert!(host_matches(Some("..admin..app.example.com"), "admin.app"));
    }

    #[test]
    fn test_forward_keeps_query() {
        let request = Request::builder()
            .uri("/assets/app.js?v=3")
            .header("host", "example.com")
            .body(Body::empty())
            .unwrap();

        let forwarded = forward(&request, "/app.js").unwrap();
        assert_eq!(forwarded.uri(), "/app.js?v=3");
        assert_eq!(forwarded.headers()["host"], "example.com");
    }
}
