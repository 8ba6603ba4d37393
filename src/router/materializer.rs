//! Route Materializer
//!
//! Turns the recorded metadata into a live `axum::Router`:
//!
//! ```text
//! 1. static rules checked against the api prefix
//!    ↓
//! 2. responders/, domain/entities/, domain/ injected (flat)
//!    ↓
//! 3. actions/ scanned recursively, one route per handler
//!    ↓
//! 4. api catch-all (not found) nested at the api prefix
//!    ↓
//! 5. static dispatcher as the application fallback
//!    ↓
//! 6. global middlewares and panic capture around everything
//! ```

use crate::action::{ActionEndpoint, HandlerArgs};
use crate::config::Configuration;
use crate::di::Injector;
use crate::error::{ConfigError, MaterializeError};
use crate::exception::{Handlers, RequestSummary};
use crate::middleware::{self, MiddlewareLayer};
use crate::registry::{
    ActionDescriptor, Family, HttpMethod, Identity, MarkerKind, MetadataRegistry,
};
use crate::router::loader::ModuleLoader;
use crate::router::scan::{self, DiscoveredModule, ScanReport};
use crate::router::static_files::{self, StaticDispatcher};
use crate::router::path;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::routing::MethodRouter;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::Layer;
use tower::util::BoxCloneSyncService;
use tower_http::catch_panic::CatchPanicLayer;

type RouteService = BoxCloneSyncService<Request<Body>, Response, Infallible>;

/// A component family injected from a flat folder.
struct Injectable {
    folder: &'static [&'static str],
    family: Family,
    namespace: &'static str,
}

const INJECTABLES: [Injectable; 3] = [
    Injectable {
        folder: &["responders"],
        family: Family::Responders,
        namespace: "Responder",
    },
    Injectable {
        folder: &["domain", "entities"],
        family: Family::Entities,
        namespace: "Entity",
    },
    Injectable {
        folder: &["domain"],
        family: Family::Domains,
        namespace: "Domain",
    },
];

/// Routes collected so far, keyed by full path.
#[derive(Default)]
struct RouteTable {
    routes: BTreeMap<String, MethodRouter>,
    methods: HashSet<(String, HttpMethod)>,
    shapes: HashMap<String, String>,
}

/// State guarded by the `app-middleware-injector` lock.
struct Routers {
    application: Router,
    api: RouteTable,
}

/// Builds the application router from the registry. Consumed by
/// [`RouteMaterializer::materialize`].
pub struct RouteMaterializer {
    configuration: Arc<Configuration>,
    injector: Injector,
    loader: Arc<dyn ModuleLoader>,
    handlers: Handlers,
    routers: Mutex<Routers>,
}

impl RouteMaterializer {
    pub fn builder() -> RouteMaterializerBuilder {
        RouteMaterializerBuilder::default()
    }

    fn registry(&self) -> &MetadataRegistry {
        self.injector.registry()
    }

    pub async fn materialize(self) -> Result<Router, MaterializeError> {
        let prefix = self.configuration.api_prefix().to_string();
        static_files::validate(self.configuration.static_files(), &prefix)?;

        for injectable in &INJECTABLES {
            self.inject_family(injectable)?;
        }

        let report = self.scan(|root, extension| scan::scan_recursive(root, &["actions"], extension));
        for module in &report.modules {
            self.load_action(module).await;
        }

        let (application, table) = {
            let mut routers = self.routers.lock().await;
            let application = std::mem::replace(&mut routers.application, Router::new());
            (application, std::mem::take(&mut routers.api))
        };

        let route_count = table.methods.len();
        let mut api = Router::new();
        for (route, method_router) in table.routes {
            api = api.route(&route, method_router);
        }

        if !path::is_root(&prefix) {
            api = api.fallback_service(not_found_service(self.handlers.clone()));
        }
        let application = path::mount_at(application, &prefix, api);

        let dispatcher = StaticDispatcher::new(&self.configuration, &self.injector);
        let mut application = application.fallback_service(dispatcher);

        let global = middleware::resolve_all(self.configuration.middlewares(), &self.injector);
        if !global.is_empty() {
            application =
                application.layer(MiddlewareLayer::new(global, Arc::clone(&self.handlers.error)));
        }

        let error_handler = Arc::clone(&self.handlers.error);
        let application = application.layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| {
                let message = panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown panic".to_string());
                error_handler.catch(
                    &RequestSummary::default(),
                    anyhow::anyhow!("Request handler panicked: {message}"),
                )
            },
        ));

        tracing::info!("Materialized {} routes under '{}'", route_count, prefix);
        Ok(application)
    }

    fn scan<F>(&self, scan: F) -> ScanReport
    where
        F: FnOnce(&std::path::Path, Option<&str>) -> ScanReport,
    {
        let report = scan(self.configuration.root(), self.configuration.extension());
        for error in &report.errors {
            let directory = error.path().unwrap_or(self.configuration.root());
            self.configuration
                .debug()
                .error(&format!("Unable to read {}: {}", directory.display(), error));
        }
        report
    }

    fn load(&self, module: &DiscoveredModule, expected: MarkerKind) -> Option<Identity> {
        let debug = self.configuration.debug();
        let identity = match self.loader.load(&module.module) {
            Ok(identity) => identity,
            Err(e) => {
                debug.error(&e.to_string());
                return None;
            }
        };

        match self.registry().marker_kind(&identity) {
            Some(kind) if kind == expected => Some(identity),
            Some(kind) => {
                debug.log(&format!(
                    "Skipping {}: '{}' is marked {} instead of {}",
                    module.module, identity, kind, expected
                ));
                None
            }
            None => {
                debug.log(&format!(
                    "Skipping {}: '{}' carries no marker",
                    module.module, identity
                ));
                None
            }
        }
    }

    fn inject_family(&self, injectable: &Injectable) -> Result<(), MaterializeError> {
        let report = self.scan(|root, extension| scan::scan_flat(root, injectable.folder, extension));

        for module in &report.modules {
            let Some(identity) = self.load(module, MarkerKind::Class) else {
                continue;
            };
            let Some(name) = self.registry().name_of(&identity, injectable.family) else {
                self.configuration.debug().log(&format!(
                    "Skipping {}: '{}' is not registered as {}",
                    module.module, identity, injectable.family
                ));
                continue;
            };

            let key = format!("{}.{}", injectable.namespace, name);
            self.injector.inject_class(key.clone(), identity)?;
            self.configuration
                .debug()
                .log(&format!("{} loaded {}", injectable.namespace, key));
        }
        Ok(())
    }

    async fn load_action(&self, module: &DiscoveredModule) {
        let debug = self.configuration.debug();
        let Some(identity) = self.load(module, MarkerKind::Action) else {
            return;
        };
        let Some(descriptor) = self.registry().action(&identity) else {
            return;
        };
        let ActionDescriptor {
            instance: Some(instance),
            path: Some(action_path),
            functions,
            middlewares,
        } = descriptor
        else {
            return;
        };
        if functions.is_empty() {
            debug.log(&format!("Skipping {}: '{}' has no handlers", module.module, identity));
            return;
        }

        let bindings = self.registry().params(&identity);
        let mount = path::join(
            module
                .prefix
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(action_path.as_str())),
        );

        let mut routes: Vec<(String, HttpMethod, RouteService)> = Vec::new();
        for function in functions {
            let child = function.child.as_deref().unwrap_or("/");
            let variants = path::to_axum_routes(&path::join([mount.as_str(), child]));
            let method = function.method;
            let layout = HandlerArgs::layout(&bindings, &function.name);
            let handler_middlewares = middleware::resolve_all(&function.middlewares, &self.injector);

            debug.log(&format!(
                "Action loaded {} {} {}",
                method,
                variants.join(" | "),
                function.name
            ));

            let endpoint = ActionEndpoint::new(
                Arc::clone(&instance),
                function,
                layout,
                self.handlers.clone(),
            )
            .body_limit(self.configuration.body_limit());

            let service = if handler_middlewares.is_empty() {
                RouteService::new(endpoint)
            } else {
                RouteService::new(
                    MiddlewareLayer::new(handler_middlewares, Arc::clone(&self.handlers.error))
                        .layer(endpoint),
                )
            };
            for route in variants {
                routes.push((route, method, service.clone()));
            }
        }

        // app-middleware-injector
        let mut routers = self.routers.lock().await;
        let action_middlewares = middleware::resolve_all(&middlewares, &self.injector);
        let action_layer = (!action_middlewares.is_empty())
            .then(|| MiddlewareLayer::new(action_middlewares, Arc::clone(&self.handlers.error)));

        for (route, method, service) in routes {
            let service = match &action_layer {
                Some(layer) => RouteService::new(layer.layer(service)),
                None => service,
            };
            self.insert_route(&mut routers.api, route, method, service);
        }
        debug.log(&format!("Action '{}' mounted at {}", identity, mount));
    }

    fn insert_route(
        &self,
        table: &mut RouteTable,
        route: String,
        method: HttpMethod,
        service: RouteService,
    ) {
        let debug = self.configuration.debug();
        let shape = path::shape(&route);

        match table.shapes.get(&shape) {
            Some(existing) if *existing != route => {
                debug.error(&format!(
                    "Route {} {} conflicts with {}, skipping",
                    method, route, existing
                ));
                return;
            }
            _ => {}
        }
        if !table.methods.insert((route.clone(), method)) {
            debug.log(&format!("Route {} {} is already defined, skipping", method, route));
            return;
        }
        table.shapes.insert(shape, route.clone());

        let method_router = table.routes.remove(&route).unwrap_or_else(|| {
            MethodRouter::new().fallback_service(not_found_service(self.handlers.clone()))
        });
        table
            .routes
            .insert(route, method_router.on_service(method.filter(), service));
    }
}

/// A service answering everything with the not-found handler.
fn not_found_service(handlers: Handlers) -> RouteService {
    RouteService::new(tower::service_fn(move |request: Request<Body>| {
        let handlers = handlers.clone();
        async move { Ok::<_, Infallible>(handlers.not_found(request).await) }
    }))
}

/// Builder for [`RouteMaterializer`]. Every part is required.
#[derive(Default)]
pub struct RouteMaterializerBuilder {
    configuration: Option<Arc<Configuration>>,
    application: Option<Router>,
    injector: Option<Injector>,
    loader: Option<Arc<dyn ModuleLoader>>,
}

impl RouteMaterializerBuilder {
    pub fn configuration(mut self, configuration: impl Into<Arc<Configuration>>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    /// The host router the api and static routes are added to.
    pub fn application(mut self, application: Router) -> Self {
        self.application = Some(application);
        self
    }

    pub fn injector(mut self, injector: Injector) -> Self {
        self.injector = Some(injector);
        self
    }

    pub fn loader(mut self, loader: impl ModuleLoader) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn shared_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Result<RouteMaterializer, ConfigError> {
        let configuration = self.configuration.ok_or(ConfigError::MissingConfiguration)?;
        let application = self.application.ok_or(ConfigError::MissingApplication)?;
        let injector = self.injector.ok_or(ConfigError::MissingComponent("injector"))?;
        let loader = self.loader.ok_or(ConfigError::MissingComponent("module loader"))?;

        if configuration.root_file().as_os_str().is_empty() {
            return Err(ConfigError::MissingRoot);
        }

        Ok(RouteMaterializer {
            handlers: configuration.handlers().clone(),
            configuration,
            injector,
            loader,
            routers: Mutex::new(Routers {
                application,
                api: RouteTable::default(),
            }),
        })
    }
}
