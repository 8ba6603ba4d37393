//! Application Bootstrap
//!
//! Ties the pieces together: materialize the routes, run the lifecycle hooks
//! and serve the result.

use crate::config::Configuration;
use crate::di::Injector;
use crate::error::{ConfigError, Result};
use crate::lifecycle::shutdown_signal;
use crate::registry::MetadataRegistry;
use crate::router::{ModuleLoader, RouteMaterializer};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// A materialized application whose lifecycle hooks have run.
///
/// # Example
///
/// ```rust,ignore
/// let app = Application::builder()
///     .configuration(configuration)
///     .injector(injector)
///     .loader(catalog)
///     .build()
///     .await?;
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// app.serve(listener).await?;
/// ```
pub struct Application {
    router: Router,
    injector: Injector,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(address) = listener.local_addr() {
            tracing::info!("Listening on {}", address);
        }

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    configuration: Option<Configuration>,
    registry: Option<MetadataRegistry>,
    injector: Option<Injector>,
    loader: Option<Arc<dyn ModuleLoader>>,
    router: Option<Router>,
}

impl ApplicationBuilder {
    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Registry to build an injector on when no injector is given.
    pub fn registry(mut self, registry: MetadataRegistry) -> Self {
        self.registry = Some(registry);
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

    /// Host router the routes are added to. Defaults to an empty router.
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Materialize the routes, then run `Injector::ready`.
    ///
    /// # Errors
    ///
    /// Configuration and injection errors, a static path colliding with the
    /// api prefix, or a failed `on_load` hook.
    pub async fn build(self) -> Result<Application> {
        let configuration = self.configuration.ok_or(ConfigError::MissingConfiguration)?;
        let loader = self
            .loader
            .ok_or(ConfigError::MissingComponent("module loader"))?;
        let injector = match (self.injector, self.registry) {
            (Some(injector), _) => injector,
            (None, Some(registry)) => Injector::new(registry),
            (None, None) => return Err(ConfigError::MissingComponent("injector").into()),
        };

        tracing::info!("Starting application initialization...");

        let router = RouteMaterializer::builder()
            .configuration(configuration)
            .application(self.router.unwrap_or_default())
            .injector(injector.clone())
            .shared_loader(loader)
            .build()?
            .materialize()
            .await?;

        injector.ready().await?;

        tracing::info!("Application initialization complete");

        Ok(Application {
            router: router.layer(TraceLayer::new_for_http()),
            injector,
        })
    }
}
