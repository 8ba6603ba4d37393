//! Sample Action-Domain-Responder server.
//!
//! Its own `src/` directory is the scanned application root:
//!
//! ```text
//! src/actions/users.rs            GET/POST /api/users, GET /api/users/:id
//! src/actions/admin/reports.rs    GET /api/admin/reports (x-admin-token)
//! src/domain/user.rs              Domain.User
//! src/domain/entities/user.rs     Entity.User
//! src/responders/json.rs          Responder.Json
//! ```

mod actions {
    pub mod users;
    pub mod admin {
        pub mod reports;
    }
}
mod domain {
    pub mod user;
    pub mod entities {
        pub mod user;
    }
}
mod responders {
    pub mod json;
}

use actionwire::config::ConfigFile;
use actionwire::{Application, Injector, MetadataRegistry};
use actionwire::router::ModuleCatalog;
use std::path::Path;

const MANIFEST_DIR: &str = env!("CARGO_MANIFEST_DIR");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adr_server=debug,actionwire=debug,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting adr-server...");

    let registry = MetadataRegistry::new();
    let injector = Injector::new(registry.clone());

    domain::entities::user::register(&registry)?;
    domain::user::register(&registry)?;
    responders::json::register(&registry)?;
    actions::users::register(&registry, &injector)?;
    actions::admin::reports::register(&registry, &injector)?;

    injector.inject_middleware("Middleware.AdminGuard", "AdminGuard")?;

    let catalog = ModuleCatalog::new()
        .module("domain/entities/user", "UserEntity")
        .module("domain/user", "UserDomain")
        .module("responders/json", "JsonResponder")
        .module("actions/users", "UsersAction")
        .module("actions/admin/reports", "ReportsAction");

    let mut config = ConfigFile::load(Path::new(MANIFEST_DIR).join("actionwire.toml"))?
        .with_env_overrides();
    config.root_file = Path::new(MANIFEST_DIR).join(&config.root_file);

    let configuration = config
        .into_builder()
        .log_requests()
        .build()?;

    let app = Application::builder()
        .configuration(configuration)
        .injector(injector)
        .loader(catalog)
        .build()
        .await?;

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;

    tracing::info!("Server running on http://127.0.0.1:{}", port);
    app.serve(listener).await?;
    Ok(())
}
