//! # Actionwire
//!
//! Action-Domain-Responder routing with built-in dependency injection for axum.
//!
//! Components are registered explicitly during bootstrap, each under a
//! caller-supplied [`Identity`]. Files under the application root are then
//! discovered by convention and mapped to those components:
//!
//! - `responders/`, `domain/entities/` and `domain/` hold injectable classes,
//!   injected as `Responder.<name>`, `Entity.<name>` and `Domain.<name>`
//! - `actions/` holds actions, each directory level adding a path segment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actionwire::prelude::*;
//!
//! struct UsersAction {
//!     users: Retrieve<UserDomain>,
//! }
//!
//! impl UsersAction {
//!     async fn find_all(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
//!         let users = self.users.get().map(|domain| domain.all()).unwrap_or_default();
//!         if let Some(response) = args.response(0) {
//!             response.json(StatusCode::OK, &ApiResponse::success(users))?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> actionwire::Result<()> {
//!     let registry = MetadataRegistry::new();
//!     let injector = Injector::new(registry.clone());
//!
//!     registry.register_class(ClassDefinition::new("UserDomain", |_| UserDomain::default()))?;
//!     registry.register_domain("UserDomain", "User")?;
//!     registry.register_handler("UsersAction", ActionFunction::get("find_all", UsersAction::find_all))?;
//!     registry.register_param("UsersAction", ParamBinding::new(0, "find_all", ParamSource::Response))?;
//!     registry.register_action(ActionDefinition::new(
//!         "UsersAction",
//!         "/users",
//!         UsersAction { users: Retrieve::new(&injector, "Domain.User") },
//!     ))?;
//!
//!     let catalog = ModuleCatalog::new()
//!         .module("domain/user", "UserDomain")
//!         .module("actions/users", "UsersAction");
//!
//!     let app = Application::builder()
//!         .configuration(Configuration::builder().root_file("app/main.rs").api_prefix("/api").build()?)
//!         .injector(injector)
//!         .loader(catalog)
//!         .build()
//!         .await?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.map_err(|e| {
//!         actionwire::ActionwireError::Internal(e.to_string())
//!     })?;
//!     app.serve(listener).await.map_err(|e| actionwire::ActionwireError::Internal(e.to_string()))
//! }
//! ```

pub mod action;
pub mod application;
pub mod common;
pub mod config;
pub mod di;
pub mod error;
pub mod exception;
pub mod lifecycle;
pub mod middleware;
pub mod registry;
pub mod router;

// Re-export core types
pub use application::{Application, ApplicationBuilder};
pub use common::ApiResponse;
pub use config::{Configuration, ConfigurationBuilder, StaticFiles};
pub use di::{InjectType, InjectValue, Injector, Retrieve};
pub use error::{ActionwireError, HandlerError, HandlerResult, Result};
pub use registry::{Identity, MetadataRegistry};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use actionwire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::action::{HandlerArgs, NextSignal, Param, RequestContext, ResponseWriter};
    pub use crate::application::{Application, ApplicationBuilder};
    pub use crate::common::ApiResponse;
    pub use crate::config::{ConfigFile, Configuration, RateLimitOptions, StaticFiles};
    pub use crate::di::{InjectType, InjectValue, Injector, Retrieve};
    pub use crate::error::{ActionwireError, HandlerError, HandlerResult, Result};
    pub use crate::exception::{ErrorHandler, NotFoundHandler, RequestSummary};
    pub use crate::lifecycle::{OnLoad, OnReady};
    pub use crate::middleware::{Middleware, MiddlewareRef, MiddlewareResult, Next};
    pub use crate::registry::{
        ActionDefinition, ActionFunction, ClassDefinition, HttpMethod, Identity,
        MetadataRegistry, ParamBinding, ParamSource,
    };
    pub use crate::router::{ModuleCatalog, ModuleLoader};
    pub use async_trait::async_trait;
    pub use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
