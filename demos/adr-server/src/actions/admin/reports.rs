use crate::domain::user::UserDomain;
use crate::responders::json::JsonResponder;
use actionwire::action::HandlerArgs;
use actionwire::axum::body::Body;
use actionwire::axum::http::{Request, StatusCode};
use actionwire::axum::response::IntoResponse;
use actionwire::middleware::{Middleware, MiddlewareResult, Next};
use actionwire::registry::{
    ActionDefinition, ActionFunction, ClassDefinition, ParamBinding, ParamSource,
};
use actionwire::{ApiResponse, HandlerResult, Injector, MetadataRegistry, Retrieve, async_trait};
use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

const TOKEN_HEADER: &str = "x-admin-token";

/// Lets a request through only with the admin token.
pub struct AdminGuard {
    token: String,
}

#[async_trait]
impl Middleware for AdminGuard {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        let authorized = request
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|token| token == self.token);

        if authorized {
            next.run(request).await
        } else {
            Ok(ApiResponse::failure(StatusCode::UNAUTHORIZED, "Admin token required").into_response())
        }
    }
}

pub struct ReportsAction {
    users: Retrieve<UserDomain>,
    responder: Retrieve<JsonResponder>,
}

impl ReportsAction {
    async fn summary(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let users = self.users.get().context("Domain.User is not injected")?;
        let responder = self.responder.get().context("Responder.Json is not injected")?;
        let response = args.response(0).context("response is not bound")?;

        responder.ok(response, json!({ "users": users.all().await.len() }))
    }
}

pub fn register(registry: &MetadataRegistry, injector: &Injector) -> actionwire::Result<()> {
    let token = std::env::var("ADMIN_TOKEN").unwrap_or_else(|_| "letmein".to_string());
    registry.register_class(
        ClassDefinition::new("AdminGuard", move |_| AdminGuard {
            token: token.clone(),
        })
        .with_middleware(),
    )?;

    registry.register_handler("ReportsAction", ActionFunction::get("summary", ReportsAction::summary))?;
    registry.register_param("ReportsAction", ParamBinding::new(0, "summary", ParamSource::Response))?;
    registry.register_action(
        ActionDefinition::new(
            "ReportsAction",
            "/reports",
            ReportsAction {
                users: Retrieve::new(injector, "Domain.User"),
                responder: Retrieve::new(injector, "Responder.Json"),
            },
        )
        .middleware("Middleware.AdminGuard"),
    )?;
    Ok(())
}
