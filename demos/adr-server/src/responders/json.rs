use actionwire::action::ResponseWriter;
use actionwire::axum::http::StatusCode;
use actionwire::registry::ClassDefinition;
use actionwire::{ApiResponse, HandlerResult, MetadataRegistry};
use serde::Serialize;

pub struct JsonResponder;

impl JsonResponder {
    pub fn ok<T: Serialize>(&self, response: &ResponseWriter, data: T) -> HandlerResult {
        response.send(ApiResponse::success(data))
    }

    pub fn created<T: Serialize>(&self, response: &ResponseWriter, data: T) -> HandlerResult {
        response.send(ApiResponse::success(data).with_status(StatusCode::CREATED))
    }

    pub fn reject(&self, response: &ResponseWriter, message: impl Into<String>) -> HandlerResult {
        response.send(ApiResponse::failure(StatusCode::BAD_REQUEST, message))
    }
}

pub fn register(registry: &MetadataRegistry) -> actionwire::Result<()> {
    registry.register_class(ClassDefinition::new("JsonResponder", |_| JsonResponder))?;
    registry.register_responder("JsonResponder", "Json")?;
    Ok(())
}
