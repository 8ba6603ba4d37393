use actionwire::MetadataRegistry;
use actionwire::registry::ClassDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Shape and validation rules of a user payload.
pub struct UserEntity;

impl UserEntity {
    pub fn parse(&self, body: &Value) -> anyhow::Result<NewUser> {
        let user: NewUser = serde_json::from_value(body.clone())?;
        if user.name.trim().is_empty() {
            anyhow::bail!("name must not be empty");
        }
        if !user.email.contains('@') {
            anyhow::bail!("'{}' is not an email address", user.email);
        }
        Ok(user)
    }
}

pub fn register(registry: &MetadataRegistry) -> actionwire::Result<()> {
    registry.register_class(ClassDefinition::new("UserEntity", |_| UserEntity))?;
    registry.register_entity("UserEntity", "User")?;
    Ok(())
}
