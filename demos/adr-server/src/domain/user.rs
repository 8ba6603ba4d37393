use crate::domain::entities::user::{NewUser, User};
use actionwire::lifecycle::{OnLoad, OnReady};
use actionwire::registry::ClassDefinition;
use actionwire::{HandlerError, MetadataRegistry, async_trait};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory user store.
#[derive(Default)]
pub struct UserDomain {
    users: RwLock<Vec<User>>,
    next_id: AtomicU64,
}

impl UserDomain {
    pub async fn all(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    pub async fn find(&self, id: u64) -> Option<User> {
        self.users.read().await.iter().find(|user| user.id == id).cloned()
    }

    pub async fn create(&self, new_user: NewUser) -> User {
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: new_user.name,
            email: new_user.email,
        };
        self.users.write().await.push(user.clone());
        user
    }
}

#[async_trait]
impl OnLoad for UserDomain {
    async fn on_load(&self) -> Result<(), HandlerError> {
        for (name, email) in [("Ada", "ada@example.com"), ("Grace", "grace@example.com")] {
            self.create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
            })
            .await;
        }
        tracing::info!("UserDomain seeded");
        Ok(())
    }
}

#[async_trait]
impl OnReady for UserDomain {
    async fn on_ready(&self) -> Result<(), HandlerError> {
        tracing::info!("UserDomain ready with {} users", self.users.read().await.len());
        Ok(())
    }
}

pub fn register(registry: &MetadataRegistry) -> actionwire::Result<()> {
    registry.register_class(
        ClassDefinition::new("UserDomain", |_| UserDomain::default())
            .with_on_load()
            .with_on_ready(),
    )?;
    registry.register_domain("UserDomain", "User")?;
    Ok(())
}
