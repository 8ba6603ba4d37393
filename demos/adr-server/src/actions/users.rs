use crate::domain::entities::user::UserEntity;
use crate::domain::user::UserDomain;
use crate::responders::json::JsonResponder;
use actionwire::action::HandlerArgs;
use actionwire::registry::{ActionDefinition, ActionFunction, ParamBinding, ParamSource};
use actionwire::{HandlerResult, Injector, MetadataRegistry, Retrieve};
use anyhow::Context;
use std::sync::Arc;

pub struct UsersAction {
    users: Retrieve<UserDomain>,
    entity: Retrieve<UserEntity>,
    responder: Retrieve<JsonResponder>,
}

impl UsersAction {
    fn new(injector: &Injector) -> Self {
        Self {
            users: Retrieve::new(injector, "Domain.User"),
            entity: Retrieve::new(injector, "Entity.User"),
            responder: Retrieve::new(injector, "Responder.Json"),
        }
    }

    fn parts(&self) -> anyhow::Result<(Arc<UserDomain>, Arc<JsonResponder>)> {
        let users = self.users.get().context("Domain.User is not injected")?;
        let responder = self.responder.get().context("Responder.Json is not injected")?;
        Ok((users, responder))
    }

    async fn find_all(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let (users, responder) = self.parts()?;
        let response = args.response(0).context("response is not bound")?;
        responder.ok(response, users.all().await)
    }

    /// An unknown id falls through to the not-found handler.
    async fn find_one(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let (users, responder) = self.parts()?;
        let params = args.params(0).context("params are not bound")?;
        let response = args.response(1).context("response is not bound")?;
        let next = args.next(2).context("next is not bound")?;

        let id = params.get("id").and_then(|id| id.parse::<u64>().ok());
        match id {
            Some(id) => match users.find(id).await {
                Some(user) => responder.ok(response, user),
                None => {
                    next.proceed();
                    Ok(())
                }
            },
            None => responder.reject(response, "id must be a number"),
        }
    }

    async fn create(self: Arc<Self>, args: HandlerArgs) -> HandlerResult {
        let (users, responder) = self.parts()?;
        let entity = self.entity.get().context("Entity.User is not injected")?;
        let body = args.body(0).context("body is not bound")?;
        let response = args.response(1).context("response is not bound")?;

        match entity.parse(body) {
            Ok(new_user) => responder.created(response, users.create(new_user).await),
            Err(e) => responder.reject(response, e.to_string()),
        }
    }
}

pub fn register(registry: &MetadataRegistry, injector: &Injector) -> actionwire::Result<()> {
    registry.register_handler("UsersAction", ActionFunction::get("find_all", UsersAction::find_all))?;
    registry.register_param("UsersAction", ParamBinding::new(0, "find_all", ParamSource::Response))?;

    registry.register_handler(
        "UsersAction",
        ActionFunction::get("find_one", UsersAction::find_one).child("/:id"),
    )?;
    registry.register_param("UsersAction", ParamBinding::new(2, "find_one", ParamSource::Next))?;
    registry.register_param("UsersAction", ParamBinding::new(0, "find_one", ParamSource::Params))?;
    registry.register_param("UsersAction", ParamBinding::new(1, "find_one", ParamSource::Response))?;

    registry.register_handler("UsersAction", ActionFunction::post("create", UsersAction::create))?;
    registry.register_param("UsersAction", ParamBinding::new(0, "create", ParamSource::Body))?;
    registry.register_param("UsersAction", ParamBinding::new(1, "create", ParamSource::Response))?;

    registry.register_action(ActionDefinition::new(
        "UsersAction",
        "/users",
        UsersAction::new(injector),
    ))?;
    Ok(())
}
