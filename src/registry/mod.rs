//! Metadata Registry
//!
//! Process-wide storage for everything the markers record before startup:
//! injectable classes, action descriptors, parameter bindings and the names
//! of domains, entities and responders. Entries are keyed by an explicit
//! [`Identity`] so that repeated registrations for one component merge.
//!
//! The registry is filled during bootstrap, read by the route materializer,
//! and cleared once `Injector::ready` completes. After that it is frozen.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = MetadataRegistry::new();
//! let injector = Injector::new(registry.clone());
//!
//! registry.register_class(ClassDefinition::new("UserDomain", UserDomain::new))?;
//! registry.register_domain("UserDomain", "User")?;
//!
//! registry.register_handler(
//!     "UsersAction",
//!     ActionFunction::get("find_all", UsersAction::find_all),
//! )?;
//! registry.register_param("UsersAction", ParamBinding::new(0, "find_all", ParamSource::Response))?;
//! registry.register_action(ActionDefinition::new("UsersAction", "/users", UsersAction::new(&injector)))?;
//! ```

mod action;
mod class;
mod identity;

pub use action::{
    ActionDefinition, ActionDescriptor, ActionFunction, HandlerFuture, HttpMethod, ParamBinding,
    ParamSource,
};
pub use class::{ClassDefinition, ClassInstance, ClassMarker, MarkerKind};
pub use identity::Identity;

use crate::error::RegistryError;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strum_macros::Display;

/// The data families the registry keeps apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "camelCase")]
pub enum Family {
    Injections,
    Actions,
    FunctionParams,
    Domains,
    Entities,
    Responders,
}

/// A value stored under an identity within one family.
#[derive(Debug, Clone)]
pub enum RegistryValue {
    Class(ClassMarker),
    Action(ActionDescriptor),
    Params(Vec<ParamBinding>),
    Name(String),
}

impl RegistryValue {
    fn kind(&self) -> &'static str {
        match self {
            RegistryValue::Class(_) => "class",
            RegistryValue::Action(_) => "action",
            RegistryValue::Params(_) => "params",
            RegistryValue::Name(_) => "name",
        }
    }

    fn belongs_to(&self, family: Family) -> bool {
        matches!(
            (self, family),
            (RegistryValue::Class(_), Family::Injections)
                | (RegistryValue::Action(_), Family::Actions)
                | (RegistryValue::Params(_), Family::FunctionParams)
                | (
                    RegistryValue::Name(_),
                    Family::Domains | Family::Entities | Family::Responders
                )
        )
    }
}

#[derive(Default)]
struct RegistryInner {
    entries: DashMap<(Family, Identity), RegistryValue>,
    frozen: AtomicBool,
}

/// Shared handle to the metadata registry. Cloning is cheap.
#[derive(Clone, Default)]
pub struct MetadataRegistry {
    inner: Arc<RegistryInner>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value recorded for `identity` in `family`.
    pub fn set_data(
        &self,
        identity: impl Into<Identity>,
        value: RegistryValue,
        family: Family,
    ) -> Result<(), RegistryError> {
        let identity = identity.into();
        self.ensure_writable(&identity)?;

        if !value.belongs_to(family) {
            return Err(RegistryError::FamilyMismatch {
                family: family.to_string(),
                value: value.kind().to_string(),
            });
        }

        self.inner.entries.insert((family, identity), value);
        Ok(())
    }

    /// Returns a copy of the recorded value; mutating it never touches the registry.
    pub fn get_data(&self, identity: &Identity, family: Family) -> Option<RegistryValue> {
        self.inner
            .entries
            .get(&(family, identity.clone()))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, identity: &Identity, family: Family) -> bool {
        self.inner
            .entries
            .contains_key(&(family, identity.clone()))
    }

    /// Record an injectable class. The first registration wins.
    pub fn register_class<T: Send + Sync + 'static>(
        &self,
        definition: ClassDefinition<T>,
    ) -> Result<(), RegistryError> {
        let marker = definition.into_marker();
        let identity = marker.identity().clone();
        self.ensure_writable(&identity)?;

        self.inner
            .entries
            .entry((Family::Injections, identity))
            .or_insert(RegistryValue::Class(marker));
        Ok(())
    }

    pub fn register_domain(
        &self,
        identity: impl Into<Identity>,
        name: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.register_name(identity.into(), name.into(), Family::Domains)
    }

    pub fn register_entity(
        &self,
        identity: impl Into<Identity>,
        name: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.register_name(identity.into(), name.into(), Family::Entities)
    }

    pub fn register_responder(
        &self,
        identity: impl Into<Identity>,
        name: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.register_name(identity.into(), name.into(), Family::Responders)
    }

    fn register_name(
        &self,
        identity: Identity,
        name: String,
        family: Family,
    ) -> Result<(), RegistryError> {
        self.ensure_writable(&identity)?;
        self.inner
            .entries
            .entry((family, identity))
            .or_insert(RegistryValue::Name(name));
        Ok(())
    }

    /// Record the class-level action marker, merging into any descriptor the
    /// handler markers already created.
    pub fn register_action(&self, definition: ActionDefinition) -> Result<(), RegistryError> {
        let ActionDefinition {
            identity,
            path,
            instance,
            middlewares,
        } = definition;
        self.ensure_writable(&identity)?;

        let mut entry = self
            .inner
            .entries
            .entry((Family::Actions, identity))
            .or_insert_with(|| RegistryValue::Action(ActionDescriptor::default()));

        if let RegistryValue::Action(descriptor) = entry.value_mut() {
            descriptor.instance = Some(instance);
            descriptor.path = Some(path);
            descriptor.middlewares = middlewares;
        }
        Ok(())
    }

    /// Append a routed method to the action's descriptor.
    pub fn register_handler(
        &self,
        identity: impl Into<Identity>,
        function: ActionFunction,
    ) -> Result<(), RegistryError> {
        let identity = identity.into();
        self.ensure_writable(&identity)?;

        let mut entry = self
            .inner
            .entries
            .entry((Family::Actions, identity))
            .or_insert_with(|| RegistryValue::Action(ActionDescriptor::default()));

        if let RegistryValue::Action(descriptor) = entry.value_mut() {
            descriptor.functions.push(function);
        }
        Ok(())
    }

    /// Append a parameter binding for one of the action's handlers.
    pub fn register_param(
        &self,
        identity: impl Into<Identity>,
        binding: ParamBinding,
    ) -> Result<(), RegistryError> {
        let identity = identity.into();
        self.ensure_writable(&identity)?;

        let mut entry = self
            .inner
            .entries
            .entry((Family::FunctionParams, identity))
            .or_insert_with(|| RegistryValue::Params(Vec::new()));

        if let RegistryValue::Params(params) = entry.value_mut() {
            params.push(binding);
        }
        Ok(())
    }

    pub fn class(&self, identity: &Identity) -> Option<ClassMarker> {
        match self.get_data(identity, Family::Injections)? {
            RegistryValue::Class(marker) => Some(marker),
            _ => None,
        }
    }

    pub fn action(&self, identity: &Identity) -> Option<ActionDescriptor> {
        match self.get_data(identity, Family::Actions)? {
            RegistryValue::Action(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn params(&self, identity: &Identity) -> Vec<ParamBinding> {
        match self.get_data(identity, Family::FunctionParams) {
            Some(RegistryValue::Params(params)) => params,
            _ => Vec::new(),
        }
    }

    pub fn name_of(&self, identity: &Identity, family: Family) -> Option<String> {
        match self.get_data(identity, family)? {
            RegistryValue::Name(name) => Some(name),
            _ => None,
        }
    }

    /// The marker recorded for `identity`, if any.
    ///
    /// Actions only count once their class-level marker has been recorded.
    pub fn marker_kind(&self, identity: &Identity) -> Option<MarkerKind> {
        if self.contains(identity, Family::Injections) {
            return Some(MarkerKind::Class);
        }
        self.action(identity)
            .filter(ActionDescriptor::has_target)
            .map(|_| MarkerKind::Action)
    }

    /// Drop every entry and refuse further registrations.
    pub fn clear(&self) {
        self.inner.frozen.store(true, Ordering::SeqCst);
        self.inner.entries.clear();
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn ensure_writable(&self, identity: &Identity) -> Result<(), RegistryError> {
        if identity.is_empty() {
            return Err(RegistryError::EmptyIdentity);
        }
        if self.is_frozen() {
            return Err(RegistryError::Frozen {
                identity: identity.to_string(),
            });
        }
        Ok(())
    }
}
