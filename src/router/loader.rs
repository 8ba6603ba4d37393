use crate::error::LoadError;
use crate::registry::Identity;
use std::collections::HashMap;

/// Maps a discovered module to the component it exports.
///
/// Modules are named by their path below the application root, without
/// extension and with `/` separators, e.g. `actions/admin/users`.
pub trait ModuleLoader: Send + Sync + 'static {
    fn load(&self, module: &str) -> Result<Identity, LoadError>;
}

/// In-memory loader populated during bootstrap.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = ModuleCatalog::new()
///     .module("domain/user", "UserDomain")
///     .module("actions/admin/users", "UsersAction");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, Identity>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module: &str, identity: impl Into<Identity>) -> Self {
        self.insert(module, identity);
        self
    }

    pub fn insert(&mut self, module: &str, identity: impl Into<Identity>) {
        self.modules.insert(Self::key(module), identity.into());
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn key(module: &str) -> String {
        module
            .replace('\\', "/")
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl ModuleLoader for ModuleCatalog {
    fn load(&self, module: &str) -> Result<Identity, LoadError> {
        self.modules
            .get(&Self::key(module))
            .cloned()
            .ok_or_else(|| LoadError::UnknownModule {
                module: module.to_string(),
            })
    }
}
