use crate::lifecycle::LifecycleError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActionwireError>;

/// Anything a handler, hook or middleware may fail with.
pub type HandlerError = anyhow::Error;

/// What an action handler returns. The response itself goes through the writer.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Errors raised while recording metadata.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Value of kind '{value}' cannot be stored in the '{family}' family")]
    FamilyMismatch { family: String, value: String },

    #[error("The registry is frozen, '{identity}' was registered after startup")]
    Frozen { identity: String },

    #[error("An identity is required for registration")]
    EmptyIdentity,
}

/// Errors raised by `Injector::inject`.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("A value is required for injection of '{key}'")]
    MissingValue { key: String },

    #[error(
        "The injected type for '{identity}' is '{marker}', but the InjectType is not 'Class' or 'Middleware'"
    )]
    MarkerMismatch { identity: String, marker: String },

    #[error("Unable to inject {key} with type {kind}")]
    Unsupported { key: String, kind: String },
}

/// A discovered file that could not be mapped to a registered component.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Module '{module}' is not in the catalog")]
    UnknownModule { module: String },

    #[error("Module '{module}' failed to load: {message}")]
    Failed { module: String, message: String },
}

/// Fatal configuration problems detected at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The configuration is not provided")]
    MissingConfiguration,

    #[error("The root file is not configured")]
    MissingRoot,

    #[error("The api prefix is not configured")]
    MissingApiPrefix,

    #[error("The application router is not provided")]
    MissingApplication,

    #[error("The {0} is not provided")]
    MissingComponent(&'static str),

    #[error("Failed to read configuration file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Errors that abort route materialization.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(
        "Static path '{path}' overlaps the api prefix '{prefix}', set disable_index_router to allow it"
    )]
    StaticPathCollision { path: String, prefix: String },

    #[error(transparent)]
    Injection(#[from] InjectionError),
}

#[derive(Debug, Error)]
pub enum ActionwireError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Injection(#[from] InjectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Internal error: {0}")]
    Internal(String),
}
