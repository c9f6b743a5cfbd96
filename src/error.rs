//! Error types for the container and the startup sequence.

use std::io;

use thiserror::Error;

use crate::secrets::FragmentKind;

/// Resolution-time container errors.
///
/// These surface when a service is looked up after the provider has been
/// built. The startup sequence turns any of them raised while instantiating
/// singletons into [`RegistrationError::Construction`].
///
/// # Examples
///
/// ```rust
/// use acme_order::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build().unwrap();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Request-scoped service requested outside of a scope
    #[error("Lifetime error: {0} is request-scoped and cannot be resolved from the root provider")]
    WrongLifetime(&'static str),
    /// A factory resolved a service that is still being constructed
    #[error("Circular resolution: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Resolution nested deeper than the container allows
    #[error("Resolution depth exceeded: {0}")]
    DepthExceeded(usize),
    /// A factory reported a failure of its own
    #[error("Factory for {service} failed: {message}")]
    Factory {
        service: &'static str,
        message: String,
    },
}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;

/// Fatal configuration problems detected before any service is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// One or more database connection fragments were absent or blank.
    ///
    /// Only fragment names are carried, never their values.
    #[error("PostgreSQL connection values missing or blank: {}", join_kinds(.0))]
    MissingFragments(Vec<FragmentKind>),

    /// A named configuration section could not be bound to its typed settings.
    #[error("configuration section `{section}` could not be bound: {message}")]
    InvalidSection { section: String, message: String },

    /// A configuration file exists but could not be read or parsed.
    #[error("configuration file `{path}` could not be loaded: {message}")]
    Source { path: String, message: String },
}

fn join_kinds(kinds: &[FragmentKind]) -> String {
    kinds
        .iter()
        .map(|k| k.file_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Dependency-graph problems found while building the provider.
///
/// All of these are raised by [`ServiceCollection::build`](crate::ServiceCollection::build),
/// before the process accepts traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("{service} depends on {dependency}, which is not registered")]
    MissingDependency {
        service: &'static str,
        dependency: &'static str,
    },

    #[error("singleton {singleton} cannot depend on request-scoped {scoped}")]
    CapturedScope {
        singleton: &'static str,
        scoped: &'static str,
    },

    #[error("circular dependency: {}", .path.join(" -> "))]
    Circular { path: Vec<&'static str> },

    #[error("{service} is registered more than once")]
    Duplicate { service: &'static str },

    #[error("failed to construct singleton {service}: {source}")]
    Construction {
        service: &'static str,
        #[source]
        source: DiError,
    },
}

/// Anything that stops the process from reaching the serving state.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server terminated: {0}")]
    Serve(#[source] io::Error),
}
