//! Error types for the enhancement engine and its container.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised while enhancing configuration types or resolving components.
///
/// Every variant propagates to the caller of the factory method or lookup
/// that triggered it. The engine never swallows one of these; the only local
/// recovery is restoring creation flags and the invoked-method marker on the
/// way out.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{ContainerBuilder, DiError, Resolver};
///
/// let container = ContainerBuilder::new().build().unwrap();
/// match container.get::<String>("missing") {
///     Err(DiError::NotFound(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No component registered under this name
    #[error("No component named '{0}' is registered")]
    NotFound(String),

    /// Downcast of a resolved value failed
    #[error("Type mismatch for '{name}': expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// A component's construction reached back into itself (includes path)
    #[error("Circular reference: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    /// `begin_creation` was called for a name whose creation is already running
    #[error("Component '{0}' is currently in creation")]
    CurrentlyInCreation(String),

    /// A factory method was called as a component reference, but the name is
    /// bound to an instance of an incompatible type
    #[error(
        "Factory method {method} called as reference for type [{expected}] \
         but '{name}' is bound to an incompatible instance of type [{actual}]"
    )]
    ConfigurationConflict {
        name: String,
        method: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A factory method ran on an enhanced instance with no container attached
    #[error("Enhanced configuration {class} has no container back-reference; was it instantiated outside a container?")]
    MissingBackReference { class: &'static str },

    /// Internal bookkeeping was used inconsistently
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Two definitions share a name and overriding is disabled
    #[error("A component named '{0}' is already defined")]
    DuplicateDefinition(String),

    /// A singleton instance was registered twice under one name
    #[error("Could not register instance under '{0}': an instance is already bound")]
    AlreadyRegistered(String),

    /// A component refers to a scope that was never registered
    #[error("No scope registered for name '{scope}' (required by '{name}')")]
    UnknownScope { name: String, scope: &'static str },

    /// `&name` was requested but `name` is not an object factory
    #[error("Component '{0}' is not an object factory")]
    NotAFactory(String),

    /// A user body or object factory failed while producing `name`
    #[error("Error creating component '{name}': {source}")]
    Resolution {
        name: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Container options could not be read
    #[error("Invalid container options: {0}")]
    Config(String),
}

impl DiError {
    /// Wraps an arbitrary error raised while creating `name`.
    pub fn resolution<E>(name: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DiError::Resolution {
            name: name.into(),
            source: Arc::new(source),
        }
    }

    /// Returns true for errors that denote a reference cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, DiError::Circular(_) | DiError::CurrentlyInCreation(_))
    }
}

/// Result type for container and enhancement operations
///
/// ```rust
/// use ferrous_beans::{DiResult, DiError};
///
/// fn lookup() -> DiResult<()> {
///     Err(DiError::NotFound("dataSource".to_string()))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
