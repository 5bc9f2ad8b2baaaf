//! Resolver traits for component lookup.

use std::any::type_name;
use std::sync::Arc;

use crate::args::Args;
use crate::error::{DiError, DiResult};
use crate::factory::{self, SharedFactory};
use crate::key;
use crate::registration::AnyArc;

/// Object-safe name-based lookup.
///
/// A leading `&` on `name` asks for an object factory itself instead of its
/// product. `args` are forwarded to the component's constructor; an empty
/// list means "use the declared parameters".
pub trait ResolverCore: Send + Sync {
    fn resolve_any(&self, name: &str, args: &Args) -> DiResult<AnyArc>;

    fn contains(&self, name: &str) -> bool;
}

/// Typed lookups built on [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_beans::{ContainerBuilder, Resolver};
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_singleton("greeting", "hello".to_string());
/// let container = builder.build().unwrap();
///
/// let greeting = container.get::<String>("greeting").unwrap();
/// assert_eq!(greeting.as_str(), "hello");
/// assert!(container.try_get::<String>("farewell").unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `name` and downcasts it to `T`.
    fn get<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.get_with(name, &Args::new())
    }

    /// Resolves `name` with explicit constructor arguments.
    fn get_with<T: Send + Sync + 'static>(&self, name: &str, args: &Args) -> DiResult<Arc<T>> {
        self.resolve_any(name, args)?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Like [`get`](Self::get), but an unknown name yields `None`.
    fn try_get<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        match self.get::<T>(name) {
            Ok(value) => Ok(Some(value)),
            Err(DiError::NotFound(missing)) if missing == key::transformed_name(name) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Panics when `name` cannot be resolved.
    fn get_required<T: Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        self.get::<T>(name)
            .unwrap_or_else(|e| panic!("Failed to resolve '{}' as {}: {}", name, type_name::<T>(), e))
    }

    /// The object factory registered under `name` (with or without the `&`).
    fn get_factory(&self, name: &str) -> DiResult<SharedFactory> {
        let name = key::transformed_name(name);
        let value = self.resolve_any(&key::factory_dereference(name), &Args::new())?;
        factory::as_factory(&value).ok_or_else(|| DiError::NotAFactory(name.to_string()))
    }
}
