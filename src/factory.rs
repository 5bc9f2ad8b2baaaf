//! Object factories: components that produce another object on request.
//!
//! Looking up `name` for a component whose value is an object factory returns
//! the factory's product; looking up `&name` returns the factory itself.
//! Products of factories reporting [`ObjectFactory::is_singleton`] are cached
//! by the container.

use std::sync::{Arc, Weak};

use crate::args::Args;
use crate::container::{Container, ContainerInner};
use crate::error::{DiError, DiResult};
use crate::registration::AnyArc;

/// A factory-of-objects component.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{AnyArc, ContainerBuilder, DiResult, ObjectFactory, Resolver};
/// use std::sync::Arc;
///
/// struct PoolFactory { size: usize }
///
/// impl ObjectFactory for PoolFactory {
///     fn get_object(&self) -> DiResult<AnyArc> {
///         Ok(Arc::new(vec![0u8; self.size]) as AnyArc)
///     }
///     fn object_type(&self) -> Option<&'static str> {
///         Some(std::any::type_name::<Vec<u8>>())
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_object_factory("pool", PoolFactory { size: 4 });
/// let container = builder.build().unwrap();
///
/// let pool = container.get::<Vec<u8>>("pool").unwrap();
/// assert_eq!(pool.len(), 4);
/// assert!(Arc::ptr_eq(&pool, &container.get::<Vec<u8>>("pool").unwrap()));
/// assert!(container.get_factory("pool").is_ok());
/// ```
pub trait ObjectFactory: Send + Sync + 'static {
    /// Produces the object. For singleton factories the container calls this
    /// at most once per container.
    fn get_object(&self) -> DiResult<AnyArc>;

    /// Type name of the produced object, if known up front.
    fn object_type(&self) -> Option<&'static str> {
        None
    }

    /// Whether the product is shared. Defaults to true.
    fn is_singleton(&self) -> bool {
        true
    }

    fn kind(&self) -> FactoryKind {
        FactoryKind::Plain
    }

    /// Whether the factory may be wrapped so that `get_object` calls made
    /// through a factory method go to the container's cache. Returning false
    /// leaves the raw factory in the caller's hands.
    fn supports_redirection(&self) -> bool {
        true
    }
}

/// Shared handle to an object factory. This is the stored value type of
/// every object factory component.
pub type SharedFactory = Arc<dyn ObjectFactory>;

/// Kinds of object factory the enhancer treats differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    /// Ordinary factory; calls through a factory method are redirected to the
    /// container.
    Plain,
    /// Scope management factory; never wrapped.
    ScopedProxy,
}

/// Extracts the factory stored in a component value, if it is one.
pub(crate) fn as_factory(value: &AnyArc) -> Option<SharedFactory> {
    value.downcast_ref::<SharedFactory>().cloned()
}

/// Stores a factory as a component value.
pub(crate) fn into_value(factory: SharedFactory) -> AnyArc {
    Arc::new(factory)
}

/// Proxy half of a scope-proxied component.
///
/// Bound under the plain name as a singleton; every `get_object` resolves the
/// real target from its scope under the `scopedTarget.` name.
pub struct ScopedProxyFactory {
    target_name: String,
    object_type: &'static str,
    container: Weak<ContainerInner>,
}

impl ScopedProxyFactory {
    pub(crate) fn new(target_name: String, object_type: &'static str, container: &Container) -> Self {
        Self {
            target_name,
            object_type,
            container: container.downgrade(),
        }
    }

    /// Internal name of the proxied target.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }
}

impl ObjectFactory for ScopedProxyFactory {
    fn get_object(&self) -> DiResult<AnyArc> {
        let container = Container::upgrade(&self.container).ok_or_else(|| {
            DiError::InvariantViolation(format!(
                "scoped proxy for '{}' outlived its container",
                self.target_name
            ))
        })?;
        container.resolve_any(&self.target_name, &Args::new())
    }

    fn object_type(&self) -> Option<&'static str> {
        Some(self.object_type)
    }

    fn is_singleton(&self) -> bool {
        false
    }

    fn kind(&self) -> FactoryKind {
        FactoryKind::ScopedProxy
    }

    fn supports_redirection(&self) -> bool {
        false
    }
}
