//! Redirecting wrapper for object factories handed out by factory methods.

use std::sync::{Arc, Weak};

use crate::args::Args;
use crate::container::{Container, ContainerInner};
use crate::error::{DiError, DiResult};
use crate::factory::{FactoryKind, ObjectFactory, SharedFactory};
use crate::registration::AnyArc;

/// Object factory whose `get_object` goes back to the container, so the
/// product comes from the container's cache instead of a fresh call on the
/// raw factory. Every other method delegates.
pub(crate) struct RedirectingFactory {
    name: String,
    target: SharedFactory,
    container: Weak<ContainerInner>,
}

impl ObjectFactory for RedirectingFactory {
    fn get_object(&self) -> DiResult<AnyArc> {
        let container = Container::upgrade(&self.container).ok_or_else(|| {
            DiError::InvariantViolation(format!(
                "redirecting factory for '{}' outlived its container",
                self.name
            ))
        })?;
        container.resolve_any(&self.name, &Args::new())
    }

    fn object_type(&self) -> Option<&'static str> {
        self.target.object_type()
    }

    fn is_singleton(&self) -> bool {
        self.target.is_singleton()
    }

    fn kind(&self) -> FactoryKind {
        self.target.kind()
    }

    fn supports_redirection(&self) -> bool {
        self.target.supports_redirection()
    }
}

/// Wraps `factory` so that product requests go to the container under `name`.
///
/// Scoped proxies are returned untouched. A factory that refuses redirection
/// is returned raw with a warning; callers of its `get_object` bypass the
/// container's cache.
pub(crate) fn redirecting(container: &Container, name: &str, factory: SharedFactory) -> SharedFactory {
    if factory.kind() == FactoryKind::ScopedProxy {
        return factory;
    }
    if !factory.supports_redirection() {
        tracing::warn!(
            name,
            "object factory does not support redirection; get_object calls on the returned \
             factory will bypass the container's singleton cache"
        );
        container.observers().redirect_degraded(name);
        return factory;
    }
    Arc::new(RedirectingFactory {
        name: name.to_string(),
        target: factory,
        container: container.downgrade(),
    })
}
