//! Factory-method interception.
//!
//! A call to an intercepted factory method takes one of three paths:
//!
//! 1. The container is calling it to build the component (the thread's
//!    invoked-method marker names this method and is unclaimed): run the body.
//! 2. An object factory already sits under the component name: hand out a
//!    redirecting wrapper around it.
//! 3. Anything else is a reference from another component: resolve the name
//!    through the container instead of running the body again.

use std::any::{Any, TypeId};

use tracing::debug;

use crate::args::Args;
use crate::container::Container;
use crate::enhance::descriptor::{FactoryMeta, ReturnKind};
use crate::enhance::redirect;
use crate::enhance::{Configuration, EnhancedInstance, EnhancedMethod};
use crate::error::{DiError, DiResult};
use crate::factory;
use crate::internal::invocation;
use crate::key;
use crate::registration::AnyArc;

pub(crate) fn intercept<C: Configuration>(
    instance: &EnhancedInstance<C>,
    method: &EnhancedMethod<C>,
    args: &Args,
) -> DiResult<AnyArc> {
    let meta = method.descriptor.factory().ok_or_else(|| {
        DiError::InvariantViolation(format!(
            "method {} is not a factory method but was routed to the interceptor",
            method.descriptor.id
        ))
    })?;
    let container = instance.container()?;

    let mut name = meta.component_name.clone();
    if meta.scoped_proxy {
        let target = key::scoped_target_name(&name);
        if container.is_currently_in_creation(&name) || container.is_currently_in_creation(&target) {
            name = target;
        }
    }

    if meta.returns == ReturnKind::ObjectFactory {
        let existing = container
            .singleton_registry()
            .get_if_present(&name)
            .and_then(|value| factory::as_factory(&value));
        if let Some(existing) = existing {
            return Ok(factory::into_value(redirect::redirecting(&container, &name, existing)));
        }
    }

    if invocation::claim(&method.descriptor.id) {
        debug!(method = %method.descriptor.id, component = %name, "invoking factory method for container");
        return instance.invoke_body(method, args);
    }

    resolve_reference(&container, meta, &method.descriptor.id.to_string(), &name, args)
}

fn resolve_reference(
    container: &Container,
    meta: &FactoryMeta,
    method: &str,
    name: &str,
    args: &Args,
) -> DiResult<AnyArc> {
    let registry = container.singleton_registry();
    let lookup = match meta.returns {
        ReturnKind::ObjectFactory => key::factory_dereference(name),
        ReturnKind::Object => name.to_string(),
    };

    let value = {
        // A body that calls its own method must reach the registry, which
        // would otherwise refuse the name while it is in creation. The
        // resolution stack still reports the cycle.
        let _suspension = registry.suspend_creation(name);
        // Null placeholders cannot be forwarded to a shared singleton.
        let forward = !args.is_empty() && !(container.is_singleton(name) && args.has_null());
        if forward {
            container.resolve_any(&lookup, args)?
        } else {
            container.resolve_any(&lookup, &Args::new())?
        }
    };

    if value_type(&value) != meta.return_type {
        return Err(DiError::ConfigurationConflict {
            name: name.to_string(),
            method: method.to_string(),
            expected: meta.return_type_name,
            actual: container.type_name_of(name),
        });
    }

    // The dependent is the nearest component built through a factory method.
    // Closure components in between are not tracked, so the reference is
    // credited to the factory-method component that encloses them.
    let outer = invocation::current_component();
    if let Some(outer) = outer.as_deref() {
        registry.register_dependent(name, outer);
    }
    container.observers().reference_resolved(name, outer.as_deref());
    debug!(component = name, referenced_from = ?outer, "factory method resolved as reference");

    if meta.returns == ReturnKind::ObjectFactory {
        if let Some(raw) = factory::as_factory(&value) {
            return Ok(factory::into_value(redirect::redirecting(container, name, raw)));
        }
    }
    Ok(value)
}

fn value_type(value: &AnyArc) -> TypeId {
    let inner: &(dyn Any + Send + Sync) = &**value;
    let any: &dyn Any = inner;
    any.type_id()
}
