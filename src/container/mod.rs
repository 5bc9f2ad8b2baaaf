//! The container: resolves components by name and drives their lifecycle.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::RwLock;
use tracing::debug;

use crate::args::Args;
use crate::config::ContainerOptions;
use crate::enhance::{Configuration, EnhancedInstance, Enhancer, Param};
use crate::error::{DiError, DiResult};
use crate::factory::{self, SharedFactory};
use crate::internal::{circular, with_circular_guard};
use crate::key;
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::registration::{AnyArc, Definition, Origin, Registry};
use crate::scope::ComponentScope;
use crate::singleton::SingletonRegistry;
use crate::traits::{Resolver, ResolverCore};

mod builder;

pub use builder::ContainerBuilder;

/// Resolves components and owns their singletons.
///
/// Cloning is cheap; every clone shares the same registry. Enhanced
/// configuration instances hold a weak reference back to it.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Args, ContainerBuilder, Lifetime, Resolver};
///
/// struct Greeter { greeting: String }
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_singleton("greeting", "hello".to_string());
/// builder.add_factory("greeter", Lifetime::Transient, |c, _| {
///     Ok(Greeter { greeting: c.get::<String>("greeting")?.to_string() })
/// });
/// let container = builder.build().unwrap();
///
/// assert_eq!(container.get::<Greeter>("greeter").unwrap().greeting, "hello");
/// assert!(container.is_singleton("greeting"));
/// assert!(!container.is_singleton("greeter"));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    definitions: Registry,
    singletons: SingletonRegistry,
    scopes: HashMap<&'static str, Arc<dyn ComponentScope>>,
    enhancer: Arc<Enhancer>,
    observers: Observers,
    options: ContainerOptions,
    /// Type names of singletons registered at runtime without a definition
    external_types: RwLock<HashMap<String, &'static str>>,
}

impl Container {
    pub(crate) fn new(
        definitions: Registry,
        scopes: HashMap<&'static str, Arc<dyn ComponentScope>>,
        enhancer: Arc<Enhancer>,
        observers: Observers,
        options: ContainerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                definitions,
                singletons: SingletonRegistry::new(),
                scopes,
                enhancer,
                observers,
                options,
                external_types: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<ContainerInner>) -> Option<Container> {
        weak.upgrade().map(|inner| Container { inner })
    }

    #[inline]
    pub(crate) fn observers(&self) -> &Observers {
        &self.inner.observers
    }

    pub fn singleton_registry(&self) -> &SingletonRegistry {
        &self.inner.singletons
    }

    pub fn enhancer(&self) -> &Arc<Enhancer> {
        &self.inner.enhancer
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    /// Resolves `name` (or the object factory itself for `&name`).
    pub fn resolve_any(&self, name: &str, args: &Args) -> DiResult<AnyArc> {
        let bean = key::transformed_name(name);
        let instance = self.resolve_raw(bean, args)?;
        self.object_for_instance(name, bean, instance)
    }

    /// The enhanced instance of configuration `C`.
    pub fn configuration<C: Configuration>(&self) -> DiResult<Arc<EnhancedInstance<C>>> {
        self.get::<EnhancedInstance<C>>(&C::component_name())
    }

    pub fn contains(&self, name: &str) -> bool {
        let name = key::transformed_name(name);
        self.inner.definitions.contains(name) || self.inner.singletons.contains(name)
    }

    /// True if `name` resolves to one shared instance.
    pub fn is_singleton(&self, name: &str) -> bool {
        let name = key::transformed_name(name);
        match self.inner.definitions.get(name) {
            Some(definition) => definition.lifetime.is_singleton(),
            None => self.inner.singletons.contains(name),
        }
    }

    /// Declared lifetime of `name`, if it has a definition.
    pub fn lifetime_of(&self, name: &str) -> Option<Lifetime> {
        self.inner
            .definitions
            .get(key::transformed_name(name))
            .map(|definition| definition.lifetime)
    }

    /// Where the definition of `name` came from.
    pub fn origin_of(&self, name: &str) -> Option<Origin> {
        self.inner
            .definitions
            .get(key::transformed_name(name))
            .map(|definition| definition.origin.clone())
    }

    /// True if the value stored under `name` is a `T`, judged by its
    /// definition's declared type without creating it.
    pub fn is_type_match<T: 'static>(&self, name: &str) -> bool {
        let name = key::transformed_name(name);
        match self.inner.definitions.get(name) {
            Some(definition) => definition.type_id == TypeId::of::<T>(),
            None => self
                .inner
                .singletons
                .get_if_present(name)
                .is_some_and(|value| value.is::<T>()),
        }
    }

    /// Registered names in registration order.
    pub fn component_names(&self) -> Vec<String> {
        self.inner
            .definitions
            .iter()
            .map(|definition| definition.name.clone())
            .collect()
    }

    /// True while `name` is being built: either marked in the singleton
    /// registry or open on this thread's resolution stack.
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.inner.singletons.is_in_creation(name) || circular::is_resolving(name)
    }

    /// Registers a pre-built singleton at runtime. It takes precedence over
    /// any definition under the same name that has not been created yet.
    pub fn register_singleton<T: Send + Sync + 'static>(&self, name: &str, value: T) -> DiResult<()> {
        self.inner.singletons.register(name, Arc::new(value))?;
        self.inner
            .external_types
            .write()
            .insert(name.to_string(), type_name::<T>());
        debug!(component = name, "registered external singleton");
        Ok(())
    }

    /// Type name recorded for `name`.
    pub(crate) fn type_name_of(&self, name: &str) -> &'static str {
        if let Some(external) = self.inner.external_types.read().get(name) {
            return *external;
        }
        self.inner
            .definitions
            .get(name)
            .map(|definition| definition.type_name)
            .unwrap_or("<unknown>")
    }

    /// Creates every non-lazy singleton, in registration order. Object
    /// factories are created but their products are not.
    pub fn preinstantiate_singletons(&self) -> DiResult<()> {
        let eager: Vec<String> = self
            .inner
            .definitions
            .iter()
            .filter(|definition| definition.lifetime.is_singleton() && !definition.lazy)
            .map(|definition| definition.name.clone())
            .collect();
        debug!(count = eager.len(), "pre-instantiating singletons");
        for name in eager {
            self.resolve_raw(&name, &Args::new())?;
        }
        Ok(())
    }

    /// Destroys every singleton, dependents first, then clears the registry.
    /// Destroy hooks run exactly once per instance.
    pub fn destroy_singletons(&self) {
        let definitions = &self.inner.definitions;
        self.inner.singletons.destroy_singletons(|name, instance| {
            let hook = definitions.get(name).and_then(|definition| definition.destroy.clone());
            if let Some(hook) = hook {
                hook(&instance);
            }
        });
        self.inner.external_types.write().clear();
    }

    fn definition(&self, name: &str) -> DiResult<&Arc<Definition>> {
        self.inner
            .definitions
            .get(name)
            .ok_or_else(|| DiError::NotFound(name.to_string()))
    }

    /// Resolves the stored value for `name`: an object factory stays a factory.
    pub(crate) fn resolve_raw(&self, name: &str, args: &Args) -> DiResult<AnyArc> {
        if let Some(existing) = self.inner.singletons.get_if_present(name) {
            return Ok(existing);
        }
        let definition = self.definition(name)?;
        match definition.lifetime {
            Lifetime::Singleton => self
                .inner
                .singletons
                .get_or_create(name, || self.create(definition, args)),
            Lifetime::Transient => self.create(definition, args),
            Lifetime::Scoped(scope) => {
                let store = self.inner.scopes.get(scope).ok_or_else(|| DiError::UnknownScope {
                    name: name.to_string(),
                    scope,
                })?;
                store.get(name, &mut || self.create(definition, args))
            }
        }
    }

    fn create(&self, definition: &Definition, args: &Args) -> DiResult<AnyArc> {
        with_circular_guard(&definition.name, || {
            let observers = &self.inner.observers;
            if !observers.has_observers() {
                return (definition.ctor)(self, args);
            }
            let started = Instant::now();
            observers.creating(&definition.name);
            let result = (definition.ctor)(self, args);
            match &result {
                Ok(_) => observers.created(&definition.name, started.elapsed()),
                Err(err) => observers.creation_failed(&definition.name, err),
            }
            result
        })
    }

    /// Turns a stored value into what was asked for: the factory itself for
    /// `&name`, otherwise the product of a factory or the value unchanged.
    fn object_for_instance(&self, requested: &str, name: &str, instance: AnyArc) -> DiResult<AnyArc> {
        let factory = factory::as_factory(&instance);
        if key::is_factory_dereference(requested) {
            return match factory {
                Some(_) => Ok(instance),
                None => Err(DiError::NotAFactory(name.to_string())),
            };
        }
        let Some(factory) = factory else {
            return Ok(instance);
        };
        if factory.is_singleton() && self.is_singleton(name) {
            self.inner
                .singletons
                .get_or_create_product(name, || self.product_of(name, &factory))
        } else {
            self.product_of(name, &factory)
        }
    }

    fn product_of(&self, name: &str, factory: &SharedFactory) -> DiResult<AnyArc> {
        with_circular_guard(name, || factory.get_object())
    }

    /// Fills the constructor arguments of a factory method. Explicit values
    /// win; missing or null positions resolve the declared parameter.
    pub(crate) fn resolve_arguments(&self, params: &[Param], explicit: &Args) -> DiResult<Args> {
        let len = params.len().max(explicit.len());
        let mut slots = Vec::with_capacity(len);
        for index in 0..len {
            let provided = explicit.slots().get(index).cloned().flatten();
            let value = match (provided, params.get(index)) {
                (Some(value), _) => value,
                (None, Some(param)) => self.resolve_any(&param.component, &Args::new())?,
                (None, None) => {
                    return Err(DiError::InvariantViolation(format!(
                        "argument {index} is null and has no declared parameter"
                    )))
                }
            };
            slots.push(Some(value));
        }
        Ok(Args::from_slots(slots))
    }
}

impl ResolverCore for Container {
    fn resolve_any(&self, name: &str, args: &Args) -> DiResult<AnyArc> {
        Container::resolve_any(self, name, args)
    }

    fn contains(&self, name: &str) -> bool {
        Container::contains(self, name)
    }
}

impl Resolver for Container {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("components", &self.inner.definitions.len())
            .field("singletons", &self.inner.singletons.singleton_count())
            .field("scopes", &self.inner.scopes.keys().collect::<Vec<_>>())
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}
