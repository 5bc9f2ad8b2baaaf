//! Configuration enhancement.
//!
//! A [`Configuration`] type declares its factory methods once through
//! [`Configuration::describe`]. The [`Enhancer`] turns that declaration into an
//! [`EnhancedClass`]: a method table with a callback fixed per method. The
//! container instantiates the class as an [`EnhancedInstance`], which carries a
//! back-reference to the container and routes every method call through its
//! callback.
//!
//! The effect is that a factory method body calling another factory method
//! gets the container-managed component, not a fresh object:
//!
//! ```rust
//! use ferrous_beans::{Configuration, ConfigurationMethods, ContainerBuilder, Resolver};
//! use std::sync::Arc;
//!
//! struct DataSource;
//! struct Repository { ds: Arc<DataSource> }
//! struct Service { ds: Arc<DataSource> }
//!
//! struct AppConfig;
//!
//! impl Configuration for AppConfig {
//!     fn describe(m: &mut ConfigurationMethods<Self>) {
//!         m.component("dataSource", |_, _| Ok(DataSource));
//!         m.component("repository", |this, _| Ok(Repository { ds: this.call("dataSource")? }));
//!         m.component("service", |this, _| Ok(Service { ds: this.call("dataSource")? }));
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.add_configuration(AppConfig).unwrap();
//! let container = builder.build().unwrap();
//!
//! let repo = container.get::<Repository>("repository").unwrap();
//! let service = container.get::<Service>("service").unwrap();
//! assert!(Arc::ptr_eq(&repo.ds, &service.ds));
//! ```

mod descriptor;
mod dispatch;
mod interceptor;
mod redirect;

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;

use crate::args::Args;
use crate::container::{Container, ContainerInner};
use crate::error::{DiError, DiResult};
use crate::factory::{self, SharedFactory};
use crate::key;
use crate::registration::{AnyArc, DestroyHook};

pub use descriptor::{
    ComponentMethod, ConfigurationMethods, FactoryMeta, MethodDescriptor, MethodId, MethodKind,
    Param, ReturnKind, SET_CONTAINER_METHOD,
};
pub use dispatch::{
    any_method, is_factory_method, is_set_container, Callback, CallbackFilter, MethodPredicate,
};

use descriptor::{MethodBody, MethodEntry};

/// A type whose factory methods the container manages.
pub trait Configuration: Send + Sync + Sized + 'static {
    /// Declares the type's methods.
    fn describe(methods: &mut ConfigurationMethods<Self>);

    /// Name under which the enhanced instance itself is registered.
    fn component_name() -> String {
        key::default_component_name(type_name::<Self>())
    }
}

/// Contract implemented by every enhanced instance: it accepts a container
/// back-reference exactly once.
pub trait EnhancedConfiguration: Send + Sync {
    fn set_container(&self, container: &Container) -> DiResult<()>;

    fn has_container(&self) -> bool;

    /// Type name of the configuration this instance enhances.
    fn configuration_type(&self) -> &'static str;
}

pub(crate) struct EnhancedMethod<C: Configuration> {
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) callback: Callback,
    body: Option<MethodBody<C>>,
    destroy: Option<DestroyHook>,
}

/// Synthesized method table for one configuration type.
pub struct EnhancedClass<C: Configuration> {
    component_name: String,
    methods: Vec<EnhancedMethod<C>>,
    by_name: HashMap<&'static str, usize>,
}

impl<C: Configuration> EnhancedClass<C> {
    fn synthesize(filter: &CallbackFilter) -> DiResult<Self> {
        let mut declared = ConfigurationMethods::new();
        C::describe(&mut declared);

        let setter = MethodDescriptor::set_container::<C>();
        let mut methods = Vec::new();
        let mut by_name = HashMap::new();

        let entries = std::iter::once((setter, None, None)).chain(
            declared
                .into_entries()
                .into_iter()
                .map(|MethodEntry { descriptor, body, destroy }| (descriptor, Some(body), destroy)),
        );

        for (descriptor, body, destroy) in entries {
            let name = descriptor.id.name();
            if by_name.insert(name, methods.len()).is_some() {
                return Err(DiError::InvariantViolation(format!(
                    "{} declares method '{name}' more than once",
                    type_name::<C>()
                )));
            }
            let callback = filter.resolve(&descriptor)?;
            methods.push(EnhancedMethod {
                descriptor,
                callback,
                body,
                destroy,
            });
        }

        Ok(Self {
            component_name: C::component_name(),
            methods,
            by_name,
        })
    }

    pub fn class_name(&self) -> &'static str {
        type_name::<C>()
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Every method of the synthesized class, the back-reference setter first.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().map(|m| &m.descriptor)
    }

    pub fn callback_for(&self, method: &str) -> Option<Callback> {
        self.method(method).map(|m| m.callback)
    }

    /// Factory methods in declaration order.
    pub fn factory_methods(&self) -> impl Iterator<Item = (&MethodDescriptor, &FactoryMeta)> {
        self.methods
            .iter()
            .filter_map(|m| m.descriptor.factory().map(|meta| (&m.descriptor, meta)))
    }

    /// Creates an unbound instance around `target`.
    pub fn instantiate(self: &Arc<Self>, target: Arc<C>) -> Arc<EnhancedInstance<C>> {
        Arc::new(EnhancedInstance {
            class: Arc::clone(self),
            target,
            container: OnceCell::new(),
        })
    }

    pub(crate) fn method(&self, name: &str) -> Option<&EnhancedMethod<C>> {
        self.by_name.get(name).map(|&index| &self.methods[index])
    }

    pub(crate) fn destroy_hook(&self, method: &str) -> Option<DestroyHook> {
        self.method(method).and_then(|m| m.destroy.clone())
    }
}

impl<C: Configuration> fmt::Debug for EnhancedClass<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancedClass")
            .field("class", &self.class_name())
            .field("component_name", &self.component_name)
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// An instance of an enhanced configuration type.
///
/// Dereferences to the configuration value, so plain fields and inherent
/// methods stay reachable. Declared methods are called through
/// [`call`](Self::call) and friends.
pub struct EnhancedInstance<C: Configuration> {
    class: Arc<EnhancedClass<C>>,
    target: Arc<C>,
    container: OnceCell<Weak<ContainerInner>>,
}

impl<C: Configuration> EnhancedInstance<C> {
    pub fn class(&self) -> &Arc<EnhancedClass<C>> {
        &self.class
    }

    pub fn target(&self) -> &Arc<C> {
        &self.target
    }

    /// The container this instance is bound to.
    pub fn container(&self) -> DiResult<Container> {
        self.container
            .get()
            .and_then(Container::upgrade)
            .ok_or(DiError::MissingBackReference {
                class: type_name::<C>(),
            })
    }

    /// Calls `method` through its callback.
    pub fn invoke(&self, method: &str, args: &Args) -> DiResult<AnyArc> {
        let entry = self.class.method(method).ok_or_else(|| {
            DiError::NotFound(format!("{}::{method}", type_name::<C>()))
        })?;
        match entry.callback {
            Callback::BindContainer => {
                let container = args.get::<Container>(0)?;
                self.bind(&container)?;
                Ok(Arc::new(()) as AnyArc)
            }
            Callback::InterceptFactoryMethod => interceptor::intercept(self, entry, args),
            Callback::NoIntercept => self.invoke_body(entry, args),
        }
    }

    /// Calls `method` with no arguments and downcasts the result.
    pub fn call<T: Any + Send + Sync>(&self, method: &str) -> DiResult<Arc<T>> {
        self.call_with(method, &Args::new())
    }

    pub fn call_with<T: Any + Send + Sync>(&self, method: &str, args: &Args) -> DiResult<Arc<T>> {
        self.invoke(method, args)?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch {
                name: method.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Calls a factory method that returns an object factory.
    pub fn object_factory(&self, method: &str) -> DiResult<SharedFactory> {
        let value = self.invoke(method, &Args::new())?;
        factory::as_factory(&value).ok_or_else(|| DiError::TypeMismatch {
            name: method.to_string(),
            expected: type_name::<SharedFactory>(),
        })
    }

    pub(crate) fn invoke_body(&self, method: &EnhancedMethod<C>, args: &Args) -> DiResult<AnyArc> {
        let body = method.body.as_ref().ok_or_else(|| {
            DiError::InvariantViolation(format!("method {} has no body", method.descriptor.id))
        })?;
        body(self, args)
    }

    fn bind(&self, container: &Container) -> DiResult<()> {
        self.container.set(container.downgrade()).map_err(|_| {
            DiError::InvariantViolation(format!(
                "{} is already bound to a container",
                type_name::<C>()
            ))
        })?;
        debug!(class = type_name::<C>(), "container back-reference set");
        Ok(())
    }
}

impl<C: Configuration> Deref for EnhancedInstance<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.target
    }
}

impl<C: Configuration> EnhancedConfiguration for EnhancedInstance<C> {
    fn set_container(&self, container: &Container) -> DiResult<()> {
        self.invoke(SET_CONTAINER_METHOD, &Args::new().with(container.clone()))
            .map(|_| ())
    }

    fn has_container(&self) -> bool {
        self.container.get().is_some()
    }

    fn configuration_type(&self) -> &'static str {
        type_name::<C>()
    }
}

impl<C: Configuration> fmt::Debug for EnhancedInstance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancedInstance")
            .field("class", &type_name::<C>())
            .field("bound", &self.has_container())
            .finish()
    }
}

/// Produces and caches enhanced classes, one per configuration type.
///
/// Synthesis runs outside the cache lock. Two threads enhancing the same type
/// at once may both synthesize, but only the first result is published and
/// both callers receive it.
pub struct Enhancer {
    filter: Arc<CallbackFilter>,
    cache: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Enhancer {
    pub fn new() -> Self {
        Self::with_filter(CallbackFilter::standard())
    }

    pub fn with_filter(filter: Arc<CallbackFilter>) -> Self {
        Self {
            filter,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the enhanced class for `C`, synthesizing it on first use.
    pub fn enhance<C: Configuration>(&self) -> DiResult<Arc<EnhancedClass<C>>> {
        if let Some(found) = self.cached::<C>() {
            return Ok(found);
        }

        let synthesized: Arc<dyn Any + Send + Sync> =
            Arc::new(EnhancedClass::<C>::synthesize(&self.filter)?);
        let published = self
            .cache
            .lock()
            .entry(TypeId::of::<C>())
            .or_insert(synthesized)
            .clone();
        debug!(class = type_name::<C>(), "enhanced configuration class");
        published.downcast::<EnhancedClass<C>>().map_err(|_| {
            DiError::InvariantViolation(format!(
                "enhancer cache entry for {} has the wrong type",
                type_name::<C>()
            ))
        })
    }

    /// Enhancing an already enhanced class is a no-op.
    pub fn enhance_class<C: Configuration>(&self, class: &Arc<EnhancedClass<C>>) -> Arc<EnhancedClass<C>> {
        debug!(class = type_name::<C>(), "class is already enhanced");
        Arc::clone(class)
    }

    pub fn is_enhanced<C: Configuration>(&self) -> bool {
        self.cache.lock().contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    fn cached<C: Configuration>(&self) -> Option<Arc<EnhancedClass<C>>> {
        let entry = self.cache.lock().get(&TypeId::of::<C>()).cloned()?;
        entry.downcast::<EnhancedClass<C>>().ok()
    }
}

impl Default for Enhancer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Enhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enhancer")
            .field("filter", &self.filter)
            .field("classes", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;

    impl Configuration for Sample {
        fn describe(m: &mut ConfigurationMethods<Self>) {
            m.component("alpha", |_, _| Ok(1u32));
            m.object_factory("beta", |_, _| Ok(Fixed));
            m.method("helper", |_, _| Ok("help"));
        }
    }

    struct Fixed;

    impl crate::factory::ObjectFactory for Fixed {
        fn get_object(&self) -> DiResult<AnyArc> {
            Ok(Arc::new(0u8) as AnyArc)
        }
    }

    struct Twice;

    impl Configuration for Twice {
        fn describe(m: &mut ConfigurationMethods<Self>) {
            m.component("x", |_, _| Ok(1u8));
            m.component("x", |_, _| Ok(2u8));
        }
    }

    #[test]
    fn enhance_is_idempotent_per_type() {
        let enhancer = Enhancer::new();
        let first = enhancer.enhance::<Sample>().unwrap();
        let second = enhancer.enhance::<Sample>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&enhancer.enhance_class(&first), &first));
        assert_eq!(enhancer.len(), 1);
    }

    #[test]
    fn callbacks_are_fixed_per_method() {
        let class = Enhancer::new().enhance::<Sample>().unwrap();
        assert_eq!(class.callback_for(SET_CONTAINER_METHOD), Some(Callback::BindContainer));
        assert_eq!(class.callback_for("alpha"), Some(Callback::InterceptFactoryMethod));
        assert_eq!(class.callback_for("beta"), Some(Callback::InterceptFactoryMethod));
        assert_eq!(class.callback_for("helper"), Some(Callback::NoIntercept));
        assert_eq!(class.factory_methods().count(), 2);
        assert_eq!(class.component_name(), "sample");
    }

    #[test]
    fn duplicate_method_names_are_rejected() {
        let err = Enhancer::new().enhance::<Twice>().unwrap_err();
        assert!(matches!(err, DiError::InvariantViolation(_)));
    }

    #[test]
    fn unbound_instance_reports_missing_back_reference() {
        let class = Enhancer::new().enhance::<Sample>().unwrap();
        let instance = class.instantiate(Arc::new(Sample));
        assert!(!instance.has_container());
        let err = instance.call::<u32>("alpha").unwrap_err();
        assert!(matches!(err, DiError::MissingBackReference { .. }));
        // Plain methods never need the container.
        assert_eq!(*instance.call::<&str>("helper").unwrap(), "help");
    }

    #[test]
    fn unknown_method_is_not_found() {
        let class = Enhancer::new().enhance::<Sample>().unwrap();
        let instance = class.instantiate(Arc::new(Sample));
        assert!(matches!(instance.invoke("gamma", &Args::new()), Err(DiError::NotFound(_))));
    }

    #[test]
    fn filter_without_catch_all_fails_synthesis() {
        let filter = CallbackFilter::new(vec![(
            is_factory_method as MethodPredicate,
            Callback::InterceptFactoryMethod,
        )]);
        let enhancer = Enhancer::with_filter(Arc::new(filter));
        assert!(matches!(enhancer.enhance::<Sample>(), Err(DiError::InvariantViolation(_))));
        assert!(!enhancer.is_enhanced::<Sample>());
    }
}
