//! Factory-method descriptors: the metadata a configuration type declares.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::args::Args;
use crate::enhance::{Configuration, EnhancedInstance};
use crate::error::DiResult;
use crate::factory::{self, ObjectFactory, SharedFactory};
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, DestroyHook};
use crate::traits::Dispose;

/// Name of the synthesized back-reference setter.
pub const SET_CONTAINER_METHOD: &str = "set_container";

/// Identity of a method on a configuration type.
///
/// Two ids are equal only if the declaring type, the method name and the
/// parameter type names all match.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MethodId {
    class: TypeId,
    class_name: &'static str,
    name: &'static str,
    params: Vec<&'static str>,
}

impl MethodId {
    pub fn of<C: 'static>(name: &'static str, params: &[&'static str]) -> Self {
        Self {
            class: TypeId::of::<C>(),
            class_name: type_name::<C>(),
            name,
            params: params.to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn params(&self) -> &[&'static str] {
        &self.params
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}({})", self.class_name, self.name, self.params.join(", "))
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// What a factory method hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Object,
    /// An [`ObjectFactory`]; references go through the redirector.
    ObjectFactory,
}

/// A declared parameter, resolved by component name when the caller does not
/// supply the argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub component: String,
    pub type_name: &'static str,
}

/// Metadata of an intercepted factory method.
#[derive(Debug, Clone)]
pub struct FactoryMeta {
    /// Name of the produced component
    pub component_name: String,
    pub lifetime: Lifetime,
    pub return_type: TypeId,
    pub return_type_name: &'static str,
    pub returns: ReturnKind,
    pub scoped_proxy: bool,
    pub lazy: bool,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone)]
pub enum MethodKind {
    /// The container back-reference setter.
    SetContainer,
    Factory(FactoryMeta),
    /// A helper method that is never intercepted.
    Plain,
}

/// A method of a configuration type as seen by the callback dispatcher.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub id: MethodId,
    pub kind: MethodKind,
}

impl MethodDescriptor {
    pub fn factory(&self) -> Option<&FactoryMeta> {
        match &self.kind {
            MethodKind::Factory(meta) => Some(meta),
            _ => None,
        }
    }

    pub(crate) fn set_container<C: 'static>() -> Self {
        Self {
            id: MethodId::of::<C>(SET_CONTAINER_METHOD, &["Container"]),
            kind: MethodKind::SetContainer,
        }
    }
}

pub(crate) type MethodBody<C> =
    Arc<dyn Fn(&EnhancedInstance<C>, &Args) -> DiResult<AnyArc> + Send + Sync>;

pub(crate) struct MethodEntry<C: Configuration> {
    pub(crate) descriptor: MethodDescriptor,
    pub(crate) body: MethodBody<C>,
    pub(crate) destroy: Option<DestroyHook>,
}

/// Method table a [`Configuration`] fills in.
///
/// Every body receives the enhanced instance it was called on, so calls it
/// makes to other factory methods are intercepted too.
pub struct ConfigurationMethods<C: Configuration> {
    entries: Vec<MethodEntry<C>>,
}

impl<C: Configuration> ConfigurationMethods<C> {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn into_entries(self) -> Vec<MethodEntry<C>> {
        self.entries
    }

    /// Declares a factory method producing a `T` component named `name`.
    pub fn component<T, F>(&mut self, name: &'static str, body: F) -> ComponentMethod<'_, C, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&EnhancedInstance<C>, &Args) -> DiResult<T> + Send + Sync + 'static,
    {
        let body: MethodBody<C> = Arc::new(move |this: &EnhancedInstance<C>, args: &Args| {
            body(this, args).map(|value| Arc::new(value) as AnyArc)
        });
        self.push_factory::<T>(name, ReturnKind::Object, body)
    }

    /// Declares a factory method whose product is itself an object factory.
    pub fn object_factory<F, B>(&mut self, name: &'static str, body: B) -> ComponentMethod<'_, C, SharedFactory>
    where
        F: ObjectFactory,
        B: Fn(&EnhancedInstance<C>, &Args) -> DiResult<F> + Send + Sync + 'static,
    {
        let body: MethodBody<C> = Arc::new(move |this: &EnhancedInstance<C>, args: &Args| {
            body(this, args).map(|made| factory::into_value(Arc::new(made) as SharedFactory))
        });
        self.push_factory::<SharedFactory>(name, ReturnKind::ObjectFactory, body)
    }

    /// Declares a helper method that is never intercepted.
    pub fn method<T, F>(&mut self, name: &'static str, body: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&EnhancedInstance<C>, &Args) -> DiResult<T> + Send + Sync + 'static,
    {
        self.entries.push(MethodEntry {
            descriptor: MethodDescriptor {
                id: MethodId::of::<C>(name, &[]),
                kind: MethodKind::Plain,
            },
            body: Arc::new(move |this: &EnhancedInstance<C>, args: &Args| {
                body(this, args).map(|value| Arc::new(value) as AnyArc)
            }),
            destroy: None,
        });
        self
    }

    fn push_factory<T: Any + Send + Sync>(
        &mut self,
        name: &'static str,
        returns: ReturnKind,
        body: MethodBody<C>,
    ) -> ComponentMethod<'_, C, T> {
        self.entries.push(MethodEntry {
            descriptor: MethodDescriptor {
                id: MethodId::of::<C>(name, &[]),
                kind: MethodKind::Factory(FactoryMeta {
                    component_name: name.to_string(),
                    lifetime: Lifetime::Singleton,
                    return_type: TypeId::of::<T>(),
                    return_type_name: type_name::<T>(),
                    returns,
                    scoped_proxy: false,
                    lazy: false,
                    params: Vec::new(),
                }),
            },
            body,
            destroy: None,
        });
        let last = self.entries.len() - 1;
        ComponentMethod {
            entry: &mut self.entries[last],
            _marker: PhantomData,
        }
    }
}

/// Builder for one declared factory method.
///
/// ```rust
/// use ferrous_beans::{Configuration, ConfigurationMethods, Lifetime};
///
/// struct Pool { size: usize }
/// struct Db { url: String }
///
/// struct DataConfig;
///
/// impl Configuration for DataConfig {
///     fn describe(m: &mut ConfigurationMethods<Self>) {
///         m.component("db", |_, _| Ok(Db { url: "postgres://".into() }))
///             .named("primaryDb")
///             .lazy();
///         m.component("pool", |_, args| Ok(Pool { size: *args.get::<usize>(0)? }))
///             .lifetime(Lifetime::Transient)
///             .param::<usize>("poolSize");
///     }
/// }
/// ```
pub struct ComponentMethod<'a, C: Configuration, T> {
    entry: &'a mut MethodEntry<C>,
    _marker: PhantomData<fn() -> T>,
}

impl<C: Configuration, T: Send + Sync + 'static> ComponentMethod<'_, C, T> {
    fn meta(&mut self) -> &mut FactoryMeta {
        match &mut self.entry.descriptor.kind {
            MethodKind::Factory(meta) => meta,
            _ => unreachable!("ComponentMethod always wraps a factory entry"),
        }
    }

    /// Overrides the component name (defaults to the method name).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.meta().component_name = name.into();
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.meta().lifetime = lifetime;
        self
    }

    /// Binds the plain name to a scoped proxy and the real target to
    /// `scopedTarget.<name>`.
    pub fn scoped_proxy(mut self) -> Self {
        self.meta().scoped_proxy = true;
        self
    }

    /// Skips the component during eager initialization.
    pub fn lazy(mut self) -> Self {
        self.meta().lazy = true;
        self
    }

    /// Declares the next parameter, resolved from `component` when the
    /// caller passes no argument (or a null placeholder) in its position.
    pub fn param<P: 'static>(mut self, component: impl Into<String>) -> Self {
        let type_name = type_name::<P>();
        self.meta().params.push(Param {
            component: component.into(),
            type_name,
        });
        self.entry.descriptor.id.params.push(type_name);
        self
    }

    /// Runs `hook` on the created instance when the container destroys its
    /// singletons.
    pub fn destroy_with<H>(self, hook: H) -> Self
    where
        H: Fn(&T) + Send + Sync + 'static,
    {
        self.entry.destroy = Some(Arc::new(move |value: &AnyArc| {
            if let Some(typed) = value.downcast_ref::<T>() {
                hook(typed);
            }
        }));
        self
    }
}

impl<C: Configuration, T: Dispose> ComponentMethod<'_, C, T> {
    /// Calls [`Dispose::dispose`] when the container destroys its singletons.
    pub fn disposable(self) -> Self {
        self.destroy_with(|value: &T| value.dispose())
    }
}
