//! Component registration.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::args::Args;
use crate::config::ContainerOptions;
use crate::container::Container;
use crate::enhance::{
    Configuration, EnhancedClass, EnhancedConfiguration, EnhancedInstance, Enhancer, FactoryMeta,
    MethodDescriptor,
};
use crate::error::DiResult;
use crate::factory::{self, ObjectFactory, ScopedProxyFactory, SharedFactory};
use crate::internal::invocation;
use crate::key;
use crate::lifetime::Lifetime;
use crate::observer::{ContainerObserver, Observers};
use crate::registration::{AnyArc, Ctor, Definition, Origin, Registry};
use crate::scope::ComponentScope;
use crate::traits::Resolver;

/// Collects component definitions and builds a [`Container`].
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Configuration, ConfigurationMethods, ContainerBuilder, Resolver};
///
/// struct Settings { url: String }
/// struct Client { url: String }
///
/// struct ClientConfig;
///
/// impl Configuration for ClientConfig {
///     fn describe(m: &mut ConfigurationMethods<Self>) {
///         m.component("client", |_, args| {
///             Ok(Client { url: args.get::<Settings>(0)?.url.clone() })
///         })
///         .param::<Settings>("settings");
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_singleton("settings", Settings { url: "https://example.test".into() });
/// builder.add_configuration(ClientConfig).unwrap();
/// let container = builder.build().unwrap();
///
/// assert_eq!(container.get::<Client>("client").unwrap().url, "https://example.test");
/// ```
pub struct ContainerBuilder {
    definitions: Vec<Definition>,
    scopes: HashMap<&'static str, Arc<dyn ComponentScope>>,
    observers: Observers,
    options: ContainerOptions,
    enhancer: Arc<Enhancer>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            scopes: HashMap::new(),
            observers: Observers::default(),
            options: ContainerOptions::default(),
            enhancer: Arc::new(Enhancer::new()),
        }
    }

    pub fn with_options(&mut self, options: ContainerOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Shares an enhancer (and its class cache) with other containers. Call
    /// before adding configurations.
    pub fn with_enhancer(&mut self, enhancer: Arc<Enhancer>) -> &mut Self {
        self.enhancer = enhancer;
        self
    }

    /// Registers a pre-built singleton.
    pub fn add_singleton<T>(&mut self, name: impl Into<String>, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        let value: AnyArc = Arc::new(value);
        let ctor: Ctor = Arc::new(move |_: &Container, _: &Args| Ok(value.clone()));
        self.push(Definition::new(
            name,
            Lifetime::Singleton,
            TypeId::of::<T>(),
            type_name::<T>(),
            Origin::Instance,
            ctor,
        ))
    }

    /// Registers a closure-built component.
    pub fn add_factory<T, F>(
        &mut self,
        name: impl Into<String>,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &Args) -> DiResult<T> + Send + Sync + 'static,
    {
        let ctor: Ctor = Arc::new(move |container: &Container, args: &Args| {
            factory(container, args).map(|value| Arc::new(value) as AnyArc)
        });
        self.push(Definition::new(
            name,
            lifetime,
            TypeId::of::<T>(),
            type_name::<T>(),
            Origin::Closure,
            ctor,
        ))
    }

    /// Registers an object factory. `name` resolves to its product and
    /// `&name` to the factory.
    pub fn add_object_factory<F>(&mut self, name: impl Into<String>, made: F) -> &mut Self
    where
        F: ObjectFactory,
    {
        let value = factory::into_value(Arc::new(made) as SharedFactory);
        let ctor: Ctor = Arc::new(move |_: &Container, _: &Args| Ok(value.clone()));
        self.push(Definition::new(
            name,
            Lifetime::Singleton,
            TypeId::of::<SharedFactory>(),
            type_name::<SharedFactory>(),
            Origin::Instance,
            ctor,
        ))
    }

    /// Enhances `C` and registers it together with every factory method it
    /// declares.
    pub fn add_configuration<C: Configuration>(&mut self, config: C) -> DiResult<&mut Self> {
        let class = self.enhancer.enhance::<C>()?;
        let config_name = class.component_name().to_string();
        let target = Arc::new(config);

        let instance_class = Arc::clone(&class);
        let ctor: Ctor = Arc::new(move |container: &Container, _: &Args| {
            let instance = instance_class.instantiate(Arc::clone(&target));
            instance.set_container(container)?;
            Ok(instance as AnyArc)
        });
        self.push(Definition::new(
            config_name.clone(),
            Lifetime::Singleton,
            TypeId::of::<EnhancedInstance<C>>(),
            type_name::<EnhancedInstance<C>>(),
            Origin::Configuration(class.class_name()),
            ctor,
        ));

        for (descriptor, meta) in class.factory_methods() {
            if meta.scoped_proxy {
                let target_name = key::scoped_target_name(&meta.component_name);
                let name = target_name.clone();
                self.push(factory_method(&config_name, &class, descriptor, meta, name));
                self.push(scoped_proxy(meta, target_name));
            } else {
                let name = meta.component_name.clone();
                self.push(factory_method(&config_name, &class, descriptor, meta, name));
            }
        }
        debug!(
            class = class.class_name(),
            component = %config_name,
            factory_methods = class.factory_methods().count(),
            "registered configuration"
        );
        Ok(self)
    }

    pub fn add_scope(&mut self, name: &'static str, scope: Arc<dyn ComponentScope>) -> &mut Self {
        self.scopes.insert(name, scope);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ContainerObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Builds the container, creating eager singletons if configured to.
    pub fn build(self) -> DiResult<Container> {
        let mut registry = Registry::new();
        for definition in self.definitions {
            registry.insert(definition, self.options.allow_definition_overriding)?;
        }
        let components = registry.len();
        let eager = self.options.eager_init;
        let container =
            Container::new(registry, self.scopes, self.enhancer, self.observers, self.options);
        if eager {
            container.preinstantiate_singletons()?;
        }
        debug!(components, eager, "container built");
        Ok(container)
    }

    fn push(&mut self, definition: Definition) -> &mut Self {
        self.definitions.push(definition);
        self
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition whose constructor calls a factory method with the invoked
/// marker set, so the interceptor runs the body instead of resolving.
fn factory_method<C: Configuration>(
    config_name: &str,
    class: &Arc<EnhancedClass<C>>,
    descriptor: &MethodDescriptor,
    meta: &FactoryMeta,
    name: String,
) -> Definition {
    let method = descriptor.id.clone();
    let config_name = config_name.to_string();
    let params = meta.params.clone();
    let component = name.clone();

    let ctor: Ctor = Arc::new(move |container: &Container, args: &Args| {
        let config = container.get::<EnhancedInstance<C>>(&config_name)?;
        let args = container.resolve_arguments(&params, args)?;
        invocation::invoke_as_container(method.clone(), &component, || {
            config.invoke(method.name(), &args)
        })
    });

    let mut definition = Definition::new(
        name,
        meta.lifetime,
        meta.return_type,
        meta.return_type_name,
        Origin::FactoryMethod {
            class: class.class_name(),
            method: descriptor.id.name(),
        },
        ctor,
    );
    definition.lazy = meta.lazy;
    definition.destroy = class.destroy_hook(descriptor.id.name());
    definition
}

/// Singleton proxy bound under the plain name of a scope-proxied method.
fn scoped_proxy(meta: &FactoryMeta, target_name: String) -> Definition {
    let object_type = meta.return_type_name;
    let proxied = target_name.clone();
    let ctor: Ctor = Arc::new(move |container: &Container, _: &Args| {
        let proxy = ScopedProxyFactory::new(proxied.clone(), object_type, container);
        Ok(factory::into_value(Arc::new(proxy) as SharedFactory))
    });
    Definition::new(
        meta.component_name.clone(),
        Lifetime::Singleton,
        TypeId::of::<SharedFactory>(),
        type_name::<SharedFactory>(),
        Origin::ScopedProxy { target: target_name },
        ctor,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiError;

    struct Proxied;

    impl Configuration for Proxied {
        fn describe(m: &mut crate::enhance::ConfigurationMethods<Self>) {
            m.component("cart", |_, _| Ok(Vec::<u32>::new()))
                .lifetime(Lifetime::Scoped("session"))
                .scoped_proxy();
        }
    }

    #[test]
    fn scoped_proxy_registers_target_and_proxy() {
        let mut builder = ContainerBuilder::new();
        builder.add_configuration(Proxied).unwrap();
        let container = builder.build().unwrap();

        assert_eq!(container.component_names(), ["proxied", "scopedTarget.cart", "cart"]);
        assert_eq!(container.lifetime_of("scopedTarget.cart"), Some(Lifetime::Scoped("session")));
        assert_eq!(container.lifetime_of("cart"), Some(Lifetime::Singleton));
        assert_eq!(
            container.origin_of("cart"),
            Some(Origin::ScopedProxy {
                target: "scopedTarget.cart".to_string()
            })
        );
    }

    #[test]
    fn duplicate_names_fail_unless_overriding() {
        let mut builder = ContainerBuilder::new();
        builder.add_singleton("x", 1u8).add_singleton("x", 2u8);
        assert!(matches!(builder.build(), Err(DiError::DuplicateDefinition(name)) if name == "x"));

        let mut builder = ContainerBuilder::new();
        builder
            .with_options(ContainerOptions {
                allow_definition_overriding: true,
                eager_init: false,
            })
            .add_singleton("x", 1u8)
            .add_singleton("x", 2u8);
        let container = builder.build().unwrap();
        assert_eq!(*container.get::<u8>("x").unwrap(), 2);
    }

    #[test]
    fn eager_init_creates_non_lazy_singletons() {
        let mut builder = ContainerBuilder::new();
        builder
            .with_options(ContainerOptions {
                eager_init: true,
                ..Default::default()
            })
            .add_singleton("a", 1u8)
            .add_factory("b", Lifetime::Transient, |_, _| Ok(2u8));
        let container = builder.build().unwrap();
        assert!(container.singleton_registry().contains("a"));
        assert!(!container.singleton_registry().contains("b"));
    }
}
