//! # ferrous-beans
//!
//! Factory-method interception and singleton redirection for configuration
//! types.
//!
//! A configuration type declares factory methods. The container enhances it
//! so that when one factory method's body calls another, the call is answered
//! from the container: singletons stay singletons, even across calls made
//! from user code inside a configuration.
//!
//! ## Features
//!
//! - **Enhanced configurations**: one synthesized method table per type,
//!   cached and shared
//! - **Singleton semantics for inter-method calls**: a body calling another
//!   factory method gets the managed instance
//! - **Object factories**: `name` resolves to the product, `&name` to the
//!   factory; factories handed out by factory methods are redirected to the
//!   container's product cache
//! - **Scopes and scoped proxies**: custom scopes, with a singleton proxy under
//!   the plain name and the real target under `scopedTarget.<name>`
//! - **Cycle detection**: per-thread resolution stack with full paths
//! - **Lifecycle**: eager pre-instantiation and dependents-first destruction
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_beans::{Configuration, ConfigurationMethods, ContainerBuilder, Resolver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! static CONNECTIONS: AtomicUsize = AtomicUsize::new(0);
//!
//! struct DataSource { id: usize }
//! struct UserRepository { ds: Arc<DataSource> }
//! struct OrderRepository { ds: Arc<DataSource> }
//!
//! struct AppConfig;
//!
//! impl Configuration for AppConfig {
//!     fn describe(m: &mut ConfigurationMethods<Self>) {
//!         m.component("dataSource", |_, _| {
//!             Ok(DataSource { id: CONNECTIONS.fetch_add(1, Ordering::SeqCst) })
//!         });
//!         m.component("users", |this, _| Ok(UserRepository { ds: this.call("dataSource")? }));
//!         m.component("orders", |this, _| Ok(OrderRepository { ds: this.call("dataSource")? }));
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.add_configuration(AppConfig).unwrap();
//! let container = builder.build().unwrap();
//!
//! let users = container.get::<UserRepository>("users").unwrap();
//! let orders = container.get::<OrderRepository>("orders").unwrap();
//! assert!(Arc::ptr_eq(&users.ds, &orders.ds));
//! assert_eq!(CONNECTIONS.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Lifetimes
//!
//! - **Singleton**: created once per container
//! - **Transient**: created on every lookup
//! - **Scoped**: cached by a named [`ComponentScope`] registered on the builder

pub mod args;
pub mod config;
pub mod container;
pub mod enhance;
pub mod error;
pub mod factory;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod scope;
pub mod singleton;
pub mod traits;

mod internal;
mod registration;

pub use args::Args;
pub use config::ContainerOptions;
pub use container::{Container, ContainerBuilder};
pub use enhance::{
    Callback, CallbackFilter, ComponentMethod, Configuration, ConfigurationMethods, EnhancedClass,
    EnhancedConfiguration, EnhancedInstance, Enhancer, MethodId,
};
pub use error::{DiError, DiResult};
pub use factory::{FactoryKind, ObjectFactory, ScopedProxyFactory, SharedFactory};
pub use lifetime::Lifetime;
pub use observer::{ContainerObserver, LoggingObserver};
pub use registration::{AnyArc, Origin};
pub use scope::{ComponentScope, SimpleScope};
pub use singleton::{CreationGuard, CreationSuspension, SingletonRegistry};
pub use traits::{Dispose, Resolver, ResolverCore};
