//! Disposal trait for singleton teardown.

/// Synchronous cleanup run when the container destroys its singletons.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Configuration, ConfigurationMethods, ContainerBuilder, Dispose, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// static CLOSED: AtomicBool = AtomicBool::new(false);
///
/// struct Connection;
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         CLOSED.store(true, Ordering::SeqCst);
///     }
/// }
///
/// struct DbConfig;
///
/// impl Configuration for DbConfig {
///     fn describe(m: &mut ConfigurationMethods<Self>) {
///         m.component("connection", |_, _| Ok(Connection)).disposable();
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_configuration(DbConfig).unwrap();
/// let container = builder.build().unwrap();
///
/// container.get::<Connection>("connection").unwrap();
/// container.destroy_singletons();
/// assert!(CLOSED.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}
