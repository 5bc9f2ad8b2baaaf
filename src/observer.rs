//! Observers for component creation events.
//!
//! Observers run synchronously on the creating thread, inside the singleton
//! lock when a singleton is being built. Keep them cheap and never resolve
//! components from inside a callback.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;

/// Hooks into the container's creation path.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{ContainerBuilder, ContainerObserver, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Counting { created: AtomicUsize }
///
/// impl ContainerObserver for Counting {
///     fn creating(&self, _name: &str) {}
///
///     fn created(&self, _name: &str, _elapsed: Duration) {
///         self.created.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let counting = Arc::new(Counting::default());
/// let mut builder = ContainerBuilder::new();
/// builder.add_singleton("answer", 42u32);
/// builder.add_observer(counting.clone());
/// let container = builder.build().unwrap();
///
/// container.get::<u32>("answer").unwrap();
/// container.get::<u32>("answer").unwrap();
/// assert_eq!(counting.created.load(Ordering::SeqCst), 1);
/// ```
pub trait ContainerObserver: Send + Sync {
    /// A component's constructor is about to run.
    fn creating(&self, name: &str);

    fn created(&self, name: &str, elapsed: Duration);

    fn creation_failed(&self, _name: &str, _error: &DiError) {}

    /// A factory method call was answered from the container instead of
    /// running its body. `referenced_from` names the component under
    /// construction that made the call, if any.
    fn reference_resolved(&self, _name: &str, _referenced_from: Option<&str>) {}

    /// An object factory that refuses redirection was handed out raw.
    fn redirect_degraded(&self, _name: &str) {}
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ContainerObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ContainerObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn creating(&self, name: &str) {
        for observer in &self.observers {
            observer.creating(name);
        }
    }

    #[inline]
    pub(crate) fn created(&self, name: &str, elapsed: Duration) {
        for observer in &self.observers {
            observer.created(name, elapsed);
        }
    }

    pub(crate) fn creation_failed(&self, name: &str, error: &DiError) {
        for observer in &self.observers {
            observer.creation_failed(name, error);
        }
    }

    pub(crate) fn reference_resolved(&self, name: &str, referenced_from: Option<&str>) {
        for observer in &self.observers {
            observer.reference_resolved(name, referenced_from);
        }
    }

    pub(crate) fn redirect_degraded(&self, name: &str) {
        for observer in &self.observers {
            observer.redirect_degraded(name);
        }
    }
}

/// Forwards every event to `tracing`.
///
/// ```
/// use ferrous_beans::{ContainerBuilder, LoggingObserver};
/// use std::sync::Arc;
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_observer(Arc::new(LoggingObserver::with_prefix("app")));
/// let container = builder.build().unwrap();
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-beans".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerObserver for LoggingObserver {
    fn creating(&self, name: &str) {
        tracing::debug!(prefix = %self.prefix, component = name, "creating component");
    }

    fn created(&self, name: &str, elapsed: Duration) {
        tracing::debug!(prefix = %self.prefix, component = name, ?elapsed, "created component");
    }

    fn creation_failed(&self, name: &str, error: &DiError) {
        tracing::warn!(prefix = %self.prefix, component = name, %error, "component creation failed");
    }

    fn reference_resolved(&self, name: &str, referenced_from: Option<&str>) {
        tracing::trace!(
            prefix = %self.prefix,
            component = name,
            referenced_from = referenced_from.unwrap_or("<none>"),
            "factory method answered from container"
        );
    }

    fn redirect_degraded(&self, name: &str) {
        tracing::warn!(prefix = %self.prefix, component = name, "object factory handed out without redirection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl ContainerObserver for Recording {
        fn creating(&self, name: &str) {
            self.events.lock().push(format!("creating {name}"));
        }

        fn created(&self, name: &str, _elapsed: Duration) {
            self.events.lock().push(format!("created {name}"));
        }

        fn reference_resolved(&self, name: &str, referenced_from: Option<&str>) {
            self.events
                .lock()
                .push(format!("reference {name} from {}", referenced_from.unwrap_or("-")));
        }
    }

    #[test]
    fn fan_out_in_registration_order() {
        let first = Arc::new(Recording::default());
        let second = Arc::new(Recording::default());
        let mut observers = Observers::default();
        observers.add(first.clone());
        observers.add(second.clone());
        assert!(observers.has_observers());
        assert_eq!(observers.len(), 2);

        observers.creating("db");
        observers.created("db", Duration::from_millis(1));
        observers.reference_resolved("db", Some("repo"));
        // Not overridden by Recording
        observers.redirect_degraded("db");

        let expected = ["creating db", "created db", "reference db from repo"];
        assert_eq!(*first.events.lock(), expected);
        assert_eq!(*second.events.lock(), expected);
    }
}
