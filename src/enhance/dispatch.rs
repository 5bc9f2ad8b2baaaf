//! Callback selection for enhanced methods.
//!
//! The filter is an ordered list of `(predicate, callback)` pairs. The first
//! matching predicate picks the callback, and the result is fixed into the
//! synthesized method table, so selection cost is paid once per method per
//! class, never per call.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::enhance::descriptor::{MethodDescriptor, MethodKind, SET_CONTAINER_METHOD};
use crate::error::{DiError, DiResult};

/// Behavior attached to an enhanced method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    /// Stores the container back-reference on the instance.
    BindContainer,
    /// Runs the factory-method interception algorithm.
    InterceptFactoryMethod,
    /// Calls the declared body directly.
    NoIntercept,
}

pub type MethodPredicate = fn(&MethodDescriptor) -> bool;

/// Matches the synthesized back-reference setter.
pub fn is_set_container(method: &MethodDescriptor) -> bool {
    matches!(method.kind, MethodKind::SetContainer) && method.id.name() == SET_CONTAINER_METHOD
}

/// Matches declared factory methods.
pub fn is_factory_method(method: &MethodDescriptor) -> bool {
    matches!(method.kind, MethodKind::Factory(_))
}

/// Matches everything.
pub fn any_method(_: &MethodDescriptor) -> bool {
    true
}

static STANDARD: Lazy<Arc<CallbackFilter>> = Lazy::new(|| {
    Arc::new(CallbackFilter::new(vec![
        (is_set_container as MethodPredicate, Callback::BindContainer),
        (is_factory_method as MethodPredicate, Callback::InterceptFactoryMethod),
        (any_method as MethodPredicate, Callback::NoIntercept),
    ]))
});

/// Ordered predicate list mapping methods to callbacks.
///
/// ```rust
/// use ferrous_beans::enhance::{Callback, CallbackFilter};
///
/// let filter = CallbackFilter::standard();
/// assert_eq!(filter.len(), 3);
/// assert_eq!(filter.callback(0), Some(Callback::BindContainer));
/// ```
#[derive(Clone)]
pub struct CallbackFilter {
    entries: Vec<(MethodPredicate, Callback)>,
}

impl CallbackFilter {
    pub fn new(entries: Vec<(MethodPredicate, Callback)>) -> Self {
        Self { entries }
    }

    /// The process-wide filter: back-reference setter, then factory methods,
    /// then a catch-all.
    pub fn standard() -> Arc<CallbackFilter> {
        STANDARD.clone()
    }

    /// Index of the first entry whose predicate matches `method`.
    ///
    /// An unmatched method means the filter has no catch-all, which the
    /// enhancer treats as a broken invariant.
    pub fn select(&self, method: &MethodDescriptor) -> DiResult<usize> {
        self.entries
            .iter()
            .position(|(matches, _)| matches(method))
            .ok_or_else(|| {
                DiError::InvariantViolation(format!("no callback available for method {}", method.id))
            })
    }

    pub fn resolve(&self, method: &MethodDescriptor) -> DiResult<Callback> {
        let index = self.select(method)?;
        Ok(self.entries[index].1)
    }

    pub fn callback(&self, index: usize) -> Option<Callback> {
        self.entries.get(index).map(|(_, callback)| *callback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CallbackFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(_, callback)| callback))
            .finish()
    }
}
