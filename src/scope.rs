//! Custom component scopes.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::DiResult;
use crate::registration::AnyArc;

/// A named scope that caches components between `get` calls.
///
/// `create` builds the component through the container; it may resolve other
/// components, including ones from the same scope, so implementations must not
/// hold their own locks while calling it.
pub trait ComponentScope: Send + Sync {
    fn get(&self, name: &str, create: &mut dyn FnMut() -> DiResult<AnyArc>) -> DiResult<AnyArc>;

    /// Drops the cached instance for `name`, returning it.
    fn remove(&self, name: &str) -> Option<AnyArc>;
}

/// Map-backed scope. Call [`reset`](SimpleScope::reset) to start a new scope
/// instance (for example at a request boundary).
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{AnyArc, ComponentScope, SimpleScope};
/// use std::sync::Arc;
///
/// let scope = SimpleScope::new();
/// let a = scope.get("cart", &mut || Ok(Arc::new(1u8) as AnyArc)).unwrap();
/// let b = scope.get("cart", &mut || Ok(Arc::new(2u8) as AnyArc)).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// scope.reset();
/// let c = scope.get("cart", &mut || Ok(Arc::new(3u8) as AnyArc)).unwrap();
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
#[derive(Default)]
pub struct SimpleScope {
    instances: Mutex<HashMap<String, AnyArc>>,
}

impl SimpleScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every cached instance.
    pub fn reset(&self) {
        self.instances.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl ComponentScope for SimpleScope {
    fn get(&self, name: &str, create: &mut dyn FnMut() -> DiResult<AnyArc>) -> DiResult<AnyArc> {
        if let Some(existing) = self.instances.lock().get(name) {
            return Ok(existing.clone());
        }

        // Never hold the lock while invoking the factory
        let value = create()?;

        let mut instances = self.instances.lock();
        Ok(instances.entry(name.to_string()).or_insert(value).clone())
    }

    fn remove(&self, name: &str) -> Option<AnyArc> {
        self.instances.lock().remove(name)
    }
}
