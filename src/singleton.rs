//! Singleton registry: completed instances and in-creation markers per name.
//!
//! All mutations happen under one coarse, reentrant "singleton lock". Reads of
//! completed instances go through a separate read-mostly map and never wait on
//! that lock, so the hot path after initialization is a single read lock.
//!
//! The lock is reentrant because building one singleton routinely builds
//! others on the same thread. Across threads it serializes creation, which is
//! what makes concurrent first lookups of one name converge on one instance.

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::error::{DiError, DiResult};
use crate::registration::AnyArc;

/// Authoritative map from component name to created singleton.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{AnyArc, SingletonRegistry};
/// use std::sync::Arc;
///
/// let registry = SingletonRegistry::new();
/// let first = registry.get_or_create("pool", || Ok(Arc::new(4u8) as AnyArc)).unwrap();
/// let again = registry.get_or_create("pool", || Ok(Arc::new(9u8) as AnyArc)).unwrap();
/// assert!(Arc::ptr_eq(&first, &again));
/// assert!(!registry.is_in_creation("pool"));
/// ```
pub struct SingletonRegistry {
    singleton_lock: ReentrantMutex<()>,
    singletons: RwLock<HashMap<String, AnyArc>>,
    /// Registration order, used for destruction
    order: Mutex<Vec<String>>,
    in_creation: Mutex<HashSet<String>>,
    /// Cached products of singleton object factories
    products: RwLock<HashMap<String, AnyArc>>,
    /// name -> names of components that referenced it during creation
    dependents: Mutex<HashMap<String, HashSet<String>>>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self {
            singleton_lock: ReentrantMutex::new(()),
            singletons: RwLock::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            in_creation: Mutex::new(HashSet::new()),
            products: RwLock::new(HashMap::new()),
            dependents: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the singleton lock. Reentrant on the owning thread.
    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.singleton_lock.lock()
    }

    /// Returns the completed instance for `name`, without taking the
    /// singleton lock.
    #[inline]
    pub fn get_if_present(&self, name: &str) -> Option<AnyArc> {
        self.singletons.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    /// True while the container is producing `name`.
    pub fn is_in_creation(&self, name: &str) -> bool {
        self.in_creation.lock().contains(name)
    }

    /// Marks `name` as in creation.
    ///
    /// Fails with [`DiError::CurrentlyInCreation`] when it already is: the only
    /// way to get here is a reference back into a component whose own
    /// creation has not finished.
    pub fn begin_creation(&self, name: &str) -> DiResult<()> {
        let _lock = self.lock();
        if self.in_creation.lock().insert(name.to_string()) {
            Ok(())
        } else {
            Err(DiError::CurrentlyInCreation(name.to_string()))
        }
    }

    /// Clears the in-creation mark for `name`.
    ///
    /// Calling this without a matching [`begin_creation`](Self::begin_creation)
    /// is an invariant violation.
    pub fn end_creation(&self, name: &str) -> DiResult<()> {
        let _lock = self.lock();
        if self.in_creation.lock().remove(name) {
            Ok(())
        } else {
            Err(DiError::InvariantViolation(format!(
                "end_creation('{name}') without matching begin_creation"
            )))
        }
    }

    /// Scoped form of `begin_creation`/`end_creation`. The mark is cleared
    /// when the guard drops, on every exit path.
    pub fn creation_scope(&self, name: &str) -> DiResult<CreationGuard<'_>> {
        self.begin_creation(name)?;
        Ok(CreationGuard {
            registry: self,
            name: name.to_string(),
        })
    }

    /// Temporarily clears the in-creation mark for `name` if it is set, and
    /// restores it when the returned guard drops.
    ///
    /// When the mark is set the singleton lock is held for the guard's
    /// lifetime, so no other thread observes the cleared state.
    pub fn suspend_creation(&self, name: &str) -> CreationSuspension<'_> {
        if !self.is_in_creation(name) {
            return CreationSuspension {
                registry: self,
                suspended: None,
                _lock: None,
            };
        }
        let lock = self.lock();
        let removed = self.in_creation.lock().remove(name);
        CreationSuspension {
            registry: self,
            suspended: removed.then(|| name.to_string()),
            _lock: Some(lock),
        }
    }

    /// Records a completed singleton created outside the registry.
    pub fn register(&self, name: &str, instance: AnyArc) -> DiResult<()> {
        let _lock = self.lock();
        if self.contains(name) {
            return Err(DiError::AlreadyRegistered(name.to_string()));
        }
        self.add(name, instance);
        Ok(())
    }

    fn add(&self, name: &str, instance: AnyArc) {
        self.singletons.write().insert(name.to_string(), instance);
        self.order.lock().push(name.to_string());
    }

    /// Returns the singleton for `name`, creating it with `create` if needed.
    ///
    /// Double-checked: a lock-free read first, then a re-check under the
    /// singleton lock before creating. `create` runs with `name` marked as
    /// in creation; a reentrant request for the same name fails with
    /// [`DiError::CurrentlyInCreation`].
    pub fn get_or_create<F>(&self, name: &str, create: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        if let Some(existing) = self.get_if_present(name) {
            return Ok(existing);
        }

        let _lock = self.lock();
        if let Some(existing) = self.get_if_present(name) {
            return Ok(existing);
        }

        let instance = {
            let _creation = self.creation_scope(name)?;
            create()?
        };
        self.add(name, instance.clone());
        Ok(instance)
    }

    /// Cached product of the singleton object factory `name`.
    pub fn product_if_present(&self, name: &str) -> Option<AnyArc> {
        self.products.read().get(name).cloned()
    }

    /// Same double-checked shape as [`get_or_create`](Self::get_or_create),
    /// for object factory products.
    pub(crate) fn get_or_create_product<F>(&self, name: &str, create: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        if let Some(product) = self.product_if_present(name) {
            return Ok(product);
        }

        let _lock = self.lock();
        if let Some(product) = self.product_if_present(name) {
            return Ok(product);
        }
        let product = create()?;
        // The factory may have resolved its own product re-entrantly.
        let stored = self
            .products
            .write()
            .entry(name.to_string())
            .or_insert(product)
            .clone();
        Ok(stored)
    }

    /// Records that `dependent` referenced `name` while being created.
    pub fn register_dependent(&self, name: &str, dependent: &str) {
        if name == dependent {
            return;
        }
        let _lock = self.lock();
        self.dependents
            .lock()
            .entry(name.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    /// Names of components that depend on `name`, sorted.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .dependents
            .lock()
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Names of completed singletons in registration order.
    pub fn singleton_names(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.read().len()
    }

    /// Removes every singleton, dependents before the components they depend
    /// on, otherwise in reverse registration order. `destroy` sees each
    /// removed instance exactly once.
    pub fn destroy_singletons<F>(&self, mut destroy: F)
    where
        F: FnMut(&str, AnyArc),
    {
        let _lock = self.lock();
        let names = std::mem::take(&mut *self.order.lock());
        let mut destroyed = HashSet::new();
        for name in names.iter().rev() {
            self.destroy_one(name, &mut destroyed, &mut destroy);
        }
        self.products.write().clear();
        self.dependents.lock().clear();
        self.singletons.write().clear();
    }

    fn destroy_one<F>(&self, name: &str, destroyed: &mut HashSet<String>, destroy: &mut F)
    where
        F: FnMut(&str, AnyArc),
    {
        if !destroyed.insert(name.to_string()) {
            return;
        }
        for dependent in self.dependents_of(name) {
            self.destroy_one(&dependent, destroyed, destroy);
        }
        let removed = self.singletons.write().remove(name);
        if let Some(instance) = removed {
            tracing::debug!(name, "destroying singleton");
            destroy(name, instance);
        }
    }
}

impl Default for SingletonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("singletons", &self.singleton_names())
            .field("in_creation", &*self.in_creation.lock())
            .finish_non_exhaustive()
    }
}

/// Clears an in-creation mark on drop.
pub struct CreationGuard<'a> {
    registry: &'a SingletonRegistry,
    name: String,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.registry.end_creation(&self.name) {
            tracing::error!(name = %self.name, %err, "creation mark lost before guard release");
        }
    }
}

/// Restores a suspended in-creation mark on drop.
pub struct CreationSuspension<'a> {
    registry: &'a SingletonRegistry,
    suspended: Option<String>,
    _lock: Option<ReentrantMutexGuard<'a, ()>>,
}

impl CreationSuspension<'_> {
    /// True if a mark was actually cleared.
    pub fn is_active(&self) -> bool {
        self.suspended.is_some()
    }
}

impl Drop for CreationSuspension<'_> {
    fn drop(&mut self) {
        if let Some(name) = self.suspended.take() {
            self.registry.in_creation.lock().insert(name);
        }
        // `_lock` is released after the mark is back.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn end_without_begin_is_an_invariant_violation() {
        let registry = SingletonRegistry::new();
        assert!(matches!(
            registry.end_creation("x"),
            Err(DiError::InvariantViolation(_))
        ));
    }

    #[test]
    fn begin_twice_reports_in_creation() {
        let registry = SingletonRegistry::new();
        let _guard = registry.creation_scope("x").unwrap();
        assert!(matches!(
            registry.begin_creation("x"),
            Err(DiError::CurrentlyInCreation(name)) if name == "x"
        ));
    }

    #[test]
    fn failed_creation_clears_the_mark() {
        let registry = SingletonRegistry::new();
        let result = registry.get_or_create("x", || Err(DiError::NotFound("y".into())));
        assert!(result.is_err());
        assert!(!registry.is_in_creation("x"));
        assert!(registry.get_if_present("x").is_none());
    }

    #[test]
    fn reentrant_same_name_fails_fast() {
        let registry = SingletonRegistry::new();
        let result = registry.get_or_create("x", || {
            registry.get_or_create("x", || Ok(Arc::new(1u8) as AnyArc))
        });
        assert!(matches!(result, Err(DiError::CurrentlyInCreation(_))));
        assert!(!registry.is_in_creation("x"));
    }

    #[test]
    fn nested_creation_of_other_names_is_allowed() {
        let registry = SingletonRegistry::new();
        let outer = registry
            .get_or_create("outer", || {
                let inner = registry.get_or_create("inner", || Ok(Arc::new(2u8) as AnyArc))?;
                assert!(registry.is_in_creation("outer"));
                Ok(inner)
            })
            .unwrap();
        assert_eq!(*outer.downcast::<u8>().unwrap(), 2);
        assert_eq!(registry.singleton_names(), ["inner", "outer"]);
    }

    #[test]
    fn suspension_restores_mark() {
        let registry = SingletonRegistry::new();
        let _guard = registry.creation_scope("x").unwrap();
        {
            let suspension = registry.suspend_creation("x");
            assert!(suspension.is_active());
            assert!(!registry.is_in_creation("x"));
        }
        assert!(registry.is_in_creation("x"));

        let idle = registry.suspend_creation("y");
        assert!(!idle.is_active());
    }

    #[test]
    fn register_rejects_duplicates() {
        let registry = SingletonRegistry::new();
        registry.register("x", Arc::new(1u8)).unwrap();
        assert!(matches!(
            registry.register("x", Arc::new(2u8)),
            Err(DiError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn products_are_cached_once() {
        let registry = SingletonRegistry::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            registry
                .get_or_create_product("p", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new("product") as AnyArc)
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_runs_dependents_first() {
        let registry = SingletonRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(name, Arc::new(0u8)).unwrap();
        }
        // a depends on c although c was registered later
        registry.register_dependent("c", "a");
        registry.register_dependent("c", "c");

        let mut order = Vec::new();
        registry.destroy_singletons(|name, _| order.push(name.to_string()));
        assert_eq!(order, ["a", "c", "b"]);
        assert_eq!(registry.singleton_count(), 0);
        assert!(registry.dependents_of("c").is_empty());
    }
}
