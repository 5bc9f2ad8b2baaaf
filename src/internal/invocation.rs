//! Thread-local "currently invoked factory method" marker.
//!
//! The container sets the marker immediately before it calls a factory method
//! to build a component, and restores the previous marker afterwards. The
//! interceptor compares the method being called against the marker to tell
//! the container's own creation call apart from an inter-component reference.
//!
//! The marker is claimed by the first matching interception. Nested calls to
//! the same method inside its own body see the claimed marker and therefore
//! take the reference path, where the registry and the resolution stack report
//! the cycle instead of recursing into the body.

use std::cell::RefCell;

use crate::enhance::MethodId;

struct InvokedMethod {
    method: MethodId,
    component: String,
    claimed: bool,
}

thread_local! {
    static CURRENT: RefCell<Option<InvokedMethod>> = const { RefCell::new(None) };
}

/// Restores the previous marker on drop.
pub(crate) struct MarkerGuard {
    previous: Option<InvokedMethod>,
}

impl Drop for MarkerGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Marks `method` as the factory method the container is about to invoke for
/// `component`.
pub(crate) fn set_invoked(method: MethodId, component: &str) -> MarkerGuard {
    let next = InvokedMethod {
        method,
        component: component.to_string(),
        claimed: false,
    };
    let previous = CURRENT.with(|current| current.borrow_mut().replace(next));
    MarkerGuard { previous }
}

/// Runs `f` with `method` marked as invoked by the container.
pub(crate) fn invoke_as_container<R>(method: MethodId, component: &str, f: impl FnOnce() -> R) -> R {
    let _guard = set_invoked(method, component);
    f()
}

/// Claims the marker if it names `method` and is still unclaimed.
pub(crate) fn claim(method: &MethodId) -> bool {
    CURRENT.with(|current| match current.borrow_mut().as_mut() {
        Some(invoked) if !invoked.claimed && invoked.method == *method => {
            invoked.claimed = true;
            true
        }
        _ => false,
    })
}

/// Component the container is currently building through a factory method.
pub(crate) fn current_component() -> Option<String> {
    CURRENT.with(|current| current.borrow().as_ref().map(|invoked| invoked.component.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cfg;
    struct Other;

    fn id(name: &'static str) -> MethodId {
        MethodId::of::<Cfg>(name, &[])
    }

    #[test]
    fn claim_is_single_use_and_scoped() {
        assert!(!claim(&id("a")));
        {
            let _outer = set_invoked(id("a"), "a");
            {
                let _inner = set_invoked(id("b"), "b");
                assert_eq!(current_component().as_deref(), Some("b"));
                assert!(claim(&id("b")));
                assert!(!claim(&id("b")));
            }
            assert_eq!(current_component().as_deref(), Some("a"));
            assert!(claim(&id("a")));
        }
        assert!(current_component().is_none());
    }

    #[test]
    fn same_name_on_another_type_does_not_match() {
        let _guard = set_invoked(id("dataSource"), "dataSource");
        assert!(!claim(&MethodId::of::<Other>("dataSource", &[])));
        assert!(claim(&id("dataSource")));
    }

    #[test]
    fn marker_is_per_thread() {
        let _guard = set_invoked(id("a"), "a");
        let seen = std::thread::spawn(|| current_component()).join().unwrap();
        assert!(seen.is_none());
    }
}
