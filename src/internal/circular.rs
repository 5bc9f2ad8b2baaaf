//! Circular reference detection infrastructure.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

const MAX_DEPTH: usize = 1024;

// Thread-local resolution state for circular reference detection
thread_local! {
    static RESOLUTION_TLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one frame of the thread-local resolution stack.
///
/// The frame is popped on drop, so the stack unwinds correctly whether the
/// build returned normally, returned an error, or panicked.
pub(crate) struct StackGuard {
    name: String,
}

impl StackGuard {
    /// Pushes `name`, failing if it is already being built on this thread.
    pub(crate) fn enter(name: &str) -> DiResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();

            if stack.iter().any(|n| n == name) {
                let mut path = stack.clone();
                path.push(name.to_string());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= MAX_DEPTH {
                return Err(DiError::InvariantViolation(format!(
                    "resolution depth {} exceeded while building '{}'",
                    stack.len(),
                    name
                )));
            }

            stack.push(name.to_string());
            Ok(())
        })?;

        Ok(Self { name: name.to_string() })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            let popped = tls.borrow_mut().pop();
            debug_assert_eq!(popped.as_deref(), Some(self.name.as_str()));
        });
    }
}

/// Runs `f` with `name` pushed on the resolution stack.
pub(crate) fn with_circular_guard<T, F>(name: &str, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    let _guard = StackGuard::enter(name)?;
    f()
}

/// True if `name` is being built further up this thread's stack.
pub(crate) fn is_resolving(name: &str) -> bool {
    RESOLUTION_TLS.with(|tls| tls.borrow().iter().any(|n| n == name))
}

#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_TLS.with(|tls| tls.borrow().len())
}
