//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod invocation;

pub(crate) use circular::with_circular_guard;
