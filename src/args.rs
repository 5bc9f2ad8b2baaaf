//! Explicit arguments for factory-method invocations and lookups.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::registration::AnyArc;

/// Ordered argument list passed to a factory method.
///
/// A `None` slot is a null placeholder: it stands for a value the container
/// fills in by resolving the method's declared parameter, never a literal
/// null to forward. A null in a position with no declared parameter fails
/// with [`DiError::InvariantViolation`] when the method is invoked.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Args;
///
/// let args = Args::new().with(8080u16).with_null();
/// assert_eq!(args.len(), 2);
/// assert!(args.has_null());
/// assert_eq!(*args.get::<u16>(0).unwrap(), 8080);
/// ```
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Option<AnyArc>>,
}

impl Args {
    /// An empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an argument list from raw slots.
    pub fn from_slots(values: Vec<Option<AnyArc>>) -> Self {
        Self { values }
    }

    /// Appends a value.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.values.push(Some(Arc::new(value)));
        self
    }

    /// Appends an already shared value.
    pub fn with_shared(mut self, value: AnyArc) -> Self {
        self.values.push(Some(value));
        self
    }

    /// Appends a null placeholder.
    pub fn with_null(mut self) -> Self {
        self.values.push(None);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if any slot is a null placeholder.
    pub fn has_null(&self) -> bool {
        self.values.iter().any(Option::is_none)
    }

    /// Raw slot access.
    pub fn slot(&self, index: usize) -> Option<&AnyArc> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn slots(&self) -> &[Option<AnyArc>] {
        &self.values
    }

    /// Typed access to a non-null slot.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
        let value = self.slot(index).cloned().ok_or_else(|| {
            DiError::InvariantViolation(format!("argument {index} is missing or null"))
        })?;
        value.downcast::<T>().map_err(|_| DiError::TypeMismatch {
            name: format!("argument {index}"),
            expected: std::any::type_name::<T>(),
        })
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(|v| if v.is_some() { "value" } else { "null" }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access_rejects_wrong_type_and_null() {
        let args = Args::new().with("url".to_string()).with_null();
        assert!(matches!(args.get::<u32>(0), Err(DiError::TypeMismatch { .. })));
        assert!(matches!(args.get::<String>(1), Err(DiError::InvariantViolation(_))));
        assert_eq!(args.get::<String>(0).unwrap().as_str(), "url");
    }

    #[test]
    fn empty_list_has_no_nulls() {
        let args = Args::new();
        assert!(args.is_empty());
        assert!(!args.has_null());
        assert_eq!(format!("{args:?}"), "[]");
    }
}
