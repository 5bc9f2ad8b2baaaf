//! Component lifetime definitions.

/// Component lifetimes controlling instance caching behavior
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Lifetime;
///
/// assert!(Lifetime::Singleton.is_singleton());
/// assert!(!Lifetime::Transient.is_singleton());
/// assert_eq!(Lifetime::Scoped("request").scope_name(), Some("request"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Single instance per container, created once and cached in the
    /// singleton registry. Arguments only matter for the first creation.
    #[default]
    Singleton,
    /// New instance per lookup, never cached.
    Transient,
    /// One instance per active instance of the named scope. The scope must be
    /// registered on the container builder.
    Scoped(&'static str),
}

impl Lifetime {
    /// True for [`Lifetime::Singleton`].
    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }

    /// Name of the scope for [`Lifetime::Scoped`].
    pub fn scope_name(&self) -> Option<&'static str> {
        match self {
            Lifetime::Scoped(scope) => Some(*scope),
            _ => None,
        }
    }
}
