//! Component name conventions.
//!
//! Components are addressed by string name. Two derived forms exist:
//!
//! - `&name` addresses an object factory itself instead of the object it produces.
//! - `scopedTarget.name` is the internal name of a scope-proxied component's
//!   real target; `name` is then bound to the proxy.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_beans::key;
//!
//! assert_eq!(key::factory_dereference("pool"), "&pool");
//! assert!(key::is_factory_dereference("&pool"));
//! assert_eq!(key::transformed_name("&&pool"), "pool");
//! assert_eq!(key::scoped_target_name("session"), "scopedTarget.session");
//! ```

/// Prefix that requests an object factory itself rather than its product.
pub const FACTORY_PREFIX: char = '&';

/// Prefix of the internal name under which a scoped proxy's target lives.
pub const SCOPED_TARGET_PREFIX: &str = "scopedTarget.";

/// Returns `&name`, the name of the factory behind `name`.
pub fn factory_dereference(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    out.push(FACTORY_PREFIX);
    out.push_str(transformed_name(name));
    out
}

/// True when `name` addresses a factory itself.
#[inline]
pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_PREFIX)
}

/// Strips every leading factory prefix.
#[inline]
pub fn transformed_name(name: &str) -> &str {
    name.trim_start_matches(FACTORY_PREFIX)
}

/// Returns the internal target name for a scope-proxied component.
pub fn scoped_target_name(name: &str) -> String {
    format!("{SCOPED_TARGET_PREFIX}{name}")
}

/// True when `name` is the internal target of a scoped proxy.
pub fn is_scoped_target(name: &str) -> bool {
    name.starts_with(SCOPED_TARGET_PREFIX)
}

/// Default component name for a type: the last path segment of its type
/// name with the first character lowercased (`app::DataConfig` -> `dataConfig`).
pub fn default_component_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let last = base.rsplit("::").next().unwrap_or(base);
    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dereference_is_not_doubled() {
        assert_eq!(factory_dereference("&x"), "&x");
        assert_eq!(factory_dereference("x"), "&x");
    }

    #[test]
    fn default_names() {
        assert_eq!(default_component_name("app::config::DataConfig"), "dataConfig");
        assert_eq!(default_component_name("Wrapper<app::Inner>"), "wrapper");
        assert_eq!(default_component_name(""), "");
    }

    #[test]
    fn scoped_targets() {
        let target = scoped_target_name("cart");
        assert!(is_scoped_target(&target));
        assert!(!is_scoped_target("cart"));
    }
}
