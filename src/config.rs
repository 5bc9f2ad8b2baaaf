//! Container options, from code, the environment or JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Environment variable for [`ContainerOptions::allow_definition_overriding`].
pub const ENV_ALLOW_OVERRIDING: &str = "FERROUS_BEANS_ALLOW_OVERRIDING";
/// Environment variable for [`ContainerOptions::eager_init`].
pub const ENV_EAGER_INIT: &str = "FERROUS_BEANS_EAGER_INIT";

/// Options applied when the container is built.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{ContainerBuilder, ContainerOptions, DiError};
///
/// let mut builder = ContainerBuilder::new();
/// builder.add_singleton("port", 8080u16);
/// builder.add_singleton("port", 9090u16);
/// assert!(matches!(builder.build(), Err(DiError::DuplicateDefinition(_))));
///
/// let mut builder = ContainerBuilder::new();
/// builder.with_options(ContainerOptions {
///     allow_definition_overriding: true,
///     ..Default::default()
/// });
/// builder.add_singleton("port", 8080u16);
/// builder.add_singleton("port", 9090u16);
/// assert!(builder.build().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// A later definition under an existing name replaces the earlier one
    /// instead of failing the build.
    pub allow_definition_overriding: bool,
    /// Create every non-lazy singleton during `build()`.
    pub eager_init: bool,
}

impl ContainerOptions {
    /// Reads options from the process environment. Unset variables keep
    /// their defaults.
    pub fn from_env() -> DiResult<Self> {
        let mut options = Self::default();
        if let Some(value) = read_flag(ENV_ALLOW_OVERRIDING)? {
            options.allow_definition_overriding = value;
        }
        if let Some(value) = read_flag(ENV_EAGER_INIT)? {
            options.eager_init = value;
        }
        Ok(options)
    }

    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DiError::Config(format!("invalid container options: {e}")))
    }
}

fn read_flag(name: &str) -> DiResult<Option<bool>> {
    match env::var(name) {
        Ok(raw) => parse_flag(&raw)
            .map(Some)
            .ok_or_else(|| DiError::Config(format!("{name}: expected a boolean, got '{raw}'"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(DiError::Config(format!("{name} is not valid unicode")))
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        env::remove_var(ENV_ALLOW_OVERRIDING);
        env::remove_var(ENV_EAGER_INIT);
    }

    #[test]
    fn flag_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    #[serial]
    fn unset_environment_gives_defaults() {
        clear();
        assert_eq!(ContainerOptions::from_env().unwrap(), ContainerOptions::default());
    }

    #[test]
    #[serial]
    fn environment_overrides() {
        clear();
        env::set_var(ENV_EAGER_INIT, "true");
        let options = ContainerOptions::from_env().unwrap();
        assert!(options.eager_init);
        assert!(!options.allow_definition_overriding);
        clear();
    }

    #[test]
    #[serial]
    fn malformed_flag_is_a_config_error() {
        clear();
        env::set_var(ENV_ALLOW_OVERRIDING, "sometimes");
        let err = ContainerOptions::from_env().unwrap_err();
        assert!(matches!(err, DiError::Config(msg) if msg.contains(ENV_ALLOW_OVERRIDING)));
        clear();
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let options = ContainerOptions::from_json_str(r#"{ "eager_init": true }"#).unwrap();
        assert!(options.eager_init);
        assert!(!options.allow_definition_overriding);
        assert!(matches!(ContainerOptions::from_json_str("{"), Err(DiError::Config(_))));
    }
}
