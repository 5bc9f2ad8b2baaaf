//! Component definitions.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::args::Args;
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;

/// Type-erased shared component value.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Builds a component value. The container passes itself and the explicit
/// arguments of the lookup.
pub(crate) type Ctor = Arc<dyn Fn(&Container, &Args) -> DiResult<AnyArc> + Send + Sync>;

/// Runs once per created singleton when the container is destroyed.
pub(crate) type DestroyHook = Arc<dyn Fn(&AnyArc) + Send + Sync>;

/// Where a definition came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A pre-built instance.
    Instance,
    /// A closure registered on the builder.
    Closure,
    /// An enhanced configuration type.
    Configuration(&'static str),
    /// A factory method on an enhanced configuration type.
    FactoryMethod {
        class: &'static str,
        method: &'static str,
    },
    /// The proxy half of a scope-proxied factory method.
    ScopedProxy { target: String },
}

/// A registered component.
pub(crate) struct Definition {
    pub(crate) name: String,
    pub(crate) lifetime: Lifetime,
    /// Declared value type
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) ctor: Ctor,
    pub(crate) lazy: bool,
    pub(crate) destroy: Option<DestroyHook>,
    pub(crate) origin: Origin,
}

impl Definition {
    pub(crate) fn new(
        name: impl Into<String>,
        lifetime: Lifetime,
        type_id: TypeId,
        type_name: &'static str,
        origin: Origin,
        ctor: Ctor,
    ) -> Self {
        Self {
            name: name.into(),
            lifetime,
            type_id,
            type_name,
            ctor,
            lazy: false,
            destroy: None,
            origin,
        }
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .field("type_name", &self.type_name)
            .field("lazy", &self.lazy)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Definitions by name, in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    index: HashMap<String, usize>,
    definitions: Vec<Arc<Definition>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a definition. An existing name is replaced in place when
    /// overriding is allowed, keeping its registration position.
    pub(crate) fn insert(&mut self, definition: Definition, allow_override: bool) -> DiResult<()> {
        match self.index.get(&definition.name) {
            Some(&pos) if allow_override => {
                tracing::debug!(name = %definition.name, "overriding component definition");
                self.definitions[pos] = Arc::new(definition);
                Ok(())
            }
            Some(_) => Err(DiError::DuplicateDefinition(definition.name)),
            None => {
                self.index.insert(definition.name.clone(), self.definitions.len());
                self.definitions.push(Arc::new(definition));
                Ok(())
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Definition>> {
        self.index.get(name).map(|&pos| &self.definitions[pos])
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Definition>> {
        self.definitions.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.definitions.len()
    }
}
