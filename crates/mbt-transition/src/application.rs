//! Application: a set of components sharing one type registry
//!
//! [`Model`] is the immutable, validated definition; [`Application`] is one
//! live instance of it with its own component states.

use crate::component::{Component, ComponentSpec};
use crate::transition::Transition;
use indexmap::IndexMap;
use mbt_model::{DefinitionError, Partition, Result, TypeRegistry, TypeSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Declaration of a whole model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Partition types
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    /// Components
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

/// Validated model definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    registry: TypeRegistry,
    components: IndexMap<String, Component>,
}

impl Model {
    /// Build the type registry, then every component against it
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] met.
    pub fn build(spec: ModelSpec) -> Result<Self> {
        let registry = TypeRegistry::build(spec.types)?;
        let mut components = IndexMap::with_capacity(spec.components.len());
        for component in &spec.components {
            let built = Component::build(component, &registry)?;
            components.insert(built.name().to_string(), built);
        }
        tracing::info!(
            types = registry.len(),
            components = components.len(),
            "model built"
        );
        Ok(Self {
            registry,
            components,
        })
    }

    /// Type registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Component prototypes, states at their first valid value
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Component prototype by name
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownComponent`].
    pub fn component(&self, name: &str) -> Result<&Component> {
        self.components
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownComponent(name.to_string()))
    }

    /// Every transition of every component
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.components.values().flat_map(Component::transitions)
    }

    /// Transition by name, searched across components
    #[must_use]
    pub fn block_by_name(&self, name: &str) -> Option<&Transition> {
        self.transitions().find(|t| t.name() == name)
    }
}

/// Identity of one application instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(Uuid);

impl ApplicationId {
    /// Fresh random identity
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live instance of a model
///
/// `Clone` keeps the identity; [`Application::fork`] issues a new one.
#[derive(Debug, Clone)]
pub struct Application {
    id: ApplicationId,
    model: Arc<Model>,
    components: IndexMap<String, Component>,
}

impl Application {
    /// Started application: every state at its first valid value
    #[must_use]
    pub fn new(model: Arc<Model>) -> Self {
        let components = model.components.clone();
        Self {
            id: ApplicationId::new(),
            model,
            components,
        }
    }

    /// Application whose every state is unconstrained
    #[must_use]
    pub fn unconstrained(model: Arc<Model>) -> Self {
        let mut app = Self::new(model);
        let model = Arc::clone(&app.model);
        for component in app.components.values_mut() {
            for state in component.states_mut() {
                if let Some(catalog) = model.registry.get(state.kind()) {
                    *state = catalog.unconstrained();
                }
            }
        }
        app
    }

    /// Deep copy with a new identity
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            id: ApplicationId::new(),
            ..self.clone()
        }
    }

    /// Instance identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> ApplicationId {
        self.id
    }

    /// Shared model
    #[inline]
    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Type registry of the model
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.model.registry
    }

    /// Components in declaration order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Component by name
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Mutable component by name
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.get_mut(name)
    }

    /// Every live state of every component
    #[must_use]
    pub fn state_list(&self) -> Vec<&Partition> {
        self.components
            .values()
            .flat_map(|c| c.states().iter())
            .collect()
    }

    /// Components other than `sender` declaring `exchange` as incoming
    #[must_use]
    pub fn destinations(&self, exchange: &Partition, sender: &str) -> Vec<String> {
        self.components
            .values()
            .filter(|c| c.name() != sender && c.accepts(exchange))
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Every target state matches some live state
    #[must_use]
    pub fn compare_states(&self, targets: &[Partition]) -> bool {
        let states = self.state_list();
        targets
            .iter()
            .all(|t| states.iter().any(|s| t.matches(s)))
    }
}
