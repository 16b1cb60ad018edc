//! Components: named state machines
//!
//! A [`Component`] owns one live partition per declared state type and the
//! transitions that drive them.

use crate::transition::{Transition, TransitionSpec};
use mbt_model::{DefinitionError, Partition, PartitionClass, Result, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declaration of one component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Component name
    pub name: String,
    /// Declared state types, in order
    #[serde(default)]
    pub states: Vec<String>,
    /// Owned transitions
    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

impl ComponentSpec {
    /// Create empty declaration
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a state type
    #[must_use]
    pub fn with_state(mut self, partition_type: impl Into<String>) -> Self {
        self.states.push(partition_type.into());
        self
    }

    /// Add a transition
    #[must_use]
    pub fn with_transition(mut self, transition: TransitionSpec) -> Self {
        self.transitions.push(transition);
        self
    }
}

/// State machine of one component
///
/// Cloning copies the live states; transitions are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    name: String,
    transitions: Arc<[Transition]>,
    states: Vec<Partition>,
}

impl Component {
    /// Validate a declaration; states start at their first valid value
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] for unknown or non-state state types and
    /// for any transition that fails to build.
    pub fn build(spec: &ComponentSpec, registry: &TypeRegistry) -> Result<Self> {
        let mut states = Vec::with_capacity(spec.states.len());
        for kind in &spec.states {
            let catalog = registry.catalog(kind)?;
            if catalog.class() != PartitionClass::State {
                return Err(DefinitionError::WrongClass {
                    partition_type: kind.clone(),
                    expected: PartitionClass::State,
                    actual: catalog.class(),
                    role: spec.name.clone(),
                });
            }
            states.push(catalog.default_partition());
        }

        let transitions = spec
            .transitions
            .iter()
            .map(|t| {
                let mut transition = Transition::build(t, registry)?;
                transition.set_owner(spec.name.clone());
                Ok(transition)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            component = %spec.name,
            states = states.len(),
            transitions = transitions.len(),
            "component built"
        );
        Ok(Self {
            name: spec.name.clone(),
            transitions: transitions.into(),
            states,
        })
    }

    /// Component name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Live states, one per declared state type
    #[inline]
    #[must_use]
    pub fn states(&self) -> &[Partition] {
        &self.states
    }

    /// Mutable live states
    #[inline]
    pub fn states_mut(&mut self) -> &mut [Partition] {
        &mut self.states
    }

    /// Live state of a type
    #[must_use]
    pub fn state(&self, kind: &str) -> Option<&Partition> {
        self.states.iter().find(|s| s.kind() == kind)
    }

    /// Replace the live state of the same type; false if the type is not declared
    pub fn set_state(&mut self, partition: Partition) -> bool {
        match self.states.iter_mut().find(|s| s.kind() == partition.kind()) {
            Some(slot) => {
                *slot = partition;
                true
            }
            None => false,
        }
    }

    /// Owned transitions
    #[inline]
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// True if the transition belongs to this component
    #[must_use]
    pub fn owns(&self, transition: &Transition) -> bool {
        transition.owner() == Some(self.name.as_str())
    }

    /// First transition enabled by the live states and `exchanges`
    #[must_use]
    pub fn get_transition_by_input(&self, exchanges: &[Partition]) -> Option<&Transition> {
        self.transitions.iter().find(|t| self.is_enabled(t, exchanges))
    }

    /// Every transition enabled by the live states and `exchanges`
    #[must_use]
    pub fn get_blocks_by_input(&self, exchanges: &[Partition]) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| self.is_enabled(t, exchanges))
            .collect()
    }

    /// First transition enabled by the live states that produces `exchanges`
    #[must_use]
    pub fn get_transition_by_output(&self, exchanges: &[Partition]) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.is_matching_outgoing(exchanges) && t.is_matching_initial(&self.states))
    }

    /// Transition by name
    #[must_use]
    pub fn block_by_name(&self, name: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.name() == name)
    }

    /// True if some transition declares an incoming code matching `exchange`
    ///
    /// Ignores the live states.
    #[must_use]
    pub fn accepts(&self, exchange: &Partition) -> bool {
        self.transitions
            .iter()
            .flat_map(Transition::incoming)
            .any(|c| c.template().matches(exchange))
    }

    /// Apply the first enabled transition
    ///
    /// Returns the produced exchanges, `None` if nothing is enabled.
    pub fn process(&mut self, exchanges: &[Partition]) -> Option<Vec<Partition>> {
        let transitions = Arc::clone(&self.transitions);
        let transition = transitions.iter().find(|t| self.is_enabled(t, exchanges))?;
        tracing::trace!(component = %self.name, transition = %transition.name(), "process");
        Some(transition.apply(&mut self.states, exchanges))
    }

    /// Apply `transition` with a trigger synthesized from the live states
    ///
    /// Returns `None` when the preconditions do not hold.
    pub fn simulate(&mut self, transition: &Transition) -> Option<Vec<Partition>> {
        if !transition.is_matching_initial(&self.states) {
            return None;
        }
        let incoming = transition.generic_incoming(&self.states);
        Some(transition.apply(&mut self.states, &incoming))
    }

    fn is_enabled(&self, transition: &Transition, exchanges: &[Partition]) -> bool {
        transition.is_matching_initial(&self.states)
            && transition.is_matching_incoming(exchanges, &self.states)
    }
}
