//! Runs: trees of transitions produced by one cascading execution
//!
//! The root is the transition that was applied; each child is the
//! transition a destination component fired for one produced exchange.

use indexmap::IndexMap;
use mbt_model::{Partition, TypeRegistry};
use mbt_transition::{Application, Transition, TransitionCode};
use serde_json::{json, Map, Value as Json};
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

/// One state-type constraint of a run's precondition or postcondition
///
/// Identity is the `(type, code)` pair; the template carries the value used
/// for matching.
#[derive(Debug, Clone)]
pub struct StateEntry {
    partition_type: String,
    code: String,
    template: Partition,
}

impl StateEntry {
    /// Entry for a transition code
    #[must_use]
    pub fn from_code(code: &TransitionCode) -> Self {
        Self {
            partition_type: code.partition_type().to_string(),
            code: code.code().name().to_string(),
            template: code.template().clone(),
        }
    }

    /// Entry naming a live state by the first catalog code it matches
    ///
    /// States no code describes are named by their display form.
    #[must_use]
    pub fn for_state(registry: &TypeRegistry, state: &Partition) -> Self {
        let code = registry
            .get(state.kind())
            .and_then(|c| c.resolve_code(state))
            .map_or_else(|| state.to_string(), |c| c.name().to_string());
        Self {
            partition_type: state.kind().to_string(),
            code,
            template: state.clone(),
        }
    }

    /// State type
    #[inline]
    #[must_use]
    pub fn partition_type(&self) -> &str {
        &self.partition_type
    }

    /// Code name
    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Partition the entry stands for
    #[inline]
    #[must_use]
    pub fn template(&self) -> &Partition {
        &self.template
    }

    /// Wildcard-aware comparison of the templates
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &StateEntry) -> bool {
        self.template.matches(&other.template)
    }
}

impl PartialEq for StateEntry {
    fn eq(&self, other: &Self) -> bool {
        self.partition_type == other.partition_type && self.code == other.code
    }
}

impl Eq for StateEntry {}

impl Hash for StateEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.partition_type.hash(state);
        self.code.hash(state);
    }
}

/// Tree of transitions from one simulated execution
///
/// Two runs are equal when their transitions and subtrees are; the recorded
/// exchanges and state changes depend on where the run was simulated and
/// are ignored.
#[derive(Debug, Clone)]
pub struct Run {
    transition: Transition,
    exchanges: Vec<Partition>,
    returned: Vec<Partition>,
    changes: Vec<Partition>,
    nodes: Vec<Run>,
}

impl PartialEq for Run {
    fn eq(&self, other: &Self) -> bool {
        self.transition == other.transition && self.nodes == other.nodes
    }
}

impl Eq for Run {}

impl Run {
    pub(crate) fn new(
        transition: Transition,
        exchanges: Vec<Partition>,
        returned: Vec<Partition>,
        changes: Vec<Partition>,
    ) -> Self {
        Self {
            transition,
            exchanges,
            returned,
            changes,
            nodes: Vec::new(),
        }
    }

    pub(crate) fn with_nodes(mut self, nodes: Vec<Run>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Root transition
    #[inline]
    #[must_use]
    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    /// Root transition name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.transition.name()
    }

    /// Exchanges that triggered the root
    #[inline]
    #[must_use]
    pub fn exchanges(&self) -> &[Partition] {
        &self.exchanges
    }

    /// Replies the root returned to its sender
    #[inline]
    #[must_use]
    pub fn returned(&self) -> &[Partition] {
        &self.returned
    }

    /// Owner states of every final type, as left by the root
    #[inline]
    #[must_use]
    pub fn changes(&self) -> &[Partition] {
        &self.changes
    }

    /// Child runs, in delivery order
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[Run] {
        &self.nodes
    }

    /// Depth-first, pre-order
    #[must_use]
    pub fn walk(&self) -> Vec<&Run> {
        let mut out = vec![self];
        for node in &self.nodes {
            out.extend(node.walk());
        }
        out
    }

    /// Breadth-first
    #[must_use]
    pub fn breadth_walk(&self) -> Vec<&Run> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([self]);
        while let Some(run) = queue.pop_front() {
            out.push(run);
            queue.extend(run.nodes.iter());
        }
        out
    }

    /// Precondition: first initial code seen per state type, breadth-first
    #[must_use]
    pub fn initial(&self) -> Vec<StateEntry> {
        let mut entries: IndexMap<String, StateEntry> = IndexMap::new();
        for run in self.breadth_walk() {
            for code in run.transition.initial() {
                entries
                    .entry(code.partition_type().to_string())
                    .or_insert_with(|| StateEntry::from_code(code));
            }
        }
        entries.into_values().collect()
    }

    /// Postcondition: last final code seen per state type, breadth-first
    #[must_use]
    pub fn final_(&self) -> Vec<StateEntry> {
        let mut entries: IndexMap<String, StateEntry> = IndexMap::new();
        for run in self.breadth_walk() {
            for code in run.transition.final_() {
                entries.insert(code.partition_type().to_string(), StateEntry::from_code(code));
            }
        }
        entries.into_values().collect()
    }

    /// Every transition of the tree holds its preconditions in `application`
    ///
    /// Each transition is checked against its owner's live states.
    #[must_use]
    pub fn compare_initial(&self, application: &Application) -> bool {
        self.breadth_walk().into_iter().all(|run| {
            run.transition
                .owner()
                .and_then(|owner| application.component(owner))
                .is_some_and(|c| run.transition.is_matching_initial(c.states()))
        })
    }

    /// Every transition of the tree left its owner in its postcondition
    ///
    /// In-place codes carry no value and are not checked.
    #[must_use]
    pub fn compare_final(&self, application: &Application) -> bool {
        self.breadth_walk().into_iter().all(|run| {
            run.transition
                .owner()
                .and_then(|owner| application.component(owner))
                .is_some_and(|c| run.transition.is_matching_final(c.states()))
        })
    }

    /// First transition of the tree enabled by `exchanges` and `states`
    #[must_use]
    pub fn get_transition_by_input_states(
        &self,
        exchanges: &[Partition],
        states: &[Partition],
    ) -> Option<&Transition> {
        self.walk()
            .into_iter()
            .map(|run| &run.transition)
            .find(|t| t.is_matching_incoming(exchanges, states) && t.is_matching_initial(states))
    }

    /// Nested step dump: root, trigger and output codes, state changes, nodes
    #[must_use]
    pub fn dump_steps(&self) -> Json {
        let codes = |codes: &[TransitionCode]| -> Vec<String> {
            codes.iter().map(|c| c.code().name().to_string()).collect()
        };
        let mut states = Map::new();
        for change in &self.changes {
            states.insert(change.kind().to_string(), change.dump());
        }
        let mut owner = Map::new();
        owner.insert(self.owner_name().to_string(), Json::Object(states));
        json!({
            "root": self.name(),
            "incoming": codes(self.transition.incoming()),
            "outgoing": codes(self.transition.outgoing()),
            "states": owner,
            "nodes": self.nodes.iter().map(Run::dump_steps).collect::<Vec<_>>(),
        })
    }

    /// Precondition dump, `{component: {type: dump}}`, first seen wins
    #[must_use]
    pub fn dump_initial(&self) -> Json {
        let mut dump: Map<String, Json> = Map::new();
        for run in self.breadth_walk() {
            for code in run.transition.initial() {
                let component = dump
                    .entry(run.owner_name().to_string())
                    .or_insert_with(|| Json::Object(Map::new()));
                if let Json::Object(types) = component {
                    types
                        .entry(code.partition_type().to_string())
                        .or_insert_with(|| code.template().dump());
                }
            }
        }
        Json::Object(dump)
    }

    /// Recorded state changes, `{component: {type: dump}}`, last seen wins
    #[must_use]
    pub fn dump_final(&self) -> Json {
        let mut dump: Map<String, Json> = Map::new();
        for run in self.breadth_walk() {
            for change in &run.changes {
                let component = dump
                    .entry(run.owner_name().to_string())
                    .or_insert_with(|| Json::Object(Map::new()));
                if let Json::Object(types) = component {
                    types.insert(change.kind().to_string(), change.dump());
                }
            }
        }
        Json::Object(dump)
    }

    fn owner_name(&self) -> &str {
        self.transition.owner().unwrap_or_default()
    }
}
