//! Run collection: every run an application can start from its origins

use crate::run::{Run, StateEntry};
use crate::sandbox::Sandbox;
use mbt_transition::{Application, Model, Transition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Index of a run inside a [`RunCollection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(usize);

impl RunId {
    /// Position in the collection
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// Precondition and postcondition of a run, computed once
#[derive(Debug, Clone)]
pub(crate) struct RunSummary {
    pub(crate) initial: Vec<StateEntry>,
    pub(crate) final_: Vec<StateEntry>,
}

impl RunSummary {
    fn of(run: &Run) -> Self {
        Self {
            initial: run.initial(),
            final_: run.final_(),
        }
    }
}

/// Deduplicated, indexed set of runs
#[derive(Debug, Clone, Default)]
pub struct RunCollection {
    runs: Vec<Run>,
    summaries: Vec<RunSummary>,
}

impl RunCollection {
    /// Collect from an explicit list, dropping duplicates
    #[must_use]
    pub fn from_runs(runs: impl IntoIterator<Item = Run>) -> Self {
        let mut collection = Self::default();
        for run in runs {
            collection.push(run);
        }
        collection
    }

    /// Every run started by an origin transition, states unconstrained
    #[must_use]
    pub fn from_model(model: Arc<Model>) -> Self {
        let application = Application::unconstrained(model);
        let sandbox = Sandbox::new(&application);
        let origins = Self::origin_transitions(&application);
        let collection = Self::from_runs(origins.iter().flat_map(|t| sandbox.collect(t)));
        tracing::info!(
            origins = origins.len(),
            runs = collection.len(),
            "run collection built"
        );
        collection
    }

    /// Every run `transition` can start from the states of `application`
    #[must_use]
    pub fn from_transition(application: &Application, transition: &Transition) -> Self {
        Self::from_runs(Sandbox::new(application).collect(transition))
    }

    /// Transitions nothing else in the application triggers
    ///
    /// Those without incoming codes, and those whose trigger no other
    /// component currently produces.
    #[must_use]
    pub fn origin_transitions(application: &Application) -> Vec<&Transition> {
        let mut origins = Vec::new();
        for component in application.components() {
            for transition in component.transitions() {
                if transition.incoming().is_empty() {
                    origins.push(transition);
                    continue;
                }
                let trigger = transition.generic_incoming(component.states());
                let produced = application
                    .components()
                    .filter(|c| c.name() != component.name())
                    .any(|c| c.get_transition_by_output(&trigger).is_some());
                if !produced {
                    origins.push(transition);
                }
            }
        }
        origins
    }

    fn push(&mut self, run: Run) -> RunId {
        if let Some(id) = self.position(&run) {
            return id;
        }
        self.summaries.push(RunSummary::of(&run));
        self.runs.push(run);
        RunId(self.runs.len() - 1)
    }

    /// Run by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: RunId) -> Option<&Run> {
        self.runs.get(id.0)
    }

    pub(crate) fn summary(&self, id: RunId) -> Option<&RunSummary> {
        self.summaries.get(id.0)
    }

    /// Runs with their ids, in collection order
    pub fn iter(&self) -> impl Iterator<Item = (RunId, &Run)> {
        self.runs.iter().enumerate().map(|(i, r)| (RunId(i), r))
    }

    /// All ids, in collection order
    pub fn ids(&self) -> impl Iterator<Item = RunId> {
        (0..self.runs.len()).map(RunId)
    }

    /// Number of runs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True if there are no runs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Id of a structurally equal run
    #[must_use]
    pub fn position(&self, run: &Run) -> Option<RunId> {
        self.runs.iter().position(|r| r == run).map(RunId)
    }

    /// Id of the first run rooted at the named transition
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<RunId> {
        self.runs.iter().position(|r| r.name() == name).map(RunId)
    }
}
