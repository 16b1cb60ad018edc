//! Bounded heuristic search for a sequence of runs
//!
//! Starting from the configuration an `origin` run leaves behind, the
//! [`Pathfinder`] looks for runs whose successive application brings every
//! state the `target` run constrains to the value it requires.
//!
//! The search is depth-first. At each step only runs that may follow the
//! current one are considered, and only those whose precondition is a subset
//! or superset of the divergent entries. Runs whose postcondition overlaps
//! the target's precondition are tried first, most overlap first; the rest
//! follow, ranked by how many target state types they newly set. A wall-clock
//! budget armed at depth zero and a depth limit cut the search short.

use crate::collection::{RunCollection, RunId};
use crate::config::{EngineConfig, PathfinderConfig};
use crate::error::Result;
use crate::reachability::ReachabilityCache;
use crate::run::{Run, StateEntry};
use indexmap::IndexMap;
use mbt_model::{Partition, TypeRegistry};
use mbt_transition::Application;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Result of one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Runs to apply in order; empty when the target already holds
    Found(Vec<RunId>),
    /// Every candidate within the depth limit failed
    Exhausted,
    /// The time budget ran out first
    TimedOut,
}

impl PathOutcome {
    /// True for [`PathOutcome::Found`]
    #[inline]
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Path, when one was found
    #[must_use]
    pub fn path(&self) -> Option<&[RunId]> {
        match self {
            Self::Found(path) => Some(path),
            Self::Exhausted | Self::TimedOut => None,
        }
    }
}

struct Timer {
    start: Instant,
    limit: Duration,
}

impl Timer {
    fn new(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    fn reset(&mut self) {
        self.start = Instant::now();
    }

    fn expired(&self) -> bool {
        self.start.elapsed() >= self.limit
    }
}

/// Mutable state of one search
struct Session<'r> {
    origin: RunId,
    target: RunId,
    precondition: &'r [StateEntry],
    target_types: HashSet<&'r str>,
    path: Vec<RunId>,
    timer: Timer,
    timed_out: bool,
}

struct Candidate<'r> {
    id: RunId,
    postcondition: &'r [StateEntry],
    overlap: usize,
    novelty: usize,
}

type Configuration = IndexMap<String, Partition>;

/// Path search over a run collection
///
/// Owns its reachability cache; build one per thread.
pub struct Pathfinder<'a> {
    application: &'a Application,
    runs: &'a RunCollection,
    cache: ReachabilityCache,
    config: PathfinderConfig,
}

impl<'a> Pathfinder<'a> {
    /// Search `runs` from the live states of `application`
    #[must_use]
    pub fn new(application: &'a Application, runs: &'a RunCollection) -> Self {
        Self {
            application,
            runs,
            cache: ReachabilityCache::new(application.id(), runs),
            config: PathfinderConfig::default(),
        }
    }

    /// Search with the limits of a validated `config`
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Config`] when `config` fails validation.
    pub fn from_config(
        application: &'a Application,
        runs: &'a RunCollection,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(application, runs).with_config(config.pathfinder))
    }

    /// With search limits
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: PathfinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjacency computed so far
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ReachabilityCache {
        &self.cache
    }

    /// Runs leading from `origin`'s postcondition to `target`'s precondition
    ///
    /// Returns `None` when either run is not part of the collection or no
    /// path was found within the limits.
    pub fn find_path(&mut self, origin: &Run, target: &Run) -> Option<Vec<Run>> {
        let origin = self.runs.position(origin)?;
        let target = self.runs.position(target)?;
        let path = match self.search(origin, target) {
            PathOutcome::Found(path) => path,
            PathOutcome::Exhausted | PathOutcome::TimedOut => return None,
        };
        Some(
            path.into_iter()
                .filter_map(|id| self.runs.get(id))
                .cloned()
                .collect(),
        )
    }

    /// Search by run id
    pub fn search(&mut self, origin: RunId, target: RunId) -> PathOutcome {
        let runs = self.runs;
        let (Some(from), Some(to)) = (runs.summary(origin), runs.summary(target)) else {
            tracing::debug!(%origin, %target, "run not in collection");
            return PathOutcome::Exhausted;
        };

        let mut configuration = Configuration::new();
        for state in self.application.state_list() {
            configuration
                .entry(state.kind().to_string())
                .or_insert_with(|| state.clone());
        }
        overlay(&mut configuration, &from.final_);

        let registry = self.application.registry();
        let diff = divergence(registry, &configuration, &to.initial);
        tracing::info!(%origin, %target, divergent = diff.len(), "path search started");
        if diff.is_empty() {
            tracing::info!(%origin, %target, "target precondition already holds");
            return PathOutcome::Found(Vec::new());
        }

        let mut session = Session {
            origin,
            target,
            precondition: &to.initial,
            target_types: to.initial.iter().map(StateEntry::partition_type).collect(),
            path: Vec::new(),
            timer: Timer::new(self.config.time_limit()),
            timed_out: false,
        };
        let outcome = if self.step(&mut session, origin, &configuration, &diff, 0) {
            PathOutcome::Found(session.path)
        } else if session.timed_out {
            PathOutcome::TimedOut
        } else {
            PathOutcome::Exhausted
        };
        tracing::info!(%origin, %target, ?outcome, "path search finished");
        outcome
    }

    fn step(
        &mut self,
        session: &mut Session<'a>,
        current: RunId,
        configuration: &Configuration,
        diff: &[StateEntry],
        depth: usize,
    ) -> bool {
        if depth == 0 {
            session.timer.reset();
        } else if session.timer.expired() {
            if !session.timed_out {
                tracing::warn!(
                    limit_ms = self.config.time_limit_ms,
                    depth,
                    "path search timed out"
                );
            }
            session.timed_out = true;
            return false;
        }
        if depth >= self.config.max_depth {
            return false;
        }

        let runs = self.runs;
        let next = self.cache.followed(runs, current);
        if diff.is_empty() && next.contains(&session.target) {
            return true;
        }

        let divergent: HashSet<&StateEntry> = diff.iter().collect();
        let mut candidates = Vec::new();
        for id in next {
            if id == session.origin || id == session.target || session.path.contains(&id) {
                continue;
            }
            let Some(summary) = runs.summary(id) else {
                continue;
            };
            let subset = summary.initial.iter().all(|e| divergent.contains(e));
            let superset = diff.iter().all(|d| summary.initial.contains(d));
            if !(subset || superset) || !holds(&summary.initial, configuration) {
                continue;
            }
            let overlap = summary
                .final_
                .iter()
                .filter(|f| session.precondition.contains(f))
                .count();
            let novelty = summary
                .final_
                .iter()
                .filter(|f| {
                    !summary.initial.contains(f)
                        && session.target_types.contains(f.partition_type())
                })
                .count();
            candidates.push(Candidate {
                id,
                postcondition: &summary.final_,
                overlap,
                novelty,
            });
        }

        let (mut ranked, mut rest): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|c| c.overlap > 0);
        ranked.sort_by_key(|c| Reverse(c.overlap));
        rest.sort_by_key(|c| Reverse(c.novelty));

        let application = self.application;
        let registry = application.registry();
        for candidate in ranked.into_iter().chain(rest) {
            tracing::trace!(depth, run = %candidate.id, "trying");
            session.path.push(candidate.id);
            let mut next_configuration = configuration.clone();
            overlay(&mut next_configuration, candidate.postcondition);
            let next_diff = divergence(registry, &next_configuration, session.precondition);
            if self.step(session, candidate.id, &next_configuration, &next_diff, depth + 1) {
                return true;
            }
            session.path.pop();
            if session.timed_out {
                return false;
            }
        }
        false
    }
}

/// Replace configured states by the postcondition templates
fn overlay(configuration: &mut Configuration, postcondition: &[StateEntry]) {
    for entry in postcondition {
        configuration.insert(
            entry.partition_type().to_string(),
            entry.template().clone(),
        );
    }
}

/// Entries naming current values the precondition rejects
fn divergence(
    registry: &TypeRegistry,
    configuration: &Configuration,
    precondition: &[StateEntry],
) -> Vec<StateEntry> {
    precondition
        .iter()
        .filter_map(|required| {
            let current = configuration.get(required.partition_type())?;
            (!required.template().matches(current))
                .then(|| StateEntry::for_state(registry, current))
        })
        .collect()
}

/// Every precondition entry agrees with the configuration
fn holds(precondition: &[StateEntry], configuration: &Configuration) -> bool {
    precondition.iter().all(|entry| {
        configuration
            .get(entry.partition_type())
            .map_or(true, |state| entry.template().matches(state))
    })
}
