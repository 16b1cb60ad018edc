//! Lazily built "run B may follow run A" relation
//!
//! B follows A when every precondition of B agrees with A's postcondition on
//! the state types both constrain. Rows are computed on first use and kept
//! until [`ReachabilityCache::invalidate`].

use crate::collection::{RunCollection, RunId};
use mbt_transition::ApplicationId;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

/// Memoized adjacency over one [`RunCollection`]
#[derive(Debug, Clone)]
pub struct ReachabilityCache {
    application: ApplicationId,
    graph: DiGraphMap<RunId, ()>,
    expanded: Vec<bool>,
}

impl ReachabilityCache {
    /// Empty cache sized for `runs`
    #[must_use]
    pub fn new(application: ApplicationId, runs: &RunCollection) -> Self {
        Self {
            application,
            graph: DiGraphMap::new(),
            expanded: vec![false; runs.len()],
        }
    }

    /// Application instance the rows describe
    #[inline]
    #[must_use]
    pub fn application(&self) -> ApplicationId {
        self.application
    }

    /// Runs that may follow `id`, in collection order
    pub fn followed(&mut self, runs: &RunCollection, id: RunId) -> Vec<RunId> {
        let Some(done) = self.expanded.get(id.index()).copied() else {
            return Vec::new();
        };
        if !done {
            self.expand(runs, id);
        }
        let mut next: Vec<RunId> = self
            .graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect();
        next.sort_unstable();
        next
    }

    /// Drop every row; the cache now describes `application`
    pub fn invalidate(&mut self, application: ApplicationId, runs: &RunCollection) {
        tracing::debug!(from = %self.application, to = %application, "reachability invalidated");
        self.application = application;
        self.graph.clear();
        self.expanded = vec![false; runs.len()];
    }

    /// Runs with a computed row
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Known follow relations
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn expand(&mut self, runs: &RunCollection, id: RunId) {
        self.graph.add_node(id);
        if let Some(from) = runs.summary(id) {
            for other in runs.ids() {
                let Some(to) = runs.summary(other) else {
                    continue;
                };
                let agrees = to.initial.iter().all(|pre| {
                    from.final_
                        .iter()
                        .filter(|post| post.partition_type() == pre.partition_type())
                        .all(|post| pre.matches(post))
                });
                if agrees {
                    self.graph.add_edge(id, other, ());
                }
            }
        }
        self.expanded[id.index()] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbt_test_utils::{sample_model, PRESS_AC, PRESS_AP, PRESS_PP, PRESS_RL};
    use pretty_assertions::assert_eq;

    fn ids(runs: &RunCollection, names: &[&str]) -> Vec<RunId> {
        names.iter().map(|n| runs.by_name(n).unwrap()).collect()
    }

    #[test]
    fn toggles_alternate() {
        let runs = RunCollection::from_model(sample_model());
        let mut cache = ReachabilityCache::new(ApplicationId::new(), &runs);
        let ac = runs.by_name(PRESS_AC).unwrap();
        assert_eq!(
            cache.followed(&runs, ac),
            ids(&runs, &[PRESS_RL, PRESS_AP, PRESS_PP])
        );
        let rl = runs.by_name(PRESS_RL).unwrap();
        assert_eq!(
            cache.followed(&runs, rl),
            ids(&runs, &[PRESS_AC, PRESS_AP, PRESS_PP])
        );
    }

    #[test]
    fn rows_are_memoized_until_invalidated() {
        let runs = RunCollection::from_model(sample_model());
        let mut cache = ReachabilityCache::new(ApplicationId::new(), &runs);
        let ap = runs.by_name(PRESS_AP).unwrap();
        let first = cache.followed(&runs, ap);
        let edges = cache.edge_count();
        assert_eq!(cache.followed(&runs, ap), first);
        assert_eq!(cache.edge_count(), edges);
        assert_eq!(first.len(), runs.len());

        let fresh = ApplicationId::new();
        cache.invalidate(fresh, &runs);
        assert_eq!(cache.application(), fresh);
        assert_eq!(cache.node_count(), 0);
    }

    #[test]
    fn unknown_run_has_no_successors() {
        let runs = RunCollection::default();
        let mut cache = ReachabilityCache::new(ApplicationId::new(), &runs);
        assert!(cache.followed(&runs, RunId::from_index(3)).is_empty());
    }
}
