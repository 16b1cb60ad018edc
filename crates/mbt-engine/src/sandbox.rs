//! Sandbox: isolated simulation of one transition and its cascade
//!
//! A [`Sandbox`] owns a forked [`Application`]. Applying a transition fires
//! it in its owner, then feeds every produced exchange to each other
//! component declaring it as incoming, recursively, and records the result
//! as a [`Run`] tree. Work happens on a copy that is only committed when
//! the whole cascade succeeds.

use crate::config::{EngineConfig, SandboxConfig};
use crate::error::{Result as EngineResult, SandboxError};
use crate::run::Run;
use mbt_model::Partition;
use mbt_transition::{Application, ApplicationId, Model, Transition};
use std::sync::Arc;

/// How a destination picks among its enabled transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// First enabled transition, as a running component would
    First,
    /// Every enabled transition, one branch each
    All,
}

/// One outcome of a cascade: the resulting application and the runs built
type Branch = (Application, Vec<Run>);

/// Isolated, disposable copy of an application
#[derive(Debug, Clone)]
pub struct Sandbox {
    origin: ApplicationId,
    application: Application,
    snapshot: Application,
    config: SandboxConfig,
}

impl Sandbox {
    /// Fork `application`; the caller's states are never touched
    #[must_use]
    pub fn new(application: &Application) -> Self {
        let forked = application.fork();
        Self {
            origin: application.id(),
            snapshot: forked.clone(),
            application: forked,
            config: SandboxConfig::default(),
        }
    }

    /// Fresh application, every state at its first valid value
    #[must_use]
    pub fn from_scratch(model: Arc<Model>) -> Self {
        Self::new(&Application::new(model))
    }

    /// Fork `application`, then move every state some transition constrains
    /// to that transition's precondition
    ///
    /// In-place preconditions carry no value and are skipped.
    #[must_use]
    pub fn with_transitions(application: &Application, transitions: &[Transition]) -> Self {
        let mut sandbox = Self::new(application);
        let names: Vec<String> = sandbox
            .application
            .components()
            .map(|c| c.name().to_string())
            .collect();
        for transition in transitions {
            for code in transition.initial() {
                if code.code().is_in_place() {
                    continue;
                }
                for name in &names {
                    if let Some(component) = sandbox.application.component_mut(name) {
                        component.set_state(code.template().clone());
                    }
                }
            }
        }
        sandbox.snapshot = sandbox.application.clone();
        sandbox
    }

    /// Fork `application` with the simulation limits of a validated `config`
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Config`] when `config` fails validation.
    pub fn from_config(application: &Application, config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self::new(application).with_config(config.sandbox))
    }

    /// With simulation limits
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: SandboxConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity of the application this sandbox was forked from
    #[inline]
    #[must_use]
    pub fn origin(&self) -> ApplicationId {
        self.origin
    }

    /// Current sandboxed application
    #[inline]
    #[must_use]
    pub fn application(&self) -> &Application {
        &self.application
    }

    /// Simulation limits
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Back to the states the sandbox was created with
    pub fn restart(&mut self) {
        self.application = self.snapshot.clone();
    }

    /// Simulate `transition` and its cascade, committing on success
    ///
    /// A transition with incoming codes is started from the component that
    /// produces its trigger when there is one, so the run begins where the
    /// exchange originates.
    ///
    /// # Errors
    ///
    /// Returns a [`SandboxError`] when the transition cannot fire or a
    /// produced exchange is not consumed; the sandbox is left unchanged.
    pub fn apply_transition(&mut self, transition: &Transition) -> Result<Run, SandboxError> {
        let cascade = Cascade::new(Mode::First, self.config.max_cascade_depth);
        let (application, run) = cascade
            .simulate(&self.application, transition)?
            .into_iter()
            .next()
            .ok_or_else(|| SandboxError::NotApplicable {
                transition: transition.name().to_string(),
                component: transition.owner().unwrap_or_default().to_string(),
            })?;
        tracing::debug!(
            transition = %transition,
            steps = run.walk().len(),
            "transition applied in sandbox"
        );
        self.application = application;
        Ok(run)
    }

    /// Every run `transition` can start, one per alternative at each step
    ///
    /// Failed alternatives are dropped. The sandbox is not modified.
    #[must_use]
    pub fn collect(&self, transition: &Transition) -> Vec<Run> {
        let cascade = Cascade::new(Mode::All, self.config.max_cascade_depth);
        match cascade.simulate(&self.application, transition) {
            Ok(branches) => branches.into_iter().map(|(_, run)| run).collect(),
            Err(err) => {
                tracing::debug!(transition = %transition, error = %err, "no run collected");
                Vec::new()
            }
        }
    }
}

struct Cascade {
    mode: Mode,
    max_depth: usize,
}

impl Cascade {
    fn new(mode: Mode, max_depth: usize) -> Self {
        Self { mode, max_depth }
    }

    /// Fire the root, then cascade its output
    fn simulate(
        &self,
        application: &Application,
        transition: &Transition,
    ) -> Result<Vec<(Application, Run)>, SandboxError> {
        let owner = transition
            .owner()
            .ok_or_else(|| SandboxError::UnknownOwner(transition.name().to_string()))?;
        let component = application
            .component(owner)
            .ok_or_else(|| SandboxError::UnknownComponent(owner.to_string()))?;
        if !transition.is_matching_initial(component.states()) {
            return Err(SandboxError::NotApplicable {
                transition: transition.name().to_string(),
                component: owner.to_string(),
            });
        }

        let mut roots: Vec<(String, Transition, Vec<Partition>)> = Vec::new();
        if transition.incoming().is_empty() {
            roots.push((owner.to_string(), transition.clone(), Vec::new()));
        } else {
            let trigger = transition.generic_incoming(component.states());
            for sender in application.components().filter(|c| c.name() != owner) {
                if let Some(t) = sender.get_transition_by_output(&trigger) {
                    roots.push((sender.name().to_string(), t.clone(), Vec::new()));
                    if self.mode == Mode::First {
                        break;
                    }
                }
            }
            if roots.is_empty() {
                roots.push((owner.to_string(), transition.clone(), trigger));
            }
        }

        let mut results = Vec::new();
        let mut failure = None;
        for (name, root, trigger) in roots {
            let mut app = application.clone();
            let (run, outgoing) = fire(&mut app, &name, &root, &trigger)?;
            match self.deliver(app, &name, &outgoing, 1) {
                Ok(branches) => results.extend(
                    branches
                        .into_iter()
                        .map(|(app, nodes)| (app, run.clone().with_nodes(nodes))),
                ),
                Err(err) if self.mode == Mode::All => failure = Some(err),
                Err(err) => return Err(err),
            }
        }
        match failure {
            Some(err) if results.is_empty() => Err(err),
            _ => Ok(results),
        }
    }

    /// Feed `exchanges` from `sender` to every consuming component
    ///
    /// Returns one branch per combination of alternatives; in
    /// [`Mode::First`] there is exactly one.
    fn deliver(
        &self,
        application: Application,
        sender: &str,
        exchanges: &[Partition],
        depth: usize,
    ) -> Result<Vec<Branch>, SandboxError> {
        if exchanges.is_empty() {
            return Ok(vec![(application, Vec::new())]);
        }
        if depth > self.max_depth {
            tracing::warn!(depth, "cascade too deep");
            return Err(SandboxError::CascadeTooDeep(self.max_depth));
        }

        let mut branches: Vec<Branch> = vec![(application, Vec::new())];
        for exchange in exchanges {
            let mut next = Vec::new();
            let mut failure = None;
            for (app, runs) in branches {
                match self.consume(app, sender, exchange, depth) {
                    Ok(consumed) => next.extend(consumed.into_iter().map(|(app, mut nodes)| {
                        let mut all = runs.clone();
                        all.append(&mut nodes);
                        (app, all)
                    })),
                    Err(err) => failure = Some(err),
                }
            }
            if next.is_empty() {
                if let Some(err) = failure {
                    return Err(err);
                }
            }
            branches = next;
        }
        Ok(branches)
    }

    /// Deliver one exchange to each of its destinations in turn
    fn consume(
        &self,
        application: Application,
        sender: &str,
        exchange: &Partition,
        depth: usize,
    ) -> Result<Vec<Branch>, SandboxError> {
        let destinations = application.destinations(exchange, sender);
        if destinations.is_empty() {
            tracing::trace!(exchange = %exchange, "terminal exchange");
        }
        let trigger = std::slice::from_ref(exchange);

        let mut branches: Vec<Branch> = vec![(application, Vec::new())];
        for destination in &destinations {
            let mut next = Vec::new();
            let mut failure = None;
            for (app, runs) in branches {
                let candidates: Vec<Transition> = {
                    let component = app
                        .component(destination)
                        .ok_or_else(|| SandboxError::UnknownComponent(destination.clone()))?;
                    match self.mode {
                        Mode::First => component
                            .get_transition_by_input(trigger)
                            .into_iter()
                            .cloned()
                            .collect(),
                        Mode::All => component
                            .get_blocks_by_input(trigger)
                            .into_iter()
                            .cloned()
                            .collect(),
                    }
                };
                if candidates.is_empty() {
                    tracing::debug!(
                        exchange = %exchange,
                        destination = %destination,
                        "exchange not consumed"
                    );
                    failure = Some(SandboxError::Unconsumed {
                        exchange: exchange.to_string(),
                        destination: destination.clone(),
                    });
                    continue;
                }
                for transition in &candidates {
                    let mut forked = app.clone();
                    let (run, outgoing) = fire(&mut forked, destination, transition, trigger)?;
                    match self.deliver(forked, destination, &outgoing, depth + 1) {
                        Ok(sub) => next.extend(sub.into_iter().map(|(app, nodes)| {
                            let mut all = runs.clone();
                            all.push(run.clone().with_nodes(nodes));
                            (app, all)
                        })),
                        Err(err) => failure = Some(err),
                    }
                }
            }
            if next.is_empty() {
                if let Some(err) = failure {
                    return Err(err);
                }
            }
            branches = next;
        }
        Ok(branches)
    }
}

/// Apply `transition` in `component` and record it as a leaf run
///
/// Returns the run and the exchanges to cascade.
fn fire(
    application: &mut Application,
    component: &str,
    transition: &Transition,
    exchanges: &[Partition],
) -> Result<(Run, Vec<Partition>), SandboxError> {
    let target = application
        .component_mut(component)
        .ok_or_else(|| SandboxError::UnknownComponent(component.to_string()))?;
    let returned = transition.returned_exchanges(target.states(), exchanges);
    let outgoing = transition.apply(target.states_mut(), exchanges);
    let changes = target
        .states()
        .iter()
        .filter(|s| {
            transition
                .final_()
                .iter()
                .any(|c| c.partition_type() == s.kind())
        })
        .cloned()
        .collect();
    tracing::trace!(
        component,
        transition = %transition.name(),
        outgoing = outgoing.len(),
        "fired"
    );
    let run = Run::new(transition.clone(), exchanges.to_vec(), returned, changes);
    Ok((run, outgoing))
}
