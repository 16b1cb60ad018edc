//! Transition (block) state machine semantics
//!
//! A [`Transition`] is a guarded state-change rule: `initial` states and
//! `incoming` exchanges guard it, `final` states and `outgoing` exchanges
//! describe its effect, `returned` exchanges reply to the sender.

use crate::binding::{self, Bindings, Candidate, Role};
use mbt_model::{Catalog, Code, DefinitionError, Partition, PartitionClass, Result, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Reference to a code of a partition type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeRef {
    /// Partition type name
    #[serde(rename = "type")]
    pub partition_type: String,
    /// Code name within the type
    pub code: String,
}

impl CodeRef {
    /// Create reference
    #[must_use]
    pub fn new(partition_type: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            partition_type: partition_type.into(),
            code: code.into(),
        }
    }
}

/// Declaration of one transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    /// Transition name
    pub name: String,
    /// State preconditions
    #[serde(default)]
    pub initial: Vec<CodeRef>,
    /// Triggering exchanges
    #[serde(default)]
    pub incoming: Vec<CodeRef>,
    /// State postconditions
    #[serde(default, rename = "final")]
    pub final_: Vec<CodeRef>,
    /// Produced exchanges
    #[serde(default)]
    pub outgoing: Vec<CodeRef>,
    /// Replies to the sender
    #[serde(default)]
    pub returned: Vec<CodeRef>,
}

impl TransitionSpec {
    /// Create empty declaration
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a state precondition
    #[must_use]
    pub fn with_initial(mut self, partition_type: &str, code: &str) -> Self {
        self.initial.push(CodeRef::new(partition_type, code));
        self
    }

    /// Add a triggering exchange
    #[must_use]
    pub fn with_incoming(mut self, partition_type: &str, code: &str) -> Self {
        self.incoming.push(CodeRef::new(partition_type, code));
        self
    }

    /// Add a state postcondition
    #[must_use]
    pub fn with_final(mut self, partition_type: &str, code: &str) -> Self {
        self.final_.push(CodeRef::new(partition_type, code));
        self
    }

    /// Add a produced exchange
    #[must_use]
    pub fn with_outgoing(mut self, partition_type: &str, code: &str) -> Self {
        self.outgoing.push(CodeRef::new(partition_type, code));
        self
    }

    /// Add a reply
    #[must_use]
    pub fn with_returned(mut self, partition_type: &str, code: &str) -> Self {
        self.returned.push(CodeRef::new(partition_type, code));
        self
    }
}

/// A resolved code inside a transition, with its argument bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCode {
    partition_type: String,
    code: Code,
    bindings: Bindings,
}

impl TransitionCode {
    /// Partition type name
    #[inline]
    #[must_use]
    pub fn partition_type(&self) -> &str {
        &self.partition_type
    }

    /// Catalog code
    #[inline]
    #[must_use]
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Static argument bindings
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Template partition, free arguments unconstrained
    #[inline]
    #[must_use]
    pub fn template(&self) -> &Partition {
        self.code.template()
    }

    /// Build the partition this code denotes in a concrete context
    ///
    /// Arguments the context cannot supply take their default.
    #[must_use]
    pub fn instantiate(&self, states: &[Partition], exchanges: &[Partition]) -> Partition {
        let arguments = binding::resolve(&self.code, &self.bindings, states, exchanges);
        self.code.factory(&[], &arguments)
    }

    /// Partition to match against, arguments the context cannot supply open
    #[must_use]
    pub fn pattern(&self, states: &[Partition], exchanges: &[Partition]) -> Partition {
        let arguments = binding::resolve(&self.code, &self.bindings, states, exchanges);
        self.code.pattern(&[], &arguments)
    }
}

/// Guarded state-change rule
///
/// Immutable once built, apart from its owning component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    name: String,
    owner: Option<String>,
    initial: Vec<TransitionCode>,
    incoming: Vec<TransitionCode>,
    final_: Vec<TransitionCode>,
    outgoing: Vec<TransitionCode>,
    returned: Vec<TransitionCode>,
}

struct Bucket<'a> {
    role: Role,
    codes: Vec<(&'a Catalog, &'a Code)>,
}

impl<'a> Bucket<'a> {
    fn lookup(
        registry: &'a TypeRegistry,
        transition: &str,
        role: Role,
        refs: &[CodeRef],
        class: PartitionClass,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut codes = Vec::with_capacity(refs.len());
        for r in refs {
            let catalog = registry.catalog(&r.partition_type)?;
            if catalog.class() != class {
                return Err(DefinitionError::WrongClass {
                    partition_type: r.partition_type.clone(),
                    expected: class,
                    actual: catalog.class(),
                    role: format!("{transition}.{role:?}"),
                });
            }
            if class == PartitionClass::State && !seen.insert(r.partition_type.as_str()) {
                return Err(DefinitionError::DuplicateStateConstraint {
                    transition: transition.to_string(),
                    partition_type: r.partition_type.clone(),
                });
            }
            let code = catalog.code(&r.code).ok_or_else(|| DefinitionError::UnknownCode {
                partition_type: r.partition_type.clone(),
                code: r.code.clone(),
            })?;
            codes.push((catalog, code));
        }
        Ok(Self { role, codes })
    }

    /// Finish codes of this bucket, binding arguments in `role` order
    fn finish(&self, role: Role, buckets: &[&Bucket<'a>]) -> Vec<TransitionCode> {
        let candidates: Vec<Candidate<'_>> = role
            .sources()
            .iter()
            .flat_map(|source| buckets.iter().filter(move |b| b.role == *source))
            .flat_map(|b| {
                b.codes.iter().map(move |&(catalog, code)| Candidate {
                    role: b.role,
                    catalog,
                    code,
                })
            })
            .collect();
        self.codes
            .iter()
            .map(|&(catalog, code)| TransitionCode {
                partition_type: catalog.name().to_string(),
                code: code.clone(),
                bindings: binding::bind(code, &candidates),
            })
            .collect()
    }
}

impl Transition {
    /// Validate a declaration and compute argument bindings
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] when a code is unknown, a type is used
    /// in a role of the wrong class, or a state type appears twice in
    /// `initial` or `final`.
    pub fn build(spec: &TransitionSpec, registry: &TypeRegistry) -> Result<Self> {
        use PartitionClass::{Exchange, State};

        let name = spec.name.as_str();
        let initial = Bucket::lookup(registry, name, Role::Initial, &spec.initial, State)?;
        let incoming = Bucket::lookup(registry, name, Role::Incoming, &spec.incoming, Exchange)?;
        let final_ = Bucket::lookup(registry, name, Role::Final, &spec.final_, State)?;
        let outgoing = Bucket::lookup(registry, name, Role::Outgoing, &spec.outgoing, Exchange)?;
        let returned = Bucket::lookup(registry, name, Role::Outgoing, &spec.returned, Exchange)?;
        let buckets = [&initial, &incoming, &final_, &outgoing];

        let transition = Self {
            name: spec.name.clone(),
            owner: None,
            initial: initial.finish(Role::Initial, &buckets),
            incoming: incoming.finish(Role::Incoming, &buckets),
            final_: final_.finish(Role::Final, &buckets),
            outgoing: outgoing.finish(Role::Outgoing, &buckets),
            returned: returned.finish(Role::Outgoing, &buckets),
        };
        tracing::trace!(transition = %transition.name, "transition built");
        Ok(transition)
    }

    /// Transition name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning component, once assigned
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Assign the owning component
    #[inline]
    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = Some(owner.into());
    }

    /// State preconditions
    #[inline]
    #[must_use]
    pub fn initial(&self) -> &[TransitionCode] {
        &self.initial
    }

    /// Triggering exchanges
    #[inline]
    #[must_use]
    pub fn incoming(&self) -> &[TransitionCode] {
        &self.incoming
    }

    /// State postconditions
    #[inline]
    #[must_use]
    pub fn final_(&self) -> &[TransitionCode] {
        &self.final_
    }

    /// Produced exchanges
    #[inline]
    #[must_use]
    pub fn outgoing(&self) -> &[TransitionCode] {
        &self.outgoing
    }

    /// Replies to the sender
    #[inline]
    #[must_use]
    pub fn returned(&self) -> &[TransitionCode] {
        &self.returned
    }

    /// Every initial code matches some live state
    #[must_use]
    pub fn is_matching_initial(&self, states: &[Partition]) -> bool {
        self.initial
            .iter()
            .all(|c| states.iter().any(|s| c.template().matches(s)))
    }

    /// Every incoming code, resolved against `states`, matches some exchange
    ///
    /// A transition without incoming codes is only triggered by an empty
    /// exchange list.
    #[must_use]
    pub fn is_matching_incoming(&self, exchanges: &[Partition], states: &[Partition]) -> bool {
        if self.incoming.is_empty() {
            return exchanges.is_empty();
        }
        self.incoming.iter().all(|c| {
            let expected = c.pattern(states, &[]);
            exchanges.iter().any(|e| expected.matches(e))
        })
    }

    /// The transition produces every exchange in `exchanges`
    ///
    /// An empty list only matches a transition without outgoing codes.
    #[must_use]
    pub fn is_matching_outgoing(&self, exchanges: &[Partition]) -> bool {
        if exchanges.is_empty() {
            return self.outgoing.is_empty();
        }
        exchanges
            .iter()
            .all(|e| self.outgoing.iter().any(|c| c.template().matches(e)))
    }

    /// Every replacing final code matches some state
    #[must_use]
    pub fn is_matching_final(&self, states: &[Partition]) -> bool {
        self.final_
            .iter()
            .filter(|c| !c.code().is_in_place())
            .all(|c| states.iter().any(|s| c.template().matches(s)))
    }

    /// Template trigger built from known state only
    #[must_use]
    pub fn generic_incoming(&self, states: &[Partition]) -> Vec<Partition> {
        self.incoming
            .iter()
            .map(|c| c.pattern(states, &[]))
            .collect()
    }

    /// Replies produced for a concrete trigger
    #[must_use]
    pub fn returned_exchanges(
        &self,
        states: &[Partition],
        exchanges: &[Partition],
    ) -> Vec<Partition> {
        self.returned
            .iter()
            .map(|c| c.instantiate(states, exchanges))
            .collect()
    }

    /// Execute against live states
    ///
    /// Final codes resolve against the states as they were on entry and
    /// update or replace the same-typed state; outgoing codes then resolve
    /// against the updated states. All updates are staged and committed
    /// together. Returns the produced exchanges in declaration order.
    pub fn apply(&self, states: &mut [Partition], exchanges: &[Partition]) -> Vec<Partition> {
        let mut staged = states.to_vec();
        for code in &self.final_ {
            let arguments = binding::resolve(code.code(), code.bindings(), states, exchanges);
            match staged.iter_mut().find(|s| s.kind() == code.partition_type()) {
                Some(slot) => code.code().update(slot, &arguments),
                None => tracing::debug!(
                    transition = %self.name,
                    state = %code.partition_type(),
                    "final state not present, skipped"
                ),
            }
        }
        let outgoing = self
            .outgoing
            .iter()
            .map(|c| c.instantiate(&staged, exchanges))
            .collect();
        states.clone_from_slice(&staged);
        outgoing
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}::{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
