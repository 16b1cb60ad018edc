//! Partition - typed state, exchange and data values
//!
//! Provides [`Partition`], the value type every state, exchange and data
//! structure of a model is expressed in, and the wildcard-aware
//! [`Partition::matches`] relation.

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Partition class
///
/// Every partition type belongs to exactly one class; transitions constrain
/// states in their `initial`/`final` buckets and exchanges in the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionClass {
    /// Component state
    State,

    /// Message exchanged between components
    Exchange,

    /// Data structure carried as an exchange attribute
    Data,
}

impl Display for PartitionClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::State => write!(f, "state"),
            Self::Exchange => write!(f, "exchange"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// One instance of a state, exchange or data type
///
/// `value == None` means unconstrained. Native equality (`==`) is structural
/// and treats two wildcards as equal; use [`Partition::matches`] whenever
/// wildcard semantics are intended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    kind: String,
    class: PartitionClass,
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    attributes: IndexMap<String, Partition>,
}

impl Partition {
    /// Create partition with a value and no attributes
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, class: PartitionClass, value: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            class,
            value,
            attributes: IndexMap::new(),
        }
    }

    /// Create the unconstrained partition of a type
    #[inline]
    #[must_use]
    pub fn unconstrained(kind: impl Into<String>, class: PartitionClass) -> Self {
        Self::new(kind, class, None)
    }

    /// Builder-style attribute assignment
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Partition) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Partition type name
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Partition class
    #[inline]
    #[must_use]
    pub fn class(&self) -> PartitionClass {
        self.class
    }

    /// Current value, `None` when unconstrained
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Replace the value
    #[inline]
    pub fn set_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    /// Attributes in declaration order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, Partition> {
        &self.attributes
    }

    /// Attribute by name
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Partition> {
        self.attributes.get(name)
    }

    /// True when neither value nor attributes constrain anything
    #[inline]
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.value.is_none() && self.attributes.is_empty()
    }

    /// Wildcard-aware match
    ///
    /// Different types never match. Same-typed partitions match when their
    /// values are equal or either is unconstrained, and either side carries
    /// no attributes or both carry the same attribute names with pairwise
    /// matching attributes.
    #[must_use]
    pub fn matches(&self, other: &Partition) -> bool {
        if self.kind != other.kind {
            return false;
        }
        let values = match (&self.value, &other.value) {
            (None, _) | (_, None) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
        };
        if !values {
            return false;
        }
        if self.attributes.is_empty() || other.attributes.is_empty() {
            return true;
        }
        self.attributes.len() == other.attributes.len()
            && self.attributes.iter().all(|(name, mine)| {
                other
                    .attributes
                    .get(name)
                    .is_some_and(|theirs| mine.matches(theirs))
            })
    }

    /// Dump as a tree of primitives
    ///
    /// Format: `{"value": <value|null>, "<attr>": {<attr dump>}, ...}`
    #[must_use]
    pub fn dump(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "value".to_string(),
            self.value
                .as_ref()
                .map_or(serde_json::Value::Null, Value::to_json),
        );
        for (name, attribute) in &self.attributes {
            map.insert(name.clone(), attribute.dump());
        }
        serde_json::Value::Object(map)
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut IndexMap<String, Partition> {
        &mut self.attributes
    }

    /// Overwrite with a resolved argument
    ///
    /// A same-typed partition replaces this one wholesale; anything else only
    /// contributes its value.
    pub(crate) fn assign(&mut self, argument: &Argument) {
        match argument {
            Argument::Partition(p) if p.kind == self.kind => *self = p.clone(),
            other => self.value = other.value().cloned(),
        }
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}({value})", self.kind),
            None => write!(f, "{}(*)", self.kind),
        }
    }
}

/// Value resolved for one free argument at apply time
///
/// A state read as a whole contributes its value; attributes and exchanges
/// contribute the partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Bare value taken from a state
    Value(Value),

    /// Partition taken from an exchange
    Partition(Partition),
}

impl Argument {
    /// Underlying value, if any
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Partition(p) => p.value(),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Partition> for Argument {
    fn from(partition: Partition) -> Self {
        Self::Partition(partition)
    }
}
