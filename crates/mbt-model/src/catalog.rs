//! Per-type catalog of codes
//!
//! A [`Catalog`] lists every [`Code`] a partition type declares and maps
//! concrete partitions back to the code (and description) they came from.

use crate::error::{DefinitionError, Result};
use crate::partition::{Argument, Partition, PartitionClass};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Human-readable description attached to a code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Description {
    /// Requirement identifier, e.g. `S-STATE-01`
    pub id: String,
    /// One-line summary
    pub short: String,
    /// Full description
    pub long: String,
}

impl Description {
    /// Create description triple
    #[must_use]
    pub fn new(id: impl Into<String>, short: impl Into<String>, long: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            short: short.into(),
            long: long.into(),
        }
    }
}

/// Declared way of building or updating a partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constructor {
    /// Build a partition carrying a fixed value
    Value(Value),

    /// Type-named constructor; first positional argument is the value
    Init,

    /// Push the argument onto a list-valued state
    Append,

    /// Remove the argument (or the head) from a list-valued state
    Pop,

    /// Empty a list-valued state
    Flush,
}

impl Constructor {
    /// True for constructors that modify the live state instead of replacing it
    #[inline]
    #[must_use]
    pub fn is_in_place(&self) -> bool {
        matches!(self, Self::Append | Self::Pop | Self::Flush)
    }
}

/// Named constructor template within a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub(crate) name: String,
    pub(crate) basename: String,
    pub(crate) constructor: Constructor,
    pub(crate) values: Vec<Value>,
    pub(crate) arguments: Vec<String>,
    pub(crate) keywords: IndexMap<String, Value>,
    pub(crate) description: Option<Description>,
    pub(crate) template: Partition,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub(crate) fallbacks: IndexMap<String, Partition>,
}

impl Code {
    /// Full code name, e.g. `AP(R)`
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructor name, e.g. `AP`
    #[inline]
    #[must_use]
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Partition type the code belongs to
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        self.template.kind()
    }

    /// Resolved constructor
    #[inline]
    #[must_use]
    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    /// Fixed positional values
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Free argument names, in declaration order
    #[inline]
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Fixed keyword values
    #[inline]
    #[must_use]
    pub fn keywords(&self) -> &IndexMap<String, Value> {
        &self.keywords
    }

    /// Attached description, if any
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    /// Partition built from the fixed values only; free arguments are wildcards
    #[inline]
    #[must_use]
    pub fn template(&self) -> &Partition {
        &self.template
    }

    /// True when the code updates the live state in place
    #[inline]
    #[must_use]
    pub fn is_in_place(&self) -> bool {
        self.constructor.is_in_place()
    }

    /// Build a concrete partition from the template
    ///
    /// Positional `args` replace the template's positional slots: the value
    /// for `Init` codes, then attributes in declaration order. Keyword
    /// `kwargs` overlay attributes by name; a keyword naming a free argument
    /// that is not an attribute sets the value. Free-argument attributes
    /// left unsupplied take their data type's first valid value; anything
    /// else keeps the template default.
    #[must_use]
    pub fn factory(&self, args: &[Argument], kwargs: &IndexMap<String, Argument>) -> Partition {
        let mut partition = self.pattern(args, kwargs);
        for (name, fallback) in &self.fallbacks {
            if let Some(slot) = partition.attributes_mut().get_mut(name) {
                if slot.is_wildcard() {
                    *slot = fallback.clone();
                }
            }
        }
        partition
    }

    /// Like [`Code::factory`], but unsupplied free arguments stay wildcards
    ///
    /// Used to match exchanges whose arguments are not known yet.
    #[must_use]
    pub fn pattern(&self, args: &[Argument], kwargs: &IndexMap<String, Argument>) -> Partition {
        let mut partition = self.template.clone();
        if !args.is_empty() {
            let mut rest = args.iter();
            if self.constructor == Constructor::Init {
                if let Some(first) = rest.next() {
                    partition.set_value(first.value().cloned());
                }
            }
            for (slot, arg) in partition.attributes_mut().values_mut().zip(rest) {
                slot.assign(arg);
            }
        }
        for (name, arg) in kwargs {
            if let Some(slot) = partition.attributes_mut().get_mut(name) {
                slot.assign(arg);
            } else if self.arguments.iter().any(|a| a == name) {
                partition.set_value(arg.value().cloned());
            }
        }
        partition
    }

    /// Apply the code to a live state
    ///
    /// In-place codes modify `state`; every other code replaces it with
    /// [`Code::factory`] of the resolved arguments.
    pub fn update(&self, state: &mut Partition, kwargs: &IndexMap<String, Argument>) {
        let item = self
            .arguments
            .iter()
            .find_map(|a| kwargs.get(a).and_then(Argument::value).cloned())
            .or_else(|| self.values.first().cloned());
        match self.constructor {
            Constructor::Append => {
                let Some(item) = item else {
                    tracing::debug!(code = %self.name, "append without argument, state kept");
                    return;
                };
                let mut items = state
                    .value()
                    .and_then(Value::as_list)
                    .map(<[Value]>::to_vec)
                    .unwrap_or_default();
                items.push(item);
                state.set_value(Some(Value::List(items)));
            }
            Constructor::Pop => {
                let Some(items) = state.value().and_then(Value::as_list) else {
                    tracing::debug!(code = %self.name, "pop on non-list state, state kept");
                    return;
                };
                let mut items = items.to_vec();
                let index = match &item {
                    Some(item) => items.iter().position(|i| i == item),
                    None => (!items.is_empty()).then_some(0),
                };
                if let Some(index) = index {
                    items.remove(index);
                }
                state.set_value(Some(Value::List(items)));
            }
            Constructor::Flush => state.set_value(Some(Value::List(Vec::new()))),
            Constructor::Value(_) | Constructor::Init => *state = self.factory(&[], kwargs),
        }
    }
}

/// All codes declared by one partition type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub(crate) name: String,
    pub(crate) class: PartitionClass,
    pub(crate) attributes: IndexMap<String, String>,
    pub(crate) codes: IndexMap<String, Code>,
}

impl Catalog {
    /// Type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type class
    #[inline]
    #[must_use]
    pub fn class(&self) -> PartitionClass {
        self.class
    }

    /// Declared attributes: name to data type
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// True if the type declares an attribute of this name
    #[inline]
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Code by name
    #[inline]
    #[must_use]
    pub fn code(&self, name: &str) -> Option<&Code> {
        self.codes.get(name)
    }

    /// Codes in declaration order
    pub fn codes(&self) -> impl Iterator<Item = &Code> {
        self.codes.values()
    }

    /// Fully unconstrained partition of this type
    #[inline]
    #[must_use]
    pub fn unconstrained(&self) -> Partition {
        Partition::unconstrained(self.name.clone(), self.class)
    }

    /// First valid value of the type
    ///
    /// The template of the first code that builds a value; the unconstrained
    /// partition when the type only declares in-place codes.
    #[must_use]
    pub fn default_partition(&self) -> Partition {
        self.codes
            .values()
            .find(|c| !c.is_in_place())
            .map_or_else(|| self.unconstrained(), |c| c.template.clone())
    }

    /// First code whose template matches `instance`
    #[must_use]
    pub fn resolve_code(&self, instance: &Partition) -> Option<&Code> {
        self.codes
            .values()
            .filter(|c| !c.is_in_place())
            .find(|c| c.template.matches(instance))
    }

    /// Description of the first code whose template matches `instance`
    #[must_use]
    pub fn resolve_description(&self, instance: &Partition) -> Option<&Description> {
        self.resolve_code(instance).and_then(Code::description)
    }

    /// Build a partition from a named code
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownCode`] when the type has no such code.
    pub fn factory(
        &self,
        code: &str,
        args: &[Argument],
        kwargs: &IndexMap<String, Argument>,
    ) -> Result<Partition> {
        self.code(code)
            .map(|c| c.factory(args, kwargs))
            .ok_or_else(|| DefinitionError::UnknownCode {
                partition_type: self.name.clone(),
                code: code.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CodeSpec, TypeRegistry, TypeSpec};
    use pretty_assertions::assert_eq;

    fn registry() -> TypeRegistry {
        TypeRegistry::build([
            TypeSpec::data("ActionRequest")
                .value_code("AT1")
                .value_code("AT2"),
            TypeSpec::state("State")
                .code(CodeSpec::new("State(True)").value(true).describe(
                    "S-STATE-01",
                    "State is true",
                    "The component state is true",
                ))
                .code(CodeSpec::new("State(False)").value(false)),
            TypeSpec::state("Queue")
                .constructor("append", Constructor::Append)
                .constructor("pop", Constructor::Pop)
                .constructor("flush", Constructor::Flush)
                .code(CodeSpec::new("Queue([])").value(Value::List(Vec::new())))
                .code(CodeSpec::new("append(R)").argument("R"))
                .code(CodeSpec::new("pop(R)").argument("R"))
                .code(CodeSpec::new("pop()"))
                .code(CodeSpec::new("flush()")),
            TypeSpec::exchange("Action")
                .attribute("R", "ActionRequest")
                .value_code("AC")
                .constructor("AP", Constructor::Value(Value::from("AP")))
                .code(CodeSpec::new("AP(R)").argument("R")),
        ])
        .unwrap()
    }

    fn request(v: &str) -> Partition {
        Partition::new("ActionRequest", PartitionClass::Data, Some(Value::from(v)))
    }

    #[test]
    fn description_round_trip() {
        let reg = registry();
        let catalog = reg.catalog("State").unwrap();
        let p = catalog.factory("State(True)", &[], &IndexMap::new()).unwrap();
        let d = catalog.resolve_description(&p).unwrap();
        assert_eq!(d.id, "S-STATE-01");

        let p = catalog.factory("State(False)", &[], &IndexMap::new()).unwrap();
        assert!(catalog.resolve_description(&p).is_none());
        assert_eq!(catalog.resolve_code(&p).unwrap().name(), "State(False)");
    }

    #[test]
    fn default_partition_is_first_valid_value() {
        let reg = registry();
        assert_eq!(
            reg.catalog("State").unwrap().default_partition().value(),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            reg.catalog("Queue").unwrap().default_partition().value(),
            Some(&Value::List(Vec::new()))
        );
    }

    #[test]
    fn factory_keyword_overlay_wins() {
        let reg = registry();
        let catalog = reg.catalog("Action").unwrap();
        let code = catalog.code("AP(R)").unwrap();
        assert!(code.pattern(&[], &IndexMap::new()).attribute("R").unwrap().is_wildcard());
        let defaulted = catalog.factory("AP(R)", &[], &IndexMap::new()).unwrap();
        assert_eq!(defaulted.attribute("R"), Some(&request("AT1")));

        let mut kwargs = IndexMap::new();
        kwargs.insert("R".to_string(), Argument::Partition(request("AT2")));
        let p = catalog.factory("AP(R)", &[], &kwargs).unwrap();
        assert_eq!(p.value(), Some(&Value::from("AP")));
        assert_eq!(p.attribute("R"), Some(&request("AT2")));
    }

    #[test]
    fn factory_positional_fills_attributes() {
        let reg = registry();
        let catalog = reg.catalog("Action").unwrap();
        let p = catalog
            .factory("AP(R)", &[Argument::Partition(request("AT1"))], &IndexMap::new())
            .unwrap();
        assert_eq!(p.attribute("R"), Some(&request("AT1")));
    }

    #[test]
    fn non_argument_attributes_default_to_first_value() {
        let reg = registry();
        let p = reg
            .catalog("Action")
            .unwrap()
            .factory("AC", &[], &IndexMap::new())
            .unwrap();
        assert_eq!(p.attribute("R"), Some(&request("AT1")));
    }

    #[test]
    fn factory_unknown_code() {
        let reg = registry();
        let err = reg
            .catalog("State")
            .unwrap()
            .factory("State(Maybe)", &[], &IndexMap::new())
            .unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownCode { .. }));
    }

    #[test]
    fn queue_updates_in_place() {
        let reg = registry();
        let catalog = reg.catalog("Queue").unwrap();
        let mut state = catalog.default_partition();
        let mut kwargs = IndexMap::new();
        kwargs.insert("R".to_string(), Argument::Partition(request("AT1")));

        catalog.code("append(R)").unwrap().update(&mut state, &kwargs);
        catalog.code("append(R)").unwrap().update(&mut state, &kwargs);
        assert_eq!(
            state.value(),
            Some(&Value::List(vec![Value::from("AT1"), Value::from("AT1")]))
        );

        catalog.code("pop(R)").unwrap().update(&mut state, &kwargs);
        assert_eq!(state.value(), Some(&Value::List(vec![Value::from("AT1")])));

        catalog.code("pop()").unwrap().update(&mut state, &IndexMap::new());
        assert_eq!(state.value(), Some(&Value::List(Vec::new())));

        catalog.code("append(R)").unwrap().update(&mut state, &kwargs);
        catalog.code("flush()").unwrap().update(&mut state, &IndexMap::new());
        assert_eq!(state.value(), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn append_without_argument_keeps_state() {
        let reg = registry();
        let catalog = reg.catalog("Queue").unwrap();
        let mut state = catalog.default_partition();
        catalog
            .code("append(R)")
            .unwrap()
            .update(&mut state, &IndexMap::new());
        assert_eq!(state, catalog.default_partition());
    }

    #[test]
    fn replacing_update() {
        let reg = registry();
        let catalog = reg.catalog("State").unwrap();
        let mut state = catalog.default_partition();
        catalog
            .code("State(False)")
            .unwrap()
            .update(&mut state, &IndexMap::new());
        assert_eq!(state.value(), Some(&Value::Bool(false)));
    }
}
