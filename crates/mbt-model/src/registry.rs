//! Type registry
//!
//! Builder-based replacement for generated partition classes: a model lists
//! its types as [`TypeSpec`]s and [`TypeRegistry::build`] validates them and
//! produces one [`Catalog`] per type.

use crate::catalog::{Catalog, Code, Constructor, Description};
use crate::error::{DefinitionError, Result};
use crate::partition::{Argument, Partition, PartitionClass};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Declaration of one code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSpec {
    /// Code name, e.g. `AP(R)`
    pub name: String,
    /// Fixed positional values
    #[serde(default)]
    pub values: Vec<Value>,
    /// Free argument names
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Fixed keyword values, by attribute name
    #[serde(default)]
    pub keywords: IndexMap<String, Value>,
    /// Optional description triple
    #[serde(default)]
    pub description: Option<Description>,
}

impl CodeSpec {
    /// Create code declaration with no values or arguments
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            arguments: Vec::new(),
            keywords: IndexMap::new(),
            description: None,
        }
    }

    /// Append a fixed positional value
    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Append a free argument
    #[must_use]
    pub fn argument(mut self, name: impl Into<String>) -> Self {
        self.arguments.push(name.into());
        self
    }

    /// Set a fixed keyword value
    #[must_use]
    pub fn keyword(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(attribute.into(), value.into());
        self
    }

    /// Attach a description
    #[must_use]
    pub fn describe(
        mut self,
        id: impl Into<String>,
        short: impl Into<String>,
        long: impl Into<String>,
    ) -> Self {
        self.description = Some(Description::new(id, short, long));
        self
    }
}

/// Declaration of one partition type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    /// Type name
    pub name: String,
    /// Type class
    pub class: PartitionClass,
    /// Attributes: name to data type name
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    /// Named constructors besides the implicit type-named one
    #[serde(default)]
    pub constructors: IndexMap<String, Constructor>,
    /// Codes in declaration order
    #[serde(default)]
    pub codes: Vec<CodeSpec>,
}

impl TypeSpec {
    /// Create type declaration
    #[must_use]
    pub fn new(name: impl Into<String>, class: PartitionClass) -> Self {
        Self {
            name: name.into(),
            class,
            attributes: IndexMap::new(),
            constructors: IndexMap::new(),
            codes: Vec::new(),
        }
    }

    /// State type
    #[must_use]
    pub fn state(name: impl Into<String>) -> Self {
        Self::new(name, PartitionClass::State)
    }

    /// Exchange type
    #[must_use]
    pub fn exchange(name: impl Into<String>) -> Self {
        Self::new(name, PartitionClass::Exchange)
    }

    /// Data type
    #[must_use]
    pub fn data(name: impl Into<String>) -> Self {
        Self::new(name, PartitionClass::Data)
    }

    /// Declare an attribute of a data type
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), data_type.into());
        self
    }

    /// Declare a named constructor
    #[must_use]
    pub fn constructor(mut self, name: impl Into<String>, constructor: Constructor) -> Self {
        self.constructors.insert(name.into(), constructor);
        self
    }

    /// Add a code
    #[must_use]
    pub fn code(mut self, code: CodeSpec) -> Self {
        self.codes.push(code);
        self
    }

    /// Declare a constructor carrying its own name as value, plus its bare code
    #[must_use]
    pub fn value_code(self, name: &str) -> Self {
        self.constructor(name, Constructor::Value(Value::from(name)))
            .code(CodeSpec::new(name))
    }
}

/// Constructor basename of a code name: text before `(`, after the last `.`
#[must_use]
pub fn basename(code: &str) -> &str {
    let head = code.split_once('(').map_or(code, |(head, _)| head);
    head.rsplit_once('.').map_or(head, |(_, tail)| tail)
}

/// Validated catalogs of every type in a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistry {
    catalogs: IndexMap<String, Catalog>,
}

impl TypeRegistry {
    /// Validate type declarations and build their catalogs
    ///
    /// Data types are built first, each after the data types its attributes
    /// use, so attribute defaults can take each data type's first valid value.
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] for duplicate types, data types that
    /// contain themselves, attribute types that are not data types, codes
    /// whose basename names no constructor, and keywords naming undeclared
    /// attributes.
    pub fn build(specs: impl IntoIterator<Item = TypeSpec>) -> Result<Self> {
        let specs: Vec<TypeSpec> = specs.into_iter().collect();
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(DefinitionError::DuplicateType(spec.name.clone()));
            }
        }

        let mut registry = Self::default();
        let (mut pending, others): (Vec<_>, Vec<_>) = specs
            .into_iter()
            .partition(|s| s.class == PartitionClass::Data);
        while !pending.is_empty() {
            let ready = pending.iter().position(|spec| {
                spec.attributes
                    .values()
                    .all(|data_type| pending.iter().all(|p| &p.name != data_type))
            });
            let Some(index) = ready else {
                return Err(DefinitionError::CyclicData(pending[0].name.clone()));
            };
            let catalog = registry.build_catalog(pending.remove(index))?;
            registry.catalogs.insert(catalog.name.clone(), catalog);
        }
        for spec in others {
            let catalog = registry.build_catalog(spec)?;
            registry.catalogs.insert(catalog.name.clone(), catalog);
        }
        tracing::debug!(types = registry.catalogs.len(), "type registry built");
        Ok(registry)
    }

    fn build_catalog(&self, mut spec: TypeSpec) -> Result<Catalog> {
        let mut defaults = IndexMap::new();
        for (attribute, data_type) in &spec.attributes {
            let catalog = self
                .catalogs
                .get(data_type)
                .filter(|c| c.class == PartitionClass::Data)
                .ok_or_else(|| DefinitionError::UnknownAttributeType {
                    partition_type: spec.name.clone(),
                    attribute: attribute.clone(),
                    data_type: data_type.clone(),
                })?;
            defaults.insert(attribute.clone(), catalog.default_partition());
        }

        let mut codes = IndexMap::new();
        for code in std::mem::take(&mut spec.codes) {
            let built = Self::build_code(&spec, &defaults, code)?;
            tracing::trace!(partition_type = %spec.name, code = %built.name, "code registered");
            codes.insert(built.name.clone(), built);
        }

        Ok(Catalog {
            name: spec.name,
            class: spec.class,
            attributes: spec.attributes,
            codes,
        })
    }

    fn build_code(
        owner: &TypeSpec,
        defaults: &IndexMap<String, Partition>,
        spec: CodeSpec,
    ) -> Result<Code> {
        let kind = owner.name.as_str();
        let class = owner.class;
        let constructors = &owner.constructors;
        let attributes = &owner.attributes;
        let base = basename(&spec.name).to_string();
        let constructor = if base == kind {
            Constructor::Init
        } else {
            constructors
                .get(&base)
                .cloned()
                .ok_or_else(|| DefinitionError::UnknownConstructor {
                    partition_type: kind.to_string(),
                    code: spec.name.clone(),
                })?
        };
        if let Some(attribute) = spec.keywords.keys().find(|k| !attributes.contains_key(*k)) {
            return Err(DefinitionError::UnknownAttribute {
                partition_type: kind.to_string(),
                code: spec.name.clone(),
                attribute: attribute.clone(),
            });
        }

        let mut fallbacks = IndexMap::new();
        let template = if constructor.is_in_place() {
            Partition::unconstrained(kind, class)
        } else {
            let mut template = Partition::new(kind, class, None);
            for (name, default) in defaults {
                template = template.with_attribute(name.clone(), default.clone());
            }
            let mut positional = spec.values.iter();
            match &constructor {
                Constructor::Value(v) => template.set_value(Some(v.clone())),
                _ => template.set_value(positional.next().cloned()),
            }
            for (slot, value) in template.attributes_mut().values_mut().zip(positional) {
                slot.set_value(Some(value.clone()));
            }
            for argument in &spec.arguments {
                if let Some(slot) = template.attributes_mut().get_mut(argument) {
                    let open = Partition::unconstrained(slot.kind().to_string(), slot.class());
                    fallbacks.insert(argument.clone(), std::mem::replace(slot, open));
                }
            }
            for (name, value) in &spec.keywords {
                if let Some(slot) = template.attributes_mut().get_mut(name) {
                    slot.set_value(Some(value.clone()));
                }
            }
            template
        };

        Ok(Code {
            name: spec.name,
            basename: base,
            constructor,
            values: spec.values,
            arguments: spec.arguments,
            keywords: spec.keywords,
            description: spec.description,
            template,
            fallbacks,
        })
    }

    /// Catalog of a type
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownType`] for undeclared types.
    pub fn catalog(&self, kind: &str) -> Result<&Catalog> {
        self.catalogs
            .get(kind)
            .ok_or_else(|| DefinitionError::UnknownType(kind.to_string()))
    }

    /// Catalog of a type, if declared
    #[inline]
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Catalog> {
        self.catalogs.get(kind)
    }

    /// Code of a type
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownType`] or
    /// [`DefinitionError::UnknownCode`].
    pub fn code(&self, kind: &str, code: &str) -> Result<&Code> {
        self.catalog(kind)?
            .code(code)
            .ok_or_else(|| DefinitionError::UnknownCode {
                partition_type: kind.to_string(),
                code: code.to_string(),
            })
    }

    /// Build a partition: `make(kind, code, positional, keywords)`
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownType`] or
    /// [`DefinitionError::UnknownCode`].
    pub fn make(
        &self,
        kind: &str,
        code: &str,
        args: &[Argument],
        kwargs: &IndexMap<String, Argument>,
    ) -> Result<Partition> {
        self.catalog(kind)?.factory(code, args, kwargs)
    }

    /// Catalogs in declaration order (data types first)
    pub fn iter(&self) -> impl Iterator<Item = &Catalog> {
        self.catalogs.values()
    }

    /// Number of declared types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    /// True when no type is declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn basename_strips_arguments_and_prefix() {
        assert_eq!(basename("AP(R)"), "AP");
        assert_eq!(basename("AnotherState.append(R)"), "append");
        assert_eq!(basename("AC"), "AC");
        assert_eq!(basename("State(True)"), "State");
    }

    #[test]
    fn duplicate_type_rejected() {
        let err = TypeRegistry::build([TypeSpec::state("S"), TypeSpec::state("S")]).unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateType("S".to_string()));
    }

    #[test]
    fn unknown_constructor_rejected() {
        let err = TypeRegistry::build([TypeSpec::exchange("Action").code(CodeSpec::new("XX"))])
            .unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownConstructor { .. }));
    }

    #[test]
    fn attribute_must_be_data() {
        let err = TypeRegistry::build([
            TypeSpec::state("S").value_code("ON"),
            TypeSpec::exchange("E").attribute("R", "S"),
        ])
        .unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownAttributeType { .. }));

        let err = TypeRegistry::build([TypeSpec::exchange("E").attribute("R", "Missing")])
            .unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownAttributeType { .. }));
    }

    fn requests() -> TypeRegistry {
        TypeRegistry::build([
            TypeSpec::exchange("Action")
                .attribute("R", "ActionRequest")
                .value_code("AC")
                .constructor("AP", Constructor::Value(Value::from("AP")))
                .code(CodeSpec::new("AP(R)").argument("R")),
            TypeSpec::data("ActionRequest")
                .attribute("C", "ActionCode")
                .attribute("P", "ActionPriority")
                .code(CodeSpec::new("ActionRequest()"))
                .constructor("R2", Constructor::Value(Value::from("R2")))
                .code(CodeSpec::new("R2").keyword("C", "AT2").keyword("P", "HIGH")),
            TypeSpec::data("ActionCode").value_code("AT1").value_code("AT2"),
            TypeSpec::data("ActionPriority").value_code("NORM").value_code("HIGH"),
        ])
        .unwrap()
    }

    #[test]
    fn nested_data_built_after_its_attributes() {
        let reg = requests();
        let names: Vec<_> = reg.iter().map(Catalog::name).collect();
        assert_eq!(
            names,
            vec!["ActionCode", "ActionPriority", "ActionRequest", "Action"]
        );

        let request = reg.catalog("ActionRequest").unwrap().default_partition();
        assert_eq!(request.value(), None);
        assert_eq!(request.attribute("C").unwrap().value(), Some(&Value::from("AT1")));
        assert_eq!(request.attribute("P").unwrap().value(), Some(&Value::from("NORM")));

        let ac = reg.make("Action", "AC", &[], &IndexMap::new()).unwrap();
        assert_eq!(ac.dump()["R"]["C"]["value"], serde_json::json!("AT1"));
    }

    #[test]
    fn nested_attributes_match_recursively() {
        let reg = requests();
        let r2 = reg.make("ActionRequest", "R2", &[], &IndexMap::new()).unwrap();
        let mut kwargs = IndexMap::new();
        kwargs.insert("R".to_string(), Argument::Partition(r2.clone()));
        let high = reg.make("Action", "AP(R)", &[], &kwargs).unwrap();
        let normal = reg.make("Action", "AP(R)", &[], &IndexMap::new()).unwrap();

        assert_eq!(high.attribute("R"), Some(&r2));
        assert!(reg.code("Action", "AP(R)").unwrap().template().matches(&high));
        assert!(!high.matches(&normal));
        assert!(high.matches(&high.clone()));
    }

    #[test]
    fn data_cannot_contain_itself() {
        let err = TypeRegistry::build([
            TypeSpec::data("Outer").attribute("x", "Inner"),
            TypeSpec::data("Inner").attribute("y", "Outer"),
        ])
        .unwrap_err();
        assert_eq!(err, DefinitionError::CyclicData("Outer".to_string()));
    }

    #[test]
    fn keyword_must_name_attribute() {
        let err = TypeRegistry::build([TypeSpec::exchange("E")
            .constructor("GO", Constructor::Value(Value::from("GO")))
            .code(CodeSpec::new("GO(x=1)").keyword("x", 1_i64))])
        .unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownAttribute { .. }));
    }

    #[test]
    fn keyword_sets_attribute_value() {
        let reg = TypeRegistry::build([
            TypeSpec::data("Req").value_code("A").value_code("B"),
            TypeSpec::exchange("E")
                .attribute("R", "Req")
                .constructor("GO", Constructor::Value(Value::from("GO")))
                .code(CodeSpec::new("GO(R=B)").keyword("R", "B")),
        ])
        .unwrap();
        let p = reg.make("E", "GO(R=B)", &[], &IndexMap::new()).unwrap();
        assert_eq!(p.attribute("R").unwrap().value(), Some(&Value::from("B")));
    }

    #[test]
    fn data_types_registered_first() {
        let reg = TypeRegistry::build([
            TypeSpec::exchange("E").attribute("R", "Req").value_code("GO"),
            TypeSpec::data("Req").value_code("A"),
        ])
        .unwrap();
        let names: Vec<_> = reg.iter().map(Catalog::name).collect();
        assert_eq!(names, vec!["Req", "E"]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn make_unknown_type() {
        let reg = TypeRegistry::default();
        assert!(reg.is_empty());
        assert_eq!(
            reg.make("Nope", "X", &[], &IndexMap::new()).unwrap_err(),
            DefinitionError::UnknownType("Nope".to_string())
        );
    }

    #[test]
    fn spec_loads_from_json() {
        let spec: TypeSpec = serde_json::from_value(serde_json::json!({
            "name": "State",
            "class": "state",
            "codes": [{"name": "State(True)", "values": [true]}]
        }))
        .unwrap();
        let reg = TypeRegistry::build([spec]).unwrap();
        let p = reg.make("State", "State(True)", &[], &IndexMap::new()).unwrap();
        assert_eq!(p.value(), Some(&Value::Bool(true)));
    }
}
