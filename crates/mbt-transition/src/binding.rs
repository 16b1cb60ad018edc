//! Argument bindings
//!
//! Which role and type feeds each free argument is fixed when a transition
//! is built; the values themselves are looked up per execution.

use indexmap::IndexMap;
use mbt_model::{Argument, Catalog, Code, Partition};
use serde::{Deserialize, Serialize};

/// Role bucket of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// State precondition
    Initial,
    /// Triggering exchange
    Incoming,
    /// State postcondition
    Final,
    /// Produced exchange
    Outgoing,
}

impl Role {
    /// Source roles searched, in order, for arguments of a code in this role
    ///
    /// Returned codes resolve like outgoing ones.
    #[must_use]
    pub fn sources(self) -> &'static [Role] {
        match self {
            Self::Final | Self::Incoming => &[Self::Initial, Self::Incoming],
            Self::Outgoing => &[Self::Incoming, Self::Final],
            Self::Initial => &[],
        }
    }

    /// True for roles holding state codes
    #[inline]
    #[must_use]
    pub fn is_state(self) -> bool {
        matches!(self, Self::Initial | Self::Final)
    }
}

/// Static source of one free argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgumentBinding {
    /// Role the value is read from
    pub role: Role,
    /// Source partition type
    pub source: String,
    /// Attribute read off the source; `None` takes the whole partition
    pub attribute: Option<String>,
}

/// Bindings of one code, by argument name
pub type Bindings = IndexMap<String, ArgumentBinding>;

/// A code of a sibling role bucket considered as argument source
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
    pub(crate) role: Role,
    pub(crate) catalog: &'a Catalog,
    pub(crate) code: &'a Code,
}

impl Candidate<'_> {
    fn bind(&self, argument: &str) -> Option<ArgumentBinding> {
        let attribute = if self.catalog.has_attribute(argument) {
            Some(argument.to_string())
        } else if self.catalog.name() == argument
            || self.code.name() == argument
            || self.code.basename() == argument
        {
            None
        } else {
            return None;
        };
        Some(ArgumentBinding {
            role: self.role,
            source: self.catalog.name().to_string(),
            attribute,
        })
    }
}

/// Bind every free argument of `code`
///
/// `candidates` must already be in search order; the first match wins and
/// unmatched arguments stay unbound.
pub(crate) fn bind(code: &Code, candidates: &[Candidate<'_>]) -> Bindings {
    code.arguments()
        .iter()
        .filter_map(|argument| {
            candidates
                .iter()
                .find_map(|c| c.bind(argument))
                .map(|binding| (argument.clone(), binding))
        })
        .collect()
}

/// Resolve the free arguments of `code` against a concrete context
///
/// State roles contribute the bound attribute of the first same-typed state,
/// or its value; exchange roles contribute the bound attribute of the first
/// same-typed exchange, or the whole exchange. Arguments without binding or source are omitted.
#[must_use]
pub fn resolve(
    code: &Code,
    bindings: &Bindings,
    states: &[Partition],
    exchanges: &[Partition],
) -> IndexMap<String, Argument> {
    let mut resolved = IndexMap::new();
    for argument in code.arguments() {
        let Some(binding) = bindings.get(argument) else {
            tracing::trace!(code = %code.name(), %argument, "argument unbound");
            continue;
        };
        let value = if binding.role.is_state() {
            states
                .iter()
                .find(|s| s.kind() == binding.source)
                .and_then(|s| match &binding.attribute {
                    Some(attribute) => s.attribute(attribute).cloned().map(Argument::Partition),
                    None => s.value().cloned().map(Argument::Value),
                })
        } else {
            exchanges
                .iter()
                .find(|e| e.kind() == binding.source)
                .and_then(|e| match &binding.attribute {
                    Some(attribute) => e.attribute(attribute).cloned(),
                    None => Some(e.clone()),
                })
                .map(Argument::Partition)
        };
        match value {
            Some(value) => {
                resolved.insert(argument.clone(), value);
            }
            None => {
                tracing::trace!(
                    code = %code.name(),
                    %argument,
                    source = %binding.source,
                    "argument source absent"
                );
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbt_model::{CodeSpec, Constructor, PartitionClass, TypeRegistry, TypeSpec, Value};
    use pretty_assertions::assert_eq;

    fn registry() -> TypeRegistry {
        TypeRegistry::build([
            TypeSpec::data("ActionRequest").value_code("AT1").value_code("AT2"),
            TypeSpec::state("Queue")
                .constructor("append", Constructor::Append)
                .code(CodeSpec::new("Queue([])").value(Value::List(Vec::new())))
                .code(CodeSpec::new("append(R)").argument("R")),
            TypeSpec::state("State")
                .code(CodeSpec::new("State(True)").value(true))
                .code(CodeSpec::new("State(S)").argument("State")),
            TypeSpec::exchange("Action")
                .attribute("R", "ActionRequest")
                .constructor("AP", Constructor::Value(Value::from("AP")))
                .code(CodeSpec::new("AP(R)").argument("R")),
        ])
        .unwrap()
    }

    #[test]
    fn sources_follow_role_precedence() {
        assert_eq!(Role::Final.sources(), &[Role::Initial, Role::Incoming]);
        assert_eq!(Role::Incoming.sources(), &[Role::Initial, Role::Incoming]);
        assert_eq!(Role::Outgoing.sources(), &[Role::Incoming, Role::Final]);
        assert!(Role::Initial.sources().is_empty());
    }

    #[test]
    fn binds_by_attribute_name() {
        let reg = registry();
        let action = reg.catalog("Action").unwrap();
        let candidates = [Candidate {
            role: Role::Incoming,
            catalog: action,
            code: action.code("AP(R)").unwrap(),
        }];
        let bindings = bind(reg.code("Queue", "append(R)").unwrap(), &candidates);
        assert_eq!(
            bindings.get("R"),
            Some(&ArgumentBinding {
                role: Role::Incoming,
                source: "Action".to_string(),
                attribute: Some("R".to_string()),
            })
        );
    }

    #[test]
    fn binds_by_type_name() {
        let reg = registry();
        let state = reg.catalog("State").unwrap();
        let candidates = [Candidate {
            role: Role::Initial,
            catalog: state,
            code: state.code("State(True)").unwrap(),
        }];
        let bindings = bind(reg.code("State", "State(S)").unwrap(), &candidates);
        assert_eq!(bindings["State"].attribute, None);
        assert_eq!(bindings["State"].role, Role::Initial);
    }

    #[test]
    fn first_candidate_wins() {
        let reg = registry();
        let action = reg.catalog("Action").unwrap();
        let code = action.code("AP(R)").unwrap();
        let candidates = [
            Candidate { role: Role::Incoming, catalog: action, code },
            Candidate { role: Role::Final, catalog: action, code },
        ];
        let bindings = bind(reg.code("Queue", "append(R)").unwrap(), &candidates);
        assert_eq!(bindings["R"].role, Role::Incoming);
    }

    #[test]
    fn unmatched_argument_stays_unbound() {
        let reg = registry();
        let bindings = bind(reg.code("Queue", "append(R)").unwrap(), &[]);
        assert!(bindings.is_empty());
    }

    #[test]
    fn resolve_reads_attribute_and_state_value() {
        let reg = registry();
        let code = reg.code("Queue", "append(R)").unwrap();
        let mut bindings = Bindings::new();
        bindings.insert(
            "R".to_string(),
            ArgumentBinding {
                role: Role::Incoming,
                source: "Action".to_string(),
                attribute: Some("R".to_string()),
            },
        );
        let request = Partition::new("ActionRequest", PartitionClass::Data, Some("AT2".into()));
        let exchange = Partition::new("Action", PartitionClass::Exchange, Some("AP".into()))
            .with_attribute("R", request.clone());
        let resolved = resolve(code, &bindings, &[], &[exchange]);
        assert_eq!(resolved.get("R"), Some(&Argument::Partition(request)));

        let state_code = reg.code("State", "State(S)").unwrap();
        let mut bindings = Bindings::new();
        bindings.insert(
            "State".to_string(),
            ArgumentBinding {
                role: Role::Initial,
                source: "State".to_string(),
                attribute: None,
            },
        );
        let live = Partition::new("State", PartitionClass::State, Some(false.into()));
        let resolved = resolve(state_code, &bindings, &[live], &[]);
        assert_eq!(resolved.get("State"), Some(&Argument::Value(false.into())));
    }

    #[test]
    fn resolve_omits_absent_sources() {
        let reg = registry();
        let code = reg.code("Queue", "append(R)").unwrap();
        let mut bindings = Bindings::new();
        bindings.insert(
            "R".to_string(),
            ArgumentBinding {
                role: Role::Incoming,
                source: "Action".to_string(),
                attribute: Some("R".to_string()),
            },
        );
        assert!(resolve(code, &bindings, &[], &[]).is_empty());
    }
}
