//! Error types for model definitions
//!
//! Every variant is fatal: a model that fails to build cannot be simulated.

use crate::partition::PartitionClass;

/// Model definition error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// Reference to a type that was never declared
    #[error("unknown partition type '{0}'")]
    UnknownType(String),

    /// Reference to a code missing from its type's catalog
    #[error("unknown code '{code}' for type '{partition_type}'")]
    UnknownCode {
        /// Type searched
        partition_type: String,
        /// Missing code
        code: String,
    },

    /// Code basename names no declared constructor
    #[error("code '{code}' of type '{partition_type}' names no declared constructor")]
    UnknownConstructor {
        /// Declaring type
        partition_type: String,
        /// Offending code
        code: String,
    },

    /// Attribute declared with a type that is not a known data type
    #[error("attribute '{attribute}' of '{partition_type}' has unknown data type '{data_type}'")]
    UnknownAttributeType {
        /// Declaring type
        partition_type: String,
        /// Attribute name
        attribute: String,
        /// Referenced data type
        data_type: String,
    },

    /// Keyword value names an attribute the type does not declare
    #[error("code '{code}' of '{partition_type}' sets undeclared attribute '{attribute}'")]
    UnknownAttribute {
        /// Declaring type
        partition_type: String,
        /// Offending code
        code: String,
        /// Undeclared attribute
        attribute: String,
    },

    /// Two types share a name
    #[error("partition type '{0}' declared twice")]
    DuplicateType(String),

    /// Type used in a role reserved for another class
    #[error("type '{partition_type}' is {actual}, expected {expected} in '{role}'")]
    WrongClass {
        /// Offending type
        partition_type: String,
        /// Class required by the role
        expected: PartitionClass,
        /// Declared class
        actual: PartitionClass,
        /// Role or context name
        role: String,
    },

    /// Two codes of one state type in the same initial/final bucket
    #[error("transition '{transition}' constrains state '{partition_type}' more than once")]
    DuplicateStateConstraint {
        /// Transition name
        transition: String,
        /// Repeated state type
        partition_type: String,
    },

    /// Data type reachable from its own attributes
    #[error("data type '{0}' contains itself")]
    CyclicData(String),

    /// Reference to a component that was never declared
    #[error("unknown component '{0}'")]
    UnknownComponent(String),
}

/// Result type for model definitions
pub type Result<T> = std::result::Result<T, DefinitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_missing_piece() {
        let err = DefinitionError::UnknownCode {
            partition_type: "Action".to_string(),
            code: "XX".to_string(),
        };
        assert_eq!(err.to_string(), "unknown code 'XX' for type 'Action'");

        let err = DefinitionError::WrongClass {
            partition_type: "Action".to_string(),
            expected: PartitionClass::State,
            actual: PartitionClass::Exchange,
            role: "initial".to_string(),
        };
        assert!(err.to_string().contains("expected state"));
    }
}
