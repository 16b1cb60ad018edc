//! Error types for the simulation engine
//!
//! Provides error handling for:
//! - Cascade failures inside a sandbox
//! - Configuration loading
//! - Model definition errors surfacing through the engine

use mbt_model::DefinitionError;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Model failed to build
    #[error("model definition invalid: {0}")]
    Definition(#[from] DefinitionError),

    /// Simulation failed
    #[error("simulation failed: {0}")]
    Sandbox(#[from] SandboxError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// True when the caller can backtrack or retry
    ///
    /// Definition and configuration errors abort tooling; simulation
    /// failures only rule out one candidate run.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Sandbox(_))
    }
}

/// Cascade failure inside a sandbox
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// Transition has no owning component
    #[error("transition '{0}' has no owner")]
    UnknownOwner(String),

    /// Owner names a component missing from the application
    #[error("component '{0}' not found in application")]
    UnknownComponent(String),

    /// Transition preconditions do not hold in the sandbox
    #[error("transition '{transition}' not applicable in component '{component}'")]
    NotApplicable {
        /// Transition name
        transition: String,
        /// Owning component
        component: String,
    },

    /// Produced exchange reached a component with no matching transition
    #[error("exchange '{exchange}' not consumed by '{destination}'")]
    Unconsumed {
        /// Exchange, displayed
        exchange: String,
        /// Destination component
        destination: String,
    },

    /// Cascade exceeded the configured depth
    #[error("cascade exceeded depth {0}")]
    CascadeTooDeep(usize),
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// YAML could not be parsed
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Parsed value out of range
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
