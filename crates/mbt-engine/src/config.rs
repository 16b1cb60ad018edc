//! Engine configuration
//!
//! Defaults: 5 s search budget, depth 8, cascade depth 32.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path search limits
    pub pathfinder: PathfinderConfig,
    /// Simulation limits
    pub sandbox: SandboxConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from YAML; missing fields keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] on malformed input and
    /// [`ConfigError::Invalid`] for zero limits.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that make every search or simulation fail
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pathfinder.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "pathfinder.max_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sandbox.max_cascade_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "sandbox.max_cascade_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// With path search limits
    #[inline]
    #[must_use]
    pub fn with_pathfinder(mut self, pathfinder: PathfinderConfig) -> Self {
        self.pathfinder = pathfinder;
        self
    }

    /// With simulation limits
    #[inline]
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.sandbox = sandbox;
        self
    }
}

/// Path search limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Wall-clock budget in milliseconds
    pub time_limit_ms: u64,
    /// Maximum path length explored
    pub max_depth: usize,
}

impl PathfinderConfig {
    /// Wall-clock budget
    #[inline]
    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    /// With wall-clock budget
    #[inline]
    #[must_use]
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With maximum depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 5_000,
            max_depth: 8,
        }
    }
}

/// Simulation limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum nesting of cascaded exchanges
    pub max_cascade_depth: usize,
}

impl SandboxConfig {
    /// With maximum cascade depth
    #[inline]
    #[must_use]
    pub fn with_max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = depth;
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.pathfinder.time_limit(), Duration::from_secs(5));
        assert_eq!(config.pathfinder.max_depth, 8);
        assert_eq!(config.sandbox.max_cascade_depth, 32);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("pathfinder:\n  time_limit_ms: 250\n").unwrap();
        assert_eq!(config.pathfinder.time_limit_ms, 250);
        assert_eq!(config.pathfinder.max_depth, 8);
        assert_eq!(config.sandbox, SandboxConfig::default());
    }

    #[test]
    fn zero_depth_rejected() {
        let err = EngineConfig::from_yaml_str("pathfinder:\n  max_depth: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "pathfinder.max_depth", .. }));
    }

    #[test]
    fn malformed_yaml_rejected() {
        let err = EngineConfig::from_yaml_str("pathfinder: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn builders() {
        let config = EngineConfig::new()
            .with_pathfinder(
                PathfinderConfig::default()
                    .with_time_limit(Duration::from_millis(40))
                    .with_max_depth(3),
            )
            .with_sandbox(SandboxConfig::default().with_max_cascade_depth(4));
        assert_eq!(config.pathfinder.time_limit_ms, 40);
        assert_eq!(config.pathfinder.max_depth, 3);
        assert_eq!(config.sandbox.max_cascade_depth, 4);
    }
}
