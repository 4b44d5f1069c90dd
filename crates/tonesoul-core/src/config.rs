//! Configuration types for the governance engine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonesoul_council::{BenevolenceConfig, CouncilConfig};
use tonesoul_gate::GateConfig;

use crate::error::GovernanceError;
use crate::Result;

/// Configuration for the governance engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Council rubrics.
    pub council: CouncilConfig,

    /// Betrayal gate thresholds.
    pub gate: GateConfig,

    /// Output audit.
    pub benevolence: BenevolenceConfig,

    /// Engine settings.
    pub engine: EngineConfig,
}

impl GovernanceConfig {
    /// Parses a JSON configuration. Missing sections take their defaults.
    ///
    /// # Errors
    ///
    /// [`GovernanceError::Config`] on malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GovernanceError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// [`GovernanceError::Config`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GovernanceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Checks thresholds and timeouts.
    ///
    /// Marker phrases are compiled later, when the engine is built.
    ///
    /// # Errors
    ///
    /// [`GovernanceError::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.engine.confirmation_timeout_ms == 0 {
            return Err(GovernanceError::Config(
                "engine.confirmation_timeout_ms must be positive".to_string(),
            ));
        }
        if self.engine.resolved_retention == 0 {
            return Err(GovernanceError::Config(
                "engine.resolved_retention must be positive".to_string(),
            ));
        }
        let coverage = self.gate.min_coverage;
        if !(coverage > 0.0 && coverage <= 1.0) {
            return Err(GovernanceError::Config(format!(
                "gate.min_coverage must be in (0, 1], got {coverage}"
            )));
        }
        let shadow = self.benevolence.shadow_threshold;
        if !(0.0..=1.0).contains(&shadow) {
            return Err(GovernanceError::Config(format!(
                "benevolence.shadow_threshold must be in [0, 1], got {shadow}"
            )));
        }
        if self.council.values.is_empty() && self.council.harms.is_empty() {
            return Err(GovernanceError::Config(
                "council needs at least one value rule or harm category".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the confirmation timeout.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.engine.confirmation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets how many resolved gate tokens stay answerable.
    pub fn with_resolved_retention(mut self, retention: usize) -> Self {
        self.engine.resolved_retention = retention;
        self
    }

    /// Replaces the council rubrics.
    pub fn with_council(mut self, council: CouncilConfig) -> Self {
        self.council = council;
        self
    }

    /// Replaces the gate configuration.
    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// Replaces the output audit configuration.
    pub fn with_benevolence(mut self, benevolence: BenevolenceConfig) -> Self {
        self.benevolence = benevolence;
        self
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a paused action waits for confirmation.
    pub confirmation_timeout_ms: u64,

    /// How many resolved gate tokens are remembered. Older ones are
    /// forgotten and answer as unknown.
    pub resolved_retention: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_ms: 300_000, // 5 minutes
            resolved_retention: 1024,
        }
    }
}

impl EngineConfig {
    /// Confirmation timeout as a [`Duration`].
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}
