//! Configuration for the host adapter.
//!
//! Maps to `chain.toml`. The engine's own tuning lives under `[persona]`
//! with the same sections as `persona.toml`.

use std::path::Path;

use chrono::{DateTime, Utc};
use persona_core::{PersonaConfig, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Block clock settings.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Log output settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Engine configuration.
    #[serde(default)]
    pub persona: PersonaConfig,
}

impl ChainConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ChainError::Config` if the TOML is invalid, or
    /// `ChainError::Persona` if the engine section is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ChainError::Config(e.to_string()))?;
        config.persona.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// Block clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Seconds the clock advances with every transaction.
    #[serde(default = "default_block_time")]
    pub block_time_secs: u64,
    /// Wall-clock time of block zero (RFC 3339).
    #[serde(default)]
    pub genesis_time: DateTime<Utc>,
}

impl ClockConfig {
    /// Genesis time as an engine timestamp (clamped at the epoch).
    #[must_use]
    pub fn genesis_timestamp(&self) -> Timestamp {
        Timestamp(u64::try_from(self.genesis_time.timestamp()).unwrap_or(0))
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            block_time_secs: default_block_time(),
            genesis_time: DateTime::<Utc>::default(),
        }
    }
}

/// Log subscriber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_block_time() -> u64 { 2 }
fn default_level() -> String { "info".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ChainConfig::from_toml("").expect("parse");
        assert_eq!(config.clock.block_time_secs, 2);
        assert_eq!(config.clock.genesis_timestamp(), Timestamp(0));
        assert_eq!(config.telemetry.level, "info");
        assert!(!config.telemetry.json);
        assert_eq!(config.persona.memory.ring_capacity, 64);
    }

    #[test]
    fn sections_override_defaults() {
        let config = ChainConfig::from_toml(
            r#"
            [clock]
            block_time_secs = 12
            genesis_time = "2025-01-01T00:00:00Z"

            [telemetry]
            level = "debug"
            json = true

            [persona.memory]
            ring_capacity = 16

            [persona.quests]
            claim_reputation_gain = 75
            "#,
        )
        .expect("parse");
        assert_eq!(config.clock.block_time_secs, 12);
        assert_eq!(config.clock.genesis_timestamp(), Timestamp(1_735_689_600));
        assert!(config.telemetry.json);
        assert_eq!(config.persona.memory.ring_capacity, 16);
        assert_eq!(config.persona.quests.claim_reputation_gain, 75);
    }

    #[test]
    fn out_of_range_engine_tuning_is_rejected() {
        let err = ChainConfig::from_toml("[persona.learning]\nseverity_cap = 99999999999")
            .expect_err("cap out of range");
        assert!(matches!(
            err,
            ChainError::Persona(persona_core::PersonaError::Config(_))
        ));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = ChainConfig::from_toml("[clock\nblock_time_secs = ").expect_err("invalid");
        assert!(matches!(err, ChainError::Config(_)));
    }
}
