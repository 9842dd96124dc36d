//! Configuration for the Persona engine.
//!
//! Maps directly to `persona.toml`. Every field has a default, so an empty
//! file (or no file at all) yields the canonical tuning.

use serde::{Deserialize, Serialize};

/// Top-level Persona configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Per-NPC memory ring settings.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Learning engine tuning.
    #[serde(default)]
    pub learning: LearningConfig,
    /// Quest state machine tuning.
    #[serde(default)]
    pub quests: QuestConfig,
    /// Snapshot persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl PersonaConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `PersonaError::Config` if the TOML is invalid or a value is
    /// out of range.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::PersonaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section's values are in range.
    ///
    /// # Errors
    /// Returns `PersonaError::Config` naming the first offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.learning.validate()
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Per-NPC memory ring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Snippets kept per NPC; the oldest is evicted beyond this.
    #[serde(default = "default_64")]
    pub ring_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { ring_capacity: 64 }
    }
}

/// Learning engine weights.
///
/// Relationship weights are scaled by the NPC's sociability (positive) or
/// aggression (negative) before being applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Largest change any single trait can take in one interaction.
    #[serde(default = "default_10")]
    pub max_trait_delta: i32,
    /// Relationship gain for a positive `Help`.
    #[serde(default = "default_50")]
    pub help_weight: i32,
    /// Relationship gain for a positive `Greet`.
    #[serde(default = "default_20")]
    pub greet_weight: i32,
    /// Base relationship gain for a positive `Trade`.
    #[serde(default = "default_10")]
    pub trade_weight: i32,
    /// Trade value counted toward the trade bonus (bonus = min(value, cap) / 10).
    #[serde(default = "default_90_u64")]
    pub trade_value_cap: u64,
    /// Relationship gain when a hostile action is nonetheless classed positive.
    #[serde(default = "default_5")]
    pub sparring_weight: i32,
    /// Base relationship loss for a negative `Attack`.
    #[serde(default = "default_60")]
    pub attack_penalty: i32,
    /// Relationship loss for a negative `Provoke`.
    #[serde(default = "default_25")]
    pub provoke_penalty: i32,
    /// Relationship loss for a negative `Trade`.
    #[serde(default = "default_15")]
    pub trade_penalty: i32,
    /// Relationship loss for a negative `Greet` or `Help`.
    #[serde(default = "default_10")]
    pub snub_penalty: i32,
    /// `value1` severity counted on negative interactions.
    #[serde(default = "default_100_u64")]
    pub severity_cap: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            max_trait_delta: 10,
            help_weight: 50,
            greet_weight: 20,
            trade_weight: 10,
            trade_value_cap: 90,
            sparring_weight: 5,
            attack_penalty: 60,
            provoke_penalty: 25,
            trade_penalty: 15,
            snub_penalty: 10,
            severity_cap: 100,
        }
    }
}

/// Largest relationship weight or trait step the learning engine accepts.
pub const LEARNING_WEIGHT_MAX: i32 = 1000;

/// Largest `trade_value_cap` / `severity_cap` the learning engine accepts.
pub const LEARNING_CAP_MAX: u64 = 10_000;

impl LearningConfig {
    /// Check weights are within `0..=LEARNING_WEIGHT_MAX` and caps within
    /// `0..=LEARNING_CAP_MAX`.
    ///
    /// # Errors
    /// Returns `PersonaError::Config` naming the first offending field.
    pub fn validate(&self) -> crate::error::Result<()> {
        let weights = [
            ("max_trait_delta", self.max_trait_delta),
            ("help_weight", self.help_weight),
            ("greet_weight", self.greet_weight),
            ("trade_weight", self.trade_weight),
            ("sparring_weight", self.sparring_weight),
            ("attack_penalty", self.attack_penalty),
            ("provoke_penalty", self.provoke_penalty),
            ("trade_penalty", self.trade_penalty),
            ("snub_penalty", self.snub_penalty),
        ];
        if let Some((name, value)) = weights
            .iter()
            .find(|(_, v)| !(0..=LEARNING_WEIGHT_MAX).contains(v))
        {
            return Err(crate::PersonaError::Config(format!(
                "learning.{name} = {value} is outside 0..={LEARNING_WEIGHT_MAX}"
            )));
        }
        let caps = [
            ("trade_value_cap", self.trade_value_cap),
            ("severity_cap", self.severity_cap),
        ];
        if let Some((name, value)) = caps.iter().find(|(_, v)| *v > LEARNING_CAP_MAX) {
            return Err(crate::PersonaError::Config(format!(
                "learning.{name} = {value} exceeds {LEARNING_CAP_MAX}"
            )));
        }
        Ok(())
    }
}

/// Quest state machine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestConfig {
    /// Faction reputation gained when a reward is claimed.
    #[serde(default = "default_50")]
    pub claim_reputation_gain: i32,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            claim_reputation_gain: 50,
        }
    }
}

/// Encoding used for stored world snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// Human-readable JSON (debugging, diffing).
    #[default]
    Json,
    /// Compact bincode.
    Bincode,
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot encoding.
    #[serde(default)]
    pub format: SnapshotFormat,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Number of save backups to keep.
    #[serde(default = "default_3")]
    pub backup_count: u32,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            format: SnapshotFormat::Json,
            wal_mode: true,
            backup_count: 3,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_3() -> u32 { 3 }
fn default_5() -> i32 { 5 }
fn default_10() -> i32 { 10 }
fn default_15() -> i32 { 15 }
fn default_20() -> i32 { 20 }
fn default_25() -> i32 { 25 }
fn default_50() -> i32 { 50 }
fn default_60() -> i32 { 60 }
fn default_64() -> usize { 64 }
fn default_90_u64() -> u64 { 90 }
fn default_100_u64() -> u64 { 100 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PersonaConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.memory.ring_capacity, 64);
        assert_eq!(config.learning.help_weight, 50);
        assert_eq!(config.quests.claim_reputation_gain, 50);
        assert_eq!(config.persistence.format, SnapshotFormat::Json);
    }

    #[test]
    fn partial_sections_override_only_given_fields() {
        let config = PersonaConfig::from_toml(
            r#"
            [memory]
            ring_capacity = 8

            [learning]
            attack_penalty = 90

            [persistence]
            format = "bincode"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.memory.ring_capacity, 8);
        assert_eq!(config.learning.attack_penalty, 90);
        assert_eq!(config.learning.greet_weight, 20);
        assert_eq!(config.persistence.format, SnapshotFormat::Bincode);
        assert!(config.persistence.wal_mode);
    }

    #[test]
    fn oversized_learning_caps_are_rejected() {
        let err = PersonaConfig::from_toml(
            r#"
            [learning]
            trade_value_cap = 10000000000
            "#,
        )
        .expect_err("cap out of range");
        match err {
            crate::PersonaError::Config(msg) => assert!(msg.contains("trade_value_cap"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_or_huge_weights_are_rejected() {
        for toml in [
            "[learning]\nattack_penalty = -5",
            "[learning]\nhelp_weight = 2147483647",
        ] {
            let err = PersonaConfig::from_toml(toml).expect_err(toml);
            assert!(matches!(err, crate::PersonaError::Config(_)), "{toml}");
        }
        assert!(LearningConfig::default().validate().is_ok());
    }

    #[test]
    fn serialized_config_has_only_engine_sections() {
        let text = toml::to_string(&PersonaConfig::default()).expect("serialize");
        let table: toml::Table = toml::from_str(&text).expect("reparse");
        let mut sections: Vec<&str> = table.keys().map(String::as_str).collect();
        sections.sort_unstable();
        assert_eq!(sections, ["learning", "memory", "persistence", "quests"]);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = PersonaConfig::from_toml("[memory\nring_capacity = ").expect_err("broken toml");
        assert!(matches!(err, crate::PersonaError::Config(_)));
    }
}
