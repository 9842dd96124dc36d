//! Error types for the Persona core library.

use thiserror::Error;

use crate::types::{Address, NpcId, QuestId};

/// Top-level error type for all Persona operations.
///
/// Every variant is a synchronous, caller-visible failure: the call that
/// returned it made no state change.
#[derive(Error, Debug)]
pub enum PersonaError {
    /// No NPC has been assigned this id.
    #[error("NPC not found: {0}")]
    NpcNotFound(NpcId),

    /// No quest has been assigned this id.
    #[error("Quest not found: {0}")]
    QuestNotFound(QuestId),

    /// A trait value was outside `[0, 1000]` at creation.
    #[error("Invalid trait: {name} = {value} (allowed 0..=1000)")]
    InvalidTrait {
        /// Which trait was rejected.
        name: &'static str,
        /// The rejected value.
        value: u32,
    },

    /// The NPC does not exist or has been deactivated.
    #[error("NPC is not active: {0}")]
    NpcInactive(NpcId),

    /// The caller is not the configured collaborator or authority.
    #[error("Unauthorized: {caller} may not {operation}")]
    Unauthorized {
        /// Who attempted the call.
        caller: Address,
        /// What they attempted.
        operation: &'static str,
    },

    /// The player already holds this quest (in any status).
    #[error("Quest already accepted: {0}")]
    AlreadyAccepted(QuestId),

    /// The quest has been switched off by the authority.
    #[error("Quest is not active: {0}")]
    QuestInactive(QuestId),

    /// The player's faction reputation is below the quest's requirement.
    #[error("Reputation too low: required {required}, have {actual}")]
    ReputationTooLow {
        /// Reputation the quest requires.
        required: i32,
        /// Reputation the player holds.
        actual: i32,
    },

    /// The quest is not in the `Completed` state for this player.
    #[error("Quest not completed: {0}")]
    NotCompleted(QuestId),

    /// The quest deadline has passed.
    #[error("Quest deadline expired: {0}")]
    DeadlineExpired(QuestId),

    /// Quest parameters were rejected at creation.
    #[error("Invalid quest: {reason}")]
    InvalidQuest {
        /// Why the quest was rejected.
        reason: String,
    },

    /// The reward ledger refused to credit a claim.
    #[error("Reward transfer failed: {0}")]
    RewardTransfer(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersonaError {
    /// Whether this is one of the "unknown id" errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NpcNotFound(_) | Self::QuestNotFound(_))
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, PersonaError>;
