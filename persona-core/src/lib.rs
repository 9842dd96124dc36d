//! # Persona Core Library
//!
//! Deterministic NPC personality and quest engine.
//!
//! NPCs carry three bounded integer traits that evolve with every player
//! interaction, a relationship score per player and a ring of memories.
//! The same interaction stream drives a quest state machine whose rewards
//! raise the player's standing with the quest giver's faction.
//!
//! - [`npc`]: the trait store, sole owner of NPC state
//! - [`decision`]: how an NPC responds (pure)
//! - [`learning`]: how an NPC changes (pure)
//! - [`interaction`]: the atomic per-action turn
//! - [`quest`]: quest lifecycle and faction reputation
//! - [`system`]: a deployed, wired world
//!
//! All arithmetic is integer arithmetic. The core never reads a clock or a
//! random source: time arrives with each call's [`CallContext`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod decision;
pub mod error;
pub mod events;
pub mod interaction;
pub mod learning;
pub mod memory;
pub mod npc;
pub mod persistence;
pub mod quest;
pub mod reputation;
pub mod rewards;
pub mod system;
pub mod types;

pub use config::PersonaConfig;
pub use error::PersonaError;
pub use events::{EventSink, PersonaEvent};
pub use system::{PersonaSystem, WorldSnapshot};
pub use types::*;
