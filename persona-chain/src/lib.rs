//! # persona-chain: Host-Ledger Adapter for Persona
//!
//! `persona-core` is a pure, single-writer state machine that never reads a
//! clock. This crate supplies the host around it: a serialized transaction
//! executor with a block clock, JSON wire types for calls and queries,
//! genesis seeding, event sinks and log setup.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              persona-chain               │
//! │  ┌────────────┐   ┌──────────────────┐   │
//! │  │  Genesis   │──▶│      Chain       │   │
//! │  └────────────┘   │ (Mutex, clock)   │   │
//! │  ┌────────────┐   └────────┬─────────┘   │
//! │  │ Call/Query │───────────▶│             │
//! │  └────────────┘            ▼             │
//! │              ┌──────────────────────┐    │
//! │              │     persona-core     │    │
//! │              └──────────┬───────────┘    │
//! │                         ▼                │
//! │                ┌─────────────────┐       │
//! │                │  JsonLinesSink  │       │
//! │                └─────────────────┘       │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `chain`: the executor, receipts and chain snapshots
//! - `calls`: `Call`, `Query` and `Receipt` wire types
//! - `genesis`: initial NPCs, quests and treasury funding
//! - `sink`: newline-delimited JSON event output
//! - `telemetry`: `tracing-subscriber` installation
//! - `config`: `chain.toml`

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod calls;
pub mod chain;
pub mod config;
pub mod error;
pub mod genesis;
pub mod sink;
pub mod telemetry;

pub use calls::{Call, Outcome, Query, Receipt, TxStatus};
pub use chain::{Chain, ChainSnapshot};
pub use config::ChainConfig;
pub use error::ChainError;
pub use genesis::Genesis;
