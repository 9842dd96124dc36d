//! The transaction executor.
//!
//! A [`Chain`] owns one [`PersonaSystem`] behind a mutex, which gives every
//! call a single global order. Each transaction is stamped with the next
//! block number and block time before it reaches the engine; the engine
//! either commits it or leaves state untouched, and the outcome is written
//! into a [`Receipt`] either way.

use std::path::Path;

use parking_lot::Mutex;
use persona_core::error::Result as CoreResult;
use persona_core::events::EventSink;
use persona_core::rewards::{Balance, Treasury};
use persona_core::{Address, CallContext, InteractionContext, PersonaSystem, Timestamp, WorldSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calls::{Call, Outcome, Query, Receipt, TxStatus};
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::genesis::Genesis;

/// Snapshot layout version.
pub const CHAIN_SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume a chain: world state, treasury and clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Layout version.
    pub version: u32,
    /// Last block produced.
    pub block: u64,
    /// Current block time.
    pub now: Timestamp,
    /// Engine state.
    pub world: WorldSnapshot,
    /// Reward balances and float.
    pub treasury: Treasury,
}

struct ChainState {
    system: PersonaSystem<Treasury>,
    block: u64,
    now: Timestamp,
}

/// Serialized executor over one deployed world.
pub struct Chain {
    state: Mutex<ChainState>,
    config: ChainConfig,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Chain")
            .field("block", &state.block)
            .field("now", &state.now)
            .field("system", &state.system)
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Deploy an empty world owned by `authority`.
    ///
    /// # Errors
    /// Propagates deployment failures.
    pub fn new(authority: Address, config: ChainConfig) -> Result<Self> {
        let system = PersonaSystem::deploy(authority, config.persona.clone())?;
        let now = config.clock.genesis_timestamp();
        info!(authority = %authority, genesis = %now, "Chain started");
        Ok(Self {
            state: Mutex::new(ChainState {
                system,
                block: 0,
                now,
            }),
            config,
        })
    }

    /// Deploy a world and seed it from `genesis` at block zero.
    ///
    /// # Errors
    /// Returns `ChainError::Genesis` naming the first entry the engine
    /// rejects.
    pub fn from_genesis(config: ChainConfig, genesis: &Genesis) -> Result<Self> {
        let chain = Self::new(genesis.authority, config)?;
        {
            let mut state = chain.state.lock();
            let ctx = CallContext::new(genesis.authority, state.now);
            genesis.apply(&mut state.system, &ctx)?;
        }
        Ok(chain)
    }

    /// Resume a chain from a snapshot.
    ///
    /// # Errors
    /// Returns `ChainError::Config` if the snapshot was written by a newer
    /// layout, or `ChainError::Persona` if the world it carries is invalid.
    pub fn restore(config: ChainConfig, snapshot: ChainSnapshot) -> Result<Self> {
        if snapshot.version > CHAIN_SNAPSHOT_VERSION {
            return Err(ChainError::Config(format!(
                "snapshot version {} is newer than supported {CHAIN_SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        let ChainSnapshot {
            block,
            now,
            world,
            treasury,
            ..
        } = snapshot;
        let system = PersonaSystem::restore(config.persona.clone(), world, treasury)?;
        info!(block, now = %now, "Chain restored");
        Ok(Self {
            state: Mutex::new(ChainState { system, block, now }),
            config,
        })
    }

    /// Replace the engine's event sink.
    #[must_use]
    pub fn with_sink(self, sink: Box<dyn EventSink>) -> Self {
        let Self { state, config } = self;
        let ChainState { system, block, now } = state.into_inner();
        Self {
            state: Mutex::new(ChainState {
                system: system.with_sink(sink),
                block,
                now,
            }),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Execute one call from `sender` in the next block.
    ///
    /// A call the engine rejects still consumes a block; its receipt is
    /// `Reverted` and carries no events.
    pub fn execute(&self, sender: Address, call: Call) -> Receipt {
        let mut state = self.state.lock();
        state.block += 1;
        state.now = state.now.plus_secs(self.config.clock.block_time_secs);
        let ctx = CallContext::new(sender, state.now);
        let name = call.name();

        let status = match dispatch(&mut state.system, &ctx, call) {
            Ok(outcome) => TxStatus::Success { outcome },
            Err(e) => {
                warn!(block = state.block, sender = %sender, call = name, error = %e, "Transaction reverted");
                TxStatus::Reverted {
                    error: e.to_string(),
                }
            }
        };
        let events = state.system.last_events().to_vec();
        debug!(block = state.block, call = name, events = events.len(), "Transaction executed");

        Receipt {
            tx_id: Uuid::new_v4(),
            block: state.block,
            timestamp: state.now,
            sender,
            call: name.to_string(),
            status,
            events,
        }
    }

    /// Answer a read against current state.
    ///
    /// # Errors
    /// Propagates unknown-id errors and JSON encoding failures.
    pub fn query(&self, query: Query) -> Result<Value> {
        let state = self.state.lock();
        answer(&state.system, query)
    }

    /// Run `f` against the engine under the lock.
    pub fn with_system<R>(&self, f: impl FnOnce(&PersonaSystem<Treasury>) -> R) -> R {
        f(&self.state.lock().system)
    }

    // ------------------------------------------------------------------
    // Clock and treasury
    // ------------------------------------------------------------------

    /// Move the block clock forward without producing a block.
    pub fn warp(&self, secs: u64) -> Timestamp {
        let mut state = self.state.lock();
        state.now = state.now.plus_secs(secs);
        debug!(now = %state.now, secs, "Clock warped");
        state.now
    }

    /// Last block produced.
    #[must_use]
    pub fn block(&self) -> u64 {
        self.state.lock().block
    }

    /// Current block time.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.state.lock().now
    }

    /// Add tokens to the reward float.
    pub fn fund_treasury(&self, amount: u64) {
        let mut state = self.state.lock();
        state.system.ledger_mut().fund(amount);
        info!(amount, float = state.system.ledger().float(), "Treasury funded");
    }

    /// Rewards `player` has received.
    #[must_use]
    pub fn balance(&self, player: Address) -> Balance {
        self.state.lock().system.ledger().balance(player)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Capture world, treasury and clock.
    #[must_use]
    pub fn snapshot(&self) -> ChainSnapshot {
        let state = self.state.lock();
        ChainSnapshot {
            version: CHAIN_SNAPSHOT_VERSION,
            block: state.block,
            now: state.now,
            world: state.system.snapshot(),
            treasury: state.system.ledger().clone(),
        }
    }

    /// Write a snapshot to `path` as JSON.
    ///
    /// # Errors
    /// Returns an error on encoding or I/O failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_vec_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), block = snapshot.block, "Chain saved");
        Ok(())
    }

    /// Resume a chain from a JSON snapshot file.
    ///
    /// # Errors
    /// Returns an error on I/O or decoding failure, or whatever
    /// [`Chain::restore`] rejects.
    pub fn load(config: ChainConfig, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: ChainSnapshot = serde_json::from_slice(&bytes)?;
        Self::restore(config, snapshot)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn dispatch(system: &mut PersonaSystem<Treasury>, ctx: &CallContext, call: Call) -> CoreResult<Outcome> {
    let outcome = match call {
        Call::CreateNpc {
            name,
            personality,
            faction,
            traits,
        } => Outcome::NpcCreated {
            npc_id: system.create_npc_in_faction(ctx, &name, personality, faction, traits)?,
        },
        Call::SetNpcActive { npc_id, active } => {
            system.set_npc_active(ctx, npc_id, active)?;
            Outcome::Done
        }
        Call::SetNpcDataPointer { npc_id, pointer } => {
            system.set_npc_data_pointer(ctx, npc_id, pointer)?;
            Outcome::Done
        }
        Call::CreateQuest(draft) => Outcome::QuestCreated {
            quest_id: system.create_quest(ctx, draft)?,
        },
        Call::SetQuestActive { quest_id, active } => {
            system.set_quest_active(ctx, quest_id, active)?;
            Outcome::Done
        }
        Call::Interact {
            npc_id,
            action,
            target,
            value1,
            value2,
            memo,
        } => {
            let context = InteractionContext {
                action,
                target: target.unwrap_or(ctx.caller),
                value1,
                value2,
                memo,
            };
            Outcome::Interaction(system.interact(ctx, npc_id, context)?)
        }
        Call::AcceptQuest { quest_id } => {
            system.accept_quest(ctx, quest_id)?;
            Outcome::Done
        }
        Call::ClaimReward { quest_id } => Outcome::RewardClaimed(system.claim_reward(ctx, quest_id)?),
        Call::ExpireQuest { quest_id } => Outcome::QuestExpired {
            failed: system.expire_quest(ctx, quest_id)?,
        },
    };
    Ok(outcome)
}

fn answer(system: &PersonaSystem<Treasury>, query: Query) -> Result<Value> {
    let value = match query {
        Query::NpcState { npc_id } => serde_json::to_value(system.npc_state(npc_id)?)?,
        Query::NpcCount => Value::from(system.npc_count()),
        Query::Relationship { npc_id, player } => Value::from(system.relationship(npc_id, player)),
        Query::Memories { npc_id } => serde_json::to_value(system.memories(npc_id)?)?,
        Query::CanInteractWith { npc_id } => Value::from(system.can_interact_with(npc_id)),
        Query::MakeDecision {
            npc_id,
            target,
            action,
            context_value,
        } => serde_json::to_value(system.make_decision(npc_id, target, action, context_value)?)?,
        Query::NpcDataPointer { npc_id } => serde_json::to_value(system.npc_data_pointer(npc_id))?,
        Query::InteractionStats { npc_id, player } => {
            serde_json::to_value(system.interaction_stats(npc_id, player))?
        }
        Query::Quest { quest_id } => serde_json::to_value(system.quest(quest_id)?)?,
        Query::QuestCount => Value::from(system.quest_count()),
        Query::PlayerQuestStatus { player, quest_id } => {
            serde_json::to_value(system.player_quest_status(player, quest_id)?)?
        }
        Query::PlayerQuests { player } => serde_json::to_value(system.player_quests(player))?,
        Query::FactionReputation { player, faction } => {
            Value::from(system.faction_reputation(player, faction))
        }
        Query::ReputationLevel { player, faction } => {
            serde_json::to_value(system.reputation_level(player, faction))?
        }
        Query::Balance { player } => serde_json::to_value(system.ledger().balance(player))?,
        Query::TreasuryFloat => Value::from(system.ledger().float()),
    };
    Ok(value)
}
