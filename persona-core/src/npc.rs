//! Trait Store: the NPC registry.
//!
//! Sole owner of NPC records, per-(NPC, player) relationships and each NPC's
//! memory ring. Reads are open to everyone; the only write path for
//! interaction results is [`NpcRegistry::apply_outcome`], which accepts calls
//! from the registered interaction orchestrator alone. Until that address is
//! configured the write path fails closed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MemoryConfig;
use crate::error::{PersonaError, Result};
use crate::events::{Component, EventLog, PersonaEvent};
use crate::memory::MemoryRing;
use crate::types::{
    clamp_relationship, Address, CallContext, Faction, InteractionOutcome, MemorySnippet, NpcId,
    Personality, Timestamp, Traits, TRAIT_MAX,
};

/// A registered NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcRecord {
    /// Sequential id.
    pub id: NpcId,
    /// Display name.
    pub name: String,
    /// Baseline temperament.
    pub personality: Personality,
    /// Owning faction.
    pub faction: Faction,
    /// Current trait values, always within `[0, 1000]`.
    pub traits: Traits,
    /// Interactions absorbed so far (monotonic).
    pub experience_points: u64,
    /// Time of the last applied interaction (creation time until then).
    pub last_interaction: Timestamp,
    /// Whether players may interact with this NPC.
    pub is_active: bool,
}

/// One NPC's standing with one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Relationship {
    /// Score in `[-1000, 1000]`.
    pub score: i32,
    /// Interactions between the pair.
    pub interactions: u32,
    /// Time of the most recent interaction.
    pub last_interaction: Timestamp,
}

/// Flat relationship row, used by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEntry {
    /// The NPC.
    pub npc_id: NpcId,
    /// The player.
    pub player: Address,
    /// The relationship.
    pub relationship: Relationship,
}

/// Serializable registry contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    /// NPC records, indexed by id.
    pub npcs: Vec<NpcRecord>,
    /// Memory rings, indexed by NPC id.
    pub memories: Vec<MemoryRing>,
    /// Every relationship that has been touched.
    pub relationships: Vec<RelationshipEntry>,
    /// Configured orchestrator address.
    pub interaction_tracker: Option<Address>,
    /// Configured learning engine address.
    pub learning_engine: Option<Address>,
}

/// The NPC registry.
#[derive(Debug, Clone)]
pub struct NpcRegistry {
    address: Address,
    authority: Address,
    npcs: Vec<NpcRecord>,
    memories: Vec<MemoryRing>,
    relationships: BTreeMap<(NpcId, Address), Relationship>,
    interaction_tracker: Option<Address>,
    learning_engine: Option<Address>,
    ring_capacity: usize,
    events: EventLog,
}

impl NpcRegistry {
    /// Create an empty registry deployed at `address`, administered by `authority`.
    #[must_use]
    pub fn new(address: Address, authority: Address, memory: &MemoryConfig) -> Self {
        Self {
            address,
            authority,
            npcs: Vec::new(),
            memories: Vec::new(),
            relationships: BTreeMap::new(),
            interaction_tracker: None,
            learning_engine: None,
            ring_capacity: memory.ring_capacity,
            events: EventLog::default(),
        }
    }

    /// Rebuild a registry from a snapshot.
    ///
    /// # Errors
    /// [`PersonaError::Serialization`] if a record sits at the wrong index or
    /// a relationship is out of range or names an unknown NPC;
    /// [`PersonaError::InvalidTrait`] if a trait exceeds the ceiling.
    pub fn from_state(
        address: Address,
        authority: Address,
        memory: &MemoryConfig,
        state: RegistryState,
    ) -> Result<Self> {
        for (index, npc) in state.npcs.iter().enumerate() {
            if npc.id.0 != index as u64 {
                return Err(PersonaError::Serialization(format!(
                    "npc record at index {index} carries id {}",
                    npc.id
                )));
            }
            validate_traits(&npc.traits)?;
        }
        let npc_count = state.npcs.len() as u64;
        for entry in &state.relationships {
            if entry.npc_id.0 >= npc_count {
                return Err(PersonaError::Serialization(format!(
                    "relationship names unknown npc {}",
                    entry.npc_id
                )));
            }
            let score = entry.relationship.score;
            if clamp_relationship(score) != score {
                return Err(PersonaError::Serialization(format!(
                    "relationship of npc {} with {} is out of range: {score}",
                    entry.npc_id, entry.player
                )));
            }
        }

        let mut registry = Self::new(address, authority, memory);
        registry.npcs = state.npcs;
        registry.memories = state.memories;
        // Pad in case the snapshot predates some NPCs' rings.
        while registry.memories.len() < registry.npcs.len() {
            registry
                .memories
                .push(MemoryRing::with_capacity(registry.ring_capacity));
        }
        registry.relationships = state
            .relationships
            .into_iter()
            .map(|e| ((e.npc_id, e.player), e.relationship))
            .collect();
        registry.interaction_tracker = state.interaction_tracker;
        registry.learning_engine = state.learning_engine;
        Ok(registry)
    }

    /// Export the registry contents for a snapshot.
    #[must_use]
    pub fn export_state(&self) -> RegistryState {
        RegistryState {
            npcs: self.npcs.clone(),
            memories: self.memories.clone(),
            relationships: self
                .relationships
                .iter()
                .map(|(&(npc_id, player), &relationship)| RelationshipEntry {
                    npc_id,
                    player,
                    relationship,
                })
                .collect(),
            interaction_tracker: self.interaction_tracker,
            learning_engine: self.learning_engine,
        }
    }

    /// This registry's own address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The deploying authority.
    #[must_use]
    pub const fn authority(&self) -> Address {
        self.authority
    }

    // ------------------------------------------------------------------
    // Wiring
    // ------------------------------------------------------------------

    /// Register the interaction orchestrator allowed to apply outcomes.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority.
    pub fn set_interaction_tracker_address(
        &mut self,
        ctx: &CallContext,
        tracker: Address,
    ) -> Result<()> {
        self.require_authority(ctx, "set the interaction tracker")?;
        self.interaction_tracker = Some(tracker);
        self.events.emit(PersonaEvent::LinkSet {
            on: Component::NpcCore,
            link: Component::InteractionTracker,
            address: tracker,
        });
        info!(tracker = %tracker, "NPC core linked to interaction tracker");
        Ok(())
    }

    /// Record the learning engine that reads from this registry.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority.
    pub fn set_learning_engine_address(&mut self, ctx: &CallContext, engine: Address) -> Result<()> {
        self.require_authority(ctx, "set the learning engine")?;
        self.learning_engine = Some(engine);
        self.events.emit(PersonaEvent::LinkSet {
            on: Component::NpcCore,
            link: Component::LearningEngine,
            address: engine,
        });
        info!(engine = %engine, "NPC core linked to learning engine");
        Ok(())
    }

    /// The registered orchestrator, if any.
    #[must_use]
    pub const fn interaction_tracker(&self) -> Option<Address> {
        self.interaction_tracker
    }

    /// The registered learning engine, if any.
    #[must_use]
    pub const fn learning_engine(&self) -> Option<Address> {
        self.learning_engine
    }

    /// Whether `caller` is the registered orchestrator.
    #[must_use]
    pub fn is_orchestrator(&self, caller: Address) -> bool {
        self.interaction_tracker == Some(caller)
    }

    // ------------------------------------------------------------------
    // NPC lifecycle
    // ------------------------------------------------------------------

    /// Register a new NPC in the default faction.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority;
    /// [`PersonaError::InvalidTrait`] if any trait is above 1000.
    pub fn create_npc(
        &mut self,
        ctx: &CallContext,
        name: impl Into<String>,
        personality: Personality,
        traits: Traits,
    ) -> Result<NpcId> {
        self.create_npc_in_faction(ctx, name, personality, Faction::default(), traits)
    }

    /// Register a new NPC in `faction`.
    ///
    /// # Errors
    /// Same as [`NpcRegistry::create_npc`].
    pub fn create_npc_in_faction(
        &mut self,
        ctx: &CallContext,
        name: impl Into<String>,
        personality: Personality,
        faction: Faction,
        traits: Traits,
    ) -> Result<NpcId> {
        self.require_authority(ctx, "create NPCs")?;
        validate_traits(&traits)?;

        let id = NpcId(self.npcs.len() as u64);
        let name = name.into();
        self.npcs.push(NpcRecord {
            id,
            name: name.clone(),
            personality,
            faction,
            traits,
            experience_points: 0,
            last_interaction: ctx.now,
            is_active: true,
        });
        self.memories
            .push(MemoryRing::with_capacity(self.ring_capacity));

        info!(npc = %id, name = %name, ?personality, %faction, "NPC created");
        self.events.emit(PersonaEvent::NpcCreated {
            npc_id: id,
            name,
            personality,
            faction,
            traits,
        });
        Ok(id)
    }

    /// Switch an NPC on or off.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority;
    /// [`PersonaError::NpcNotFound`] for an unknown id.
    pub fn set_npc_active(&mut self, ctx: &CallContext, id: NpcId, active: bool) -> Result<()> {
        self.require_authority(ctx, "toggle NPCs")?;
        let npc = self.npc_mut(id)?;
        if npc.is_active == active {
            return Ok(());
        }
        npc.is_active = active;
        info!(npc = %id, active, "NPC activation changed");
        self.events
            .emit(PersonaEvent::NpcActivationChanged { npc_id: id, active });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Full record of an NPC.
    ///
    /// # Errors
    /// [`PersonaError::NpcNotFound`] if the id was never assigned.
    pub fn npc_state(&self, id: NpcId) -> Result<&NpcRecord> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.npcs.get(i))
            .ok_or(PersonaError::NpcNotFound(id))
    }

    /// Number of NPCs ever created.
    #[must_use]
    pub fn npc_count(&self) -> u64 {
        self.npcs.len() as u64
    }

    /// Every NPC record, by ascending id.
    pub fn npcs(&self) -> impl Iterator<Item = &NpcRecord> {
        self.npcs.iter()
    }

    /// Whether the NPC exists and is active.
    #[must_use]
    pub fn is_active(&self, id: NpcId) -> bool {
        self.npc_state(id).is_ok_and(|npc| npc.is_active)
    }

    /// Relationship score between an NPC and a player (0 when never set).
    #[must_use]
    pub fn relationship(&self, id: NpcId, player: Address) -> i32 {
        self.relationships
            .get(&(id, player))
            .map_or(0, |r| r.score)
    }

    /// Full relationship record, if the pair ever interacted.
    #[must_use]
    pub fn relationship_record(&self, id: NpcId, player: Address) -> Option<&Relationship> {
        self.relationships.get(&(id, player))
    }

    /// Every player an NPC has a relationship with, by address.
    pub fn relationships_of(&self, id: NpcId) -> impl Iterator<Item = (Address, &Relationship)> {
        self.relationships
            .range((id, Address::ZERO)..=(id, Address([0xff; 20])))
            .map(|(&(_, player), rel)| (player, rel))
    }

    /// The NPC's memory snippets, oldest first.
    ///
    /// # Errors
    /// [`PersonaError::NpcNotFound`] if the id was never assigned.
    pub fn memories(&self, id: NpcId) -> Result<Vec<MemorySnippet>> {
        self.memory_ring(id).map(MemoryRing::to_vec)
    }

    /// The NPC's memory ring.
    ///
    /// # Errors
    /// [`PersonaError::NpcNotFound`] if the id was never assigned.
    pub fn memory_ring(&self, id: NpcId) -> Result<&MemoryRing> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.memories.get(i))
            .ok_or(PersonaError::NpcNotFound(id))
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Atomically write an interaction outcome.
    ///
    /// Traits are clamped to `[0, 1000]`, the relationship to
    /// `[-1000, 1000]`; the snippet is appended to the memory ring,
    /// `last_interaction` is set to `ctx.now` and experience grows by one.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless `ctx.caller` is the registered
    /// orchestrator; [`PersonaError::NpcNotFound`] / [`PersonaError::NpcInactive`]
    /// if the NPC cannot take the update. Nothing is written on error.
    pub fn apply_outcome(
        &mut self,
        ctx: &CallContext,
        id: NpcId,
        player: Address,
        outcome: &InteractionOutcome,
    ) -> Result<()> {
        if !self.is_orchestrator(ctx.caller) {
            return Err(PersonaError::Unauthorized {
                caller: ctx.caller,
                operation: "apply interaction outcomes",
            });
        }
        if !self.npc_state(id)?.is_active {
            return Err(PersonaError::NpcInactive(id));
        }

        let traits = Traits::clamped(
            i32::from(outcome.new_intelligence),
            i32::from(outcome.new_aggression),
            i32::from(outcome.new_sociability),
        );
        let score = clamp_relationship(outcome.new_relationship_score);

        let npc = self.npc_mut(id)?;
        npc.traits = traits;
        npc.last_interaction = ctx.now;
        npc.experience_points = npc.experience_points.saturating_add(1);
        let experience = npc.experience_points;

        let rel = self.relationships.entry((id, player)).or_default();
        rel.score = score;
        rel.interactions = rel.interactions.saturating_add(1);
        rel.last_interaction = ctx.now;

        let ring = usize::try_from(id.0)
            .ok()
            .and_then(|i| self.memories.get_mut(i))
            .ok_or(PersonaError::NpcNotFound(id))?;
        ring.push(outcome.memory_snippet);

        debug!(
            npc = %id,
            player = %player,
            intelligence = traits.intelligence,
            aggression = traits.aggression,
            sociability = traits.sociability,
            relationship = score,
            experience,
            snippet = %outcome.memory_snippet,
            "Outcome applied"
        );
        self.events.emit(PersonaEvent::OutcomeApplied {
            npc_id: id,
            player,
            traits,
            relationship: score,
            snippet: outcome.memory_snippet,
            at: ctx.now,
        });
        Ok(())
    }

    /// Take the events journaled since the last drain.
    pub fn drain_events(&mut self) -> Vec<PersonaEvent> {
        self.events.drain()
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn npc_mut(&mut self, id: NpcId) -> Result<&mut NpcRecord> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.npcs.get_mut(i))
            .ok_or(PersonaError::NpcNotFound(id))
    }

    fn require_authority(&self, ctx: &CallContext, operation: &'static str) -> Result<()> {
        if ctx.caller == self.authority {
            Ok(())
        } else {
            Err(PersonaError::Unauthorized {
                caller: ctx.caller,
                operation,
            })
        }
    }
}

/// Reject any trait above the ceiling.
fn validate_traits(traits: &Traits) -> Result<()> {
    for (name, value) in [
        ("intelligence", traits.intelligence),
        ("aggression", traits.aggression),
        ("sociability", traits.sociability),
    ] {
        if i32::from(value) > TRAIT_MAX {
            return Err(PersonaError::InvalidTrait {
                name,
                value: u32::from(value),
            });
        }
    }
    Ok(())
}
