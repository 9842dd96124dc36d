//! System facade: one deployed world.
//!
//! [`PersonaSystem::deploy`] builds every component in dependency order
//! (NPC core, learning engine, decision engine, quest system, tracker) and
//! wires their links. The facade exposes the read operations and the
//! write path used by presentation layers, and after every call drains the
//! components' event journals into the configured [`EventSink`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PersonaConfig;
use crate::decision::{DataPointer, Decision, DecisionEngine};
use crate::error::{PersonaError, Result};
use crate::events::{EventSink, PersonaEvent, TracingSink};
use crate::interaction::{InteractionReceipt, InteractionStats, InteractionTracker, Links, TrackerState};
use crate::learning::LearningEngine;
use crate::memory::MemoryRing;
use crate::npc::{NpcRecord, NpcRegistry, RegistryState};
use crate::quest::{PlayerQuest, Quest, QuestDraft, QuestState, QuestSystem};
use crate::reputation::ReputationLevel;
use crate::rewards::{Reward, RewardLedger, Treasury};
use crate::types::{
    Action, Address, CallContext, Faction, InteractionContext, MemorySnippet, NpcId, Personality,
    QuestId, Timestamp, Traits,
};

/// Snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Addresses the components are deployed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Trait store.
    pub npc_core: Address,
    /// Learning engine.
    pub learning_engine: Address,
    /// Decision engine.
    pub decision_engine: Address,
    /// Quest system.
    pub quest_system: Address,
    /// Interaction orchestrator.
    pub interaction_tracker: Address,
}

impl Deployment {
    /// Fixed component addresses: `"persona"` followed by a slot byte.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            npc_core: component_address(1),
            learning_engine: component_address(2),
            decision_engine: component_address(3),
            quest_system: component_address(4),
            interaction_tracker: component_address(5),
        }
    }
}

fn component_address(slot: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[..7].copy_from_slice(b"persona");
    bytes[19] = slot;
    Address(bytes)
}

/// Flat data-pointer row, used by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPointerEntry {
    /// The NPC.
    pub npc_id: NpcId,
    /// Its pointer.
    pub pointer: DataPointer,
}

/// Everything needed to rebuild a world's game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Layout version.
    pub version: u32,
    /// The deploying authority.
    pub authority: Address,
    /// Component addresses.
    pub deployment: Deployment,
    /// Trait store contents.
    pub registry: RegistryState,
    /// Quest system contents.
    pub quests: QuestState,
    /// Orchestrator counters.
    pub tracker: TrackerState,
    /// NPC data pointers.
    pub data_pointers: Vec<DataPointerEntry>,
}

/// A deployed, wired world.
pub struct PersonaSystem<L: RewardLedger = Treasury> {
    config: PersonaConfig,
    authority: Address,
    deployment: Deployment,
    registry: NpcRegistry,
    learning: LearningEngine,
    decision: DecisionEngine,
    quests: QuestSystem,
    tracker: InteractionTracker,
    ledger: L,
    sink: Box<dyn EventSink>,
    last_events: Vec<PersonaEvent>,
}

impl<L: RewardLedger> std::fmt::Debug for PersonaSystem<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaSystem")
            .field("authority", &self.authority)
            .field("deployment", &self.deployment)
            .field("npcs", &self.registry.npc_count())
            .field("quests", &self.quests.quest_count())
            .finish_non_exhaustive()
    }
}

impl PersonaSystem<Treasury> {
    /// Deploy a world paying rewards from an empty [`Treasury`].
    ///
    /// # Errors
    /// Propagates wiring failures (none occur with a fresh deployment).
    pub fn deploy(authority: Address, config: PersonaConfig) -> Result<Self> {
        Self::deploy_with_ledger(authority, config, Treasury::default())
    }
}

impl<L: RewardLedger> PersonaSystem<L> {
    /// Deploy a world paying rewards through `ledger`.
    ///
    /// # Errors
    /// Propagates wiring failures (none occur with a fresh deployment).
    pub fn deploy_with_ledger(authority: Address, config: PersonaConfig, ledger: L) -> Result<Self> {
        let deployment = Deployment::standard();
        let mut system = Self::assemble(authority, config, deployment, ledger);

        let admin = CallContext::new(authority, Timestamp::default());
        system
            .registry
            .set_interaction_tracker_address(&admin, deployment.interaction_tracker)?;
        system
            .registry
            .set_learning_engine_address(&admin, deployment.learning_engine)?;
        system
            .quests
            .set_interaction_tracker_address(&admin, deployment.interaction_tracker)?;
        system
            .tracker
            .set_quest_system_address(&admin, deployment.quest_system)?;

        info!(authority = %authority, "Persona world deployed");
        system.publish();
        Ok(system)
    }

    /// Rebuild a world from a snapshot.
    ///
    /// # Errors
    /// [`PersonaError::Serialization`] if the snapshot layout is newer than
    /// [`SNAPSHOT_VERSION`] or its contents break a registry or quest
    /// invariant; [`PersonaError::InvalidTrait`] for an out-of-range trait.
    pub fn restore(config: PersonaConfig, snapshot: WorldSnapshot, ledger: L) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(PersonaError::Serialization(format!(
                "world snapshot version {} is newer than supported {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        let WorldSnapshot {
            authority,
            deployment,
            registry,
            quests,
            tracker,
            data_pointers,
            ..
        } = snapshot;
        let mut system = Self::assemble(authority, config, deployment, ledger);
        system.registry = NpcRegistry::from_state(
            deployment.npc_core,
            authority,
            &system.config.memory,
            registry,
        )?;
        system.quests = QuestSystem::from_state(
            deployment.quest_system,
            authority,
            deployment.npc_core,
            system.config.quests.clone(),
            quests,
        )?;
        system.tracker.restore_state(tracker);
        system
            .decision
            .restore_data_pointers(data_pointers.into_iter().map(|e| (e.npc_id, e.pointer)));
        info!(
            authority = %authority,
            npcs = system.registry.npc_count(),
            quests = system.quests.quest_count(),
            "Persona world restored"
        );
        Ok(system)
    }

    fn assemble(authority: Address, config: PersonaConfig, deployment: Deployment, ledger: L) -> Self {
        let registry = NpcRegistry::new(deployment.npc_core, authority, &config.memory);
        let learning = LearningEngine::new(
            deployment.learning_engine,
            deployment.npc_core,
            config.learning.clone(),
        );
        let decision = DecisionEngine::new(deployment.decision_engine, authority, deployment.npc_core);
        let quests = QuestSystem::new(
            deployment.quest_system,
            authority,
            deployment.npc_core,
            config.quests.clone(),
        );
        let tracker = InteractionTracker::new(
            deployment.interaction_tracker,
            authority,
            deployment.npc_core,
            deployment.learning_engine,
            deployment.decision_engine,
        );
        Self {
            config,
            authority,
            deployment,
            registry,
            learning,
            decision,
            quests,
            tracker,
            ledger,
            sink: Box::new(TracingSink),
            last_events: Vec::new(),
        }
    }

    /// Replace the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Capture the game state.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            version: SNAPSHOT_VERSION,
            authority: self.authority,
            deployment: self.deployment,
            registry: self.registry.export_state(),
            quests: self.quests.export_state(),
            tracker: self.tracker.export_state(),
            data_pointers: self
                .decision
                .data_pointers()
                .map(|(npc_id, pointer)| DataPointerEntry { npc_id, pointer })
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Drain every component journal into the sink, in component order.
    fn publish(&mut self) {
        let mut events = self.registry.drain_events();
        events.extend(self.decision.drain_events());
        events.extend(self.tracker.drain_events());
        events.extend(self.quests.drain_events());
        for event in &events {
            self.sink.publish(event);
        }
        self.last_events = events;
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        self.publish();
        result
    }

    /// Events committed by the most recent call (empty after a failure).
    #[must_use]
    pub fn last_events(&self) -> &[PersonaEvent] {
        &self.last_events
    }

    // ------------------------------------------------------------------
    // Authority operations
    // ------------------------------------------------------------------

    /// Create an NPC in the default faction.
    ///
    /// # Errors
    /// See [`NpcRegistry::create_npc`].
    pub fn create_npc(
        &mut self,
        ctx: &CallContext,
        name: &str,
        personality: Personality,
        traits: Traits,
    ) -> Result<NpcId> {
        let result = self.registry.create_npc(ctx, name, personality, traits);
        self.finish(result)
    }

    /// Create an NPC in `faction`.
    ///
    /// # Errors
    /// See [`NpcRegistry::create_npc_in_faction`].
    pub fn create_npc_in_faction(
        &mut self,
        ctx: &CallContext,
        name: &str,
        personality: Personality,
        faction: Faction,
        traits: Traits,
    ) -> Result<NpcId> {
        let result = self
            .registry
            .create_npc_in_faction(ctx, name, personality, faction, traits);
        self.finish(result)
    }

    /// Switch an NPC on or off.
    ///
    /// # Errors
    /// See [`NpcRegistry::set_npc_active`].
    pub fn set_npc_active(&mut self, ctx: &CallContext, npc_id: NpcId, active: bool) -> Result<()> {
        let result = self.registry.set_npc_active(ctx, npc_id, active);
        self.finish(result)
    }

    /// Attach an off-ledger data pointer to an NPC.
    ///
    /// # Errors
    /// See [`DecisionEngine::set_npc_data_pointer`].
    pub fn set_npc_data_pointer(
        &mut self,
        ctx: &CallContext,
        npc_id: NpcId,
        pointer: DataPointer,
    ) -> Result<()> {
        let result = self
            .decision
            .set_npc_data_pointer(ctx, &self.registry, npc_id, pointer);
        self.finish(result)
    }

    /// Create a quest.
    ///
    /// # Errors
    /// See [`QuestSystem::create_quest`].
    pub fn create_quest(&mut self, ctx: &CallContext, draft: QuestDraft) -> Result<QuestId> {
        let result = self.quests.create_quest(ctx, &self.registry, draft);
        self.finish(result)
    }

    /// Switch a quest on or off.
    ///
    /// # Errors
    /// See [`QuestSystem::set_quest_active`].
    pub fn set_quest_active(&mut self, ctx: &CallContext, quest_id: QuestId, active: bool) -> Result<()> {
        let result = self.quests.set_quest_active(ctx, quest_id, active);
        self.finish(result)
    }

    // ------------------------------------------------------------------
    // Player operations
    // ------------------------------------------------------------------

    /// Run one interaction of `ctx.caller` with an NPC.
    ///
    /// # Errors
    /// See [`InteractionTracker::interact`].
    pub fn interact(
        &mut self,
        ctx: &CallContext,
        npc_id: NpcId,
        context: InteractionContext,
    ) -> Result<InteractionReceipt> {
        let links = Links {
            registry: &mut self.registry,
            learning: &self.learning,
            decision: &self.decision,
            quests: Some(&mut self.quests),
        };
        let result = self.tracker.interact(ctx, npc_id, context, links);
        self.finish(result)
    }

    /// Accept a quest.
    ///
    /// # Errors
    /// See [`QuestSystem::accept_quest`].
    pub fn accept_quest(&mut self, ctx: &CallContext, quest_id: QuestId) -> Result<()> {
        let result = self.quests.accept_quest(ctx, quest_id);
        self.finish(result)
    }

    /// Claim a completed quest's reward.
    ///
    /// # Errors
    /// See [`QuestSystem::claim_reward`].
    pub fn claim_reward(&mut self, ctx: &CallContext, quest_id: QuestId) -> Result<Reward> {
        let result = self.quests.claim_reward(ctx, quest_id, &mut self.ledger);
        self.finish(result)
    }

    /// Fail the caller's overdue quest.
    ///
    /// # Errors
    /// See [`QuestSystem::expire_quest`].
    pub fn expire_quest(&mut self, ctx: &CallContext, quest_id: QuestId) -> Result<bool> {
        let result = self.quests.expire_quest(ctx, quest_id);
        self.finish(result)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// See [`NpcRegistry::npc_state`].
    ///
    /// # Errors
    /// [`crate::PersonaError::NpcNotFound`] for an unknown id.
    pub fn npc_state(&self, npc_id: NpcId) -> Result<&NpcRecord> {
        self.registry.npc_state(npc_id)
    }

    /// Number of NPCs created.
    #[must_use]
    pub fn npc_count(&self) -> u64 {
        self.registry.npc_count()
    }

    /// Relationship between an NPC and a player.
    #[must_use]
    pub fn relationship(&self, npc_id: NpcId, player: Address) -> i32 {
        self.registry.relationship(npc_id, player)
    }

    /// An NPC's memories, oldest first.
    ///
    /// # Errors
    /// [`crate::PersonaError::NpcNotFound`] for an unknown id.
    pub fn memories(&self, npc_id: NpcId) -> Result<Vec<MemorySnippet>> {
        self.registry.memories(npc_id)
    }

    /// An NPC's memory ring.
    ///
    /// # Errors
    /// [`crate::PersonaError::NpcNotFound`] for an unknown id.
    pub fn memory_ring(&self, npc_id: NpcId) -> Result<&MemoryRing> {
        self.registry.memory_ring(npc_id)
    }

    /// Whether players can interact with the NPC.
    #[must_use]
    pub fn can_interact_with(&self, npc_id: NpcId) -> bool {
        self.tracker.can_interact_with(&self.registry, npc_id)
    }

    /// Preview how an NPC would respond.
    ///
    /// # Errors
    /// [`crate::PersonaError::NpcNotFound`] for an unknown id.
    pub fn make_decision(
        &self,
        npc_id: NpcId,
        target: Address,
        action: Action,
        context_value: u64,
    ) -> Result<Decision> {
        self.decision
            .make_decision(&self.registry, npc_id, target, action, context_value)
    }

    /// An NPC's data pointer.
    #[must_use]
    pub fn npc_data_pointer(&self, npc_id: NpcId) -> Option<DataPointer> {
        self.decision.npc_data_pointer(npc_id)
    }

    /// Interaction counters for a pair.
    #[must_use]
    pub fn interaction_stats(&self, npc_id: NpcId, player: Address) -> InteractionStats {
        self.tracker.stats(npc_id, player)
    }

    /// A quest by id.
    ///
    /// # Errors
    /// [`crate::PersonaError::QuestNotFound`] for an unknown id.
    pub fn quest(&self, quest_id: QuestId) -> Result<&Quest> {
        self.quests.quest(quest_id)
    }

    /// Number of quests created.
    #[must_use]
    pub fn quest_count(&self) -> u64 {
        self.quests.quest_count()
    }

    /// A player's record for a quest.
    ///
    /// # Errors
    /// [`crate::PersonaError::QuestNotFound`] for an unknown id.
    pub fn player_quest_status(&self, player: Address, quest_id: QuestId) -> Result<PlayerQuest> {
        self.quests.player_quest_status(player, quest_id)
    }

    /// Every quest a player has accepted.
    #[must_use]
    pub fn player_quests(&self, player: Address) -> Vec<PlayerQuest> {
        self.quests.player_quests(player)
    }

    /// A player's reputation with a faction.
    #[must_use]
    pub fn faction_reputation(&self, player: Address, faction: Faction) -> i32 {
        self.quests.faction_reputation(player, faction)
    }

    /// The tier of a player's reputation with a faction.
    #[must_use]
    pub fn reputation_level(&self, player: Address, faction: Faction) -> ReputationLevel {
        self.quests.reputation_level(player, faction)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The deploying authority.
    #[must_use]
    pub const fn authority(&self) -> Address {
        self.authority
    }

    /// Component addresses.
    #[must_use]
    pub const fn deployment(&self) -> Deployment {
        self.deployment
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PersonaConfig {
        &self.config
    }

    /// The trait store.
    #[must_use]
    pub const fn registry(&self) -> &NpcRegistry {
        &self.registry
    }

    /// The quest system.
    #[must_use]
    pub const fn quests(&self) -> &QuestSystem {
        &self.quests
    }

    /// The reward ledger.
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The reward ledger, mutably (funding, host-side adjustments).
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::quest::{QuestStatus, QuestType};

    fn authority() -> Address {
        Address::from_low_u64(1)
    }

    fn admin(now: u64) -> CallContext {
        CallContext::new(authority(), Timestamp(now))
    }

    fn player(now: u64) -> CallContext {
        CallContext::new(Address::from_low_u64(100), Timestamp(now))
    }

    #[test]
    fn deploy_wires_everything() {
        let system = PersonaSystem::deploy(authority(), PersonaConfig::default()).expect("deploy");
        let d = system.deployment();
        assert!(system.registry().is_orchestrator(d.interaction_tracker));
        assert_eq!(system.registry().learning_engine(), Some(d.learning_engine));
        assert_eq!(system.quests().interaction_tracker(), Some(d.interaction_tracker));
        assert_eq!(system.last_events().len(), 4);
    }

    #[test]
    fn events_reach_the_sink() {
        let sink = MemorySink::new();
        let mut system = PersonaSystem::deploy(authority(), PersonaConfig::default())
            .expect("deploy")
            .with_sink(Box::new(sink.clone()));

        let npc = system
            .create_npc(&admin(1), "Herald", Personality::Friendly, Traits::default())
            .expect("create");
        system
            .interact(&player(2), npc, InteractionContext::new(Action::Greet, Address::from_low_u64(100)))
            .expect("interact");

        let names: Vec<&str> = sink.events().iter().map(PersonaEvent::name).collect();
        assert_eq!(names, vec!["npc_created", "outcome_applied", "interaction_recorded"]);
    }

    #[test]
    fn failed_calls_publish_nothing() {
        let mut system = PersonaSystem::deploy(authority(), PersonaConfig::default()).expect("deploy");
        assert!(system
            .interact(&player(1), NpcId(3), InteractionContext::new(Action::Help, Address::from_low_u64(100)))
            .is_err());
        assert!(system.last_events().is_empty());
    }

    #[test]
    fn claim_pays_from_treasury() {
        let mut system = PersonaSystem::deploy(authority(), PersonaConfig::default()).expect("deploy");
        system.ledger_mut().fund(1_000);
        let npc = system
            .create_npc(&admin(1), "Quest Giver", Personality::Friendly, Traits::default())
            .expect("create");
        let quest = system
            .create_quest(&admin(1), QuestDraft::new(npc, QuestType::Interact, "Test Quest", 1).with_reward(100, 0))
            .expect("quest");
        system.accept_quest(&player(2), quest).expect("accept");
        system
            .interact(&player(3), npc, InteractionContext::new(Action::Help, Address::from_low_u64(100)))
            .expect("interact");

        system.claim_reward(&player(4), quest).expect("claim");
        assert_eq!(system.ledger().float(), 900);
        assert_eq!(
            system.player_quest_status(Address::from_low_u64(100), quest).expect("exists").status,
            QuestStatus::Claimed
        );
    }

    #[test]
    fn snapshot_restore_preserves_state() {
        let mut system = PersonaSystem::deploy(authority(), PersonaConfig::default()).expect("deploy");
        let npc = system
            .create_npc(&admin(1), "Archivist", Personality::Cautious, Traits::default())
            .expect("create");
        system
            .set_npc_data_pointer(&admin(1), npc, DataPointer([9; 32]))
            .expect("pointer");
        system
            .interact(&player(2), npc, InteractionContext::new(Action::Trade, Address::from_low_u64(100)).with_value(10))
            .expect("interact");

        let snapshot = system.snapshot();
        let json = serde_json::to_string(&snapshot).expect("json");
        let decoded: WorldSnapshot = serde_json::from_str(&json).expect("decode");
        let restored = PersonaSystem::restore(PersonaConfig::default(), decoded, Treasury::default())
            .expect("restore");

        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.npc_data_pointer(npc), Some(DataPointer([9; 32])));
        assert!(restored.can_interact_with(npc));
        assert_eq!(
            restored.relationship(npc, Address::from_low_u64(100)),
            system.relationship(npc, Address::from_low_u64(100))
        );
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let mut system = PersonaSystem::deploy(authority(), PersonaConfig::default()).expect("deploy");
        system
            .create_npc(&admin(1), "Archivist", Personality::Cautious, Traits::default())
            .expect("create");
        let mut json: serde_json::Value =
            serde_json::to_value(system.snapshot()).expect("json");
        json["registry"]["npcs"][0]["traits"]["aggression"] = 5000.into();
        json["registry"]["npcs"][0]["id"] = 7.into();
        let tampered: WorldSnapshot = serde_json::from_value(json).expect("still decodes");
        let err = PersonaSystem::restore(PersonaConfig::default(), tampered, Treasury::default())
            .expect_err("tampered snapshot");
        assert!(matches!(err, PersonaError::Serialization(_)));

        let mut future = system.snapshot();
        future.version = SNAPSHOT_VERSION + 1;
        let err = PersonaSystem::restore(PersonaConfig::default(), future, Treasury::default())
            .expect_err("newer layout");
        assert!(matches!(err, PersonaError::Serialization(_)));
    }
}
