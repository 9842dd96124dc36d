//! Interaction orchestrator: the per-action entry point.
//!
//! One call to [`InteractionTracker::interact`] is one atomic "turn":
//!
//! 1. Check the wiring; unwired trackers fail closed.
//! 2. Refuse absent or inactive NPCs.
//! 3. Decide (informational), classify, compute the outcome, then commit it
//!    to the trait store in a single write.
//! 4. Report the interaction to the quest system. A quest failure is logged
//!    and swallowed; it never rolls back the trait commit.
//!
//! The player is always the caller of the turn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{Decision, DecisionEngine};
use crate::error::{PersonaError, Result};
use crate::events::{Component, EventLog, PersonaEvent};
use crate::learning::{is_interaction_positive, LearningEngine};
use crate::npc::NpcRegistry;
use crate::quest::QuestSystem;
use crate::types::{Address, CallContext, InteractionContext, InteractionOutcome, NpcId, QuestId};

/// The collaborators one interaction touches.
///
/// Passed per call rather than stored, so every component keeps sole
/// ownership of its state.
#[derive(Debug)]
pub struct Links<'a> {
    /// Trait store; the only component written unconditionally.
    pub registry: &'a mut NpcRegistry,
    /// Outcome engine.
    pub learning: &'a LearningEngine,
    /// Response engine.
    pub decision: &'a DecisionEngine,
    /// Quest system, notified softly when present.
    pub quests: Option<&'a mut QuestSystem>,
}

/// What one interaction produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionReceipt {
    /// The NPC.
    pub npc_id: NpcId,
    /// The player.
    pub player: Address,
    /// How the NPC responded.
    pub decision: Decision,
    /// What was committed.
    pub outcome: InteractionOutcome,
    /// Whether the interaction was classed positive.
    pub positive: bool,
    /// Quests that gained progress.
    pub quests_advanced: Vec<QuestId>,
}

/// Interaction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InteractionStats {
    /// Interactions recorded.
    pub total: u64,
    /// Of which positive.
    pub positive: u64,
    /// Of which negative.
    pub negative: u64,
}

impl InteractionStats {
    fn record(&mut self, positive: bool) {
        self.total = self.total.saturating_add(1);
        if positive {
            self.positive = self.positive.saturating_add(1);
        } else {
            self.negative = self.negative.saturating_add(1);
        }
    }
}

/// Flat per-pair counter row, used by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsEntry {
    /// The NPC.
    pub npc_id: NpcId,
    /// The player.
    pub player: Address,
    /// Their counters.
    pub stats: InteractionStats,
}

/// Serializable tracker contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerState {
    /// Per-pair counters.
    pub stats: Vec<StatsEntry>,
    /// Global counters.
    pub totals: InteractionStats,
    /// Configured quest system address.
    pub quest_system: Option<Address>,
}

/// The interaction orchestrator component.
#[derive(Debug, Clone)]
pub struct InteractionTracker {
    address: Address,
    authority: Address,
    npc_core: Address,
    learning_engine: Address,
    decision_engine: Address,
    quest_system: Option<Address>,
    stats: BTreeMap<(NpcId, Address), InteractionStats>,
    totals: InteractionStats,
    events: EventLog,
}

impl InteractionTracker {
    /// Create a tracker at `address` bound to the given collaborators.
    #[must_use]
    pub fn new(
        address: Address,
        authority: Address,
        npc_core: Address,
        learning_engine: Address,
        decision_engine: Address,
    ) -> Self {
        Self {
            address,
            authority,
            npc_core,
            learning_engine,
            decision_engine,
            quest_system: None,
            stats: BTreeMap::new(),
            totals: InteractionStats::default(),
            events: EventLog::default(),
        }
    }

    /// Restore counters and the quest link from a snapshot.
    pub fn restore_state(&mut self, state: TrackerState) {
        self.stats = state
            .stats
            .into_iter()
            .map(|e| ((e.npc_id, e.player), e.stats))
            .collect();
        self.totals = state.totals;
        self.quest_system = state.quest_system;
    }

    /// Export counters and the quest link for a snapshot.
    #[must_use]
    pub fn export_state(&self) -> TrackerState {
        TrackerState {
            stats: self
                .stats
                .iter()
                .map(|(&(npc_id, player), &stats)| StatsEntry {
                    npc_id,
                    player,
                    stats,
                })
                .collect(),
            totals: self.totals,
            quest_system: self.quest_system,
        }
    }

    /// This tracker's own address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The linked quest system, if any.
    #[must_use]
    pub const fn quest_system(&self) -> Option<Address> {
        self.quest_system
    }

    /// Link the quest system that receives interaction reports.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority.
    pub fn set_quest_system_address(&mut self, ctx: &CallContext, quests: Address) -> Result<()> {
        if ctx.caller != self.authority {
            return Err(PersonaError::Unauthorized {
                caller: ctx.caller,
                operation: "set the quest system",
            });
        }
        self.quest_system = Some(quests);
        self.events.emit(PersonaEvent::LinkSet {
            on: Component::InteractionTracker,
            link: Component::QuestSystem,
            address: quests,
        });
        Ok(())
    }

    /// Whether players can interact with the NPC right now.
    #[must_use]
    pub fn can_interact_with(&self, registry: &NpcRegistry, npc_id: NpcId) -> bool {
        registry.is_active(npc_id)
    }

    /// Whether `links` are the collaborators this tracker was built for,
    /// and the registry accepts this tracker's writes.
    #[must_use]
    pub fn is_wired(&self, links: &Links<'_>) -> bool {
        links.registry.address() == self.npc_core
            && links.learning.address() == self.learning_engine
            && links.decision.address() == self.decision_engine
            && links.registry.is_orchestrator(self.address)
    }

    /// Run one interaction of `ctx.caller` with `npc_id`.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] if the components are not wired to
    /// each other; [`PersonaError::NpcInactive`] if the NPC is absent or
    /// inactive. Either way nothing is written.
    pub fn interact(
        &mut self,
        ctx: &CallContext,
        npc_id: NpcId,
        context: InteractionContext,
        links: Links<'_>,
    ) -> Result<InteractionReceipt> {
        if !self.is_wired(&links) {
            return Err(PersonaError::Unauthorized {
                caller: ctx.caller,
                operation: "interact through an unwired tracker",
            });
        }
        let Links {
            registry,
            learning,
            decision,
            quests,
        } = links;
        if !self.can_interact_with(registry, npc_id) {
            return Err(PersonaError::NpcInactive(npc_id));
        }

        let player = ctx.caller;
        let decision = decision.make_decision(registry, npc_id, player, context.action, context.value1)?;
        let positive = is_interaction_positive(&context);
        let outcome = learning.calculate_interaction_outcome(registry, npc_id, player, &context, positive)?;
        registry.apply_outcome(&ctx.as_caller(self.address), npc_id, player, &outcome)?;

        let quests_advanced = self.notify_quests(ctx, npc_id, &context, quests);

        self.stats.entry((npc_id, player)).or_default().record(positive);
        self.totals.record(positive);

        debug!(
            npc = %npc_id,
            player = %player,
            action = %context.action,
            positive,
            response = %decision.response,
            intensity = decision.intensity,
            quests = quests_advanced.len(),
            "Interaction recorded"
        );
        self.events.emit(PersonaEvent::InteractionRecorded {
            npc_id,
            player,
            action: context.action,
            positive,
            response: decision.response,
            intensity: decision.intensity,
        });

        Ok(InteractionReceipt {
            npc_id,
            player,
            decision,
            outcome,
            positive,
            quests_advanced,
        })
    }

    /// Soft quest notification: errors are logged, never returned.
    fn notify_quests(
        &self,
        ctx: &CallContext,
        npc_id: NpcId,
        context: &InteractionContext,
        quests: Option<&mut QuestSystem>,
    ) -> Vec<QuestId> {
        let (Some(linked), Some(quests)) = (self.quest_system, quests) else {
            return Vec::new();
        };
        if quests.address() != linked {
            warn!(
                expected = %linked,
                got = %quests.address(),
                "Quest notification skipped: not the linked quest system"
            );
            return Vec::new();
        }
        match quests.record_interaction(
            &ctx.as_caller(self.address),
            npc_id,
            ctx.caller,
            context.action,
            context.value1,
        ) {
            Ok(advanced) => advanced,
            Err(e) => {
                warn!(npc = %npc_id, player = %ctx.caller, error = %e, "Quest notification failed");
                Vec::new()
            }
        }
    }

    /// Counters for one (NPC, player) pair.
    #[must_use]
    pub fn stats(&self, npc_id: NpcId, player: Address) -> InteractionStats {
        self.stats.get(&(npc_id, player)).copied().unwrap_or_default()
    }

    /// Counters across every interaction.
    #[must_use]
    pub const fn totals(&self) -> InteractionStats {
        self.totals
    }

    /// Take the events journaled since the last drain.
    pub fn drain_events(&mut self) -> Vec<PersonaEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LearningConfig, MemoryConfig, QuestConfig};
    use crate::quest::{QuestDraft, QuestStatus, QuestType};
    use crate::types::{Action, Personality, Timestamp, Traits};

    const AUTHORITY: u64 = 1;
    const PLAYER: u64 = 100;

    struct World {
        registry: NpcRegistry,
        learning: LearningEngine,
        decision: DecisionEngine,
        quests: QuestSystem,
        tracker: InteractionTracker,
    }

    fn ctx(caller: u64, now: u64) -> CallContext {
        CallContext::new(Address::from_low_u64(caller), Timestamp(now))
    }

    fn world(wire_registry: bool, wire_quests: bool) -> World {
        let authority = Address::from_low_u64(AUTHORITY);
        let admin = ctx(AUTHORITY, 0);
        let mut registry = NpcRegistry::new(Address::from_low_u64(10), authority, &MemoryConfig::default());
        let learning = LearningEngine::new(Address::from_low_u64(11), registry.address(), LearningConfig::default());
        let decision = DecisionEngine::new(Address::from_low_u64(12), authority, registry.address());
        let mut quests = QuestSystem::new(Address::from_low_u64(14), authority, registry.address(), QuestConfig::default());
        let mut tracker = InteractionTracker::new(
            Address::from_low_u64(13),
            authority,
            registry.address(),
            learning.address(),
            decision.address(),
        );
        if wire_registry {
            registry
                .set_interaction_tracker_address(&admin, tracker.address())
                .expect("wire registry");
        }
        if wire_quests {
            quests
                .set_interaction_tracker_address(&admin, tracker.address())
                .expect("wire quests");
            tracker
                .set_quest_system_address(&admin, quests.address())
                .expect("wire tracker");
        }
        World {
            registry,
            learning,
            decision,
            quests,
            tracker,
        }
    }

    impl World {
        fn npc(&mut self, personality: Personality, traits: Traits) -> NpcId {
            self.registry
                .create_npc(&ctx(AUTHORITY, 0), "Subject", personality, traits)
                .expect("create")
        }

        fn interact(&mut self, now: u64, npc: NpcId, context: InteractionContext) -> Result<InteractionReceipt> {
            self.tracker.interact(
                &ctx(PLAYER, now),
                npc,
                context,
                Links {
                    registry: &mut self.registry,
                    learning: &self.learning,
                    decision: &self.decision,
                    quests: Some(&mut self.quests),
                },
            )
        }
    }

    fn help() -> InteractionContext {
        InteractionContext::new(Action::Help, Address::from_low_u64(PLAYER)).with_value(50)
    }

    #[test]
    fn friendly_help_commits_outcome() {
        let mut w = world(true, true);
        let npc = w.npc(Personality::Friendly, Traits::new(800, 200, 700).expect("valid"));

        let receipt = w.interact(5, npc, help()).expect("interact");
        assert!(receipt.positive);
        assert_eq!(receipt.decision.response, crate::decision::ResponseType::Help);

        let state = w.registry.npc_state(npc).expect("exists");
        assert!(state.traits.intelligence >= 800);
        assert!(state.traits.sociability >= 700);
        assert_eq!(state.experience_points, 1);
        assert!(w.registry.relationship(npc, Address::from_low_u64(PLAYER)) > 0);
        assert_eq!(w.tracker.stats(npc, Address::from_low_u64(PLAYER)).positive, 1);
    }

    #[test]
    fn unknown_npc_fails_before_any_write() {
        let mut w = world(true, true);
        let err = w.interact(1, NpcId(42), help()).expect_err("no such NPC");
        assert!(matches!(err, PersonaError::NpcInactive(NpcId(42))));
        assert_eq!(w.tracker.totals().total, 0);
        assert!(w.tracker.drain_events().iter().all(|e| e.name() == "link_set"));
    }

    #[test]
    fn can_interact_before_and_after_creation() {
        let mut w = world(true, false);
        assert!(!w.tracker.can_interact_with(&w.registry, NpcId(0)));
        let npc = w.npc(Personality::Neutral, Traits::default());
        assert!(w.tracker.can_interact_with(&w.registry, npc));
    }

    #[test]
    fn unwired_tracker_fails_closed() {
        let mut w = world(false, false);
        let npc = w.npc(Personality::Neutral, Traits::default());
        let err = w.interact(1, npc, help()).expect_err("registry not wired");
        assert!(matches!(err, PersonaError::Unauthorized { .. }));
        assert_eq!(w.registry.npc_state(npc).expect("exists").experience_points, 0);
    }

    #[test]
    fn quest_progress_is_reported() {
        let mut w = world(true, true);
        let npc = w.npc(Personality::Friendly, Traits::default());
        let quest = w
            .quests
            .create_quest(&ctx(AUTHORITY, 0), &w.registry, QuestDraft::new(npc, QuestType::Assist, "Help out", 1))
            .expect("quest");
        w.quests.accept_quest(&ctx(PLAYER, 1), quest).expect("accept");

        let receipt = w.interact(2, npc, help()).expect("interact");
        assert_eq!(receipt.quests_advanced, vec![quest]);
        assert_eq!(
            w.quests
                .player_quest_status(Address::from_low_u64(PLAYER), quest)
                .expect("exists")
                .status,
            QuestStatus::Completed
        );
    }

    #[test]
    fn quest_failure_does_not_roll_back_traits() {
        // Tracker links the quest system, but the quest system never
        // registered the tracker, so every report is refused.
        let mut w = world(true, false);
        w.tracker
            .set_quest_system_address(&ctx(AUTHORITY, 0), w.quests.address())
            .expect("link");
        let npc = w.npc(Personality::Friendly, Traits::default());

        let receipt = w.interact(3, npc, help()).expect("soft failure");
        assert!(receipt.quests_advanced.is_empty());
        assert_eq!(w.registry.npc_state(npc).expect("exists").experience_points, 1);
    }

    #[test]
    fn hostile_attack_lowers_relationship() {
        let mut w = world(true, true);
        let npc = w.npc(Personality::Hostile, Traits::new(750, 800, 200).expect("valid"));
        let attack = InteractionContext::new(Action::Attack, Address::from_low_u64(PLAYER)).with_value(30);

        let receipt = w.interact(4, npc, attack).expect("interact");
        assert!(!receipt.positive);
        let state = w.registry.npc_state(npc).expect("exists");
        assert!(state.traits.aggression > 800);
        assert!(w.registry.relationship(npc, Address::from_low_u64(PLAYER)) < 0);
        assert_eq!(w.tracker.stats(npc, Address::from_low_u64(PLAYER)).negative, 1);
    }
}
