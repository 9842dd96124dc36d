//! State-transition events and the sinks that observe them.
//!
//! Components journal an event for every state transition they commit.
//! The system facade drains those journals after each call and hands the
//! events to an [`EventSink`]. Delivery is fire-and-forget: no game logic
//! reads events back.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decision::{DataPointer, ResponseType};
use crate::quest::QuestType;
use crate::types::{
    Action, Address, Faction, MemorySnippet, NpcId, Personality, QuestId, Timestamp, Traits,
};

/// The engine components, as named in wiring events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// The trait store / NPC registry.
    NpcCore,
    /// The learning / outcome engine.
    LearningEngine,
    /// The decision engine.
    DecisionEngine,
    /// The interaction orchestrator.
    InteractionTracker,
    /// The quest state machine.
    QuestSystem,
}

/// A committed state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PersonaEvent {
    /// A new NPC was registered.
    NpcCreated {
        /// Assigned id.
        npc_id: NpcId,
        /// Display name.
        name: String,
        /// Baseline temperament.
        personality: Personality,
        /// Owning faction.
        faction: Faction,
        /// Initial traits.
        traits: Traits,
    },
    /// An NPC was switched on or off.
    NpcActivationChanged {
        /// The NPC.
        npc_id: NpcId,
        /// New activation flag.
        active: bool,
    },
    /// An interaction outcome was written to the trait store.
    OutcomeApplied {
        /// The NPC.
        npc_id: NpcId,
        /// The player.
        player: Address,
        /// Traits after the update.
        traits: Traits,
        /// Relationship after the update.
        relationship: i32,
        /// Memory appended.
        snippet: MemorySnippet,
        /// When it happened.
        at: Timestamp,
    },
    /// The orchestrator finished a player interaction.
    InteractionRecorded {
        /// The NPC.
        npc_id: NpcId,
        /// The player.
        player: Address,
        /// What the player did.
        action: Action,
        /// Whether it was classed positive.
        positive: bool,
        /// How the NPC responded.
        response: ResponseType,
        /// How strongly it responded.
        intensity: u16,
    },
    /// An off-chain data pointer was attached to an NPC.
    DataPointerSet {
        /// The NPC.
        npc_id: NpcId,
        /// The pointer.
        pointer: DataPointer,
    },
    /// A component was linked to a collaborator.
    LinkSet {
        /// Component whose link changed.
        on: Component,
        /// Which collaborator slot was set.
        link: Component,
        /// The collaborator's address.
        address: Address,
    },
    /// A quest was created.
    QuestCreated {
        /// Assigned id.
        quest_id: QuestId,
        /// Quest-giving NPC.
        npc_id: NpcId,
        /// Progress rule.
        quest_type: QuestType,
        /// Progress needed to complete.
        target_value: u64,
    },
    /// A quest was switched on or off.
    QuestActivationChanged {
        /// The quest.
        quest_id: QuestId,
        /// New activation flag.
        active: bool,
    },
    /// A player accepted a quest.
    QuestAccepted {
        /// The quest.
        quest_id: QuestId,
        /// The player.
        player: Address,
    },
    /// A player's quest progress advanced.
    QuestProgressed {
        /// The quest.
        quest_id: QuestId,
        /// The player.
        player: Address,
        /// Progress after the update.
        progress: u64,
        /// Progress needed.
        target: u64,
    },
    /// A player's quest reached its target.
    QuestCompleted {
        /// The quest.
        quest_id: QuestId,
        /// The player.
        player: Address,
    },
    /// A player's quest passed its deadline incomplete.
    QuestFailed {
        /// The quest.
        quest_id: QuestId,
        /// The player.
        player: Address,
    },
    /// A player claimed a quest reward.
    RewardClaimed {
        /// The quest.
        quest_id: QuestId,
        /// The player.
        player: Address,
        /// Tokens credited.
        tokens: u64,
        /// Experience credited.
        xp: u64,
    },
    /// A player's faction reputation changed.
    ReputationChanged {
        /// The player.
        player: Address,
        /// The faction.
        faction: Faction,
        /// Reputation after the change.
        reputation: i32,
    },
}

impl PersonaEvent {
    /// Short snake-case name of the event kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NpcCreated { .. } => "npc_created",
            Self::NpcActivationChanged { .. } => "npc_activation_changed",
            Self::OutcomeApplied { .. } => "outcome_applied",
            Self::InteractionRecorded { .. } => "interaction_recorded",
            Self::DataPointerSet { .. } => "data_pointer_set",
            Self::LinkSet { .. } => "link_set",
            Self::QuestCreated { .. } => "quest_created",
            Self::QuestActivationChanged { .. } => "quest_activation_changed",
            Self::QuestAccepted { .. } => "quest_accepted",
            Self::QuestProgressed { .. } => "quest_progressed",
            Self::QuestCompleted { .. } => "quest_completed",
            Self::QuestFailed { .. } => "quest_failed",
            Self::RewardClaimed { .. } => "reward_claimed",
            Self::ReputationChanged { .. } => "reputation_changed",
        }
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Per-component journal of events committed since the last drain.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pending: Vec<PersonaEvent>,
}

impl EventLog {
    /// Record an event.
    pub fn emit(&mut self, event: PersonaEvent) {
        self.pending.push(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<PersonaEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Observer of committed events (dashboards, indexers, logs).
pub trait EventSink: Send {
    /// Deliver one event. Must not fail the caller.
    fn publish(&mut self, event: &PersonaEvent);
}

/// Sink that logs each event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&mut self, event: &PersonaEvent) {
        info!(target: "persona::events", kind = event.name(), ?event, "event");
    }
}

/// Sink that keeps events in a shared buffer.
///
/// Clones share the buffer, so a handle kept by the caller sees everything
/// published through the copy handed to the system.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<PersonaEvent>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event published so far.
    #[must_use]
    pub fn events(&self) -> Vec<PersonaEvent> {
        self.events.lock().clone()
    }

    /// Take every event published so far, leaving the buffer empty.
    #[must_use]
    pub fn take(&self) -> Vec<PersonaEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemorySink {
    fn publish(&mut self, event: &PersonaEvent) {
        self.events.lock().push(event.clone());
    }
}
