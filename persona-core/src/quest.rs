//! Quest state machine.
//!
//! Per (player, quest):
//!
//! ```text
//! Available --accept--> Active --progress >= target--> Completed --claim--> Claimed
//!                         \--deadline passed--> Failed
//! ```
//!
//! Progress is driven by interaction notifications from the registered
//! orchestrator. Claiming pays through a [`RewardLedger`] and raises the
//! player's reputation with the quest giver's faction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::QuestConfig;
use crate::error::{PersonaError, Result};
use crate::events::{Component, EventLog, PersonaEvent};
use crate::npc::NpcRegistry;
use crate::reputation::ReputationLevel;
use crate::rewards::{Reward, RewardLedger};
use crate::types::{
    clamp_relationship, Action, Address, CallContext, Faction, NpcId, QuestId, Timestamp,
    RELATIONSHIP_MAX, RELATIONSHIP_MIN,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What kind of interaction advances a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestType {
    /// Any interaction with the quest giver, +1 each.
    Interact,
    /// Trades with the quest giver, + the trade value (at least 1).
    Trade,
    /// Attacks or provocations against the quest giver, +1 each.
    Combat,
    /// Helping the quest giver, +1 each.
    Assist,
}

impl QuestType {
    /// Stable wire code (0..=3).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Interact => 0,
            Self::Trade => 1,
            Self::Combat => 2,
            Self::Assist => 3,
        }
    }

    /// Decode a wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Interact),
            1 => Some(Self::Trade),
            2 => Some(Self::Combat),
            3 => Some(Self::Assist),
            _ => None,
        }
    }

    /// Progress an interaction earns, or `None` if it does not count.
    #[must_use]
    pub fn progress_for(self, action: Action, value1: u64) -> Option<u64> {
        match (self, action) {
            (Self::Interact, _)
            | (Self::Combat, Action::Attack | Action::Provoke)
            | (Self::Assist, Action::Help) => Some(1),
            (Self::Trade, Action::Trade) => Some(value1.max(1)),
            (Self::Trade | Self::Combat | Self::Assist, _) => None,
        }
    }
}

/// Where a player stands on a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum QuestStatus {
    /// Not accepted yet.
    #[default]
    Available,
    /// Accepted, in progress.
    Active,
    /// Target reached, reward unclaimed.
    Completed,
    /// Deadline passed before completion. Terminal.
    Failed,
    /// Reward paid out. Terminal.
    Claimed,
}

impl QuestStatus {
    /// Stable wire code (0..=4).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Available => 0,
            Self::Active => 1,
            Self::Completed => 2,
            Self::Failed => 3,
            Self::Claimed => 4,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Claimed)
    }
}

/// A quest as created by the authority. Immutable apart from `is_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Sequential id.
    pub id: QuestId,
    /// Quest giver.
    pub npc_id: NpcId,
    /// Faction of the quest giver.
    pub faction: Faction,
    /// Progress rule.
    pub quest_type: QuestType,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Progress needed to complete.
    pub target_value: u64,
    /// Tokens paid on claim.
    pub reward_tokens: u64,
    /// Experience paid on claim.
    pub reward_xp: u64,
    /// Last moment progress counts; `None` for open-ended quests.
    pub deadline: Option<Timestamp>,
    /// Whether the quest can be accepted and advanced.
    pub is_active: bool,
    /// Minimum faction reputation needed to accept.
    pub required_reputation: i32,
    /// When the quest was created.
    pub created_at: Timestamp,
}

impl Quest {
    /// Whether the deadline has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|d| now > d)
    }

    /// The reward paid on claim.
    #[must_use]
    pub const fn reward(&self) -> Reward {
        Reward {
            tokens: self.reward_tokens,
            xp: self.reward_xp,
        }
    }
}

/// Parameters of a quest to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDraft {
    /// Quest giver.
    pub npc_id: NpcId,
    /// Progress rule.
    pub quest_type: QuestType,
    /// Display title.
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Progress needed to complete (at least 1).
    pub target_value: u64,
    /// Tokens paid on claim.
    #[serde(default)]
    pub reward_tokens: u64,
    /// Experience paid on claim.
    #[serde(default)]
    pub reward_xp: u64,
    /// Seconds from creation until the deadline; 0 for none.
    #[serde(default)]
    pub duration_secs: u64,
    /// Minimum faction reputation needed to accept.
    #[serde(default)]
    pub required_reputation: i32,
}

impl QuestDraft {
    /// Draft with no reward, no deadline and no reputation requirement.
    #[must_use]
    pub fn new(npc_id: NpcId, quest_type: QuestType, title: impl Into<String>, target_value: u64) -> Self {
        Self {
            npc_id,
            quest_type,
            title: title.into(),
            description: String::new(),
            target_value,
            reward_tokens: 0,
            reward_xp: 0,
            duration_secs: 0,
            required_reputation: 0,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the reward.
    #[must_use]
    pub const fn with_reward(mut self, tokens: u64, xp: u64) -> Self {
        self.reward_tokens = tokens;
        self.reward_xp = xp;
        self
    }

    /// Set a deadline `secs` after creation.
    #[must_use]
    pub const fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Require a minimum faction reputation.
    #[must_use]
    pub const fn with_required_reputation(mut self, reputation: i32) -> Self {
        self.required_reputation = reputation;
        self
    }
}

/// A player's progress on one quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerQuest {
    /// The quest.
    pub quest_id: QuestId,
    /// Current state.
    pub status: QuestStatus,
    /// Progress so far.
    pub progress: u64,
    /// When the quest was accepted.
    pub accepted_at: Option<Timestamp>,
    /// When the target was reached.
    pub completed_at: Option<Timestamp>,
}

impl PlayerQuest {
    /// Record for a quest the player never accepted.
    #[must_use]
    pub const fn available(quest_id: QuestId) -> Self {
        Self {
            quest_id,
            status: QuestStatus::Available,
            progress: 0,
            accepted_at: None,
            completed_at: None,
        }
    }
}

/// Flat player-quest row, used by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerQuestEntry {
    /// The player.
    pub player: Address,
    /// Their progress.
    pub quest: PlayerQuest,
}

/// Flat reputation row, used by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEntry {
    /// The player.
    pub player: Address,
    /// The faction.
    pub faction: Faction,
    /// Score in `[-1000, 1000]`.
    pub reputation: i32,
}

/// Serializable quest system contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestState {
    /// Quests, indexed by id.
    pub quests: Vec<Quest>,
    /// Every accepted quest.
    pub player_quests: Vec<PlayerQuestEntry>,
    /// Every non-default faction reputation.
    pub reputation: Vec<ReputationEntry>,
    /// Configured orchestrator address.
    pub interaction_tracker: Option<Address>,
}

// ---------------------------------------------------------------------------
// QuestSystem
// ---------------------------------------------------------------------------

/// The quest state machine component.
#[derive(Debug, Clone)]
pub struct QuestSystem {
    address: Address,
    authority: Address,
    npc_core: Address,
    interaction_tracker: Option<Address>,
    config: QuestConfig,
    quests: Vec<Quest>,
    player_quests: BTreeMap<(Address, QuestId), PlayerQuest>,
    reputation: BTreeMap<(Address, Faction), i32>,
    events: EventLog,
}

impl QuestSystem {
    /// Create an empty quest system at `address`, bound to the NPC core at `npc_core`.
    #[must_use]
    pub fn new(address: Address, authority: Address, npc_core: Address, config: QuestConfig) -> Self {
        Self {
            address,
            authority,
            npc_core,
            interaction_tracker: None,
            config,
            quests: Vec::new(),
            player_quests: BTreeMap::new(),
            reputation: BTreeMap::new(),
            events: EventLog::default(),
        }
    }

    /// Rebuild a quest system from a snapshot.
    ///
    /// # Errors
    /// [`PersonaError::Serialization`] if a quest sits at the wrong index, a
    /// player quest names an unknown quest, or a reputation is out of range.
    pub fn from_state(
        address: Address,
        authority: Address,
        npc_core: Address,
        config: QuestConfig,
        state: QuestState,
    ) -> Result<Self> {
        for (index, quest) in state.quests.iter().enumerate() {
            if quest.id.0 != index as u64 {
                return Err(PersonaError::Serialization(format!(
                    "quest at index {index} carries id {}",
                    quest.id
                )));
            }
        }
        let quest_count = state.quests.len() as u64;
        if let Some(entry) = state
            .player_quests
            .iter()
            .find(|e| e.quest.quest_id.0 >= quest_count)
        {
            return Err(PersonaError::Serialization(format!(
                "player {} holds unknown quest {}",
                entry.player, entry.quest.quest_id
            )));
        }
        if let Some(entry) = state
            .reputation
            .iter()
            .find(|e| !(RELATIONSHIP_MIN..=RELATIONSHIP_MAX).contains(&e.reputation))
        {
            return Err(PersonaError::Serialization(format!(
                "reputation of {} with {} is out of range: {}",
                entry.player, entry.faction, entry.reputation
            )));
        }

        let mut system = Self::new(address, authority, npc_core, config);
        system.quests = state.quests;
        system.player_quests = state
            .player_quests
            .into_iter()
            .map(|e| ((e.player, e.quest.quest_id), e.quest))
            .collect();
        system.reputation = state
            .reputation
            .into_iter()
            .map(|e| ((e.player, e.faction), e.reputation))
            .collect();
        system.interaction_tracker = state.interaction_tracker;
        Ok(system)
    }

    /// Export the quest system contents for a snapshot.
    #[must_use]
    pub fn export_state(&self) -> QuestState {
        QuestState {
            quests: self.quests.clone(),
            player_quests: self
                .player_quests
                .iter()
                .map(|(&(player, _), &quest)| PlayerQuestEntry { player, quest })
                .collect(),
            reputation: self
                .reputation
                .iter()
                .map(|(&(player, faction), &reputation)| ReputationEntry {
                    player,
                    faction,
                    reputation,
                })
                .collect(),
            interaction_tracker: self.interaction_tracker,
        }
    }

    /// This system's own address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The registered orchestrator, if any.
    #[must_use]
    pub const fn interaction_tracker(&self) -> Option<Address> {
        self.interaction_tracker
    }

    /// Register the orchestrator allowed to report interactions.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority.
    pub fn set_interaction_tracker_address(&mut self, ctx: &CallContext, tracker: Address) -> Result<()> {
        self.require_authority(ctx, "set the interaction tracker")?;
        self.interaction_tracker = Some(tracker);
        self.events.emit(PersonaEvent::LinkSet {
            on: Component::QuestSystem,
            link: Component::InteractionTracker,
            address: tracker,
        });
        info!(tracker = %tracker, "Quest system linked to interaction tracker");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Authority operations
    // ------------------------------------------------------------------

    /// Create a quest offered by an existing NPC.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority (or if
    /// `registry` is not this system's NPC core);
    /// [`PersonaError::NpcNotFound`] for an unknown quest giver;
    /// [`PersonaError::InvalidQuest`] for a zero target, blank title or an
    /// out-of-range reputation requirement.
    pub fn create_quest(&mut self, ctx: &CallContext, registry: &NpcRegistry, draft: QuestDraft) -> Result<QuestId> {
        self.require_authority(ctx, "create quests")?;
        if registry.address() != self.npc_core {
            return Err(PersonaError::Unauthorized {
                caller: registry.address(),
                operation: "serve NPCs to this quest system",
            });
        }
        let npc = registry.npc_state(draft.npc_id)?;
        if draft.target_value == 0 {
            return Err(PersonaError::InvalidQuest {
                reason: "target value must be at least 1".to_string(),
            });
        }
        if draft.title.trim().is_empty() {
            return Err(PersonaError::InvalidQuest {
                reason: "title must not be empty".to_string(),
            });
        }
        if !(RELATIONSHIP_MIN..=RELATIONSHIP_MAX).contains(&draft.required_reputation) {
            return Err(PersonaError::InvalidQuest {
                reason: format!(
                    "required reputation {} outside [{RELATIONSHIP_MIN}, {RELATIONSHIP_MAX}]",
                    draft.required_reputation
                ),
            });
        }

        let id = QuestId(self.quests.len() as u64);
        let deadline = (draft.duration_secs > 0).then(|| ctx.now.plus_secs(draft.duration_secs));
        let quest = Quest {
            id,
            npc_id: draft.npc_id,
            faction: npc.faction,
            quest_type: draft.quest_type,
            title: draft.title,
            description: draft.description,
            target_value: draft.target_value,
            reward_tokens: draft.reward_tokens,
            reward_xp: draft.reward_xp,
            deadline,
            is_active: true,
            required_reputation: draft.required_reputation,
            created_at: ctx.now,
        };
        info!(
            quest = %id,
            npc = %quest.npc_id,
            title = %quest.title,
            quest_type = ?quest.quest_type,
            target = quest.target_value,
            "Quest created"
        );
        self.events.emit(PersonaEvent::QuestCreated {
            quest_id: id,
            npc_id: quest.npc_id,
            quest_type: quest.quest_type,
            target_value: quest.target_value,
        });
        self.quests.push(quest);
        Ok(id)
    }

    /// Switch a quest on or off.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority;
    /// [`PersonaError::QuestNotFound`] for an unknown id.
    pub fn set_quest_active(&mut self, ctx: &CallContext, quest_id: QuestId, active: bool) -> Result<()> {
        self.require_authority(ctx, "toggle quests")?;
        let quest = self.quest_mut(quest_id)?;
        if quest.is_active == active {
            return Ok(());
        }
        quest.is_active = active;
        info!(quest = %quest_id, active, "Quest activation changed");
        self.events
            .emit(PersonaEvent::QuestActivationChanged { quest_id, active });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Player operations
    // ------------------------------------------------------------------

    /// Accept a quest as `ctx.caller`.
    ///
    /// # Errors
    /// [`PersonaError::QuestNotFound`], [`PersonaError::QuestInactive`],
    /// [`PersonaError::DeadlineExpired`], [`PersonaError::AlreadyAccepted`]
    /// (the player holds this quest in any status) or
    /// [`PersonaError::ReputationTooLow`].
    pub fn accept_quest(&mut self, ctx: &CallContext, quest_id: QuestId) -> Result<()> {
        let player = ctx.caller;
        let quest = self.quest(quest_id)?;
        if !quest.is_active {
            return Err(PersonaError::QuestInactive(quest_id));
        }
        if quest.is_expired(ctx.now) {
            return Err(PersonaError::DeadlineExpired(quest_id));
        }
        if self.player_quests.contains_key(&(player, quest_id)) {
            return Err(PersonaError::AlreadyAccepted(quest_id));
        }
        let actual = self.faction_reputation(player, quest.faction);
        if actual < quest.required_reputation {
            return Err(PersonaError::ReputationTooLow {
                required: quest.required_reputation,
                actual,
            });
        }

        self.player_quests.insert(
            (player, quest_id),
            PlayerQuest {
                quest_id,
                status: QuestStatus::Active,
                progress: 0,
                accepted_at: Some(ctx.now),
                completed_at: None,
            },
        );
        info!(quest = %quest_id, player = %player, "Quest accepted");
        self.events
            .emit(PersonaEvent::QuestAccepted { quest_id, player });
        Ok(())
    }

    /// Claim the reward of a completed quest as `ctx.caller`.
    ///
    /// The ledger is credited first; if it refuses, nothing changes.
    ///
    /// # Errors
    /// [`PersonaError::QuestNotFound`] for an unknown quest;
    /// [`PersonaError::NotCompleted`] unless the player's status is exactly
    /// `Completed` (so a second claim fails too); whatever the ledger returns.
    pub fn claim_reward(
        &mut self,
        ctx: &CallContext,
        quest_id: QuestId,
        ledger: &mut dyn RewardLedger,
    ) -> Result<Reward> {
        let player = ctx.caller;
        let quest = self.quest(quest_id)?;
        let (reward, faction) = (quest.reward(), quest.faction);
        let completed = self
            .player_quests
            .get(&(player, quest_id))
            .is_some_and(|pq| pq.status == QuestStatus::Completed);
        if !completed {
            return Err(PersonaError::NotCompleted(quest_id));
        }

        ledger.credit(player, reward)?;

        if let Some(pq) = self.player_quests.get_mut(&(player, quest_id)) {
            pq.status = QuestStatus::Claimed;
        }
        let reputation = self.reputation.entry((player, faction)).or_insert(0);
        *reputation = clamp_relationship(reputation.saturating_add(self.config.claim_reputation_gain));
        let reputation = *reputation;

        info!(
            quest = %quest_id,
            player = %player,
            tokens = reward.tokens,
            xp = reward.xp,
            %faction,
            reputation,
            "Quest reward claimed"
        );
        self.events.emit(PersonaEvent::RewardClaimed {
            quest_id,
            player,
            tokens: reward.tokens,
            xp: reward.xp,
        });
        self.events.emit(PersonaEvent::ReputationChanged {
            player,
            faction,
            reputation,
        });
        Ok(reward)
    }

    /// Fail `ctx.caller`'s quest if it is Active and past its deadline.
    ///
    /// Returns whether the quest was failed.
    ///
    /// # Errors
    /// [`PersonaError::QuestNotFound`] for an unknown quest.
    pub fn expire_quest(&mut self, ctx: &CallContext, quest_id: QuestId) -> Result<bool> {
        let player = ctx.caller;
        let expired = self.quest(quest_id)?.is_expired(ctx.now);
        let Some(pq) = self.player_quests.get_mut(&(player, quest_id)) else {
            return Ok(false);
        };
        if pq.status != QuestStatus::Active || !expired {
            return Ok(false);
        }
        pq.status = QuestStatus::Failed;
        info!(quest = %quest_id, player = %player, "Quest failed: deadline passed");
        self.events.emit(PersonaEvent::QuestFailed { quest_id, player });
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Orchestrator notification
    // ------------------------------------------------------------------

    /// Advance `player`'s Active quests on `npc_id` for one interaction.
    ///
    /// Overdue quests are failed instead of advanced. Completed and terminal
    /// quests are untouched. Returns the quests that gained progress.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless `ctx.caller` is the registered
    /// orchestrator.
    pub fn record_interaction(
        &mut self,
        ctx: &CallContext,
        npc_id: NpcId,
        player: Address,
        action: Action,
        value1: u64,
    ) -> Result<Vec<QuestId>> {
        if self.interaction_tracker != Some(ctx.caller) {
            return Err(PersonaError::Unauthorized {
                caller: ctx.caller,
                operation: "report interactions",
            });
        }

        let mut advanced = Vec::new();
        let range = (player, QuestId(0))..=(player, QuestId(u64::MAX));
        for (&(_, quest_id), pq) in self.player_quests.range_mut(range) {
            if pq.status != QuestStatus::Active {
                continue;
            }
            let Some(quest) = usize::try_from(quest_id.0).ok().and_then(|i| self.quests.get(i)) else {
                continue;
            };
            if quest.npc_id != npc_id || !quest.is_active {
                continue;
            }
            if quest.is_expired(ctx.now) {
                pq.status = QuestStatus::Failed;
                info!(quest = %quest_id, player = %player, "Quest failed: deadline passed");
                self.events.emit(PersonaEvent::QuestFailed { quest_id, player });
                continue;
            }
            let Some(amount) = quest.quest_type.progress_for(action, value1) else {
                continue;
            };

            pq.progress = pq.progress.saturating_add(amount);
            advanced.push(quest_id);
            debug!(
                quest = %quest_id,
                player = %player,
                progress = pq.progress,
                target = quest.target_value,
                "Quest progressed"
            );
            self.events.emit(PersonaEvent::QuestProgressed {
                quest_id,
                player,
                progress: pq.progress,
                target: quest.target_value,
            });

            if pq.progress >= quest.target_value {
                pq.status = QuestStatus::Completed;
                pq.completed_at = Some(ctx.now);
                info!(quest = %quest_id, player = %player, "Quest completed");
                self.events
                    .emit(PersonaEvent::QuestCompleted { quest_id, player });
            }
        }
        Ok(advanced)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// A quest by id.
    ///
    /// # Errors
    /// [`PersonaError::QuestNotFound`] if the id was never assigned.
    pub fn quest(&self, quest_id: QuestId) -> Result<&Quest> {
        usize::try_from(quest_id.0)
            .ok()
            .and_then(|i| self.quests.get(i))
            .ok_or(PersonaError::QuestNotFound(quest_id))
    }

    /// Number of quests ever created.
    #[must_use]
    pub fn quest_count(&self) -> u64 {
        self.quests.len() as u64
    }

    /// Every quest, by ascending id.
    pub fn quests(&self) -> impl Iterator<Item = &Quest> {
        self.quests.iter()
    }

    /// Quests offered by one NPC.
    pub fn quests_for_npc(&self, npc_id: NpcId) -> impl Iterator<Item = &Quest> {
        self.quests.iter().filter(move |q| q.npc_id == npc_id)
    }

    /// A player's record for a quest (`Available` when never accepted).
    ///
    /// # Errors
    /// [`PersonaError::QuestNotFound`] if the id was never assigned.
    pub fn player_quest_status(&self, player: Address, quest_id: QuestId) -> Result<PlayerQuest> {
        self.quest(quest_id)?;
        Ok(self
            .player_quests
            .get(&(player, quest_id))
            .copied()
            .unwrap_or_else(|| PlayerQuest::available(quest_id)))
    }

    /// Every quest a player has accepted, by quest id.
    #[must_use]
    pub fn player_quests(&self, player: Address) -> Vec<PlayerQuest> {
        self.player_quests
            .range((player, QuestId(0))..=(player, QuestId(u64::MAX)))
            .map(|(_, pq)| *pq)
            .collect()
    }

    /// A player's reputation with a faction (0 when never changed).
    #[must_use]
    pub fn faction_reputation(&self, player: Address, faction: Faction) -> i32 {
        self.reputation.get(&(player, faction)).copied().unwrap_or(0)
    }

    /// The tier of a player's reputation with a faction.
    #[must_use]
    pub fn reputation_level(&self, player: Address, faction: Faction) -> ReputationLevel {
        ReputationLevel::from_score(self.faction_reputation(player, faction))
    }

    /// Take the events journaled since the last drain.
    pub fn drain_events(&mut self) -> Vec<PersonaEvent> {
        self.events.drain()
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn quest_mut(&mut self, quest_id: QuestId) -> Result<&mut Quest> {
        usize::try_from(quest_id.0)
            .ok()
            .and_then(|i| self.quests.get_mut(i))
            .ok_or(PersonaError::QuestNotFound(quest_id))
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
