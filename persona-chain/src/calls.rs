//! Wire types: what clients send and what they get back.
//!
//! Every type here is plain serde JSON, internally tagged so a line of JSON
//! names its own kind (`{"call": "accept_quest", "quest_id": 0}`).

use persona_core::decision::DataPointer;
use persona_core::events::PersonaEvent;
use persona_core::interaction::InteractionReceipt;
use persona_core::quest::QuestDraft;
use persona_core::rewards::Reward;
use persona_core::{Action, Address, Faction, NpcId, Personality, QuestId, Timestamp, Traits};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// A state-changing transaction. The sender travels alongside, not inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    /// Register an NPC (authority only).
    CreateNpc {
        /// Display name.
        name: String,
        /// Baseline temperament.
        personality: Personality,
        /// Owning faction.
        #[serde(default)]
        faction: Faction,
        /// Initial traits.
        traits: Traits,
    },
    /// Switch an NPC on or off (authority only).
    SetNpcActive {
        /// The NPC.
        npc_id: NpcId,
        /// New flag.
        active: bool,
    },
    /// Attach an off-ledger data pointer (authority only).
    SetNpcDataPointer {
        /// The NPC.
        npc_id: NpcId,
        /// The pointer.
        pointer: DataPointer,
    },
    /// Create a quest (authority only).
    CreateQuest(QuestDraft),
    /// Switch a quest on or off (authority only).
    SetQuestActive {
        /// The quest.
        quest_id: QuestId,
        /// New flag.
        active: bool,
    },
    /// Act on an NPC.
    Interact {
        /// The NPC.
        npc_id: NpcId,
        /// What the sender does.
        action: Action,
        /// Who the action concerns; the sender when omitted.
        #[serde(default)]
        target: Option<Address>,
        /// Primary payload.
        #[serde(default)]
        value1: u64,
        /// Secondary payload.
        #[serde(default)]
        value2: u64,
        /// Opaque caller tag, handed to the engine untouched.
        #[serde(default)]
        memo: [u8; 32],
    },
    /// Accept a quest.
    AcceptQuest {
        /// The quest.
        quest_id: QuestId,
    },
    /// Claim a completed quest's reward.
    ClaimReward {
        /// The quest.
        quest_id: QuestId,
    },
    /// Fail the sender's overdue quest.
    ExpireQuest {
        /// The quest.
        quest_id: QuestId,
    },
}

impl Call {
    /// Snake-case name of the call, as on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateNpc { .. } => "create_npc",
            Self::SetNpcActive { .. } => "set_npc_active",
            Self::SetNpcDataPointer { .. } => "set_npc_data_pointer",
            Self::CreateQuest(_) => "create_quest",
            Self::SetQuestActive { .. } => "set_quest_active",
            Self::Interact { .. } => "interact",
            Self::AcceptQuest { .. } => "accept_quest",
            Self::ClaimReward { .. } => "claim_reward",
            Self::ExpireQuest { .. } => "expire_quest",
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A read. Queries never change state and never advance the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    /// Full NPC record.
    NpcState {
        /// The NPC.
        npc_id: NpcId,
    },
    /// Number of NPCs created.
    NpcCount,
    /// Relationship score of a pair.
    Relationship {
        /// The NPC.
        npc_id: NpcId,
        /// The player.
        player: Address,
    },
    /// An NPC's memories, oldest first.
    Memories {
        /// The NPC.
        npc_id: NpcId,
    },
    /// Whether the NPC accepts interactions.
    CanInteractWith {
        /// The NPC.
        npc_id: NpcId,
    },
    /// Preview a response without committing anything.
    MakeDecision {
        /// The NPC.
        npc_id: NpcId,
        /// Who acts.
        target: Address,
        /// What they do.
        action: Action,
        /// Action payload.
        #[serde(default)]
        context_value: u64,
    },
    /// An NPC's data pointer.
    NpcDataPointer {
        /// The NPC.
        npc_id: NpcId,
    },
    /// Interaction counters of a pair.
    InteractionStats {
        /// The NPC.
        npc_id: NpcId,
        /// The player.
        player: Address,
    },
    /// A quest definition.
    Quest {
        /// The quest.
        quest_id: QuestId,
    },
    /// Number of quests created.
    QuestCount,
    /// A player's record for one quest.
    PlayerQuestStatus {
        /// The player.
        player: Address,
        /// The quest.
        quest_id: QuestId,
    },
    /// Every quest a player has accepted.
    PlayerQuests {
        /// The player.
        player: Address,
    },
    /// A player's standing with a faction.
    FactionReputation {
        /// The player.
        player: Address,
        /// The faction.
        faction: Faction,
    },
    /// Tier of a player's standing with a faction.
    ReputationLevel {
        /// The player.
        player: Address,
        /// The faction.
        faction: Faction,
    },
    /// Rewards a player has received.
    Balance {
        /// The player.
        player: Address,
    },
    /// Tokens left in the treasury.
    TreasuryFloat,
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// What a successful call returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing beyond the events.
    Done,
    /// An NPC was created.
    NpcCreated {
        /// Assigned id.
        npc_id: NpcId,
    },
    /// A quest was created.
    QuestCreated {
        /// Assigned id.
        quest_id: QuestId,
    },
    /// An interaction was committed.
    Interaction(InteractionReceipt),
    /// A reward was paid.
    RewardClaimed(Reward),
    /// An expiry check ran.
    QuestExpired {
        /// Whether the quest was marked failed.
        failed: bool,
    },
}

/// Whether a transaction took effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    /// Committed.
    Success {
        /// What the call returned.
        outcome: Outcome,
    },
    /// Rejected with no state change.
    Reverted {
        /// Why.
        error: String,
    },
}

/// Result of one executed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique transaction id.
    pub tx_id: Uuid,
    /// Block the transaction was included in.
    pub block: u64,
    /// Block time.
    pub timestamp: Timestamp,
    /// Who sent it.
    pub sender: Address,
    /// Call name.
    pub call: String,
    /// Success or revert.
    pub status: TxStatus,
    /// Events committed, in order. Empty on revert.
    pub events: Vec<PersonaEvent>,
}

impl Receipt {
    /// Whether the call committed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, TxStatus::Success { .. })
    }

    /// The outcome of a committed call.
    #[must_use]
    pub const fn outcome(&self) -> Option<&Outcome> {
        match &self.status {
            TxStatus::Success { outcome } => Some(outcome),
            TxStatus::Reverted { .. } => None,
        }
    }

    /// The revert reason of a rejected call.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            TxStatus::Success { .. } => None,
            TxStatus::Reverted { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interact_defaults_fill_in() {
        let call: Call =
            serde_json::from_str(r#"{"call":"interact","npc_id":3,"action":"Help"}"#).expect("parse");
        assert_eq!(
            call,
            Call::Interact {
                npc_id: NpcId(3),
                action: Action::Help,
                target: None,
                value1: 0,
                value2: 0,
                memo: [0; 32],
            }
        );
        assert_eq!(call.name(), "interact");
    }

    #[test]
    fn interact_carries_its_memo() {
        let mut memo = [0u8; 32];
        memo[0] = 0xAB;
        memo[31] = 7;
        let call = Call::Interact {
            npc_id: NpcId(1),
            action: Action::Trade,
            target: None,
            value1: 25,
            value2: 0,
            memo,
        };
        let json = serde_json::to_value(&call).expect("serialize");
        assert_eq!(json["memo"][0], 0xAB);
        assert_eq!(json["memo"][31], 7);
        let back: Call = serde_json::from_value(json).expect("parse");
        assert_eq!(back, call);
    }

    #[test]
    fn create_quest_flattens_the_draft() {
        let call: Call = serde_json::from_str(
            r#"{"call":"create_quest","npc_id":0,"quest_type":"Trade","title":"Haggle","target_value":50,"reward_tokens":10}"#,
        )
        .expect("parse");
        let Call::CreateQuest(draft) = call else {
            panic!("wrong variant");
        };
        assert_eq!(draft.target_value, 50);
        assert_eq!(draft.reward_tokens, 10);
        assert_eq!(draft.duration_secs, 0);
    }

    #[test]
    fn unknown_calls_are_rejected() {
        assert!(serde_json::from_str::<Call>(r#"{"call":"mint","amount":1}"#).is_err());
    }

    #[test]
    fn reverted_receipt_accessors() {
        let receipt = Receipt {
            tx_id: Uuid::nil(),
            block: 1,
            timestamp: Timestamp(2),
            sender: Address::ZERO,
            call: "accept_quest".to_string(),
            status: TxStatus::Reverted {
                error: "Quest not found: quest#9".to_string(),
            },
            events: Vec::new(),
        };
        assert!(!receipt.is_success());
        assert!(receipt.outcome().is_none());
        assert_eq!(receipt.error(), Some("Quest not found: quest#9"));

        let json = serde_json::to_value(&receipt).expect("json");
        assert_eq!(json["status"]["status"], "reverted");
    }
}
