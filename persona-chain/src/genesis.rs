//! Initial world contents.
//!
//! A genesis file names the deploying authority, funds the reward treasury
//! and lists the NPCs and quests that exist at block zero:
//!
//! ```toml
//! authority = "0x0000000000000000000000000000000000000001"
//! treasury = 10000
//!
//! [[npcs]]
//! name = "Guard John"
//! personality = "Hostile"
//! faction = "Guard"
//! traits = { intelligence = 750, aggression = 800, sociability = 200 }
//!
//! [[quests]]
//! npc_id = 0
//! quest_type = "Combat"
//! title = "Spar with the guard"
//! target_value = 3
//! reward_tokens = 100
//! ```
//!
//! Entries are applied in file order, so NPC ids follow their position in
//! `npcs` and quests may refer to them.

use std::path::Path;

use persona_core::quest::{QuestDraft, QuestType};
use persona_core::rewards::Treasury;
use persona_core::{Address, CallContext, Faction, NpcId, PersonaSystem, Personality, Traits};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ChainError, Result};

/// One NPC present at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisNpc {
    /// Display name.
    pub name: String,
    /// Baseline temperament.
    pub personality: Personality,
    /// Owning faction.
    #[serde(default)]
    pub faction: Faction,
    /// Initial traits.
    pub traits: Traits,
}

/// World contents at block zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Deploying authority.
    pub authority: Address,
    /// Tokens placed in the reward treasury.
    #[serde(default)]
    pub treasury: u64,
    /// NPCs, in id order.
    #[serde(default)]
    pub npcs: Vec<GenesisNpc>,
    /// Quests, in id order.
    #[serde(default)]
    pub quests: Vec<QuestDraft>,
}

impl Genesis {
    /// Load a genesis from a TOML string.
    ///
    /// # Errors
    /// Returns `ChainError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| ChainError::Config(e.to_string()))
    }

    /// Load a genesis from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// A small village: one NPC per faction and a starter quest for each
    /// of the first three.
    #[must_use]
    pub fn village(authority: Address) -> Self {
        Self {
            authority,
            treasury: 10_000,
            npcs: vec![
                npc("Guard John", Personality::Hostile, Faction::Guard, (750, 800, 200)),
                npc("Merchant Mira", Personality::Friendly, Faction::Merchant, (700, 150, 800)),
                npc("Villager Tom", Personality::Neutral, Faction::Villager, (500, 300, 600)),
                npc("Elder Rowan", Personality::Cautious, Faction::Elder, (900, 100, 400)),
                npc("Farmer Ada", Personality::Friendly, Faction::Farmer, (400, 200, 700)),
            ],
            quests: vec![
                QuestDraft::new(NpcId(0), QuestType::Combat, "Spar with the guard", 3)
                    .with_description("Prove yourself against the town guard.")
                    .with_reward(100, 50),
                QuestDraft::new(NpcId(1), QuestType::Trade, "Open an account", 100)
                    .with_description("Trade goods worth 100 with the merchant.")
                    .with_reward(150, 25),
                QuestDraft::new(NpcId(2), QuestType::Assist, "Lend a hand", 2)
                    .with_description("Help the villager twice.")
                    .with_reward(50, 100),
            ],
        }
    }

    /// Seed `system`: fund the treasury, then create every NPC and quest as
    /// the authority at `ctx.now`. Only [`crate::Chain::from_genesis`] calls
    /// this, and it discards the whole chain on failure.
    ///
    /// # Errors
    /// Returns `ChainError::Genesis` naming the first entry the engine
    /// rejects.
    pub(crate) fn apply(&self, system: &mut PersonaSystem<Treasury>, ctx: &CallContext) -> Result<()> {
        let ctx = ctx.as_caller(self.authority);
        system.ledger_mut().fund(self.treasury);

        for (index, npc) in self.npcs.iter().enumerate() {
            system
                .create_npc_in_faction(&ctx, &npc.name, npc.personality, npc.faction, npc.traits)
                .map_err(|e| ChainError::Genesis(format!("npcs[{index}] {:?}: {e}", npc.name)))?;
        }
        for (index, quest) in self.quests.iter().enumerate() {
            system
                .create_quest(&ctx, quest.clone())
                .map_err(|e| ChainError::Genesis(format!("quests[{index}] {:?}: {e}", quest.title)))?;
        }

        info!(
            npcs = self.npcs.len(),
            quests = self.quests.len(),
            treasury = self.treasury,
            "Genesis applied"
        );
        Ok(())
    }
}

fn npc(name: &str, personality: Personality, faction: Faction, traits: (u16, u16, u16)) -> GenesisNpc {
    let (intelligence, aggression, sociability) = traits;
    GenesisNpc {
        name: name.to_string(),
        personality,
        faction,
        traits: Traits {
            intelligence,
            aggression,
            sociability,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{PersonaConfig, Timestamp};

    #[test]
    fn parses_the_documented_example() {
        let genesis = Genesis::from_toml(
            r#"
            authority = "0x0000000000000000000000000000000000000001"
            treasury = 10000

            [[npcs]]
            name = "Guard John"
            personality = "Hostile"
            faction = "Guard"
            traits = { intelligence = 750, aggression = 800, sociability = 200 }

            [[quests]]
            npc_id = 0
            quest_type = "Combat"
            title = "Spar with the guard"
            target_value = 3
            reward_tokens = 100
            "#,
        )
        .expect("parse");
        assert_eq!(genesis.authority, Address::from_low_u64(1));
        assert_eq!(genesis.npcs[0].traits.aggression, 800);
        assert_eq!(genesis.quests[0].npc_id, NpcId(0));
        assert_eq!(genesis.quests[0].reward_xp, 0);
    }

    #[test]
    fn village_applies_cleanly() {
        let authority = Address::from_low_u64(1);
        let genesis = Genesis::village(authority);
        let mut system = PersonaSystem::deploy(authority, PersonaConfig::default()).expect("deploy");
        genesis
            .apply(&mut system, &CallContext::new(authority, Timestamp(0)))
            .expect("apply");
        assert_eq!(system.npc_count(), 5);
        assert_eq!(system.quest_count(), 3);
        assert_eq!(system.ledger().float(), 10_000);
        assert_eq!(system.npc_state(NpcId(3)).expect("elder").faction, Faction::Elder);
    }

    #[test]
    fn rejected_entries_are_named() {
        let authority = Address::from_low_u64(1);
        let mut genesis = Genesis::village(authority);
        genesis.npcs[1].traits.sociability = 1_001;
        let mut system = PersonaSystem::deploy(authority, PersonaConfig::default()).expect("deploy");
        let err = genesis
            .apply(&mut system, &CallContext::new(authority, Timestamp(0)))
            .expect_err("invalid trait");
        let ChainError::Genesis(message) = err else {
            panic!("expected a genesis error, got {err:?}");
        };
        assert!(message.starts_with("npcs[1]"), "{message}");
    }
}
