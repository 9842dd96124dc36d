//! Decision engine: how an NPC responds to a player action.
//!
//! A deterministic mapping from (personality, traits, relationship, action)
//! to a [`Decision`]. Nothing here persists game state: the decision is
//! informational and never gates the interaction's outcome.
//!
//! Intensity is `base(action) + bias(personality) + (trait - 500) / 2`,
//! plus `relationship / 10` for friendly actions, clamped to `[0, 1000]`.
//! The trait is sociability for friendly actions and aggression for hostile
//! ones, so intensity is monotonic in that trait.
//!
//! The engine also keeps the per-NPC [`DataPointer`] registry: an opaque
//! 32-byte reference to off-ledger content (portraits, dialogue packs).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PersonaError, Result};
use crate::events::{EventLog, PersonaEvent};
use crate::npc::{NpcRecord, NpcRegistry};
use crate::types::{
    Action, Address, CallContext, NpcId, Personality, TRAIT_MAX, TRAIT_MID,
};

/// How an NPC answers an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseType {
    /// Returns the greeting.
    Greet,
    /// Opens for trade.
    Trade,
    /// Offers help.
    Help,
    /// Does nothing.
    Ignore,
    /// Braces or blocks.
    Defend,
    /// Strikes back.
    Attack,
    /// Runs away.
    Flee,
}

impl ResponseType {
    /// Whether this response is hostile toward the player.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Attack | Self::Defend)
    }

    /// Short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Greet => "greet",
            Self::Trade => "trade",
            Self::Help => "help",
            Self::Ignore => "ignore",
            Self::Defend => "defend",
            Self::Attack => "attack",
            Self::Flee => "flee",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A computed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// What the NPC does.
    pub response: ResponseType,
    /// How strongly, in `[0, 1000]`.
    pub intensity: u16,
    /// Human-readable summary.
    pub note: String,
    /// The caller's context value, echoed back.
    pub context_value: u64,
}

/// Opaque 32-byte reference to an NPC's off-ledger data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataPointer(pub [u8; 32]);

impl fmt::Display for DataPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Base intensity of the response an action provokes.
const fn base_intensity(action: Action) -> i32 {
    match action {
        Action::Greet => 300,
        Action::Trade => 400,
        Action::Help => 600,
        Action::Provoke => 450,
        Action::Attack => 700,
    }
}

/// Personality bias on intensity for friendly (`false`) or hostile (`true`) actions.
const fn personality_bias(personality: Personality, hostile: bool) -> i32 {
    match (personality, hostile) {
        (Personality::Friendly, false) => 100,
        (Personality::Friendly, true) => -100,
        (Personality::Neutral, _) => 0,
        (Personality::Hostile, false) => -100,
        (Personality::Hostile, true) => 150,
        (Personality::Cautious, false) => -50,
        (Personality::Cautious, true) => 50,
    }
}

/// Pick the response type.
fn select_response(npc: &NpcRecord, relationship: i32, action: Action) -> ResponseType {
    let aggression = i32::from(npc.traits.aggression);
    let sociability = i32::from(npc.traits.sociability);
    match npc.personality {
        Personality::Friendly => match action {
            Action::Greet => ResponseType::Greet,
            Action::Trade => ResponseType::Trade,
            Action::Help => ResponseType::Help,
            Action::Provoke if aggression > 700 => ResponseType::Defend,
            Action::Provoke => ResponseType::Greet,
            Action::Attack => ResponseType::Defend,
        },
        Personality::Hostile => match action {
            Action::Greet if sociability >= TRAIT_MID => ResponseType::Greet,
            Action::Greet | Action::Help => ResponseType::Ignore,
            Action::Trade if relationship > 0 => ResponseType::Trade,
            Action::Trade => ResponseType::Ignore,
            Action::Provoke => ResponseType::Attack,
            Action::Attack if aggression >= TRAIT_MID => ResponseType::Attack,
            Action::Attack => ResponseType::Defend,
        },
        Personality::Neutral => match action {
            Action::Greet => ResponseType::Greet,
            Action::Trade => ResponseType::Trade,
            Action::Help => ResponseType::Help,
            Action::Provoke => ResponseType::Defend,
            Action::Attack => ResponseType::Attack,
        },
        Personality::Cautious => match action {
            Action::Greet | Action::Help if relationship >= 0 => ResponseType::Greet,
            Action::Trade if relationship >= 0 => ResponseType::Trade,
            Action::Greet | Action::Help | Action::Trade => ResponseType::Ignore,
            Action::Provoke if aggression < TRAIT_MID => ResponseType::Ignore,
            Action::Attack if aggression < TRAIT_MID => ResponseType::Flee,
            Action::Provoke | Action::Attack => ResponseType::Defend,
        },
    }
}

/// Decide how `npc` answers `action` from a player it holds `relationship` with.
///
/// Pure: identical inputs always produce identical output.
#[must_use]
pub fn decide(npc: &NpcRecord, relationship: i32, action: Action, context_value: u64) -> Decision {
    let hostile = action.is_hostile();
    let trait_value = if hostile {
        i32::from(npc.traits.aggression)
    } else {
        i32::from(npc.traits.sociability)
    };
    let mut raw = base_intensity(action)
        + personality_bias(npc.personality, hostile)
        + (trait_value - TRAIT_MID) / 2;
    if !hostile {
        raw += relationship / 10;
    }
    // Clamped into [0, 1000], so the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let intensity = raw.clamp(0, TRAIT_MAX) as u16;

    let response = select_response(npc, relationship, action);
    Decision {
        response,
        intensity,
        note: format!(
            "{} answers {action} with {response} ({intensity})",
            npc.name
        ),
        context_value,
    }
}

// ---------------------------------------------------------------------------
// DecisionEngine
// ---------------------------------------------------------------------------

/// The decision engine component.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    address: Address,
    authority: Address,
    npc_core: Address,
    data_pointers: BTreeMap<NpcId, DataPointer>,
    events: EventLog,
}

impl DecisionEngine {
    /// Create an engine at `address` reading from the NPC core at `npc_core`.
    #[must_use]
    pub fn new(address: Address, authority: Address, npc_core: Address) -> Self {
        Self {
            address,
            authority,
            npc_core,
            data_pointers: BTreeMap::new(),
            events: EventLog::default(),
        }
    }

    /// This engine's own address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The NPC core this engine reads from.
    #[must_use]
    pub const fn npc_core(&self) -> Address {
        self.npc_core
    }

    /// Decide how an NPC responds to `action` from `target`.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] if `registry` is not this engine's NPC
    /// core; [`PersonaError::NpcNotFound`] for an unknown NPC.
    pub fn make_decision(
        &self,
        registry: &NpcRegistry,
        npc_id: NpcId,
        target: Address,
        action: Action,
        context_value: u64,
    ) -> Result<Decision> {
        if registry.address() != self.npc_core {
            return Err(PersonaError::Unauthorized {
                caller: registry.address(),
                operation: "serve traits to this decision engine",
            });
        }
        let npc = registry.npc_state(npc_id)?;
        let decision = decide(npc, registry.relationship(npc_id, target), action, context_value);
        debug!(
            npc = %npc_id,
            target = %target,
            %action,
            response = %decision.response,
            intensity = decision.intensity,
            "Decision made"
        );
        Ok(decision)
    }

    /// Attach an off-ledger data pointer to an NPC.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] unless called by the authority;
    /// [`PersonaError::NpcNotFound`] if the NPC does not exist.
    pub fn set_npc_data_pointer(
        &mut self,
        ctx: &CallContext,
        registry: &NpcRegistry,
        npc_id: NpcId,
        pointer: DataPointer,
    ) -> Result<()> {
        if ctx.caller != self.authority {
            return Err(PersonaError::Unauthorized {
                caller: ctx.caller,
                operation: "set NPC data pointers",
            });
        }
        registry.npc_state(npc_id)?;
        self.data_pointers.insert(npc_id, pointer);
        info!(npc = %npc_id, %pointer, "NPC data pointer set");
        self.events
            .emit(PersonaEvent::DataPointerSet { npc_id, pointer });
        Ok(())
    }

    /// The NPC's data pointer, if one was set.
    #[must_use]
    pub fn npc_data_pointer(&self, npc_id: NpcId) -> Option<DataPointer> {
        self.data_pointers.get(&npc_id).copied()
    }

    /// Every data pointer, by NPC id.
    pub fn data_pointers(&self) -> impl Iterator<Item = (NpcId, DataPointer)> + '_ {
        self.data_pointers.iter().map(|(&id, &p)| (id, p))
    }

    /// Replace the data-pointer registry (snapshot restore).
    pub fn restore_data_pointers(&mut self, pointers: impl IntoIterator<Item = (NpcId, DataPointer)>) {
        self.data_pointers = pointers.into_iter().collect();
    }

    /// Take the events journaled since the last drain.
    pub fn drain_events(&mut self) -> Vec<PersonaEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Faction, Timestamp, Traits};

    fn npc(personality: Personality, aggression: u16, sociability: u16) -> NpcRecord {
        NpcRecord {
            id: NpcId(0),
            name: "Tester".to_string(),
            personality,
            faction: Faction::Villager,
            traits: Traits {
                intelligence: 500,
                aggression,
                sociability,
            },
            experience_points: 0,
            last_interaction: Timestamp(0),
            is_active: true,
        }
    }

    #[test]
    fn friendly_favours_greet_and_help() {
        let n = npc(Personality::Friendly, 200, 700);
        assert_eq!(decide(&n, 0, Action::Greet, 0).response, ResponseType::Greet);
        assert_eq!(decide(&n, 0, Action::Help, 0).response, ResponseType::Help);
        assert_eq!(decide(&n, 0, Action::Provoke, 0).response, ResponseType::Greet);
    }

    #[test]
    fn hostile_favours_attack_and_defend() {
        let n = npc(Personality::Hostile, 800, 200);
        assert_eq!(decide(&n, 0, Action::Attack, 0).response, ResponseType::Attack);
        assert_eq!(decide(&n, 0, Action::Provoke, 0).response, ResponseType::Attack);
        assert_eq!(decide(&n, 0, Action::Greet, 0).response, ResponseType::Ignore);

        let mild = npc(Personality::Hostile, 300, 200);
        assert_eq!(decide(&mild, 0, Action::Attack, 0).response, ResponseType::Defend);
    }

    #[test]
    fn neutral_mirrors() {
        let n = npc(Personality::Neutral, 500, 500);
        assert_eq!(decide(&n, 0, Action::Trade, 0).response, ResponseType::Trade);
        assert_eq!(decide(&n, 0, Action::Attack, 0).response, ResponseType::Attack);
    }

    #[test]
    fn cautious_flees_when_timid() {
        let timid = npc(Personality::Cautious, 100, 500);
        assert_eq!(decide(&timid, 0, Action::Attack, 0).response, ResponseType::Flee);
        let brave = npc(Personality::Cautious, 900, 500);
        assert_eq!(decide(&brave, 0, Action::Attack, 0).response, ResponseType::Defend);
        assert_eq!(decide(&brave, -10, Action::Trade, 0).response, ResponseType::Ignore);
    }

    #[test]
    fn intensity_follows_formula() {
        let n = npc(Personality::Neutral, 500, 700);
        // 300 + 0 + (700 - 500) / 2 + 100 / 10
        assert_eq!(decide(&n, 100, Action::Greet, 0).intensity, 410);
        let hostile = npc(Personality::Hostile, 1000, 0);
        // 700 + 150 + 250, clamped
        assert_eq!(decide(&hostile, 0, Action::Attack, 0).intensity, 1000);
    }

    #[test]
    fn intensity_is_monotonic_in_trait() {
        let mut last = 0;
        for aggression in (0..=1000).step_by(50) {
            let d = decide(&npc(Personality::Hostile, aggression, 500), 0, Action::Attack, 0);
            assert!(d.intensity >= last);
            last = d.intensity;
        }
    }

    #[test]
    fn decisions_are_deterministic() {
        let n = npc(Personality::Cautious, 420, 610);
        let a = decide(&n, -30, Action::Provoke, 7);
        let b = decide(&n, -30, Action::Provoke, 7);
        assert_eq!(a, b);
        assert_eq!(a.context_value, 7);
    }

    #[test]
    fn data_pointer_is_authority_only() {
        use crate::config::MemoryConfig;

        let authority = Address::from_low_u64(1);
        let mut registry = NpcRegistry::new(Address::from_low_u64(10), authority, &MemoryConfig::default());
        let ctx = CallContext::new(authority, Timestamp(0));
        let id = registry
            .create_npc(&ctx, "Painted", Personality::Friendly, Traits::default())
            .expect("create");

        let mut engine = DecisionEngine::new(Address::from_low_u64(12), authority, registry.address());
        let pointer = DataPointer([7; 32]);

        let err = engine
            .set_npc_data_pointer(&ctx.as_caller(Address::from_low_u64(100)), &registry, id, pointer)
            .expect_err("players cannot set pointers");
        assert!(matches!(err, PersonaError::Unauthorized { .. }));
        assert!(engine.npc_data_pointer(id).is_none());

        engine
            .set_npc_data_pointer(&ctx, &registry, id, pointer)
            .expect("authority sets pointer");
        assert_eq!(engine.npc_data_pointer(id), Some(pointer));
        assert_eq!(engine.drain_events().len(), 1);

        let missing = engine
            .set_npc_data_pointer(&ctx, &registry, NpcId(9), pointer)
            .expect_err("unknown NPC");
        assert!(missing.is_not_found());
    }
}
