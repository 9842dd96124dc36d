//! Core type definitions for the Persona engine.
//!
//! Everything here is a plain value type: identifiers, the bounded integer
//! trait model, the closed action/personality/faction enums and the
//! immutable interaction value objects that flow between the engines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PersonaError, Result};

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Lowest value any personality trait can take.
pub const TRAIT_MIN: i32 = 0;
/// Highest value any personality trait can take.
pub const TRAIT_MAX: i32 = 1000;
/// Midpoint of the trait scale; decisions scale around it.
pub const TRAIT_MID: i32 = 500;
/// Lowest relationship score.
pub const RELATIONSHIP_MIN: i32 = -1000;
/// Highest relationship score.
pub const RELATIONSHIP_MAX: i32 = 1000;

/// Clamp a (possibly out-of-range) trait value into `[0, 1000]`.
#[must_use]
pub fn clamp_trait(value: i32) -> u16 {
    // Bounded by TRAIT_MAX, so the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = value.clamp(TRAIT_MIN, TRAIT_MAX) as u16;
    clamped
}

/// Clamp a relationship (or reputation) score into `[-1000, 1000]`.
#[must_use]
pub fn clamp_relationship(value: i32) -> i32 {
    value.clamp(RELATIONSHIP_MIN, RELATIONSHIP_MAX)
}

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Sequential identifier of an NPC, assigned from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NpcId(pub u64);

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "npc#{}", self.0)
    }
}

/// Sequential identifier of a quest, assigned from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestId(pub u64);

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quest#{}", self.0)
    }
}

/// A 20-byte account address: players, components and the deploying authority.
///
/// Rendered (and serialized) as a `0x`-prefixed lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0; 20]);

    /// Build an address whose low eight bytes hold `n` (big-endian).
    ///
    /// Handy for tests and for deriving deterministic component addresses.
    #[must_use]
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Whether this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        if hex.len() != 40 || !hex.is_ascii() {
            return Err(PersonaError::Serialization(format!(
                "invalid address {s:?}: expected 40 hex digits"
            )));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|e| {
                PersonaError::Serialization(format!("invalid address {s:?}: {e}"))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = PersonaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Host-supplied time in seconds since the Unix epoch.
///
/// The core never reads a clock; every mutating call carries one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Timestamp `secs` seconds after this one (saturating).
    #[must_use]
    pub fn plus_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

/// Who is calling, and when.
///
/// This is the host's implicit transaction sender made explicit and threaded
/// through every state-mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The identity making the call.
    pub caller: Address,
    /// Current host time.
    pub now: Timestamp,
}

impl CallContext {
    /// Create a call context.
    #[must_use]
    pub const fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }

    /// The same moment, seen from a different caller.
    #[must_use]
    pub const fn as_caller(&self, caller: Address) -> Self {
        Self {
            caller,
            now: self.now,
        }
    }
}

// ---------------------------------------------------------------------------
// Closed enums
// ---------------------------------------------------------------------------

/// Baseline temperament of an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Personality {
    /// Warm; favours greeting and helping back.
    Friendly,
    /// Mirrors whatever the player does.
    Neutral,
    /// Quick to defend or attack.
    Hostile,
    /// Guarded; flees or defends when threatened.
    Cautious,
}

impl Personality {
    /// Stable wire code (0..=3).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Friendly => 0,
            Self::Neutral => 1,
            Self::Hostile => 2,
            Self::Cautious => 3,
        }
    }

    /// Decode a wire code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Friendly),
            1 => Some(Self::Neutral),
            2 => Some(Self::Hostile),
            3 => Some(Self::Cautious),
            _ => None,
        }
    }
}

/// The faction an NPC belongs to. Quests and player reputation are per faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Faction {
    /// Town guard.
    Guard,
    /// Traders and shopkeepers.
    Merchant,
    /// Ordinary townsfolk.
    #[default]
    Villager,
    /// Village elders.
    Elder,
    /// Farmers.
    Farmer,
}

impl Faction {
    /// Every faction, in wire-code order.
    pub const ALL: [Self; 5] = [
        Self::Guard,
        Self::Merchant,
        Self::Villager,
        Self::Elder,
        Self::Farmer,
    ];

    /// Stable wire code (0..=4).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Guard => 0,
            Self::Merchant => 1,
            Self::Villager => 2,
            Self::Elder => 3,
            Self::Farmer => 4,
        }
    }

    /// Decode a wire code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Guard => "Guard",
            Self::Merchant => "Merchant",
            Self::Villager => "Villager",
            Self::Elder => "Elder",
            Self::Farmer => "Farmer",
        };
        f.write_str(name)
    }
}

/// Something a player can do to an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Say hello.
    Greet,
    /// Exchange goods; `value1` carries the trade value.
    Trade,
    /// Physical attack; `value1` carries the damage/severity.
    Attack,
    /// Lend a hand.
    Help,
    /// Taunt or insult without violence.
    Provoke,
}

impl Action {
    /// Every action, in wire-code order.
    pub const ALL: [Self; 5] = [
        Self::Greet,
        Self::Trade,
        Self::Attack,
        Self::Help,
        Self::Provoke,
    ];

    /// Stable wire code (0..=4).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Greet => 0,
            Self::Trade => 1,
            Self::Attack => 2,
            Self::Help => 3,
            Self::Provoke => 4,
        }
    }

    /// Decode a wire code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Whether this action belongs to the hostile class (Attack/Provoke).
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Attack | Self::Provoke)
    }

    /// Short lowercase label used in memory snippets and notes.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Greet => "greet",
            Self::Trade => "trade",
            Self::Attack => "attack",
            Self::Help => "help",
            Self::Provoke => "provoke",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Personality Traits
// ---------------------------------------------------------------------------

/// The three mutable personality traits. Each is held in `[0, 1000]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traits {
    /// How quickly the NPC learns from interactions.
    pub intelligence: u16,
    /// How readily the NPC answers hostility with hostility.
    pub aggression: u16,
    /// How warmly the NPC answers friendly overtures.
    pub sociability: u16,
}

impl Traits {
    /// Build a trait set, rejecting any value above 1000.
    ///
    /// # Errors
    /// Returns [`PersonaError::InvalidTrait`] naming the first offending trait.
    pub fn new(intelligence: u32, aggression: u32, sociability: u32) -> Result<Self> {
        Ok(Self {
            intelligence: checked_trait("intelligence", intelligence)?,
            aggression: checked_trait("aggression", aggression)?,
            sociability: checked_trait("sociability", sociability)?,
        })
    }

    /// Build a trait set from raw values, clamping each into range.
    #[must_use]
    pub fn clamped(intelligence: i32, aggression: i32, sociability: i32) -> Self {
        Self {
            intelligence: clamp_trait(intelligence),
            aggression: clamp_trait(aggression),
            sociability: clamp_trait(sociability),
        }
    }
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            intelligence: 500,
            aggression: 500,
            sociability: 500,
        }
    }
}

fn checked_trait(name: &'static str, value: u32) -> Result<u16> {
    u16::try_from(value)
        .ok()
        .filter(|v| i32::from(*v) <= TRAIT_MAX)
        .ok_or(PersonaError::InvalidTrait { name, value })
}

// ---------------------------------------------------------------------------
// Interaction value objects
// ---------------------------------------------------------------------------

/// A single player action against an NPC. Immutable, passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionContext {
    /// What the player did.
    pub action: Action,
    /// Who the action concerns (usually the player themself).
    pub target: Address,
    /// Action-specific payload: trade value, attack severity, ...
    pub value1: u64,
    /// Second action-specific payload.
    pub value2: u64,
    /// Opaque caller tag, carried through untouched.
    pub memo: [u8; 32],
}

impl InteractionContext {
    /// Context for `action` aimed at `target` with no payload.
    #[must_use]
    pub const fn new(action: Action, target: Address) -> Self {
        Self {
            action,
            target,
            value1: 0,
            value2: 0,
            memo: [0; 32],
        }
    }

    /// Attach the primary payload value.
    #[must_use]
    pub const fn with_value(mut self, value1: u64) -> Self {
        self.value1 = value1;
        self
    }
}

/// A compact, deterministic record of one interaction, kept in the NPC's memory ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnippet {
    /// What the player did.
    pub action: Action,
    /// Whether the interaction was classed as positive.
    pub positive: bool,
    /// Absolute relationship change caused by the interaction.
    pub magnitude: u16,
    /// The player involved.
    pub player: Address,
}

impl MemorySnippet {
    /// Four-byte encoding: `[action, sign, magnitude_hi, magnitude_lo]`.
    #[must_use]
    pub fn encode(&self) -> [u8; 4] {
        let [hi, lo] = self.magnitude.to_be_bytes();
        [self.action.code(), u8::from(self.positive), hi, lo]
    }
}

impl fmt::Display for MemorySnippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.positive { '+' } else { '-' };
        write!(f, "{sign}{}/{}", self.action, self.magnitude)
    }
}

/// The computed result of one interaction, applied atomically to the trait store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    /// Relationship score after the interaction.
    pub new_relationship_score: i32,
    /// Aggression after the interaction.
    pub new_aggression: u16,
    /// Sociability after the interaction.
    pub new_sociability: u16,
    /// Intelligence after the interaction.
    pub new_intelligence: u16,
    /// Memory ring entry describing the interaction.
    pub memory_snippet: MemorySnippet,
}

impl InteractionOutcome {
    /// The trait values this outcome writes.
    #[must_use]
    pub const fn traits(&self) -> Traits {
        Traits {
            intelligence: self.new_intelligence,
            aggression: self.new_aggression,
            sociability: self.new_sociability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_hex() {
        let addr = Address::from_low_u64(0xdead_beef);
        let text = addr.to_string();
        assert_eq!(text, "0x00000000000000000000000000000000deadbeef");
        assert_eq!(text.parse::<Address>().expect("parse"), addr);
    }

    #[test]
    fn address_rejects_bad_hex() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz00000000000000000000000000000000000000".parse::<Address>().is_err());
    }

    #[test]
    fn traits_reject_out_of_range() {
        assert!(Traits::new(1000, 0, 500).is_ok());
        let err = Traits::new(750, 1001, 200).expect_err("1001 is out of range");
        assert!(matches!(
            err,
            PersonaError::InvalidTrait { name: "aggression", value: 1001 }
        ));
    }

    #[test]
    fn clamped_traits_stay_in_range() {
        let t = Traits::clamped(-40, 1_500, 700);
        assert_eq!(t.intelligence, 0);
        assert_eq!(t.aggression, 1000);
        assert_eq!(t.sociability, 700);
    }

    #[test]
    fn wire_codes_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_code(action.code()), Some(action));
        }
        for faction in Faction::ALL {
            assert_eq!(Faction::from_code(faction.code()), Some(faction));
        }
        assert_eq!(Personality::from_code(2), Some(Personality::Hostile));
        assert_eq!(Personality::from_code(9), None);
    }

    #[test]
    fn snippet_renders_sign_action_and_magnitude() {
        let snippet = MemorySnippet {
            action: Action::Help,
            positive: true,
            magnitude: 38,
            player: Address::from_low_u64(7),
        };
        assert_eq!(snippet.to_string(), "+help/38");
        assert_eq!(snippet.encode(), [3, 1, 0, 38]);
    }
}
