//! Learning / outcome engine.
//!
//! Turns one classified interaction into the NPC's next trait values, its
//! next relationship score with the player and a memory snippet. The engine
//! owns no game state: [`compute_outcome`] is a pure function, and
//! [`LearningEngine::calculate_interaction_outcome`] only adds the read of the
//! NPC's recorded traits and relationship from the trait store.
//!
//! ## Rules
//!
//! - Learning rate `r = 1 + intelligence/200 + max(relationship, 0)/250`,
//!   capped at `max_trait_delta`.
//! - Growth toward the ceiling has diminishing returns:
//!   `max(1, rate * headroom / 1000)` while there is headroom, else 0.
//! - Positive: intelligence and sociability grow by `r`, aggression eases
//!   by `r / 2`, and the relationship rises by an action weight scaled by
//!   sociability (Help > Greet > Trade).
//! - Negative: aggression grows at a rate set by the action and its severity
//!   (`value1`), sociability loses half of that, and the relationship falls
//!   by an action weight scaled by aggression. Intelligence is untouched.

use tracing::debug;

use crate::config::LearningConfig;
use crate::error::{PersonaError, Result};
use crate::npc::NpcRegistry;
use crate::types::{
    clamp_relationship, Action, Address, InteractionContext, InteractionOutcome,
    MemorySnippet, NpcId, Traits, TRAIT_MAX, TRAIT_MID,
};

/// Classify an interaction. Fixed table over the action enum.
#[must_use]
pub const fn is_interaction_positive(context: &InteractionContext) -> bool {
    match context.action {
        Action::Greet | Action::Trade | Action::Help => true,
        Action::Attack | Action::Provoke => false,
    }
}

/// How fast an NPC absorbs a positive interaction.
#[must_use]
pub fn learning_rate(intelligence: u16, relationship: i32, max_delta: i32) -> i32 {
    let rate = 1 + i32::from(intelligence) / 200 + relationship.max(0) / 250;
    rate.clamp(1, max_delta.max(1))
}

/// Bounded growth of `current` toward the trait ceiling at `rate`.
#[must_use]
pub fn growth(current: u16, rate: i32) -> i32 {
    let headroom = TRAIT_MAX - i32::from(current);
    if headroom <= 0 || rate <= 0 {
        0
    } else {
        let step = i64::from(rate) * i64::from(headroom) / i64::from(TRAIT_MAX);
        saturate(step).max(1)
    }
}

/// Compute the outcome of one interaction from the NPC's current state.
///
/// Pure: identical inputs always produce identical outputs.
#[must_use]
pub fn compute_outcome(
    config: &LearningConfig,
    traits: Traits,
    relationship: i32,
    context: &InteractionContext,
    player: Address,
    positive: bool,
) -> InteractionOutcome {
    let intelligence = i32::from(traits.intelligence);
    let aggression = i32::from(traits.aggression);
    let sociability = i32::from(traits.sociability);

    let (next, rel_delta) = if positive {
        let rate = learning_rate(traits.intelligence, relationship, config.max_trait_delta);
        let next = Traits::clamped(
            intelligence + growth(traits.intelligence, rate),
            aggression - rate / 2,
            sociability + growth(traits.sociability, rate),
        );
        let weight = positive_weight(config, context);
        (next, scaled(weight, sociability))
    } else {
        let severity = severity(config, context);
        let base: i32 = match context.action {
            Action::Attack => 5,
            Action::Provoke => 2,
            Action::Greet | Action::Trade | Action::Help => 1,
        };
        let rate = base
            .saturating_add(severity / 20)
            .min(config.max_trait_delta.max(1));
        let agg_delta = growth(traits.aggression, rate);
        let next = Traits::clamped(
            intelligence,
            aggression + agg_delta,
            sociability - agg_delta / 2,
        );
        let weight = negative_weight(config, context, severity);
        (next, -scaled(weight, aggression))
    };

    let new_relationship = clamp_relationship(relationship.saturating_add(rel_delta));
    let magnitude = u16::try_from(new_relationship.abs_diff(relationship)).unwrap_or(u16::MAX);

    InteractionOutcome {
        new_relationship_score: new_relationship,
        new_aggression: next.aggression,
        new_sociability: next.sociability,
        new_intelligence: next.intelligence,
        memory_snippet: MemorySnippet {
            action: context.action,
            positive,
            magnitude,
            player,
        },
    }
}

/// Relationship weight of a positive interaction.
fn positive_weight(config: &LearningConfig, context: &InteractionContext) -> i32 {
    match context.action {
        Action::Help => config.help_weight,
        Action::Greet => config.greet_weight,
        Action::Trade => {
            let value = context.value1.min(config.trade_value_cap);
            config
                .trade_weight
                .saturating_add(i32::try_from(value / 10).unwrap_or(i32::MAX))
        }
        Action::Attack | Action::Provoke => config.sparring_weight,
    }
}

/// Relationship weight of a negative interaction.
fn negative_weight(config: &LearningConfig, context: &InteractionContext, severity: i32) -> i32 {
    match context.action {
        Action::Attack => config.attack_penalty.saturating_add(severity / 2),
        Action::Provoke => config.provoke_penalty,
        Action::Trade => config.trade_penalty,
        Action::Greet | Action::Help => config.snub_penalty,
    }
}

fn severity(config: &LearningConfig, context: &InteractionContext) -> i32 {
    i32::try_from(context.value1.min(config.severity_cap)).unwrap_or(i32::MAX)
}

/// Scale a weight by a trait around the midpoint: `weight * (500 + trait) / 1000`, at least 1.
fn scaled(weight: i32, trait_value: i32) -> i32 {
    let weight = i64::from(weight.max(0));
    let factor = i64::from(TRAIT_MID) + i64::from(trait_value);
    saturate(weight * factor / i64::from(TRAIT_MAX)).max(1)
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

// ---------------------------------------------------------------------------
// LearningEngine
// ---------------------------------------------------------------------------

/// The learning engine component.
#[derive(Debug, Clone)]
pub struct LearningEngine {
    address: Address,
    npc_core: Address,
    config: LearningConfig,
}

impl LearningEngine {
    /// Create an engine deployed at `address`, reading from the NPC core at `npc_core`.
    #[must_use]
    pub fn new(address: Address, npc_core: Address, config: LearningConfig) -> Self {
        Self {
            address,
            npc_core,
            config,
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

    /// Active tuning.
    #[must_use]
    pub const fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Classify an interaction. See [`is_interaction_positive`].
    #[must_use]
    pub const fn is_interaction_positive(&self, context: &InteractionContext) -> bool {
        is_interaction_positive(context)
    }

    /// Outcome of `context` for the NPC's current recorded state.
    ///
    /// # Errors
    /// [`PersonaError::Unauthorized`] if `registry` is not the NPC core this
    /// engine was deployed against; [`PersonaError::NpcNotFound`] for an
    /// unknown NPC.
    pub fn calculate_interaction_outcome(
        &self,
        registry: &NpcRegistry,
        npc_id: NpcId,
        player: Address,
        context: &InteractionContext,
        was_positive: bool,
    ) -> Result<InteractionOutcome> {
        if registry.address() != self.npc_core {
            return Err(PersonaError::Unauthorized {
                caller: registry.address(),
                operation: "serve traits to this learning engine",
            });
        }
        let npc = registry.npc_state(npc_id)?;
        let relationship = registry.relationship(npc_id, player);
        let outcome = compute_outcome(
            &self.config,
            npc.traits,
            relationship,
            context,
            player,
            was_positive,
        );
        debug!(
            npc = %npc_id,
            player = %player,
            action = %context.action,
            positive = was_positive,
            relationship_before = relationship,
            relationship_after = outcome.new_relationship_score,
            "Interaction outcome calculated"
        );
        Ok(outcome)
    }
}
