//! Property-Based Tests for Persona Core
//!
//! Uses `proptest` to check the engine's invariants under random inputs:
//! bounded traits and relationships, a total classification table, and
//! deterministic decisions and outcomes.

use proptest::prelude::*;

use persona_core::config::{LearningConfig, MemoryConfig, PersonaConfig};
use persona_core::decision::decide;
use persona_core::learning::{compute_outcome, is_interaction_positive};
use persona_core::memory::MemoryRing;
use persona_core::npc::NpcRecord;
use persona_core::{
    clamp_relationship, clamp_trait, Action, Address, CallContext, Faction, InteractionContext,
    MemorySnippet, NpcId, PersonaSystem, Personality, Timestamp, Traits,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_traits() -> impl Strategy<Value = Traits> {
    (0u16..=1000, 0u16..=1000, 0u16..=1000).prop_map(|(i, a, s)| Traits {
        intelligence: i,
        aggression: a,
        sociability: s,
    })
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop::sample::select(Action::ALL.to_vec())
}

fn arb_personality() -> impl Strategy<Value = Personality> {
    prop::sample::select(vec![
        Personality::Friendly,
        Personality::Neutral,
        Personality::Hostile,
        Personality::Cautious,
    ])
}

fn arb_context() -> impl Strategy<Value = InteractionContext> {
    (arb_action(), any::<u64>(), any::<u64>()).prop_map(|(action, v1, v2)| InteractionContext {
        action,
        target: Address::from_low_u64(7),
        value1: v1,
        value2: v2,
        memo: [0; 32],
    })
}

/// Any tuning at all, including values `PersonaConfig::from_toml` would reject.
fn arb_learning_config() -> impl Strategy<Value = LearningConfig> {
    (
        (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()),
        (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()),
        (any::<u64>(), any::<u64>()),
    )
        .prop_map(|(positive, negative, caps)| LearningConfig {
            max_trait_delta: positive.0,
            help_weight: positive.1,
            greet_weight: positive.2,
            trade_weight: positive.3,
            sparring_weight: positive.4,
            attack_penalty: negative.0,
            provoke_penalty: negative.1,
            trade_penalty: negative.2,
            snub_penalty: negative.3,
            trade_value_cap: caps.0,
            severity_cap: caps.1,
        })
}

fn record(personality: Personality, traits: Traits) -> NpcRecord {
    NpcRecord {
        id: NpcId(0),
        name: "Prop".to_string(),
        personality,
        faction: Faction::Villager,
        traits,
        experience_points: 0,
        last_interaction: Timestamp(0),
        is_active: true,
    }
}

// ---------------------------------------------------------------------------
// Clamping
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn trait_clamp_stays_in_range(v in -5_000i32..5_000, d in -5_000i32..5_000) {
        let c = clamp_trait(v + d);
        prop_assert!(c <= 1000);
    }

    #[test]
    fn relationship_clamp_stays_in_range(v in any::<i32>()) {
        let c = clamp_relationship(v);
        prop_assert!((-1000..=1000).contains(&c));
    }
}

// ---------------------------------------------------------------------------
// Learning engine
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn outcomes_stay_in_bounds(
        traits in arb_traits(),
        rel in -1000i32..=1000,
        ctx in arb_context(),
    ) {
        let positive = is_interaction_positive(&ctx);
        let out = compute_outcome(&LearningConfig::default(), traits, rel, &ctx, Address::ZERO, positive);
        prop_assert!(out.new_intelligence <= 1000);
        prop_assert!(out.new_aggression <= 1000);
        prop_assert!(out.new_sociability <= 1000);
        prop_assert!((-1000..=1000).contains(&out.new_relationship_score));
        prop_assert_eq!(
            u32::from(out.memory_snippet.magnitude),
            out.new_relationship_score.abs_diff(rel)
        );
    }

    #[test]
    fn positive_outcomes_never_lower_growth_traits(
        traits in arb_traits(),
        rel in -1000i32..=1000,
        ctx in arb_context(),
    ) {
        let out = compute_outcome(&LearningConfig::default(), traits, rel, &ctx, Address::ZERO, true);
        prop_assert!(out.new_intelligence >= traits.intelligence);
        prop_assert!(out.new_sociability >= traits.sociability);
        prop_assert!(out.new_relationship_score >= rel);
    }

    #[test]
    fn negative_outcomes_never_lower_aggression(
        traits in arb_traits(),
        rel in -1000i32..=1000,
        ctx in arb_context(),
    ) {
        let out = compute_outcome(&LearningConfig::default(), traits, rel, &ctx, Address::ZERO, false);
        prop_assert!(out.new_aggression >= traits.aggression);
        prop_assert_eq!(out.new_intelligence, traits.intelligence);
        prop_assert!(out.new_relationship_score <= rel);
    }

    #[test]
    fn outcomes_are_pure(traits in arb_traits(), rel in -1000i32..=1000, ctx in arb_context()) {
        let config = LearningConfig::default();
        let a = compute_outcome(&config, traits, rel, &ctx, Address::ZERO, true);
        let b = compute_outcome(&config, traits, rel, &ctx, Address::ZERO, true);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn any_tuning_stays_in_bounds(
        config in arb_learning_config(),
        traits in arb_traits(),
        rel in -1000i32..=1000,
        ctx in arb_context(),
        positive in any::<bool>(),
    ) {
        let out = compute_outcome(&config, traits, rel, &ctx, Address::ZERO, positive);
        prop_assert!(out.new_intelligence <= 1000);
        prop_assert!(out.new_aggression <= 1000);
        prop_assert!(out.new_sociability <= 1000);
        prop_assert!((-1000..=1000).contains(&out.new_relationship_score));
        if positive {
            prop_assert!(out.new_relationship_score >= rel);
        } else {
            prop_assert!(out.new_relationship_score <= rel);
        }
    }

    #[test]
    fn classification_is_total(ctx in arb_context()) {
        let expected = !matches!(ctx.action, Action::Attack | Action::Provoke);
        prop_assert_eq!(is_interaction_positive(&ctx), expected);
    }
}

// ---------------------------------------------------------------------------
// Decision engine
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn decisions_are_deterministic_and_bounded(
        personality in arb_personality(),
        traits in arb_traits(),
        rel in -1000i32..=1000,
        action in arb_action(),
        value in any::<u64>(),
    ) {
        let npc = record(personality, traits);
        let a = decide(&npc, rel, action, value);
        let b = decide(&npc, rel, action, value);
        prop_assert!(a.intensity <= 1000);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn intensity_is_monotonic_in_the_relevant_trait(
        personality in arb_personality(),
        traits in arb_traits(),
        bump in 0u16..=1000,
        rel in -1000i32..=1000,
        action in arb_action(),
    ) {
        let mut higher = traits;
        if action.is_hostile() {
            higher.aggression = traits.aggression.saturating_add(bump).min(1000);
        } else {
            higher.sociability = traits.sociability.saturating_add(bump).min(1000);
        }
        let low = decide(&record(personality, traits), rel, action, 0);
        let high = decide(&record(personality, higher), rel, action, 0);
        prop_assert!(high.intensity >= low.intensity);
    }
}

// ---------------------------------------------------------------------------
// Memory ring and full-system determinism
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn memory_ring_keeps_the_newest(cap in 1usize..16, n in 0u16..64) {
        let mut ring = MemoryRing::with_capacity(cap);
        for m in 0..n {
            ring.push(MemorySnippet { action: Action::Greet, positive: true, magnitude: m, player: Address::ZERO });
        }
        prop_assert!(ring.len() <= cap);
        let expected: Vec<u16> = (n.saturating_sub(u16::try_from(cap).unwrap_or(u16::MAX))..n).collect();
        let got: Vec<u16> = ring.iter().map(|s| s.magnitude).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn same_call_sequence_yields_same_world(
        traits in arb_traits(),
        personality in arb_personality(),
        contexts in prop::collection::vec(arb_context(), 1..20),
    ) {
        let run = || {
            let authority = Address::from_low_u64(1);
            let player = Address::from_low_u64(2);
            let config = PersonaConfig { memory: MemoryConfig { ring_capacity: 8 }, ..PersonaConfig::default() };
            let mut system = PersonaSystem::deploy(authority, config).expect("deploy");
            let npc = system
                .create_npc(&CallContext::new(authority, Timestamp(0)), "Twin", personality, traits)
                .expect("create");
            for (t, ctx) in (1u64..).zip(contexts.iter()) {
                system.interact(&CallContext::new(player, Timestamp(t)), npc, *ctx).expect("interact");
            }
            system.snapshot()
        };
        prop_assert_eq!(run(), run());
    }
}
