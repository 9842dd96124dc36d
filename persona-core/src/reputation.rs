//! Faction reputation tiers.
//!
//! A player's standing with each faction is an integer in `[-1000, 1000]`
//! held by the quest system. Claiming a reward raises it; quests may require
//! a minimum before they can be accepted. The tiers below are what the
//! presentation layer shows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tier a reputation score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReputationLevel {
    /// Score ≤ -750: attacked on sight.
    Hostile,
    /// Score in (-750, -250]: distrusted.
    Unfriendly,
    /// Score in (-250, 250): unknown.
    Neutral,
    /// Score in [250, 750): welcome.
    Friendly,
    /// Score ≥ 750: honoured.
    Respected,
}

impl ReputationLevel {
    /// Classify a score into a tier.
    #[must_use]
    pub const fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=-750 => Self::Hostile,
            -749..=-250 => Self::Unfriendly,
            -249..=249 => Self::Neutral,
            250..=749 => Self::Friendly,
            _ => Self::Respected,
        }
    }

    /// Lowest score in this tier.
    #[must_use]
    pub const fn threshold(self) -> i32 {
        match self {
            Self::Hostile => -1000,
            Self::Unfriendly => -749,
            Self::Neutral => -249,
            Self::Friendly => 250,
            Self::Respected => 750,
        }
    }
}

impl fmt::Display for ReputationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hostile => "Hostile",
            Self::Unfriendly => "Unfriendly",
            Self::Neutral => "Neutral",
            Self::Friendly => "Friendly",
            Self::Respected => "Respected",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(ReputationLevel::from_score(-1000), ReputationLevel::Hostile);
        assert_eq!(ReputationLevel::from_score(-750), ReputationLevel::Hostile);
        assert_eq!(ReputationLevel::from_score(-749), ReputationLevel::Unfriendly);
        assert_eq!(ReputationLevel::from_score(-250), ReputationLevel::Unfriendly);
        assert_eq!(ReputationLevel::from_score(0), ReputationLevel::Neutral);
        assert_eq!(ReputationLevel::from_score(250), ReputationLevel::Friendly);
        assert_eq!(ReputationLevel::from_score(750), ReputationLevel::Respected);
    }

    #[test]
    fn thresholds_classify_into_their_own_tier() {
        for level in [
            ReputationLevel::Hostile,
            ReputationLevel::Unfriendly,
            ReputationLevel::Neutral,
            ReputationLevel::Friendly,
            ReputationLevel::Respected,
        ] {
            assert_eq!(ReputationLevel::from_score(level.threshold()), level);
        }
    }
}
