//! Reward ledger: where claimed quest rewards go.
//!
//! The quest system never holds balances itself. A claim calls
//! [`RewardLedger::credit`] once, before any quest state changes; a credit
//! failure aborts the whole claim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PersonaError, Result};
use crate::types::Address;

/// Tokens and experience paid out by one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    /// Fungible tokens.
    pub tokens: u64,
    /// Experience points.
    pub xp: u64,
}

/// External fungible-balance collaborator.
pub trait RewardLedger {
    /// Credit `reward` to `player`.
    ///
    /// # Errors
    /// [`PersonaError::RewardTransfer`] if the ledger cannot pay.
    fn credit(&mut self, player: Address, reward: Reward) -> Result<()>;
}

/// A player's accumulated rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Tokens received.
    pub tokens: u64,
    /// Experience received.
    pub xp: u64,
}

/// In-process reward ledger with a finite token float.
///
/// Experience is unlimited; tokens come out of the float and a claim larger
/// than what remains is refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    float: u64,
    balances: BTreeMap<Address, Balance>,
}

impl Treasury {
    /// Treasury holding `float` tokens.
    #[must_use]
    pub fn new(float: u64) -> Self {
        Self {
            float,
            balances: BTreeMap::new(),
        }
    }

    /// Add tokens to the float.
    pub fn fund(&mut self, amount: u64) {
        self.float = self.float.saturating_add(amount);
    }

    /// Tokens left to pay out.
    #[must_use]
    pub const fn float(&self) -> u64 {
        self.float
    }

    /// What `player` has received so far.
    #[must_use]
    pub fn balance(&self, player: Address) -> Balance {
        self.balances.get(&player).copied().unwrap_or_default()
    }

    /// Every player with a balance, by address.
    pub fn balances(&self) -> impl Iterator<Item = (Address, Balance)> + '_ {
        self.balances.iter().map(|(&a, &b)| (a, b))
    }
}

impl RewardLedger for Treasury {
    fn credit(&mut self, player: Address, reward: Reward) -> Result<()> {
        if reward.tokens > self.float {
            return Err(PersonaError::RewardTransfer(format!(
                "treasury holds {} tokens, claim needs {}",
                self.float, reward.tokens
            )));
        }
        self.float -= reward.tokens;
        let balance = self.balances.entry(player).or_default();
        balance.tokens = balance.tokens.saturating_add(reward.tokens);
        balance.xp = balance.xp.saturating_add(reward.xp);
        debug!(
            player = %player,
            tokens = reward.tokens,
            xp = reward.xp,
            float = self.float,
            "Reward credited"
        );
        Ok(())
    }
}

impl<L: RewardLedger + ?Sized> RewardLedger for Box<L> {
    fn credit(&mut self, player: Address, reward: Reward) -> Result<()> {
        (**self).credit(player, reward)
    }
}
