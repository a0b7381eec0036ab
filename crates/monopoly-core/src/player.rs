//! Player state.

use crate::board::SpaceId;
use crate::catalog::Money;
use serde::{Deserialize, Serialize};

/// Player identifier, usually the token color (e.g. "red")
pub type PlayerId = String;

/// Per-player portion of the game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Cash on hand; rent and taxes may drive it negative
    pub budget: Money,
    /// Current space
    pub at: SpaceId,
    /// Net worth: budget plus property valuation
    pub total: Money,
    #[serde(default)]
    pub in_jail: bool,
    #[serde(default)]
    pub jail_turns: u8,
}

impl PlayerState {
    /// A free player with no property, so `total == budget`
    pub fn new(budget: Money, at: SpaceId) -> Self {
        Self {
            budget,
            at,
            total: budget,
            in_jail: false,
            jail_turns: 0,
        }
    }

    pub fn can_afford(&self, cost: Money) -> bool {
        self.budget >= cost
    }
}
