//! Space effects.
//!
//! Every special space maps to one [`SpaceEffect`] in an [`EffectTable`].
//! Touch effects fire for each space a token passes over or stops on; land
//! effects fire once more for the space it stops on. New behavior is added by
//! registering a space against a variant, never by matching on space codes.

use crate::actions::{PendingAction, TaxKind};
use crate::board::SpaceId;
use crate::catalog::{Catalog, Deck};
use crate::game::{GameError, GameState};
use crate::jail;
use crate::property;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a special space does to the player who reaches it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceEffect {
    /// Credit the salary
    Salary,
    /// Send the player to jail
    GoToJail,
    /// Queue a percentage tax on net worth, capped
    IncomeTax,
    /// Queue a flat tax
    LuxuryTax,
    /// Draw the top card of a deck
    DrawCard(Deck),
}

/// Whether movement resolution may continue after an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    Continue,
    Jailed,
}

/// Space-to-effect dispatch tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectTable {
    #[serde(default)]
    pub on_touch: BTreeMap<SpaceId, SpaceEffect>,
    #[serde(default)]
    pub on_land: BTreeMap<SpaceId, SpaceEffect>,
}

impl EffectTable {
    /// Register a touch effect, returning any effect it replaces
    pub fn register_touch(&mut self, space: &str, effect: SpaceEffect) -> Option<SpaceEffect> {
        self.on_touch.insert(space.to_string(), effect)
    }

    /// Register a land effect, returning any effect it replaces
    pub fn register_land(&mut self, space: &str, effect: SpaceEffect) -> Option<SpaceEffect> {
        self.on_land.insert(space.to_string(), effect)
    }

    pub fn on_touch(&self, space: &str) -> Option<SpaceEffect> {
        self.on_touch.get(space).copied()
    }

    pub fn on_land(&self, space: &str) -> Option<SpaceEffect> {
        self.on_land.get(space).copied()
    }
}

impl SpaceEffect {
    /// Apply this effect to `player` on the working snapshot
    pub fn apply(
        self,
        catalog: &Catalog,
        state: &mut GameState,
        player: &str,
    ) -> Result<EffectOutcome, GameError> {
        let rules = &catalog.rules;

        match self {
            SpaceEffect::Salary => {
                state.player_mut(player)?.budget += rules.salary;
                property::refresh_total(catalog, state, player)?;
                state.message(format!("Passed start (+{}k)", rules.salary));
            }

            SpaceEffect::GoToJail => {
                jail::imprison(state, player)?;
                state.message("Go to jail!");
                return Ok(EffectOutcome::Jailed);
            }

            SpaceEffect::IncomeTax => {
                let worth = property::net_worth(catalog, state, player)?;
                let amount = (worth * rules.income_tax_percent / 100)
                    .min(rules.income_tax_cap)
                    .max(0);
                state.push(PendingAction::PayTax {
                    tax_type: TaxKind::Income,
                    amount,
                });
            }

            SpaceEffect::LuxuryTax => {
                state.push(PendingAction::PayTax {
                    tax_type: TaxKind::Luxury,
                    amount: rules.luxury_tax,
                });
            }

            SpaceEffect::DrawCard(deck) => {
                if let Some(card_id) = state.draw_card(deck) {
                    if let Some(card) = catalog.deck(deck).get(&card_id) {
                        let text = format!("{}: {}", card.title, card.content);
                        state.message(text);
                    }
                }
            }
        }

        Ok(EffectOutcome::Continue)
    }
}
