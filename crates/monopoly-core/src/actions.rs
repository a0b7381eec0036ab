//! Pending actions and client actions.
//!
//! Pending actions form the queue the client must work through before the
//! turn can advance. Client actions are the requests that resolve them.

use crate::catalog::{Money, PropertyId};
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which tax a `pay_tax` action collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxKind {
    Income,
    Luxury,
}

impl TaxKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaxKind::Income => "Income tax",
            TaxKind::Luxury => "Luxury tax",
        }
    }
}

/// An item the client must resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PendingAction {
    /// Roll the dice to start the turn
    RollDice,
    /// Informational text to acknowledge
    ShowMessage { message: String },
    /// Offer to buy the unowned property just landed on
    BuyProperty {
        property_id: PropertyId,
        price: Money,
        buyable: bool,
    },
    /// Rent owed for landing on another player's property
    PayRent {
        property_id: PropertyId,
        owner: PlayerId,
        rent: Money,
        dice_sum: u8,
    },
    /// Tax owed for landing on a tax space
    PayTax { tax_type: TaxKind, amount: Money },
    /// Mandatory fine after the last failed escape roll
    PayJailFineForced { fine: Money, dice1: u8, dice2: u8 },
    /// Turn boundary; `next_player` is false when the mover rolls again
    EndTurn { next_player: bool },
}

/// Discriminant of [`PendingAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RollDice,
    ShowMessage,
    BuyProperty,
    PayRent,
    PayTax,
    PayJailFineForced,
    EndTurn,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::RollDice => "roll_dice",
            ActionKind::ShowMessage => "show_message",
            ActionKind::BuyProperty => "buy_property",
            ActionKind::PayRent => "pay_rent",
            ActionKind::PayTax => "pay_tax",
            ActionKind::PayJailFineForced => "pay_jail_fine_forced",
            ActionKind::EndTurn => "end_turn",
        };
        f.write_str(name)
    }
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PendingAction::RollDice => ActionKind::RollDice,
            PendingAction::ShowMessage { .. } => ActionKind::ShowMessage,
            PendingAction::BuyProperty { .. } => ActionKind::BuyProperty,
            PendingAction::PayRent { .. } => ActionKind::PayRent,
            PendingAction::PayTax { .. } => ActionKind::PayTax,
            PendingAction::PayJailFineForced { .. } => ActionKind::PayJailFineForced,
            PendingAction::EndTurn { .. } => ActionKind::EndTurn,
        }
    }

    /// Whether this action concerns the given property
    pub fn is_for_property(&self, id: &str) -> bool {
        match self {
            PendingAction::BuyProperty { property_id, .. }
            | PendingAction::PayRent { property_id, .. } => property_id == id,
            _ => false,
        }
    }
}

/// Everything a client can ask the engine to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameAction {
    /// Move with the given dice values
    RollDice { dice1: u8, dice2: u8 },
    /// Resolve the pending end of turn
    AdvanceTurn,
    /// Accept or decline the pending purchase offer
    BuyProperty { property_id: PropertyId, buy: bool },
    PayRent { property_id: PropertyId },
    PayTax,
    /// Pay the jail fine; dice are present for the forced pay-then-move path
    PayJailFine {
        #[serde(default)]
        dice1: Option<u8>,
        #[serde(default)]
        dice2: Option<u8>,
    },
    UpgradeProperty { property_id: PropertyId },
    DowngradeProperty { property_id: PropertyId },
    MortgageProperty { property_id: PropertyId },
    UnmortgageProperty { property_id: PropertyId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_pending_action_wire_shape() {
        let action = PendingAction::EndTurn { next_player: false };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": "end_turn", "data": { "next_player": false } })
        );

        let tax = PendingAction::PayTax {
            tax_type: TaxKind::Income,
            amount: 150,
        };
        assert_eq!(
            serde_json::to_value(&tax).unwrap(),
            json!({ "type": "pay_tax", "data": { "tax_type": "income", "amount": 150 } })
        );
    }

    #[test]
    fn test_roll_dice_without_data() {
        let action: PendingAction = serde_json::from_value(json!({ "type": "roll_dice" })).unwrap();
        assert_eq!(action, PendingAction::RollDice);
        assert_eq!(action.kind(), ActionKind::RollDice);
    }

    #[test]
    fn test_game_action_wire_shape() {
        let action: GameAction =
            serde_json::from_value(json!({ "type": "pay_jail_fine" })).unwrap();
        assert_eq!(
            action,
            GameAction::PayJailFine {
                dice1: None,
                dice2: None
            }
        );

        let action: GameAction = serde_json::from_value(
            json!({ "type": "buy_property", "property_id": "A1", "buy": true }),
        )
        .unwrap();
        assert_eq!(
            action,
            GameAction::BuyProperty {
                property_id: "A1".to_string(),
                buy: true
            }
        );
    }

    #[test]
    fn test_is_for_property() {
        let offer = PendingAction::BuyProperty {
            property_id: "B1".to_string(),
            price: 100,
            buyable: true,
        };
        assert!(offer.is_for_property("B1"));
        assert!(!offer.is_for_property("B2"));
        assert!(!PendingAction::RollDice.is_for_property("B1"));
        assert_eq!(ActionKind::PayJailFineForced.to_string(), "pay_jail_fine_forced");
    }
}
