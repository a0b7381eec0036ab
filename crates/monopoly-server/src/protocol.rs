//! WebSocket protocol messages for the Monopoly engine.
//!
//! Every request that acts on a game carries the complete prior state; the
//! reply carries the resulting state(s). The server remembers nothing.

use monopoly_core::{GameAction, GameState, PlayerId, PropertyId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a new game with players in turn order
    Init { players: Vec<PlayerId> },

    /// Roll for the current player
    MoveWithDice {
        state: GameState,
        dice1: u8,
        dice2: u8,
    },

    AdvanceTurn { state: GameState },

    BuyProperty {
        state: GameState,
        property_id: PropertyId,
        buy: bool,
    },

    PayRent {
        state: GameState,
        property_id: PropertyId,
    },

    PayTax { state: GameState },

    /// Dice are present only for the forced fine
    PayJailFine {
        state: GameState,
        #[serde(default)]
        dice1: Option<u8>,
        #[serde(default)]
        dice2: Option<u8>,
    },

    UpgradeProperty {
        state: GameState,
        property_id: PropertyId,
    },

    DowngradeProperty {
        state: GameState,
        property_id: PropertyId,
    },

    MortgageProperty {
        state: GameState,
        property_id: PropertyId,
    },

    UnmortgageProperty {
        state: GameState,
        property_id: PropertyId,
    },

    /// Ask whether an action would take effect
    Validate { state: GameState, action: GameAction },

    /// Request the static board, property and card catalog
    GetCatalog,

    /// Ping for keepalive
    Ping,
}

impl ClientMessage {
    /// Split a game request into its prior state and engine action
    pub fn into_action(self) -> Option<(GameState, GameAction)> {
        let pair = match self {
            ClientMessage::MoveWithDice { state, dice1, dice2 } => {
                (state, GameAction::RollDice { dice1, dice2 })
            }
            ClientMessage::AdvanceTurn { state } => (state, GameAction::AdvanceTurn),
            ClientMessage::BuyProperty {
                state,
                property_id,
                buy,
            } => (state, GameAction::BuyProperty { property_id, buy }),
            ClientMessage::PayRent { state, property_id } => {
                (state, GameAction::PayRent { property_id })
            }
            ClientMessage::PayTax { state } => (state, GameAction::PayTax),
            ClientMessage::PayJailFine {
                state,
                dice1,
                dice2,
            } => (state, GameAction::PayJailFine { dice1, dice2 }),
            ClientMessage::UpgradeProperty { state, property_id } => {
                (state, GameAction::UpgradeProperty { property_id })
            }
            ClientMessage::DowngradeProperty { state, property_id } => {
                (state, GameAction::DowngradeProperty { property_id })
            }
            ClientMessage::MortgageProperty { state, property_id } => {
                (state, GameAction::MortgageProperty { property_id })
            }
            ClientMessage::UnmortgageProperty { state, property_id } => {
                (state, GameAction::UnmortgageProperty { property_id })
            }
            ClientMessage::Init { .. }
            | ClientMessage::Validate { .. }
            | ClientMessage::GetCatalog
            | ClientMessage::Ping => return None,
        };
        Some(pair)
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome message with the connection id used in logs
    Welcome { connection_id: Uuid },

    /// Resulting state of a single-step request
    GameState { state: GameState },

    /// One snapshot per space touched by a roll; the last is authoritative
    IntermediateStates { states: Vec<GameState> },

    /// The static catalog
    Catalog { catalog: serde_json::Value },

    /// Answer to a validation request
    Validation {
        allowed: bool,
        reason: Option<String>,
    },

    /// Error occurred
    Error { kind: ErrorKind, message: String },

    /// Pong response
    Pong,
}

/// How the client should treat an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed message
    BadRequest,
    /// Unknown space, property or player, or a bad game setup
    InvalidReference,
    /// The submitted state breaks the game invariants
    CorruptedState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_shape() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "init",
            "payload": { "players": ["red", "blue"] }
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::Init { players } if players.len() == 2));

        let msg: ClientMessage = serde_json::from_value(json!({ "type": "get_catalog" })).unwrap();
        assert!(matches!(msg, ClientMessage::GetCatalog));
    }

    #[test]
    fn test_server_message_shape() {
        let msg = ServerMessage::Error {
            kind: ErrorKind::InvalidReference,
            message: "Unknown property: ZZ".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "error",
                "payload": { "kind": "invalid_reference", "message": "Unknown property: ZZ" }
            })
        );
        assert_eq!(
            serde_json::to_value(&ServerMessage::Pong).unwrap(),
            json!({ "type": "pong" })
        );
    }
}
