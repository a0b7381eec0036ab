//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, ErrorKind, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use monopoly_core::{Engine, GameAction, GameError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, engine: Arc<Engine>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Monopoly server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, engine).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    engine: Arc<Engine>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let connection_id = Uuid::new_v4();
    info!(%connection_id, "New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let welcome = ServerMessage::Welcome { connection_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Cannot encode reply: {}", e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => handle_message(&engine, client_msg),
                    Err(e) => {
                        warn!(%connection_id, "Invalid message: {}", e);
                        ServerMessage::Error {
                            kind: ErrorKind::BadRequest,
                            message: e.to_string(),
                        }
                    }
                };
                if tx.send(reply).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(%connection_id, "Client closing connection");
                break;
            }
            Err(e) => {
                error!(%connection_id, "WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    drop(tx);
    send_task.abort();

    info!(%connection_id, "Connection closed");
    Ok(())
}

/// Answer one client message. Pure with respect to server state.
pub fn handle_message(engine: &Engine, msg: ClientMessage) -> ServerMessage {
    match msg {
        ClientMessage::Init { players } => match engine.new_game(&players) {
            Ok(state) => ServerMessage::GameState { state },
            Err(e) => error_reply(e),
        },

        ClientMessage::Validate { state, action } => match engine.validate(&state, &action) {
            Ok(()) => ServerMessage::Validation {
                allowed: true,
                reason: None,
            },
            Err(GameError::Rejected(reason)) => ServerMessage::Validation {
                allowed: false,
                reason: Some(reason.to_string()),
            },
            Err(e) => error_reply(e),
        },

        ClientMessage::GetCatalog => match serde_json::to_value(engine.catalog()) {
            Ok(catalog) => ServerMessage::Catalog { catalog },
            Err(e) => ServerMessage::Error {
                kind: ErrorKind::BadRequest,
                message: e.to_string(),
            },
        },

        ClientMessage::Ping => ServerMessage::Pong,

        other => match other.into_action() {
            Some((state, action)) => apply_action(engine, state, action),
            None => ServerMessage::Error {
                kind: ErrorKind::BadRequest,
                message: "Unsupported message".to_string(),
            },
        },
    }
}

fn apply_action(
    engine: &Engine,
    state: monopoly_core::GameState,
    action: GameAction,
) -> ServerMessage {
    let is_roll = matches!(action, GameAction::RollDice { .. });
    debug!(?action, player = %state.current_player, "apply");

    match engine.apply(state, action) {
        Ok(states) if is_roll => ServerMessage::IntermediateStates { states },
        Ok(mut states) => match states.pop() {
            Some(state) => ServerMessage::GameState { state },
            None => ServerMessage::Error {
                kind: ErrorKind::CorruptedState,
                message: "Engine returned no state".to_string(),
            },
        },
        Err(e) => error_reply(e),
    }
}

fn error_reply(err: GameError) -> ServerMessage {
    let kind = match err {
        GameError::Corrupted(_) => ErrorKind::CorruptedState,
        GameError::Rejected(_) => ErrorKind::BadRequest,
        GameError::UnknownSpace(_)
        | GameError::UnknownProperty(_)
        | GameError::UnknownPlayer(_)
        | GameError::InvalidSetup(_) => ErrorKind::InvalidReference,
    };
    warn!(?kind, "{}", err);
    ServerMessage::Error {
        kind,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(engine: &Engine) -> monopoly_core::GameState {
        let msg = ClientMessage::Init {
            players: vec!["red".to_string(), "blue".to_string()],
        };
        match handle_message(engine, msg) {
            ServerMessage::GameState { state } => state,
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn test_init_and_roll() {
        let engine = Engine::standard();
        let state = init(&engine);

        let reply = handle_message(
            &engine,
            ClientMessage::MoveWithDice {
                state,
                dice1: 3,
                dice2: 4,
            },
        );

        match reply {
            ServerMessage::IntermediateStates { states } => {
                assert_eq!(states.len(), 8);
                assert_eq!(states[7].players["red"].at, "CH1");
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn test_validate_reports_reason() {
        let engine = Engine::standard();
        let state = init(&engine);

        let reply = handle_message(
            &engine,
            ClientMessage::Validate {
                state,
                action: GameAction::AdvanceTurn,
            },
        );

        assert!(matches!(
            reply,
            ServerMessage::Validation { allowed: false, reason: Some(_) }
        ));
    }

    #[test]
    fn test_unknown_property_is_reported() {
        let engine = Engine::standard();
        let state = init(&engine);

        let reply = handle_message(
            &engine,
            ClientMessage::MortgageProperty {
                state,
                property_id: "ZZ".to_string(),
            },
        );

        assert!(matches!(
            reply,
            ServerMessage::Error { kind: ErrorKind::InvalidReference, .. }
        ));
    }

    #[test]
    fn test_bad_setup() {
        let engine = Engine::standard();
        let reply = handle_message(&engine, ClientMessage::Init { players: vec![] });
        assert!(matches!(
            reply,
            ServerMessage::Error { kind: ErrorKind::InvalidReference, .. }
        ));
    }

    #[test]
    fn test_catalog_and_ping() {
        let engine = Engine::standard();
        assert!(matches!(
            handle_message(&engine, ClientMessage::GetCatalog),
            ServerMessage::Catalog { .. }
        ));
        assert!(matches!(
            handle_message(&engine, ClientMessage::Ping),
            ServerMessage::Pong
        ));
    }
}
