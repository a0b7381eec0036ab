//! Monopoly Impact - a stateless Monopoly turn engine
//!
//! This crate provides the core game logic, including:
//! - The board track and its display layout
//! - The static catalog of properties, cards and rule constants
//! - Dice movement with per-space snapshots for animation
//! - The jail state machine
//! - Property purchase, rent, mortgage and building rules
//! - The pending-action queue and turn rotation
//!
//! # Architecture
//!
//! Every operation takes the complete prior [`GameState`] by value and returns
//! the next state(s); the [`Engine`] holds nothing but the catalog. It can be
//! compiled to:
//! - Native Rust for server-side hosting
//! - WebAssembly for in-browser play
//!
//! # Modules
//!
//! - [`board`]: Track order, path engine and space layout
//! - [`catalog`]: Properties, cards, rules and catalog loading
//! - [`effects`]: Space effect registry
//! - [`player`]: Player state
//! - [`jail`]: Jail entry and exit
//! - [`property`]: Property transactions and capability flags
//! - [`movement`]: Dice movement and landing resolution
//! - [`actions`]: Pending actions and client actions
//! - [`game`]: Game state, errors and the turn controller

pub mod actions;
pub mod board;
pub mod catalog;
pub mod effects;
pub mod game;
pub mod jail;
pub mod movement;
pub mod player;
pub mod property;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{ActionKind, GameAction, PendingAction, TaxKind};
pub use board::{Board, SpaceId, Track};
pub use catalog::{
    Card, Catalog, CatalogError, Deck, Money, PropertyGroup, PropertyId, PropertyInfo, Rules,
};
pub use effects::{EffectTable, SpaceEffect};
pub use game::{Engine, GameError, GameState, Rejection};
pub use player::{PlayerId, PlayerState};
pub use property::{Capabilities, Level, PropertyState};
