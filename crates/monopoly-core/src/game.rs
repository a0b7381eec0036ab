//! Game state and the turn engine.
//!
//! This module contains the `GameState` aggregate, the error taxonomy and the
//! `Engine`, which turns a prior state plus a client action into the next
//! state(s). The engine keeps no state of its own between calls.

use crate::actions::{ActionKind, GameAction, PendingAction};
use crate::board::SpaceId;
use crate::catalog::{CardId, Catalog, Deck, Money, PropertyId};
use crate::player::{PlayerId, PlayerState};
use crate::property::{self, Capabilities, PropertyState, MORTGAGED};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Outcome tag recorded in `GameState::cards` when a card is drawn
const CARD_DRAWN: &str = "drawn";

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Unknown space: {0}")]
    UnknownSpace(SpaceId),

    #[error("Unknown property: {0}")]
    UnknownProperty(PropertyId),

    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("Invalid game setup: {0}")]
    InvalidSetup(String),

    #[error("Action not allowed: {0}")]
    Rejected(#[from] Rejection),

    #[error("Corrupted game state: {0}")]
    Corrupted(String),
}

/// Why an action was not allowed in the given state
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("No pending {0} action")]
    NotPending(ActionKind),

    #[error("A {0} action must be resolved first")]
    Unresolved(ActionKind),

    #[error("Dice values {0} and {1} are not both in 1..=6")]
    InvalidDice(u8, u8),

    #[error("Dice do not match the pending forced fine")]
    DiceMismatch,

    #[error("Cannot afford {cost}k with a budget of {budget}k")]
    CannotAfford { cost: Money, budget: Money },

    #[error("Property is already owned")]
    AlreadyOwned,

    #[error("Property is not owned by the acting player")]
    NotOwner,

    #[error("Property has no owner")]
    Unowned,

    #[error("Rent is never owed on your own property")]
    OwnProperty,

    #[error("Property is mortgaged")]
    Mortgaged,

    #[error("Property is not mortgaged")]
    NotMortgaged,

    #[error("Property cannot carry buildings")]
    NotBuildable,

    #[error("Property is already at its highest level")]
    MaxLevel,

    #[error("Property has no buildings")]
    NoBuildings,

    #[error("Property has buildings")]
    HasBuildings,

    #[error("Another property in the group has buildings")]
    BuildingsInGroup,

    #[error("Player does not own the whole group")]
    NoMonopoly,

    #[error("Buildings in a group must stay within one level of each other")]
    UnevenBuilding,

    #[error("No houses left in the supply")]
    OutOfHouses,

    #[error("No hotels left in the supply")]
    OutOfHotels,

    #[error("Player is not in jail")]
    NotInJail,
}

/// Split a check result into "allowed", "rejected" or a hard failure
pub(crate) fn admit(check: Result<(), GameError>) -> Result<Option<Rejection>, GameError> {
    match check {
        Ok(()) => Ok(None),
        Err(GameError::Rejected(reason)) => Ok(Some(reason)),
        Err(err) => Err(err),
    }
}

/// The complete game state, passed by value between calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub players: BTreeMap<PlayerId, PlayerState>,
    /// Only properties that have ever been bought have an entry
    pub property_states: BTreeMap<PropertyId, PropertyState>,
    /// Turn order, fixed at game start
    pub player_queue: Vec<PlayerId>,
    pub current_player: PlayerId,
    /// Consecutive doubles rolled by the current player
    pub double_roll_stack: u8,
    pub houses_left: i32,
    pub hotels_left: i32,
    pub pending_actions: Vec<PendingAction>,
    /// Community card draw order
    pub kv_queue: Vec<CardId>,
    /// Chance card draw order
    pub ch_queue: Vec<CardId>,
    /// Drawn card history: card id to outcome tag
    pub cards: BTreeMap<CardId, String>,
    #[serde(default)]
    pub last_roll: Option<(u8, u8)>,
}

impl GameState {
    pub fn player(&self, id: &str) -> Result<&PlayerState, GameError> {
        self.players
            .get(id)
            .ok_or_else(|| GameError::UnknownPlayer(id.to_string()))
    }

    pub(crate) fn player_mut(&mut self, id: &str) -> Result<&mut PlayerState, GameError> {
        self.players
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownPlayer(id.to_string()))
    }

    /// The player whose turn it is
    pub fn current(&self) -> Result<&PlayerState, GameError> {
        self.player(&self.current_player)
    }

    pub(crate) fn current_mut(&mut self) -> Result<&mut PlayerState, GameError> {
        let id = self.current_player.clone();
        self.player_mut(&id)
    }

    /// First pending action of the given kind
    pub fn pending(&self, kind: ActionKind) -> Option<&PendingAction> {
        self.pending_actions.iter().find(|a| a.kind() == kind)
    }

    pub fn has_pending(&self, kind: ActionKind) -> bool {
        self.pending(kind).is_some()
    }

    /// Remove and return the first pending action matching `pred`
    pub(crate) fn take_pending<F>(&mut self, pred: F) -> Option<PendingAction>
    where
        F: Fn(&PendingAction) -> bool,
    {
        let index = self.pending_actions.iter().position(pred)?;
        Some(self.pending_actions.remove(index))
    }

    pub(crate) fn push(&mut self, action: PendingAction) {
        self.pending_actions.push(action);
    }

    pub(crate) fn message(&mut self, message: impl Into<String>) {
        self.push(PendingAction::ShowMessage {
            message: message.into(),
        });
    }

    /// Take the top card of a deck, put it back at the bottom and record it
    pub(crate) fn draw_card(&mut self, deck: Deck) -> Option<CardId> {
        let queue = match deck {
            Deck::Community => &mut self.kv_queue,
            Deck::Chance => &mut self.ch_queue,
        };
        if queue.is_empty() {
            return None;
        }
        let card = queue.remove(0);
        queue.push(card.clone());
        self.cards.insert(card.clone(), CARD_DRAWN.to_string());
        Some(card)
    }

    /// Properties owned by a player
    pub fn owned_by<'a>(
        &'a self,
        player: &'a str,
    ) -> impl Iterator<Item = (&'a PropertyId, &'a PropertyState)> + 'a {
        self.property_states
            .iter()
            .filter(move |(_, s)| s.owner.as_deref() == Some(player))
    }

    /// The player after the current one in turn order, wrapping around
    pub fn next_player(&self) -> Result<&PlayerId, GameError> {
        let index = self
            .player_queue
            .iter()
            .position(|p| p == &self.current_player)
            .ok_or_else(|| GameError::UnknownPlayer(self.current_player.clone()))?;
        self.player_queue
            .get((index + 1) % self.player_queue.len())
            .ok_or_else(|| GameError::Corrupted("empty player queue".to_string()))
    }

    /// Check the structural invariants against a catalog.
    ///
    /// Unknown spaces and properties are reported as such; anything else
    /// inconsistent is reported as `Corrupted`.
    pub fn verify(&self, catalog: &Catalog) -> Result<(), GameError> {
        let corrupted = |msg: String| -> Result<(), GameError> { Err(GameError::Corrupted(msg)) };
        let rules = &catalog.rules;

        if self.player_queue.is_empty() {
            return corrupted("player queue is empty".to_string());
        }
        if self.player_queue.len() != self.players.len()
            || self.player_queue.iter().any(|p| !self.players.contains_key(p))
        {
            return corrupted("player queue does not match players".to_string());
        }
        if !self.players.contains_key(&self.current_player) {
            return Err(GameError::UnknownPlayer(self.current_player.clone()));
        }
        if self.double_roll_stack > rules.max_double_rolls {
            return corrupted(format!("double roll stack {}", self.double_roll_stack));
        }

        for (id, player) in &self.players {
            if !catalog.is_space(&player.at) {
                return Err(GameError::UnknownSpace(player.at.clone()));
            }
            if !player.in_jail && player.at == catalog.board.jail_cell {
                return corrupted(format!("{id} is in the jail cell but not jailed"));
            }
            if player.jail_turns > rules.max_jail_turns {
                return corrupted(format!("{id} has served {} jail turns", player.jail_turns));
            }
        }

        for (id, state) in &self.property_states {
            let info = catalog.property(id)?;
            if let Some(owner) = &state.owner {
                if !self.players.contains_key(owner) {
                    return corrupted(format!("{id} is owned by unknown player {owner}"));
                }
            }
            if state.level < MORTGAGED || state.level > info.max_level() {
                return corrupted(format!("{id} has level {}", state.level));
            }
        }

        if self.houses_left < 0 || self.hotels_left < 0 {
            return corrupted(format!(
                "building supply is negative ({} houses, {} hotels)",
                self.houses_left, self.hotels_left
            ));
        }

        let end_turns = self
            .pending_actions
            .iter()
            .filter(|a| a.kind() == ActionKind::EndTurn)
            .count();
        if end_turns > 1 {
            return corrupted(format!("{end_turns} end_turn actions pending"));
        }

        Ok(())
    }
}

/// The stateless rule engine
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
}

impl Engine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Engine over the built-in standard board
    pub fn standard() -> Self {
        Self::new(Catalog::standard())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Start a new game with thread-local randomness
    pub fn new_game(&self, players: &[PlayerId]) -> Result<GameState, GameError> {
        self.new_game_with_rng(players, &mut rand::thread_rng())
    }

    /// Start a new game: every player on the start space with the starting
    /// budget, both decks shuffled, and a `roll_dice` queued for the first
    /// player in order.
    pub fn new_game_with_rng<R: Rng + ?Sized>(
        &self,
        players: &[PlayerId],
        rng: &mut R,
    ) -> Result<GameState, GameError> {
        let first = players
            .first()
            .ok_or_else(|| GameError::InvalidSetup("at least one player is required".into()))?;

        let mut seen = HashSet::new();
        if let Some(dup) = players.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(GameError::InvalidSetup(format!("duplicate player {dup}")));
        }

        let start = self
            .catalog
            .track
            .start()
            .ok_or_else(|| GameError::InvalidSetup("the track is empty".into()))?;
        let rules = &self.catalog.rules;

        let mut kv_queue: Vec<CardId> = self.catalog.community.keys().cloned().collect();
        let mut ch_queue: Vec<CardId> = self.catalog.chance.keys().cloned().collect();
        kv_queue.shuffle(rng);
        ch_queue.shuffle(rng);

        let mut state = GameState {
            players: players
                .iter()
                .map(|p| (p.clone(), PlayerState::new(rules.starting_budget, start.clone())))
                .collect(),
            property_states: BTreeMap::new(),
            player_queue: players.to_vec(),
            current_player: first.clone(),
            double_roll_stack: 0,
            houses_left: rules.houses,
            hotels_left: rules.hotels,
            pending_actions: vec![PendingAction::RollDice],
            kv_queue,
            ch_queue,
            cards: BTreeMap::new(),
            last_roll: None,
        };
        property::refresh_capabilities(&self.catalog, &mut state, first);

        Ok(state)
    }

    /// Capability record for one property from one player's point of view
    pub fn capabilities(&self, state: &GameState, property_id: &str, player: &str) -> Capabilities {
        property::capabilities(&self.catalog, state, property_id, player)
    }

    /// Resolve the pending end of turn.
    ///
    /// Clears the queue, hands the turn to the next player unless the mover
    /// rolled doubles, and queues a fresh `roll_dice`.
    pub fn advance_turn(&self, state: GameState) -> Result<GameState, GameError> {
        state.verify(&self.catalog)?;
        if let Some(reason) = admit(self.check_advance(&state))? {
            debug!(%reason, player = %state.current_player, "advance ignored");
            return Ok(state);
        }

        let mut state = state;
        let next_player = matches!(
            state.pending(ActionKind::EndTurn),
            Some(PendingAction::EndTurn { next_player: true })
        );
        state.pending_actions.clear();

        if next_player {
            let next = state.next_player()?.clone();
            debug!(from = %state.current_player, to = %next, "turn passes");
            state.current_player = next;
            state.double_roll_stack = 0;
        }

        let current = state.current_player.clone();
        property::refresh_capabilities(&self.catalog, &mut state, &current);
        state.push(PendingAction::RollDice);

        Ok(state)
    }

    fn check_advance(&self, state: &GameState) -> Result<(), GameError> {
        if !state.has_pending(ActionKind::EndTurn) {
            return Err(Rejection::NotPending(ActionKind::EndTurn).into());
        }
        for kind in [ActionKind::PayRent, ActionKind::PayTax] {
            if state.has_pending(kind) {
                return Err(Rejection::Unresolved(kind).into());
            }
        }
        Ok(())
    }

    /// Pay the first pending tax
    pub fn pay_tax(&self, state: GameState) -> Result<GameState, GameError> {
        state.verify(&self.catalog)?;
        if let Some(reason) = admit(self.check_pay_tax(&state))? {
            debug!(%reason, player = %state.current_player, "tax payment ignored");
            return Ok(state);
        }

        let mut state = state;
        let player = state.current_player.clone();
        if let Some(PendingAction::PayTax { tax_type, amount }) =
            state.take_pending(|a| a.kind() == ActionKind::PayTax)
        {
            state.player_mut(&player)?.budget -= amount;
            property::refresh_total(&self.catalog, &mut state, &player)?;
            state.message(format!("{}: -{amount}k", tax_type.label()));
        }

        Ok(state)
    }

    fn check_pay_tax(&self, state: &GameState) -> Result<(), GameError> {
        if state.has_pending(ActionKind::PayTax) {
            Ok(())
        } else {
            Err(Rejection::NotPending(ActionKind::PayTax).into())
        }
    }

    /// Whether `action` would take effect on `state`.
    ///
    /// Operations ignore disallowed actions and hand the state back
    /// unchanged; this query tells the caller why.
    pub fn validate(&self, state: &GameState, action: &GameAction) -> Result<(), GameError> {
        state.verify(&self.catalog)?;
        let player = state.current_player.as_str();

        match action {
            GameAction::RollDice { dice1, dice2 } => self.check_roll(state, *dice1, *dice2),
            GameAction::AdvanceTurn => self.check_advance(state),
            GameAction::BuyProperty { property_id, buy } => {
                self.check_buy(state, property_id, *buy)
            }
            GameAction::PayRent { property_id } => self.check_rent(state, property_id),
            GameAction::PayTax => self.check_pay_tax(state),
            GameAction::PayJailFine { dice1, dice2 } => {
                let dice = dice_pair(*dice1, *dice2)?;
                self.check_jail_fine(state, dice)
            }
            GameAction::UpgradeProperty { property_id } => {
                property::check_upgrade(&self.catalog, state, property_id, player)
            }
            GameAction::DowngradeProperty { property_id } => {
                property::check_downgrade(&self.catalog, state, property_id, player)
            }
            GameAction::MortgageProperty { property_id } => {
                property::check_mortgage(&self.catalog, state, property_id, player)
            }
            GameAction::UnmortgageProperty { property_id } => {
                property::check_unmortgage(&self.catalog, state, property_id, player)
            }
        }
    }

    /// Apply any client action.
    ///
    /// Rolling returns one snapshot per space touched; everything else
    /// returns a single snapshot. The last snapshot is authoritative.
    pub fn apply(&self, state: GameState, action: GameAction) -> Result<Vec<GameState>, GameError> {
        let next = match action {
            GameAction::RollDice { dice1, dice2 } => {
                return self.move_with_dice(state, dice1, dice2)
            }
            GameAction::AdvanceTurn => self.advance_turn(state)?,
            GameAction::BuyProperty { property_id, buy } => {
                self.buy_property(state, &property_id, buy)?
            }
            GameAction::PayRent { property_id } => self.pay_rent(state, &property_id)?,
            GameAction::PayTax => self.pay_tax(state)?,
            GameAction::PayJailFine { dice1, dice2 } => match dice_pair(dice1, dice2) {
                Ok(dice) => self.pay_jail_fine(state, dice)?,
                Err(GameError::Rejected(reason)) => {
                    debug!(%reason, "jail fine ignored");
                    state
                }
                Err(err) => return Err(err),
            },
            GameAction::UpgradeProperty { property_id } => {
                self.upgrade_property(state, &property_id)?
            }
            GameAction::DowngradeProperty { property_id } => {
                self.downgrade_property(state, &property_id)?
            }
            GameAction::MortgageProperty { property_id } => {
                self.mortgage_property(state, &property_id)?
            }
            GameAction::UnmortgageProperty { property_id } => {
                self.unmortgage_property(state, &property_id)?
            }
        };
        Ok(vec![next])
    }
}

/// Both dice or neither
fn dice_pair(dice1: Option<u8>, dice2: Option<u8>) -> Result<Option<(u8, u8)>, GameError> {
    match (dice1, dice2) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        (a, b) => Err(Rejection::InvalidDice(a.unwrap_or(0), b.unwrap_or(0)).into()),
    }
}
