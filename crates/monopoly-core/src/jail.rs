//! Jail entry, escape rolls and fines.

use crate::actions::{ActionKind, PendingAction};
use crate::catalog::Rules;
use crate::game::{admit, Engine, GameError, GameState, Rejection};
use crate::property;
use tracing::debug;

/// Result of a jailed player's roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JailRoll {
    /// Doubles: the player is free and moves from the visiting space
    Escaped,
    /// Another failed roll; the player stays put
    Stay { turns_served: u8 },
    /// Out of escape rolls; the fine must be paid
    MustPay,
}

/// Put a player in jail. Relocation to the jail cell is left to the caller so
/// that the space that triggered it can still be shown.
pub(crate) fn imprison(state: &mut GameState, player: &str) -> Result<(), GameError> {
    let jailed = state.player_mut(player)?;
    jailed.in_jail = true;
    jailed.jail_turns = 0;
    state.double_roll_stack = 0;
    debug!(player, "imprisoned");
    Ok(())
}

/// Free a player onto the visiting space
pub(crate) fn release(
    state: &mut GameState,
    player: &str,
    visiting: &str,
) -> Result<(), GameError> {
    let freed = state.player_mut(player)?;
    freed.in_jail = false;
    freed.jail_turns = 0;
    freed.at = visiting.to_string();
    state.double_roll_stack = 0;
    debug!(player, "released");
    Ok(())
}

/// Count one escape attempt for a jailed player
pub(crate) fn serve_roll(
    state: &mut GameState,
    player: &str,
    rules: &Rules,
    doubles: bool,
    visiting: &str,
) -> Result<JailRoll, GameError> {
    if doubles {
        release(state, player, visiting)?;
        return Ok(JailRoll::Escaped);
    }

    let jailed = state.player_mut(player)?;
    jailed.jail_turns = jailed.jail_turns.saturating_add(1).min(rules.max_jail_turns);
    if jailed.jail_turns >= rules.max_jail_turns {
        Ok(JailRoll::MustPay)
    } else {
        Ok(JailRoll::Stay {
            turns_served: jailed.jail_turns,
        })
    }
}

fn valid_die(value: u8) -> bool {
    (1..=6).contains(&value)
}

pub(crate) fn check_dice(dice1: u8, dice2: u8) -> Result<(), GameError> {
    if valid_die(dice1) && valid_die(dice2) {
        Ok(())
    } else {
        Err(Rejection::InvalidDice(dice1, dice2).into())
    }
}

impl Engine {
    /// Pay the jail fine.
    ///
    /// Without dice this is the voluntary payment: the player is freed onto
    /// the visiting space and keeps the turn. With dice it settles the forced
    /// fine queued after the last failed escape roll, then moves with those
    /// dice; the final snapshot of the move is returned.
    pub fn pay_jail_fine(
        &self,
        state: GameState,
        dice: Option<(u8, u8)>,
    ) -> Result<GameState, GameError> {
        let catalog = self.catalog();
        state.verify(catalog)?;
        if let Some(reason) = admit(self.check_jail_fine(&state, dice))? {
            debug!(%reason, player = %state.current_player, "jail fine ignored");
            return Ok(state);
        }

        let mut state = state;
        let player = state.current_player.clone();
        let fine = catalog.rules.jail_fine;

        state.player_mut(&player)?.budget -= fine;
        release(&mut state, &player, &catalog.board.visiting)?;
        property::refresh_total(catalog, &mut state, &player)?;

        match dice {
            None => {
                state.take_pending(|a| a.kind() == ActionKind::PayJailFineForced);
                property::refresh_capabilities(catalog, &mut state, &player);
                state.message(format!("Paid jail fine (-{fine}k)"));
                Ok(state)
            }
            Some((dice1, dice2)) => {
                state.pending_actions.clear();
                state.message(format!("Paid jail fine (-{fine}k)"));
                let mut snapshots = self.resolve_roll(state, dice1, dice2)?;
                snapshots.pop().ok_or_else(|| {
                    GameError::Corrupted("movement produced no snapshot".to_string())
                })
            }
        }
    }

    pub(crate) fn check_jail_fine(
        &self,
        state: &GameState,
        dice: Option<(u8, u8)>,
    ) -> Result<(), GameError> {
        if !state.current()?.in_jail {
            return Err(Rejection::NotInJail.into());
        }

        match dice {
            Some((dice1, dice2)) => {
                check_dice(dice1, dice2)?;
                match state.pending(ActionKind::PayJailFineForced) {
                    Some(PendingAction::PayJailFineForced {
                        dice1: d1, dice2: d2, ..
                    }) if (*d1, *d2) == (dice1, dice2) => Ok(()),
                    Some(_) => Err(Rejection::DiceMismatch.into()),
                    None => Err(Rejection::NotPending(ActionKind::PayJailFineForced).into()),
                }
            }
            None => {
                let cost = self.catalog().rules.jail_fine;
                let budget = state.current()?.budget;
                if budget < cost {
                    Err(Rejection::CannotAfford { cost, budget }.into())
                } else {
                    Ok(())
                }
            }
        }
    }
}
