//! Dice movement and landing resolution.
//!
//! A roll produces one snapshot per space the token reaches so clients can
//! animate the move. Touch effects fire on every space after the origin,
//! land effects and property offers/rent only on the last one.

use crate::actions::{ActionKind, PendingAction};
use crate::board::SpaceId;
use crate::effects::EffectOutcome;
use crate::game::{admit, Engine, GameError, GameState, Rejection};
use crate::jail::{self, JailRoll};
use crate::property;
use tracing::debug;

impl Engine {
    /// Spaces visited moving `steps` forward from `start`
    pub fn path_from(&self, start: &str, steps: usize) -> Result<Vec<SpaceId>, GameError> {
        self.catalog().track.path_from(start, steps)
    }

    /// Move the current player with the given dice.
    ///
    /// Returns every intermediate snapshot; the last one is authoritative.
    /// A disallowed roll returns the input state as the only snapshot.
    pub fn move_with_dice(
        &self,
        state: GameState,
        dice1: u8,
        dice2: u8,
    ) -> Result<Vec<GameState>, GameError> {
        state.verify(self.catalog())?;
        if let Some(reason) = admit(self.check_roll(&state, dice1, dice2))? {
            debug!(%reason, player = %state.current_player, "roll ignored");
            return Ok(vec![state]);
        }

        let mut state = state;
        state.take_pending(|a| a.kind() == ActionKind::RollDice);
        self.resolve_roll(state, dice1, dice2)
    }

    pub(crate) fn check_roll(
        &self,
        state: &GameState,
        dice1: u8,
        dice2: u8,
    ) -> Result<(), GameError> {
        if !state.has_pending(ActionKind::RollDice) {
            return Err(Rejection::NotPending(ActionKind::RollDice).into());
        }
        jail::check_dice(dice1, dice2)
    }

    /// Apply a roll that has already been admitted
    pub(crate) fn resolve_roll(
        &self,
        state: GameState,
        dice1: u8,
        dice2: u8,
    ) -> Result<Vec<GameState>, GameError> {
        let catalog = self.catalog();
        let rules = &catalog.rules;
        let mut state = state;
        let player = state.current_player.clone();
        let doubles = dice1 == dice2;
        let dice_sum = dice1 + dice2;
        state.last_roll = Some((dice1, dice2));
        debug!(player = %player, dice1, dice2, "roll");

        if state.current()?.in_jail {
            match jail::serve_roll(&mut state, &player, rules, doubles, &catalog.board.visiting)? {
                JailRoll::Escaped => state.message("Doubles! Out of jail"),
                JailRoll::Stay { turns_served } => {
                    state.message(format!(
                        "Still in jail ({turns_served}/{})",
                        rules.max_jail_turns
                    ));
                    state.push(PendingAction::EndTurn { next_player: true });
                    return Ok(vec![state]);
                }
                JailRoll::MustPay => {
                    state.push(PendingAction::PayJailFineForced {
                        fine: rules.jail_fine,
                        dice1,
                        dice2,
                    });
                    state.push(PendingAction::EndTurn { next_player: true });
                    return Ok(vec![state]);
                }
            }
        } else if doubles {
            state.double_roll_stack = state.double_roll_stack.saturating_add(1);
            if state.double_roll_stack >= rules.max_double_rolls {
                jail::imprison(&mut state, &player)?;
                state.message(format!("{} doubles in a row, go to jail!", rules.max_double_rolls));
                return self.lock_up(state, &player);
            }
        } else {
            state.double_roll_stack = 0;
        }

        let start = state.current()?.at.clone();
        let path = catalog.track.path_from(&start, usize::from(dice_sum))?;
        let last = path.len() - 1;
        let mut snapshots = Vec::with_capacity(path.len());

        for (i, space) in path.iter().enumerate() {
            state.current_mut()?.at = space.clone();

            if i > 0 {
                if let Some(effect) = catalog.effects.on_touch(space) {
                    effect.apply(catalog, &mut state, &player)?;
                }
            }

            if i == last {
                if self.land(&mut state, &player, space, dice_sum)? == EffectOutcome::Jailed {
                    snapshots.extend(self.lock_up(state, &player)?);
                    return Ok(snapshots);
                }
                property::refresh_capabilities(catalog, &mut state, &player);
                state.push(PendingAction::EndTurn {
                    next_player: state.double_roll_stack == 0,
                });
            }

            snapshots.push(state.clone());
        }

        Ok(snapshots)
    }

    /// Resolve the space a token stopped on
    fn land(
        &self,
        state: &mut GameState,
        player: &str,
        space: &str,
        dice_sum: u8,
    ) -> Result<EffectOutcome, GameError> {
        let catalog = self.catalog();
        let info = catalog.properties.get(space);
        let name = info.map_or(space, |p| p.name.as_str());
        state.message(format!("Landed on {name}"));

        if let Some(effect) = catalog.effects.on_land(space) {
            if effect.apply(catalog, state, player)? == EffectOutcome::Jailed {
                return Ok(EffectOutcome::Jailed);
            }
        }

        let Some(info) = info else {
            return Ok(EffectOutcome::Continue);
        };
        let (owner, mortgaged) = match state.property_states.get(space) {
            Some(prop) => (prop.owner.clone(), prop.is_mortgaged()),
            None => (None, false),
        };

        match owner {
            None => {
                let buyable = state.player(player)?.can_afford(info.price);
                state.push(PendingAction::BuyProperty {
                    property_id: info.id.clone(),
                    price: info.price,
                    buyable,
                });
            }
            Some(owner) if owner == player => {}
            Some(owner) if mortgaged => {
                state.message(format!("{name} is mortgaged by {owner}, no rent due"));
            }
            Some(owner) => {
                let rent = property::rent_due(catalog, state, space, dice_sum)?;
                state.push(PendingAction::PayRent {
                    property_id: info.id.clone(),
                    owner,
                    rent,
                    dice_sum,
                });
            }
        }

        Ok(EffectOutcome::Continue)
    }

    /// Show the triggering space, then move the jailed player to the jail
    /// cell. Only messages survive in the queue, followed by the end of turn.
    fn lock_up(&self, state: GameState, player: &str) -> Result<Vec<GameState>, GameError> {
        let mut state = state;
        let shown = state.clone();

        state.player_mut(player)?.at = self.catalog().board.jail_cell.clone();
        state
            .pending_actions
            .retain(|a| a.kind() == ActionKind::ShowMessage);
        state.push(PendingAction::EndTurn { next_player: true });

        Ok(vec![shown, state])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_game() -> (Engine, GameState) {
        let engine = Engine::standard();
        let mut rng = StdRng::seed_from_u64(5);
        let state = engine
            .new_game_with_rng(&["red".to_string(), "blue".to_string()], &mut rng)
            .unwrap();
        (engine, state)
    }

    fn place(state: &mut GameState, player: &str, space: &str) {
        state.player_mut(player).unwrap().at = space.to_string();
    }

    #[test]
    fn test_one_snapshot_per_space() {
        let (engine, state) = new_game();

        let snapshots = engine.move_with_dice(state, 3, 4).unwrap();

        assert_eq!(snapshots.len(), 8);
        let spaces: Vec<_> = snapshots.iter().map(|s| s.players["red"].at.clone()).collect();
        assert_eq!(spaces, engine.path_from("BDAU", 7).unwrap());

        let last = snapshots.last().unwrap();
        assert_eq!(last.players["red"].at, "CH1");
        assert_eq!(last.double_roll_stack, 0);
        assert_eq!(last.last_roll, Some((3, 4)));
        assert!(!last.has_pending(ActionKind::RollDice));
        assert_eq!(
            last.pending(ActionKind::EndTurn),
            Some(&PendingAction::EndTurn { next_player: true })
        );
    }

    #[test]
    fn test_doubles_grant_another_roll() {
        let (engine, state) = new_game();

        let snapshots = engine.move_with_dice(state, 4, 4).unwrap();
        let last = snapshots.last().unwrap();

        assert_eq!(last.players["red"].at, "B2");
        assert_eq!(last.double_roll_stack, 1);
        assert_eq!(
            last.pending(ActionKind::EndTurn),
            Some(&PendingAction::EndTurn { next_player: false })
        );
        assert_eq!(
            last.pending(ActionKind::BuyProperty),
            Some(&PendingAction::BuyProperty {
                property_id: "B2".to_string(),
                price: 100,
                buyable: true,
            })
        );
    }

    #[test]
    fn test_roll_without_pending_is_ignored() {
        let (engine, mut state) = new_game();
        state.pending_actions.clear();

        let snapshots = engine.move_with_dice(state.clone(), 3, 4).unwrap();
        assert_eq!(snapshots, vec![state]);
    }

    #[test]
    fn test_invalid_dice_are_rejected() {
        let (engine, state) = new_game();

        assert_eq!(
            engine.check_roll(&state, 0, 7),
            Err(Rejection::InvalidDice(0, 7).into())
        );
        let snapshots = engine.move_with_dice(state.clone(), 0, 7).unwrap();
        assert_eq!(snapshots, vec![state]);
    }

    #[test]
    fn test_passing_start_pays_salary() {
        let (engine, mut state) = new_game();
        place(&mut state, "red", "H1");

        let snapshots = engine.move_with_dice(state, 1, 3).unwrap();
        let last = snapshots.last().unwrap();

        assert_eq!(last.players["red"].at, "A1");
        assert_eq!(last.players["red"].budget, 1700);
        assert_eq!(last.players["red"].total, 1700);
        assert_eq!(snapshots[3].players["red"].budget, 1700);
        assert_eq!(snapshots[2].players["red"].budget, 1500);
    }

    #[test]
    fn test_landing_on_owned_property_charges_rent() {
        let (engine, mut state) = new_game();
        state
            .property_states
            .insert("B1".to_string(), property::PropertyState::owned_by("blue"));

        let snapshots = engine.move_with_dice(state, 2, 4).unwrap();
        let last = snapshots.last().unwrap();

        assert_eq!(last.players["red"].at, "B1");
        assert_eq!(
            last.pending(ActionKind::PayRent),
            Some(&PendingAction::PayRent {
                property_id: "B1".to_string(),
                owner: "blue".to_string(),
                rent: 6,
                dice_sum: 6,
            })
        );
        assert!(!last.has_pending(ActionKind::BuyProperty));
    }

    #[test]
    fn test_plain_roll_clears_doubles() {
        let (engine, mut state) = new_game();
        state.double_roll_stack = 1;

        let snapshots = engine.move_with_dice(state, 2, 3).unwrap();
        let last = snapshots.last().unwrap();

        assert_eq!(last.players["red"].at, "R1");
        assert_eq!(last.current_player, "red");
        assert_eq!(last.double_roll_stack, 0);
        assert_eq!(
            last.pending(ActionKind::EndTurn),
            Some(&PendingAction::EndTurn { next_player: true })
        );
    }

    #[test]
    fn test_go_to_jail_space() {
        let (engine, mut state) = new_game();
        place(&mut state, "red", "E3");
        state.double_roll_stack = 1;

        let snapshots = engine.move_with_dice(state, 3, 3).unwrap();

        let shown = &snapshots[snapshots.len() - 2];
        assert_eq!(shown.players["red"].at, "VT");
        assert!(shown.players["red"].in_jail);

        let last = snapshots.last().unwrap();
        assert_eq!(last.players["red"].at, "OT");
        assert!(last.players["red"].in_jail);
        assert_eq!(last.double_roll_stack, 0);
        assert_eq!(
            last.pending(ActionKind::EndTurn),
            Some(&PendingAction::EndTurn { next_player: true })
        );
        assert!(last
            .pending_actions
            .iter()
            .all(|a| matches!(a.kind(), ActionKind::ShowMessage | ActionKind::EndTurn)));
    }

    #[test]
    fn test_three_doubles_skip_the_move() {
        let (engine, mut state) = new_game();
        state.double_roll_stack = 2;

        let snapshots = engine.move_with_dice(state, 2, 2).unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].players["red"].at, "BDAU");
        let last = &snapshots[1];
        assert_eq!(last.players["red"].at, "OT");
        assert!(last.players["red"].in_jail);
        assert_eq!(last.double_roll_stack, 0);
        assert!(!last.has_pending(ActionKind::BuyProperty));
    }

    #[test]
    fn test_jailed_roll_stays_put() {
        let (engine, mut state) = new_game();
        place(&mut state, "red", "OT");
        state.player_mut("red").unwrap().in_jail = true;

        let snapshots = engine.move_with_dice(state, 1, 2).unwrap();

        assert_eq!(snapshots.len(), 1);
        let last = &snapshots[0];
        assert_eq!(last.players["red"].at, "OT");
        assert_eq!(last.players["red"].jail_turns, 1);
        assert_eq!(
            last.pending(ActionKind::EndTurn),
            Some(&PendingAction::EndTurn { next_player: true })
        );
    }

    #[test]
    fn test_escape_with_doubles_moves_without_bonus() {
        let (engine, mut state) = new_game();
        place(&mut state, "red", "OT");
        let red = state.player_mut("red").unwrap();
        red.in_jail = true;
        red.jail_turns = 1;

        let snapshots = engine.move_with_dice(state, 5, 5).unwrap();

        assert_eq!(snapshots[0].players["red"].at, "TT");
        let last = snapshots.last().unwrap();
        assert_eq!(last.players["red"].at, "BDX");
        assert!(!last.players["red"].in_jail);
        assert_eq!(last.double_roll_stack, 0);
        assert_eq!(
            last.pending(ActionKind::EndTurn),
            Some(&PendingAction::EndTurn { next_player: true })
        );
    }

    #[test]
    fn test_third_failed_roll_forces_fine() {
        let (engine, mut state) = new_game();
        place(&mut state, "red", "OT");
        let red = state.player_mut("red").unwrap();
        red.in_jail = true;
        red.jail_turns = 2;

        let snapshots = engine.move_with_dice(state, 3, 5).unwrap();
        let last = snapshots.last().unwrap();

        assert_eq!(last.players["red"].at, "OT");
        assert_eq!(last.players["red"].budget, 1500);
        assert_eq!(
            last.pending_actions,
            vec![
                PendingAction::PayJailFineForced {
                    fine: 50,
                    dice1: 3,
                    dice2: 5,
                },
                PendingAction::EndTurn { next_player: true },
            ]
        );

        let next = engine.advance_turn(last.clone()).unwrap();
        assert_eq!(next.current_player, "blue");
    }

    #[test]
    fn test_income_tax_space() {
        let (engine, state) = new_game();

        let snapshots = engine.move_with_dice(state, 1, 3).unwrap();
        let last = snapshots.last().unwrap();

        assert_eq!(last.players["red"].at, "TTN");
        assert!(matches!(
            last.pending(ActionKind::PayTax),
            Some(PendingAction::PayTax { amount: 150, .. })
        ));
    }
}
