//! Property-based tests for movement, money and building rules.
//!
//! Run with: cargo test --release prop_game

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use monopoly_core::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn new_game() -> (Engine, GameState) {
    let engine = Engine::standard();
    let mut rng = StdRng::seed_from_u64(1);
    let state = engine
        .new_game_with_rng(&["red".to_string(), "blue".to_string()], &mut rng)
        .unwrap();
    (engine, state)
}

fn nth_property(engine: &Engine, index: usize) -> PropertyInfo {
    let properties = &engine.catalog().properties;
    properties.values().nth(index % properties.len()).unwrap().clone()
}

/// Street groups with their members, in track order
fn street_groups(engine: &Engine) -> Vec<Vec<PropertyId>> {
    ('A'..='H')
        .map(|letter| {
            engine
                .catalog()
                .group_members(&PropertyGroup::Street(letter))
                .to_vec()
        })
        .collect()
}

fn own(state: &mut GameState, id: &str, player: &str, level: Level) {
    let mut prop = PropertyState::owned_by(player);
    prop.level = level;
    state.property_states.insert(id.to_string(), prop);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Paths have steps + 1 entries, start at the origin and only ever
    /// advance to the next space.
    #[test]
    fn prop_path_shape(start in 0usize..40, steps in 0usize..200) {
        let track = Board::standard().track();
        let origin = &track.spaces()[start];
        let path = track.path_from(origin, steps).unwrap();

        prop_assert_eq!(path.len(), steps + 1);
        prop_assert_eq!(&path[0], origin);
        for pair in path.windows(2) {
            let a = track.index_of(&pair[0]).unwrap();
            let b = track.index_of(&pair[1]).unwrap();
            prop_assert_eq!((a + 1) % track.len(), b);
        }
    }

    /// A whole number of laps ends where it started.
    #[test]
    fn prop_full_laps_return(start in 0usize..40, laps in 0usize..5) {
        let track = Board::standard().track();
        let origin = &track.spaces()[start];
        let path = track.path_from(origin, laps * track.len()).unwrap();

        prop_assert_eq!(path.last().unwrap(), origin);
    }

    /// Buying costs exactly the price and touches no one else's budget.
    #[test]
    fn prop_buy_costs_price(index in 0usize..28, budget in 0i64..1000) {
        let (engine, mut state) = new_game();
        let info = nth_property(&engine, index);
        state.players.get_mut("red").unwrap().budget = budget;
        state.pending_actions.push(PendingAction::BuyProperty {
            property_id: info.id.clone(),
            price: info.price,
            buyable: budget >= info.price,
        });

        let next = engine.buy_property(state, &info.id, true).unwrap();

        prop_assert_eq!(next.players["blue"].budget, 1500);
        if budget >= info.price {
            prop_assert_eq!(next.players["red"].budget, budget - info.price);
            prop_assert_eq!(next.property_states[&info.id].owner.as_deref(), Some("red"));
        } else {
            prop_assert_eq!(next.players["red"].budget, budget);
            prop_assert!(!next.property_states.contains_key(&info.id));
        }
    }

    /// Paying rent moves money between the two players without creating any.
    #[test]
    fn prop_rent_conserves_money(index in 0usize..28, level in 0i8..=5, dice_sum in 2u8..=12) {
        let (engine, mut state) = new_game();
        let info = nth_property(&engine, index);
        let level = if info.upgrade.is_some() { level.min(info.max_level()) } else { 0 };
        own(&mut state, &info.id, "blue", level);
        state.pending_actions.push(PendingAction::PayRent {
            property_id: info.id.clone(),
            owner: "blue".to_string(),
            rent: 0,
            dice_sum,
        });
        let before: Money = state.players.values().map(|p| p.budget).sum();

        let next = engine.pay_rent(state, &info.id).unwrap();

        let after: Money = next.players.values().map(|p| p.budget).sum();
        prop_assert_eq!(before, after);
        prop_assert!(next.players["red"].budget < 1500);
    }

    /// Building up a whole group and tearing it down again restores levels
    /// and supply, at a cost of (upgrade - downgrade) per step.
    #[test]
    fn prop_upgrade_downgrade_round_trip(group in 0usize..8, rounds in 1usize..=5) {
        let (engine, mut state) = new_game();
        let members = street_groups(&engine)[group].clone();
        for id in &members {
            own(&mut state, id, "red", 0);
        }
        state.players.get_mut("red").unwrap().budget = 100_000;
        let start = state.clone();

        for _ in 0..rounds {
            for id in &members {
                state = engine.upgrade_property(state, id).unwrap();
            }
        }
        for id in &members {
            prop_assert_eq!(state.property_states[id].level as usize, rounds);
        }
        for _ in 0..rounds {
            for id in members.iter().rev() {
                state = engine.downgrade_property(state, id).unwrap();
            }
        }

        let upgrade = engine.catalog().property(&members[0]).unwrap().upgrade.unwrap();
        let loss = (upgrade - upgrade / 2) * (rounds * members.len()) as Money;
        prop_assert_eq!(state.houses_left, start.houses_left);
        prop_assert_eq!(state.hotels_left, start.hotels_left);
        prop_assert_eq!(state.players["red"].budget, 100_000 - loss);
        for id in &members {
            prop_assert_eq!(state.property_states[id].level, 0);
        }
    }

    /// Missing even one member of the group blocks building.
    #[test]
    fn prop_no_upgrade_without_monopoly(
        group in 0usize..8,
        mask in 0u8..8,
        blue_takes_rest in any::<bool>(),
    ) {
        let (engine, mut state) = new_game();
        let members = street_groups(&engine)[group].clone();
        state.players.get_mut("red").unwrap().budget = 100_000;

        let full = (1u8 << members.len()) - 1;
        let mask = mask & full;
        prop_assume!(mask != 0 && mask != full);

        for (i, id) in members.iter().enumerate() {
            if mask & (1 << i) != 0 {
                own(&mut state, id, "red", 0);
            } else if blue_takes_rest {
                own(&mut state, id, "blue", 0);
            }
        }

        for (i, id) in members.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            prop_assert!(!engine.capabilities(&state, id, "red").can_upgrade);
            let action = GameAction::UpgradeProperty { property_id: id.clone() };
            prop_assert_eq!(
                engine.validate(&state, &action),
                Err(GameError::Rejected(Rejection::NoMonopoly))
            );
            let next = engine.upgrade_property(state.clone(), id).unwrap();
            prop_assert_eq!(&next, &state);
        }
    }

    /// The third double in a row sends the roller straight to jail without
    /// resolving the space the dice point at.
    #[test]
    fn prop_three_doubles_jail(start in 0usize..40, die in 1u8..=6) {
        let (engine, mut state) = new_game();
        let origin = engine.catalog().track.spaces()[start].clone();
        state.players.get_mut("red").unwrap().at = origin.clone();
        state.double_roll_stack = 2;

        let snapshots = engine.move_with_dice(state, die, die).unwrap();
        let last = snapshots.last().unwrap();

        prop_assert_eq!(&snapshots[0].players["red"].at, &origin);
        prop_assert!(last.players["red"].in_jail);
        prop_assert_eq!(last.double_roll_stack, 0);
        prop_assert_eq!(&last.players["red"].at, &engine.catalog().board.jail_cell);
        prop_assert_eq!(last.players["red"].budget, 1500);
        prop_assert!(last.pending_actions.iter().all(|a| matches!(
            a.kind(),
            ActionKind::ShowMessage | ActionKind::EndTurn
        )));
    }
}
