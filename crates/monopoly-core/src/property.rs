//! Property ownership, rent and building management.
//!
//! This module contains:
//! - Per-property state and the derived capability record
//! - Monopoly detection and the even-building rule
//! - Rent formulas for streets, railroads and utilities
//! - Buy, rent, upgrade, downgrade, mortgage and unmortgage transactions

use crate::actions::{ActionKind, PendingAction};
use crate::catalog::{Catalog, Money, PropertyGroup, PropertyId, PropertyInfo};
use crate::game::{admit, Engine, GameError, GameState, Rejection};
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Building level: -1 mortgaged, 0 unimproved, 1..=max buildings
pub type Level = i8;

/// Level of a mortgaged property
pub const MORTGAGED: Level = -1;

/// What the owner may currently do with a property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub can_upgrade: bool,
    pub can_downgrade: bool,
    pub can_mortgage: bool,
    pub can_unmortgage: bool,
}

/// Mutable state of a bought property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyState {
    #[serde(default)]
    pub owner: Option<PlayerId>,
    pub level: Level,
    /// Derived; recomputed at every transaction and turn boundary
    #[serde(flatten)]
    pub capabilities: Capabilities,
}

impl PropertyState {
    /// A freshly bought, unimproved property
    pub fn owned_by(player: &str) -> Self {
        Self {
            owner: Some(player.to_string()),
            level: 0,
            capabilities: Capabilities::default(),
        }
    }

    pub fn is_mortgaged(&self) -> bool {
        self.level == MORTGAGED
    }
}

fn reject<T>(reason: Rejection) -> Result<T, GameError> {
    Err(GameError::Rejected(reason))
}

/// The property's state, provided `player` owns it
fn owned<'a>(state: &'a GameState, id: &str, player: &str) -> Result<&'a PropertyState, GameError> {
    match state.property_states.get(id) {
        Some(prop) if prop.owner.as_deref() == Some(player) => Ok(prop),
        _ => reject(Rejection::NotOwner),
    }
}

/// Levels of the other members of the property's group
fn sibling_levels<'a>(
    catalog: &'a Catalog,
    state: &'a GameState,
    info: &'a PropertyInfo,
) -> impl Iterator<Item = Level> + 'a {
    catalog
        .group_members(&info.group)
        .iter()
        .filter(move |id| **id != info.id)
        .filter_map(move |id| state.property_states.get(id).map(|s| s.level))
}

/// Houses that stand on a lot just below the hotel level
fn houses_below_top(info: &PropertyInfo) -> i32 {
    i32::from(info.max_level() - 1).max(0)
}

/// Whether `player` owns every property of `group`.
///
/// A property nobody ever bought breaks the monopoly.
pub fn owns_monopoly(
    catalog: &Catalog,
    state: &GameState,
    group: &PropertyGroup,
    player: &str,
) -> bool {
    let members = catalog.group_members(group);
    !members.is_empty()
        && members.iter().all(|id| {
            state
                .property_states
                .get(id)
                .map_or(false, |s| s.owner.as_deref() == Some(player))
        })
}

/// Unmortgaged members of `group` held by `owner`
fn active_holdings(
    catalog: &Catalog,
    state: &GameState,
    group: &PropertyGroup,
    owner: &str,
) -> usize {
    catalog
        .group_members(group)
        .iter()
        .filter_map(|id| state.property_states.get(id))
        .filter(|s| s.owner.as_deref() == Some(owner) && s.level >= 0)
        .count()
}

/// Rent owed for landing on a property with the given dice sum
pub fn rent_due(
    catalog: &Catalog,
    state: &GameState,
    id: &str,
    dice_sum: u8,
) -> Result<Money, GameError> {
    let info = catalog.property(id)?;
    let prop = match state.property_states.get(id) {
        Some(prop) => prop,
        None => return reject(Rejection::Unowned),
    };
    let owner = match prop.owner.as_deref() {
        Some(owner) => owner,
        None => return reject(Rejection::Unowned),
    };
    if prop.is_mortgaged() {
        return reject(Rejection::Mortgaged);
    }

    let rent = match info.group {
        PropertyGroup::Street(_) => info.rent_at(usize::try_from(prop.level).unwrap_or(0)),
        PropertyGroup::Railroad => {
            let held = active_holdings(catalog, state, &info.group, owner);
            info.rent_at(held.saturating_sub(1))
        }
        PropertyGroup::Utility => {
            let held = active_holdings(catalog, state, &info.group, owner);
            info.rent_at(held.saturating_sub(1)) * Money::from(dice_sum)
        }
    };
    Ok(rent)
}

/// Budget plus full price of unmortgaged and half price of mortgaged holdings
pub fn net_worth(catalog: &Catalog, state: &GameState, player: &str) -> Result<Money, GameError> {
    let mut worth = state.player(player)?.budget;
    for (id, prop) in state.owned_by(player) {
        let price = catalog.property(id)?.price;
        worth += if prop.is_mortgaged() { price / 2 } else { price };
    }
    Ok(worth)
}

pub(crate) fn refresh_total(
    catalog: &Catalog,
    state: &mut GameState,
    player: &str,
) -> Result<(), GameError> {
    let total = net_worth(catalog, state, player)?;
    state.player_mut(player)?.total = total;
    Ok(())
}

pub fn check_upgrade(
    catalog: &Catalog,
    state: &GameState,
    id: &str,
    player: &str,
) -> Result<(), GameError> {
    let info = catalog.property(id)?;
    let prop = owned(state, id, player)?;
    let cost = info.upgrade.ok_or(Rejection::NotBuildable)?;

    if prop.is_mortgaged() {
        return reject(Rejection::Mortgaged);
    }
    let max = info.max_level();
    if prop.level >= max {
        return reject(Rejection::MaxLevel);
    }
    if !owns_monopoly(catalog, state, &info.group, player) {
        return reject(Rejection::NoMonopoly);
    }
    if let Some(lowest) = sibling_levels(catalog, state, info).min() {
        if prop.level > lowest {
            return reject(Rejection::UnevenBuilding);
        }
    }

    let budget = state.player(player)?.budget;
    if budget < cost {
        return reject(Rejection::CannotAfford { cost, budget });
    }

    if prop.level + 1 == max {
        if state.hotels_left < 1 {
            return reject(Rejection::OutOfHotels);
        }
    } else if state.houses_left < 1 {
        return reject(Rejection::OutOfHouses);
    }

    Ok(())
}

pub fn check_downgrade(
    catalog: &Catalog,
    state: &GameState,
    id: &str,
    player: &str,
) -> Result<(), GameError> {
    let info = catalog.property(id)?;
    let prop = owned(state, id, player)?;
    info.upgrade.ok_or(Rejection::NotBuildable)?;

    if prop.level <= 0 {
        return reject(Rejection::NoBuildings);
    }
    if let Some(highest) = sibling_levels(catalog, state, info).max() {
        if prop.level < highest {
            return reject(Rejection::UnevenBuilding);
        }
    }
    if prop.level == info.max_level() && state.houses_left < houses_below_top(info) {
        return reject(Rejection::OutOfHouses);
    }

    Ok(())
}

pub fn check_mortgage(
    catalog: &Catalog,
    state: &GameState,
    id: &str,
    player: &str,
) -> Result<(), GameError> {
    let info = catalog.property(id)?;
    let prop = owned(state, id, player)?;

    if prop.is_mortgaged() {
        return reject(Rejection::Mortgaged);
    }
    if prop.level > 0 {
        return reject(Rejection::HasBuildings);
    }
    let built = catalog.group_members(&info.group).iter().any(|member| {
        state
            .property_states
            .get(member)
            .map_or(false, |s| s.owner.as_deref() == Some(player) && s.level > 0)
    });
    if built {
        return reject(Rejection::BuildingsInGroup);
    }

    Ok(())
}

pub fn check_unmortgage(
    catalog: &Catalog,
    state: &GameState,
    id: &str,
    player: &str,
) -> Result<(), GameError> {
    let info = catalog.property(id)?;
    let prop = owned(state, id, player)?;

    if !prop.is_mortgaged() {
        return reject(Rejection::NotMortgaged);
    }
    let cost = info.unmortgage();
    let budget = state.player(player)?.budget;
    if budget < cost {
        return reject(Rejection::CannotAfford { cost, budget });
    }

    Ok(())
}

/// Capability record of one property for one player.
///
/// Always all-false for properties the player does not own.
pub fn capabilities(catalog: &Catalog, state: &GameState, id: &str, player: &str) -> Capabilities {
    Capabilities {
        can_upgrade: check_upgrade(catalog, state, id, player).is_ok(),
        can_downgrade: check_downgrade(catalog, state, id, player).is_ok(),
        can_mortgage: check_mortgage(catalog, state, id, player).is_ok(),
        can_unmortgage: check_unmortgage(catalog, state, id, player).is_ok(),
    }
}

/// Recompute the stored capability flags of every property for `player`
pub(crate) fn refresh_capabilities(catalog: &Catalog, state: &mut GameState, player: &str) {
    let updated: Vec<(PropertyId, Capabilities)> = state
        .property_states
        .keys()
        .map(|id| (id.clone(), capabilities(catalog, state, id, player)))
        .collect();

    for (id, caps) in updated {
        if let Some(prop) = state.property_states.get_mut(&id) {
            prop.capabilities = caps;
        }
    }
}

type Check = fn(&Catalog, &GameState, &str, &str) -> Result<(), GameError>;

impl Engine {
    /// Accept or decline the pending purchase offer for a property
    pub fn buy_property(
        &self,
        state: GameState,
        property_id: &str,
        buy: bool,
    ) -> Result<GameState, GameError> {
        state.verify(self.catalog())?;
        if let Some(reason) = admit(self.check_buy(&state, property_id, buy))? {
            debug!(%reason, property = property_id, "purchase ignored");
            return Ok(state);
        }

        let catalog = self.catalog();
        let mut state = state;
        let player = state.current_player.clone();
        state.take_pending(|a| {
            a.kind() == ActionKind::BuyProperty && a.is_for_property(property_id)
        });

        if !buy {
            state.message(format!("Declined to buy {property_id}"));
            return Ok(state);
        }

        let price = catalog.property(property_id)?.price;
        state.player_mut(&player)?.budget -= price;
        state
            .property_states
            .insert(property_id.to_string(), PropertyState::owned_by(&player));
        refresh_total(catalog, &mut state, &player)?;
        refresh_capabilities(catalog, &mut state, &player);
        state.message(format!("Bought {property_id} for {price}k"));

        Ok(state)
    }

    pub(crate) fn check_buy(
        &self,
        state: &GameState,
        property_id: &str,
        buy: bool,
    ) -> Result<(), GameError> {
        let info = self.catalog().property(property_id)?;
        let offered = state
            .pending_actions
            .iter()
            .any(|a| a.kind() == ActionKind::BuyProperty && a.is_for_property(property_id));
        if !offered {
            return reject(Rejection::NotPending(ActionKind::BuyProperty));
        }
        if !buy {
            return Ok(());
        }

        if state
            .property_states
            .get(property_id)
            .map_or(false, |s| s.owner.is_some())
        {
            return reject(Rejection::AlreadyOwned);
        }
        let budget = state.current()?.budget;
        if budget < info.price {
            return reject(Rejection::CannotAfford {
                cost: info.price,
                budget,
            });
        }

        Ok(())
    }

    /// Pay the pending rent for a property to its owner
    pub fn pay_rent(&self, state: GameState, property_id: &str) -> Result<GameState, GameError> {
        state.verify(self.catalog())?;
        if let Some(reason) = admit(self.check_rent(&state, property_id))? {
            debug!(%reason, property = property_id, "rent payment ignored");
            return Ok(state);
        }

        let catalog = self.catalog();
        let mut state = state;
        let player = state.current_player.clone();
        let dice_sum = match state
            .take_pending(|a| a.kind() == ActionKind::PayRent && a.is_for_property(property_id))
        {
            Some(PendingAction::PayRent { dice_sum, .. }) => dice_sum,
            _ => return Ok(state),
        };

        let rent = rent_due(catalog, &state, property_id, dice_sum)?;
        let owner = state
            .property_states
            .get(property_id)
            .and_then(|s| s.owner.clone())
            .ok_or(Rejection::Unowned)?;

        state.player_mut(&player)?.budget -= rent;
        state.player_mut(&owner)?.budget += rent;
        refresh_total(catalog, &mut state, &player)?;
        refresh_total(catalog, &mut state, &owner)?;
        refresh_capabilities(catalog, &mut state, &player);
        state.message(format!("Paid {rent}k rent to {owner}"));

        Ok(state)
    }

    pub(crate) fn check_rent(&self, state: &GameState, property_id: &str) -> Result<(), GameError> {
        self.catalog().property(property_id)?;
        let owed = state
            .pending_actions
            .iter()
            .any(|a| a.kind() == ActionKind::PayRent && a.is_for_property(property_id));
        if !owed {
            return reject(Rejection::NotPending(ActionKind::PayRent));
        }

        let prop = state
            .property_states
            .get(property_id)
            .ok_or(Rejection::Unowned)?;
        match prop.owner.as_deref() {
            None => reject(Rejection::Unowned),
            Some(owner) if owner == state.current_player => reject(Rejection::OwnProperty),
            Some(_) if prop.is_mortgaged() => reject(Rejection::Mortgaged),
            Some(_) => Ok(()),
        }
    }

    /// Add one building level
    pub fn upgrade_property(
        &self,
        state: GameState,
        property_id: &str,
    ) -> Result<GameState, GameError> {
        self.transact(state, property_id, "upgrade", check_upgrade, |info, state, player| {
            let cost = info.upgrade.ok_or(Rejection::NotBuildable)?;
            state.player_mut(player)?.budget -= cost;
            let level = raise_level(state, &info.id, 1)?;

            if level == info.max_level() {
                state.hotels_left -= 1;
                state.houses_left += houses_below_top(info);
            } else {
                state.houses_left -= 1;
            }
            Ok(())
        })
    }

    /// Remove one building level, refunding half the upgrade cost
    pub fn downgrade_property(
        &self,
        state: GameState,
        property_id: &str,
    ) -> Result<GameState, GameError> {
        self.transact(state, property_id, "downgrade", check_downgrade, |info, state, player| {
            let refund = info.downgrade().ok_or(Rejection::NotBuildable)?;
            state.player_mut(player)?.budget += refund;
            let level = raise_level(state, &info.id, -1)?;

            if level + 1 == info.max_level() {
                state.hotels_left += 1;
                state.houses_left -= houses_below_top(info);
            } else {
                state.houses_left += 1;
            }
            Ok(())
        })
    }

    pub fn mortgage_property(
        &self,
        state: GameState,
        property_id: &str,
    ) -> Result<GameState, GameError> {
        self.transact(state, property_id, "mortgage", check_mortgage, |info, state, player| {
            state.player_mut(player)?.budget += info.mortgage;
            set_level(state, &info.id, MORTGAGED)
        })
    }

    pub fn unmortgage_property(
        &self,
        state: GameState,
        property_id: &str,
    ) -> Result<GameState, GameError> {
        self.transact(state, property_id, "unmortgage", check_unmortgage, |info, state, player| {
            state.player_mut(player)?.budget -= info.unmortgage();
            set_level(state, &info.id, 0)
        })
    }

    /// Shared flow of the owner-only transactions: verify, gate, apply,
    /// then recompute net worth and capability flags.
    fn transact<F>(
        &self,
        state: GameState,
        property_id: &str,
        verb: &str,
        check: Check,
        apply: F,
    ) -> Result<GameState, GameError>
    where
        F: FnOnce(&PropertyInfo, &mut GameState, &str) -> Result<(), GameError>,
    {
        let catalog = self.catalog();
        state.verify(catalog)?;
        let player = state.current_player.clone();

        if let Some(reason) = admit(check(catalog, &state, property_id, &player))? {
            debug!(%reason, property = property_id, "{verb} ignored");
            return Ok(state);
        }

        let mut state = state;
        let info = catalog.property(property_id)?;
        apply(info, &mut state, &player)?;
        refresh_total(catalog, &mut state, &player)?;
        refresh_capabilities(catalog, &mut state, &player);

        Ok(state)
    }
}

fn property_mut<'a>(
    state: &'a mut GameState,
    id: &str,
) -> Result<&'a mut PropertyState, GameError> {
    state
        .property_states
        .get_mut(id)
        .ok_or_else(|| GameError::UnknownProperty(id.to_string()))
}

fn raise_level(state: &mut GameState, id: &str, delta: Level) -> Result<Level, GameError> {
    let prop = property_mut(state, id)?;
    prop.level += delta;
    Ok(prop.level)
}

fn set_level(state: &mut GameState, id: &str, level: Level) -> Result<(), GameError> {
    property_mut(state, id)?.level = level;
    Ok(())
}
