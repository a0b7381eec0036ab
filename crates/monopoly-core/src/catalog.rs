//! Static game catalog: board, properties, cards and rule constants.
//!
//! The catalog is immutable once built. It can come from the built-in
//! standard board ([`Catalog::standard`]) or from a JSON document
//! ([`Catalog::from_json`]), which is validated before use.

use crate::board::{Board, SpaceId, SpacePosition, Track};
use crate::effects::{EffectTable, SpaceEffect};
use crate::game::GameError;
use crate::property::Level;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Amount of money, in thousands
pub type Money = i64;

/// Properties are identified by the space they occupy
pub type PropertyId = SpaceId;

/// Card identifier within a deck
pub type CardId = String;

/// Ownership group of a property
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyGroup {
    /// Ordinary color group, identified by its letter
    Street(char),
    /// Rent scales with the number of railroads the owner holds
    Railroad,
    /// Rent is a multiple of the dice sum
    Utility,
}

impl fmt::Display for PropertyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyGroup::Street(letter) => write!(f, "{letter}"),
            PropertyGroup::Railroad => write!(f, "railroad"),
            PropertyGroup::Utility => write!(f, "utility"),
        }
    }
}

/// Catalog entry for a purchasable space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub id: PropertyId,
    pub name: String,
    pub group: PropertyGroup,
    pub price: Money,
    /// Rent by building level (streets) or by ownership count (railroads, utilities)
    pub rent: Vec<Money>,
    pub mortgage: Money,
    /// Cost of one building step; absent for railroads and utilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<Money>,
}

impl PropertyInfo {
    /// Highest building level, the last index of the rent table
    pub fn max_level(&self) -> Level {
        Level::try_from(self.rent.len().saturating_sub(1)).unwrap_or(Level::MAX)
    }

    /// Cost to lift a mortgage: mortgage value plus 10%, truncated
    pub fn unmortgage(&self) -> Money {
        self.mortgage * 11 / 10
    }

    /// Refund for tearing down one building step
    pub fn downgrade(&self) -> Option<Money> {
        self.upgrade.map(|cost| cost / 2)
    }

    /// Rent table entry, clamped to the last index
    pub fn rent_at(&self, index: usize) -> Money {
        let last = self.rent.len().saturating_sub(1);
        self.rent.get(index.min(last)).copied().unwrap_or(0)
    }
}

/// The two card decks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deck {
    Community,
    Chance,
}

/// A community or chance card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub content: String,
}

impl Card {
    fn new(id: &str, title: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }
}

/// Rule constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub starting_budget: Money,
    /// Credited every time the start space is touched
    pub salary: Money,
    pub jail_fine: Money,
    /// Failed escape rolls before the fine becomes mandatory
    pub max_jail_turns: u8,
    /// Consecutive doubles that send the roller to jail
    pub max_double_rolls: u8,
    pub income_tax_percent: Money,
    pub income_tax_cap: Money,
    pub luxury_tax: Money,
    pub houses: i32,
    pub hotels: i32,
}

impl Rules {
    /// Money rules must be non-negative; roll limits must leave room for a
    /// counter to reach them.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let amounts = [
            ("starting_budget", self.starting_budget),
            ("salary", self.salary),
            ("jail_fine", self.jail_fine),
            ("income_tax_percent", self.income_tax_percent),
            ("income_tax_cap", self.income_tax_cap),
            ("luxury_tax", self.luxury_tax),
            ("houses", i64::from(self.houses)),
            ("hotels", i64::from(self.hotels)),
        ];
        if let Some((rule, value)) = amounts.into_iter().find(|(_, value)| *value < 0) {
            return Err(CatalogError::InvalidRule { rule, value });
        }

        let limits = [
            ("max_jail_turns", self.max_jail_turns),
            ("max_double_rolls", self.max_double_rolls),
        ];
        for (rule, value) in limits {
            if value == 0 || value == u8::MAX {
                return Err(CatalogError::InvalidRule {
                    rule,
                    value: i64::from(value),
                });
            }
        }

        Ok(())
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            starting_budget: 1500,
            salary: 200,
            jail_fine: 50,
            max_jail_turns: 3,
            max_double_rolls: 3,
            income_tax_percent: 10,
            income_tax_cap: 200,
            luxury_tax: 75,
            houses: 32,
            hotels: 12,
        }
    }
}

/// Errors raised while loading or validating a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Track is empty")]
    EmptyTrack,

    #[error("Space {0} appears more than once on the track")]
    DuplicateSpace(SpaceId),

    #[error("Visiting space {0} is not on the track")]
    VisitingOffTrack(SpaceId),

    #[error("Jail cell {0} must not be on the track")]
    JailCellOnTrack(SpaceId),

    #[error("Property {0} is not on the track")]
    PropertyOffTrack(PropertyId),

    #[error("Property {0} is listed twice")]
    DuplicateProperty(PropertyId),

    #[error("Property {0} has an empty rent table")]
    EmptyRent(PropertyId),

    #[error("Effect registered for unknown space {0}")]
    EffectOffTrack(SpaceId),

    #[error("Card {0} is listed twice")]
    DuplicateCard(CardId),

    #[error("Rule {rule} has invalid value {value}")]
    InvalidRule { rule: &'static str, value: i64 },
}

/// Raw catalog document as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSource {
    pub board: Board,
    pub properties: Vec<PropertyInfo>,
    #[serde(default)]
    pub community: Vec<Card>,
    #[serde(default)]
    pub chance: Vec<Card>,
    #[serde(default)]
    pub effects: EffectTable,
    #[serde(default)]
    pub rules: Rules,
}

/// The assembled, validated catalog
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub board: Board,
    pub track: Track,
    pub layout: BTreeMap<SpaceId, SpacePosition>,
    pub special_spaces: BTreeMap<SpaceId, String>,
    pub properties: BTreeMap<PropertyId, PropertyInfo>,
    pub community: BTreeMap<CardId, Card>,
    pub chance: BTreeMap<CardId, Card>,
    pub effects: EffectTable,
    pub rules: Rules,
    /// Group membership, in track order
    #[serde(skip)]
    groups: BTreeMap<PropertyGroup, Vec<PropertyId>>,
}

impl Catalog {
    /// The built-in standard board
    pub fn standard() -> Self {
        Self::assemble(CatalogSource::standard())
    }

    /// Parse and validate a JSON catalog document
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let source: CatalogSource = serde_json::from_str(json)?;
        Self::from_source(source)
    }

    /// Validate a catalog document and assemble it
    pub fn from_source(source: CatalogSource) -> Result<Self, CatalogError> {
        source.validate()?;
        Ok(Self::assemble(source))
    }

    fn assemble(source: CatalogSource) -> Self {
        let track = source.board.track();

        let mut groups: BTreeMap<PropertyGroup, Vec<PropertyId>> = BTreeMap::new();
        for space in track.spaces() {
            if let Some(info) = source.properties.iter().find(|p| &p.id == space) {
                groups.entry(info.group.clone()).or_default().push(info.id.clone());
            }
        }

        let by_id = |cards: Vec<Card>| cards.into_iter().map(|c| (c.id.clone(), c)).collect();

        Self {
            layout: source.board.layout(),
            special_spaces: source.board.special_spaces(),
            track,
            properties: source
                .properties
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            community: by_id(source.community),
            chance: by_id(source.chance),
            effects: source.effects,
            rules: source.rules,
            board: source.board,
            groups,
        }
    }

    /// Look up a property, failing on unknown ids
    pub fn property(&self, id: &str) -> Result<&PropertyInfo, GameError> {
        self.properties
            .get(id)
            .ok_or_else(|| GameError::UnknownProperty(id.to_string()))
    }

    /// All property ids of a group, in track order
    pub fn group_members(&self, group: &PropertyGroup) -> &[PropertyId] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn deck(&self, deck: Deck) -> &BTreeMap<CardId, Card> {
        match deck {
            Deck::Community => &self.community,
            Deck::Chance => &self.chance,
        }
    }

    /// Whether a token may stand on this space
    pub fn is_space(&self, space: &str) -> bool {
        self.track.contains(space) || space == self.board.jail_cell
    }
}

impl CatalogSource {
    /// Check the document for internal consistency
    pub fn validate(&self) -> Result<(), CatalogError> {
        let track = self.board.track();
        if track.is_empty() {
            return Err(CatalogError::EmptyTrack);
        }

        let mut seen = HashSet::new();
        for space in track.spaces() {
            if !seen.insert(space.as_str()) {
                return Err(CatalogError::DuplicateSpace(space.clone()));
            }
        }

        if !track.contains(&self.board.visiting) {
            return Err(CatalogError::VisitingOffTrack(self.board.visiting.clone()));
        }
        if track.contains(&self.board.jail_cell) {
            return Err(CatalogError::JailCellOnTrack(self.board.jail_cell.clone()));
        }

        let mut properties = HashSet::new();
        for info in &self.properties {
            if !track.contains(&info.id) {
                return Err(CatalogError::PropertyOffTrack(info.id.clone()));
            }
            if !properties.insert(info.id.as_str()) {
                return Err(CatalogError::DuplicateProperty(info.id.clone()));
            }
            if info.rent.is_empty() {
                return Err(CatalogError::EmptyRent(info.id.clone()));
            }
        }

        for space in self.effects.on_touch.keys().chain(self.effects.on_land.keys()) {
            if !track.contains(space) {
                return Err(CatalogError::EffectOffTrack(space.clone()));
            }
        }

        let mut cards = HashSet::new();
        for card in self.community.iter().chain(self.chance.iter()) {
            if !cards.insert(card.id.as_str()) {
                return Err(CatalogError::DuplicateCard(card.id.clone()));
            }
        }

        self.rules.validate()
    }

    /// Document for the standard board
    pub fn standard() -> Self {
        let board = Board::standard();

        let mut effects = EffectTable::default();
        effects.register_touch(&board.south_east, SpaceEffect::Salary);
        effects.register_land(&board.north_east, SpaceEffect::GoToJail);
        effects.register_land("TTN", SpaceEffect::IncomeTax);
        effects.register_land("TDB", SpaceEffect::LuxuryTax);
        for space in ["KV1", "KV2", "KV3"] {
            effects.register_land(space, SpaceEffect::DrawCard(Deck::Community));
        }
        for space in ["CH1", "CH2", "CH3"] {
            effects.register_land(space, SpaceEffect::DrawCard(Deck::Chance));
        }

        Self {
            board,
            properties: standard_properties(),
            community: standard_community(),
            chance: standard_chance(),
            effects,
            rules: Rules::default(),
        }
    }
}

fn street(
    id: &str,
    name: &str,
    group: char,
    price: Money,
    rent: [Money; 6],
    upgrade: Money,
) -> PropertyInfo {
    PropertyInfo {
        id: id.to_string(),
        name: name.to_string(),
        group: PropertyGroup::Street(group),
        price,
        rent: rent.to_vec(),
        mortgage: price / 2,
        upgrade: Some(upgrade),
    }
}

fn railroad(id: &str, name: &str) -> PropertyInfo {
    PropertyInfo {
        id: id.to_string(),
        name: name.to_string(),
        group: PropertyGroup::Railroad,
        price: 200,
        rent: vec![25, 50, 100, 200],
        mortgage: 100,
        upgrade: None,
    }
}

fn utility(id: &str, name: &str) -> PropertyInfo {
    PropertyInfo {
        id: id.to_string(),
        name: name.to_string(),
        group: PropertyGroup::Utility,
        price: 150,
        rent: vec![4, 10],
        mortgage: 75,
        upgrade: None,
    }
}

fn standard_properties() -> Vec<PropertyInfo> {
    vec![
        street("A1", "Mediterranean Avenue", 'A', 60, [2, 10, 30, 90, 160, 250], 50),
        street("A2", "Baltic Avenue", 'A', 60, [4, 20, 60, 180, 320, 450], 50),
        street("B1", "Oriental Avenue", 'B', 100, [6, 30, 90, 270, 400, 550], 50),
        street("B2", "Vermont Avenue", 'B', 100, [6, 30, 90, 270, 400, 550], 50),
        street("B3", "Connecticut Avenue", 'B', 120, [8, 40, 100, 300, 450, 600], 50),
        street("C1", "St. Charles Place", 'C', 140, [10, 50, 150, 450, 625, 750], 100),
        street("C2", "States Avenue", 'C', 140, [10, 50, 150, 450, 625, 750], 100),
        street("C3", "Virginia Avenue", 'C', 160, [12, 60, 180, 500, 700, 900], 100),
        street("D1", "St. James Place", 'D', 180, [14, 70, 200, 550, 750, 950], 100),
        street("D2", "Tennessee Avenue", 'D', 180, [14, 70, 200, 550, 750, 950], 100),
        street("D3", "New York Avenue", 'D', 200, [16, 80, 220, 600, 800, 1000], 100),
        street("E1", "Kentucky Avenue", 'E', 220, [18, 90, 250, 700, 875, 1050], 150),
        street("E2", "Indiana Avenue", 'E', 220, [18, 90, 250, 700, 875, 1050], 150),
        street("E3", "Illinois Avenue", 'E', 240, [20, 100, 300, 750, 925, 1100], 150),
        street("F1", "Atlantic Avenue", 'F', 260, [22, 110, 330, 800, 975, 1150], 150),
        street("F2", "Ventnor Avenue", 'F', 260, [22, 110, 330, 800, 975, 1150], 150),
        street("F3", "Marvin Gardens", 'F', 280, [24, 120, 360, 850, 1025, 1200], 150),
        street("G1", "Pacific Avenue", 'G', 300, [26, 130, 390, 900, 1100, 1275], 200),
        street("G2", "North Carolina Avenue", 'G', 300, [26, 130, 390, 900, 1100, 1275], 200),
        street("G3", "Pennsylvania Avenue", 'G', 320, [28, 150, 450, 1000, 1200, 1400], 200),
        street("H1", "Park Place", 'H', 350, [35, 175, 500, 1100, 1300, 1500], 200),
        street("H2", "Boardwalk", 'H', 400, [50, 200, 600, 1400, 1700, 2000], 200),
        railroad("R1", "Reading Railroad"),
        railroad("R2", "Pennsylvania Railroad"),
        railroad("R3", "B&O Railroad"),
        railroad("R4", "Short Line"),
        utility("U1", "Electric Company"),
        utility("U2", "Water Works"),
    ]
}

fn standard_community() -> Vec<Card> {
    vec![
        Card::new("KV01", "Bank error in your favor", "Collect 200k."),
        Card::new("KV02", "Doctor's fee", "Pay 50k."),
        Card::new("KV03", "Sale of stock", "You get 50k."),
        Card::new("KV04", "Holiday fund matures", "Receive 100k."),
        Card::new("KV05", "Income tax refund", "Collect 20k."),
        Card::new("KV06", "Hospital fees", "Pay 100k."),
        Card::new("KV07", "Consultancy fee", "Receive 25k."),
        Card::new("KV08", "Beauty contest", "You have won second prize. Collect 10k."),
    ]
}

fn standard_chance() -> Vec<Card> {
    vec![
        Card::new("CH01", "Advance to start", "Collect 200k."),
        Card::new("CH02", "Bank pays you dividend", "Collect 50k."),
        Card::new("CH03", "Speeding fine", "Pay 15k."),
        Card::new("CH04", "Building loan matures", "Collect 150k."),
        Card::new("CH05", "Chairman of the board", "Pay each player 50k."),
        Card::new("CH06", "Go back three spaces", "Move back three spaces."),
        Card::new("CH07", "General repairs", "Pay 25k for each house and 100k for each hotel."),
        Card::new("CH08", "Crossword competition", "Collect 100k."),
    ]
}
