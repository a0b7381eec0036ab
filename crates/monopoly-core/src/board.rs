//! Board geometry and the circular track.
//!
//! This module contains:
//! - Space identifiers and their display positions
//! - The board description (four corners, four sides, jail aliases)
//! - The track: the fixed cyclic order tokens move along
//! - The path engine used for dice movement

use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Short code identifying a space (e.g. `BDAU`, `TT`, `A1`)
pub type SpaceId = String;

/// Which edge or corner of the board a space is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    N,
    E,
    S,
    W,
    NE,
    NW,
    SE,
    SW,
}

/// Display position of a space, in board cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacePosition {
    pub orient: Orientation,
    pub x: f64,
    pub y: f64,
}

impl SpacePosition {
    fn new(orient: Orientation, x: f64, y: f64) -> Self {
        Self { orient, x, y }
    }
}

/// Static board description.
///
/// The track runs south-east corner, south side, south-west corner, west
/// side, north-west corner, north side, north-east corner, east side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub south_east: SpaceId,
    pub south: Vec<SpaceId>,
    pub south_west: SpaceId,
    pub west: Vec<SpaceId>,
    pub north_west: SpaceId,
    pub north: Vec<SpaceId>,
    pub north_east: SpaceId,
    pub east: Vec<SpaceId>,
    /// Where a released prisoner stands ("just visiting")
    pub visiting: SpaceId,
    /// Off-track cell where jailed players are shown
    pub jail_cell: SpaceId,
    /// Display grouping of non-property spaces (taxes, card spaces, ...)
    #[serde(default)]
    pub special_groups: BTreeMap<String, Vec<SpaceId>>,
}

impl Board {
    /// The standard 40-space board
    pub fn standard() -> Self {
        let ids = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut special_groups = BTreeMap::new();
        special_groups.insert("tax".to_string(), ids(&["TTN", "TDB"]));
        special_groups.insert("community".to_string(), ids(&["KV1", "KV2", "KV3"]));
        special_groups.insert("chance".to_string(), ids(&["CH1", "CH2", "CH3"]));
        special_groups.insert("jail".to_string(), ids(&["VT"]));

        Self {
            south_east: "BDAU".to_string(),
            south: ids(&["A1", "KV1", "A2", "TTN", "R1", "B1", "CH1", "B2", "B3"]),
            south_west: "TT".to_string(),
            west: ids(&["C1", "U1", "C2", "C3", "R2", "D1", "KV2", "D2", "D3"]),
            north_west: "BDX".to_string(),
            north: ids(&["E1", "CH2", "E2", "E3", "R3", "F1", "F2", "U2", "F3"]),
            north_east: "VT".to_string(),
            east: ids(&["G1", "G2", "KV3", "G3", "R4", "CH3", "H1", "TDB", "H2"]),
            visiting: "TT".to_string(),
            jail_cell: "OT".to_string(),
            special_groups,
        }
    }

    /// Build the track in its fixed cyclic order
    pub fn track(&self) -> Track {
        let mut spaces = Vec::with_capacity(
            4 + self.south.len() + self.west.len() + self.north.len() + self.east.len(),
        );
        spaces.push(self.south_east.clone());
        spaces.extend(self.south.iter().cloned());
        spaces.push(self.south_west.clone());
        spaces.extend(self.west.iter().cloned());
        spaces.push(self.north_west.clone());
        spaces.extend(self.north.iter().cloned());
        spaces.push(self.north_east.clone());
        spaces.extend(self.east.iter().cloned());
        Track::new(spaces)
    }

    /// Display position of every space, including the jail cell
    pub fn layout(&self) -> BTreeMap<SpaceId, SpacePosition> {
        let vt_max = (self.south.len() + 4) as f64;
        let mut layout = BTreeMap::new();

        for (i, space) in self.south.iter().enumerate() {
            let pos = SpacePosition::new(Orientation::S, vt_max - 3.0 - i as f64, vt_max - 2.0);
            layout.insert(space.clone(), pos);
        }
        for (i, space) in self.west.iter().enumerate() {
            let pos = SpacePosition::new(Orientation::W, 0.0, vt_max - 3.0 - i as f64);
            layout.insert(space.clone(), pos);
        }
        for (i, space) in self.east.iter().enumerate() {
            let pos = SpacePosition::new(Orientation::E, vt_max - 2.0, 2.0 + i as f64);
            layout.insert(space.clone(), pos);
        }
        for (i, space) in self.north.iter().enumerate() {
            let pos = SpacePosition::new(Orientation::N, 2.0 + i as f64, 0.0);
            layout.insert(space.clone(), pos);
        }

        let corner = |orient, x, y| SpacePosition::new(orient, x, y);
        layout.insert(
            self.south_east.clone(),
            corner(Orientation::SE, vt_max - 2.0, vt_max - 2.0),
        );
        layout.insert(self.south_west.clone(), corner(Orientation::SW, 0.0, vt_max - 2.0));
        layout.insert(self.north_west.clone(), corner(Orientation::NW, 0.0, 0.0));
        layout.insert(self.north_east.clone(), corner(Orientation::NE, vt_max - 2.0, 0.0));
        layout.insert(self.jail_cell.clone(), corner(Orientation::SW, 0.75, vt_max - 2.0));

        layout
    }

    /// Reverse index of `special_groups`: space id to group name
    pub fn special_spaces(&self) -> BTreeMap<SpaceId, String> {
        self.special_groups
            .iter()
            .flat_map(|(group, spaces)| spaces.iter().map(move |s| (s.clone(), group.clone())))
            .collect()
    }
}

/// The cyclic sequence of spaces, with a position index for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<SpaceId>")]
pub struct Track {
    spaces: Vec<SpaceId>,
    positions: HashMap<SpaceId, usize>,
}

impl Track {
    pub fn new(spaces: Vec<SpaceId>) -> Self {
        let mut positions = HashMap::with_capacity(spaces.len());
        for (i, space) in spaces.iter().enumerate() {
            positions.entry(space.clone()).or_insert(i);
        }
        Self { spaces, positions }
    }

    pub fn spaces(&self) -> &[SpaceId] {
        &self.spaces
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    pub fn contains(&self, space: &str) -> bool {
        self.positions.contains_key(space)
    }

    /// The first space of the track, where every token starts
    pub fn start(&self) -> Option<&SpaceId> {
        self.spaces.first()
    }

    /// Position of a space on the track
    pub fn index_of(&self, space: &str) -> Result<usize, GameError> {
        self.positions
            .get(space)
            .copied()
            .ok_or_else(|| GameError::UnknownSpace(space.to_string()))
    }

    /// Spaces visited when moving `steps` forward from `start`.
    ///
    /// The path has `steps + 1` entries and begins with `start` itself.
    pub fn path_from(&self, start: &str, steps: usize) -> Result<Vec<SpaceId>, GameError> {
        let origin = self.index_of(start)?;
        let len = self.spaces.len();
        Ok((0..=steps)
            .map(|i| self.spaces[(origin + i) % len].clone())
            .collect())
    }
}

impl From<Track> for Vec<SpaceId> {
    fn from(track: Track) -> Self {
        track.spaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_track_order() {
        let track = Board::standard().track();

        assert_eq!(track.len(), 40);
        assert_eq!(track.spaces()[0], "BDAU");
        assert_eq!(track.spaces()[10], "TT");
        assert_eq!(track.spaces()[20], "BDX");
        assert_eq!(track.spaces()[30], "VT");
        assert_eq!(track.spaces()[39], "H2");
        assert_eq!(track.start().map(String::as_str), Some("BDAU"));
    }

    #[test]
    fn test_index_of_unknown_space() {
        let track = Board::standard().track();

        assert_eq!(track.index_of("TT").unwrap(), 10);
        assert_eq!(
            track.index_of("NOPE"),
            Err(GameError::UnknownSpace("NOPE".to_string()))
        );
        // The jail cell is displayed but never walked over
        assert!(!track.contains("OT"));
    }

    #[test]
    fn test_path_from_start() {
        let track = Board::standard().track();
        let path = track.path_from("BDAU", 7).unwrap();

        assert_eq!(path.len(), 8);
        assert_eq!(path.first().unwrap(), "BDAU");
        assert_eq!(path.last().unwrap(), "CH1");
    }

    #[test]
    fn test_path_wraps_around() {
        let track = Board::standard().track();
        let path = track.path_from("H1", 4).unwrap();

        assert_eq!(path, vec!["H1", "TDB", "H2", "BDAU", "A1"]);
    }

    #[test]
    fn test_zero_steps() {
        let track = Board::standard().track();
        assert_eq!(track.path_from("E2", 0).unwrap(), vec!["E2"]);
    }

    #[test]
    fn test_layout_covers_every_space() {
        let board = Board::standard();
        let layout = board.layout();

        assert_eq!(layout.len(), 41);
        assert_eq!(layout["BDAU"].orient, Orientation::SE);
        assert_eq!(layout["BDAU"].x, 11.0);
        assert_eq!(layout["A1"].x, 10.0);
        assert_eq!(layout["OT"].x, 0.75);
    }

    #[test]
    fn test_special_spaces() {
        let special = Board::standard().special_spaces();
        assert_eq!(special["TTN"], "tax");
        assert_eq!(special["KV2"], "community");
        assert!(!special.contains_key("A1"));
    }
}
