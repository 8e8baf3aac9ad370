//! # Tiling Scheme
//!
//! Quadtree tile addressing and the geographic geometry of tiles.
//!
//! ## Components
//! - `TileCoordinate`: `(zoom, x, y)` address of a tile, TMS convention
//!   (`y` grows northwards)
//! - `BorderDirection`: The four tile borders, indexed `0..4`
//! - `GeographicBounds`: Axis-aligned rectangle in the grid's coordinate system
//! - `GridTransform`: Maps sample positions of a tile grid to geographic
//!   coordinates
//! - `Grid`: A tile pyramid over a fixed extent (global geodetic or mercator)

pub mod bounds;
pub mod grid;

pub use bounds::{GeographicBounds, GridTransform};
pub use grid::{Grid, Profile};

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a tile in the quadtree pyramid.
///
/// Level 0 holds the root tiles of the grid; every level doubles the number
/// of tiles along each axis. `y` follows the TMS convention, so `y + 1` is the
/// tile to the north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoordinate {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Returns the coordinate of the tile one zoom level up that contains this one,
    /// or `None` at level 0.
    pub fn parent(&self) -> Option<TileCoordinate> {
        let zoom = self.zoom.checked_sub(1)?;
        Some(TileCoordinate::new(zoom, self.x / 2, self.y / 2))
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// One of the four borders of a tile.
///
/// The discriminants are the border indices used when walking the
/// neighbours of a tile: west, north, east, south. Odd indices are the
/// borders shared with a neighbour along the Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
pub enum BorderDirection {
    West = 0,
    North = 1,
    East = 2,
    South = 3,
}

impl BorderDirection {
    /// All borders in index order.
    pub const ALL: [BorderDirection; 4] = [
        BorderDirection::West,
        BorderDirection::North,
        BorderDirection::East,
        BorderDirection::South,
    ];

    pub fn from_index(index: usize) -> Option<BorderDirection> {
        num::FromPrimitive::from_usize(index)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the north and south borders.
    pub fn is_y_axis(self) -> bool {
        self.index() % 2 != 0
    }

    pub fn opposite(self) -> BorderDirection {
        match self {
            BorderDirection::West => BorderDirection::East,
            BorderDirection::North => BorderDirection::South,
            BorderDirection::East => BorderDirection::West,
            BorderDirection::South => BorderDirection::North,
        }
    }

    /// Coordinate of the tile on the other side of this border.
    ///
    /// Only checks for underflow at the western and southern edges of the
    /// pyramid; use `Grid::neighbor_coordinate` to also bound-check against
    /// the grid.
    pub fn neighbor_coordinate(self, coordinate: &TileCoordinate) -> Option<TileCoordinate> {
        let TileCoordinate { zoom, x, y } = *coordinate;
        let (x, y) = match self {
            BorderDirection::West => (x.checked_sub(1)?, y),
            BorderDirection::North => (x, y.checked_add(1)?),
            BorderDirection::East => (x.checked_add(1)?, y),
            BorderDirection::South => (x, y.checked_sub(1)?),
        };
        Some(TileCoordinate::new(zoom, x, y))
    }
}

impl fmt::Display for BorderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BorderDirection::West => "west",
            BorderDirection::North => "north",
            BorderDirection::East => "east",
            BorderDirection::South => "south",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_indices_round_trip() {
        for border in BorderDirection::ALL {
            assert_eq!(BorderDirection::from_index(border.index()), Some(border));
        }
        assert_eq!(BorderDirection::from_index(4), None);
    }

    #[test]
    fn odd_borders_are_y_axis() {
        assert!(!BorderDirection::West.is_y_axis());
        assert!(BorderDirection::North.is_y_axis());
        assert!(!BorderDirection::East.is_y_axis());
        assert!(BorderDirection::South.is_y_axis());
    }

    #[test]
    fn neighbor_coordinates_follow_tms() {
        let tile = TileCoordinate::new(9, 10, 20);
        assert_eq!(
            BorderDirection::North.neighbor_coordinate(&tile),
            Some(TileCoordinate::new(9, 10, 21))
        );
        assert_eq!(
            BorderDirection::West.neighbor_coordinate(&tile),
            Some(TileCoordinate::new(9, 9, 20))
        );
        let origin = TileCoordinate::new(3, 0, 0);
        assert_eq!(BorderDirection::West.neighbor_coordinate(&origin), None);
        assert_eq!(BorderDirection::South.neighbor_coordinate(&origin), None);
    }

    #[test]
    fn opposite_is_an_involution() {
        for border in BorderDirection::ALL {
            assert_eq!(border.opposite().opposite(), border);
            assert_eq!(border.opposite().is_y_axis(), border.is_y_axis());
        }
    }

    #[test]
    fn parent_halves_the_coordinate() {
        assert_eq!(
            TileCoordinate::new(5, 7, 12).parent(),
            Some(TileCoordinate::new(4, 3, 6))
        );
        assert_eq!(TileCoordinate::new(0, 0, 0).parent(), None);
        assert_eq!(TileCoordinate::new(5, 7, 12).to_string(), "5/7/12");
    }
}
