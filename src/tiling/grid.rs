//! # Tile Grid
//!
//! A `Grid` describes a tile pyramid laid over a fixed rectangular extent:
//! the number of root tiles at level 0, the number of samples along a tile
//! edge and the resulting ground resolution of every zoom level.
//!
//! Two profiles are provided:
//! - **Geodetic** (EPSG:4326): extent `±180° × ±90°`, two root tiles side by side
//! - **Mercator** (EPSG:3857): the square spherical-mercator extent, one root tile
//!
//! Tile bounds are derived from the tile's pixel offsets so that neighbouring
//! tiles compute their shared edge with the same floating point expression.

use super::{BorderDirection, GeographicBounds, TileCoordinate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Semi-major axis of the WGS84 ellipsoid in metres.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// Supported tiling profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Geodetic,
    Mercator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    extent: GeographicBounds,
    tile_size: u32,
    root_tiles: u32,
    initial_resolution: f64,
}

impl Grid {
    /// Creates a grid over `extent` whose level 0 is `root_tiles` tiles wide.
    ///
    /// # Arguments
    /// * `extent` - Full extent of the pyramid
    /// * `tile_size` - Number of samples along a tile edge
    /// * `root_tiles` - Number of level-0 tiles along the X axis
    pub fn new(extent: GeographicBounds, tile_size: u32, root_tiles: u32) -> Self {
        let initial_resolution = extent.width() / root_tiles as f64 / tile_size as f64;
        Self {
            extent,
            tile_size,
            root_tiles,
            initial_resolution,
        }
    }

    pub fn global_geodetic(tile_size: u32) -> Self {
        Self::new(
            GeographicBounds::new(-180.0, -90.0, 180.0, 90.0),
            tile_size,
            2,
        )
    }

    pub fn global_mercator(tile_size: u32) -> Self {
        let origin_shift = PI * WGS84_SEMI_MAJOR_AXIS;
        Self::new(
            GeographicBounds::new(-origin_shift, -origin_shift, origin_shift, origin_shift),
            tile_size,
            1,
        )
    }

    pub fn for_profile(profile: Profile, tile_size: u32) -> Self {
        match profile {
            Profile::Geodetic => Self::global_geodetic(tile_size),
            Profile::Mercator => Self::global_mercator(tile_size),
        }
    }

    pub fn extent(&self) -> &GeographicBounds {
        &self.extent
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Ground units per sample at `zoom`.
    pub fn resolution(&self, zoom: u8) -> f64 {
        self.initial_resolution / 2f64.powi(zoom as i32)
    }

    /// Number of tiles spanning the extent's width at level 0.
    pub fn tiles_at_level_zero(&self) -> u32 {
        let tiles = self.extent.width() / (self.tile_size as f64 * self.resolution(0));
        tiles.round() as u32
    }

    /// Number of tiles along the X and Y axes at `zoom`.
    pub fn tiles_per_axis(&self, zoom: u8) -> (u32, u32) {
        let span = self.tile_span(zoom);
        let columns = (self.extent.width() / span).round() as u32;
        let rows = (self.extent.height() / span).round() as u32;
        (columns, rows)
    }

    pub fn contains(&self, coordinate: &TileCoordinate) -> bool {
        let (columns, rows) = self.tiles_per_axis(coordinate.zoom);
        coordinate.x < columns && coordinate.y < rows
    }

    /// Geographic bounds of a tile.
    pub fn tile_bounds(&self, coordinate: &TileCoordinate) -> GeographicBounds {
        let span = self.tile_span(coordinate.zoom);
        GeographicBounds::new(
            self.extent.min_x + coordinate.x as f64 * span,
            self.extent.min_y + coordinate.y as f64 * span,
            self.extent.min_x + (coordinate.x + 1) as f64 * span,
            self.extent.min_y + (coordinate.y + 1) as f64 * span,
        )
    }

    /// Inclusive range of tiles at `zoom` that overlap `bounds`.
    ///
    /// # Returns
    /// `Some((lower_left, upper_right))`, or `None` if `bounds` does not
    /// overlap the grid extent
    pub fn tile_range(
        &self,
        bounds: &GeographicBounds,
        zoom: u8,
    ) -> Option<(TileCoordinate, TileCoordinate)> {
        if !self.extent.overlaps(bounds) {
            return None;
        }
        let span = self.tile_span(zoom);
        let (columns, rows) = self.tiles_per_axis(zoom);
        let first = |offset: f64, count: u32| {
            ((offset / span).floor().max(0.0) as u32).min(count.saturating_sub(1))
        };
        let last = |offset: f64, count: u32| {
            (((offset / span).ceil() - 1.0).max(0.0) as u32).min(count.saturating_sub(1))
        };
        let lower_left = TileCoordinate::new(
            zoom,
            first(bounds.min_x - self.extent.min_x, columns),
            first(bounds.min_y - self.extent.min_y, rows),
        );
        let upper_right = TileCoordinate::new(
            zoom,
            last(bounds.max_x - self.extent.min_x, columns),
            last(bounds.max_y - self.extent.min_y, rows),
        );
        Some((lower_left, upper_right))
    }

    /// Coordinate of the neighbour across border `border_index`
    /// (0 = west, 1 = north, 2 = east, 3 = south).
    ///
    /// # Returns
    /// `None` for an unknown border index or a neighbour outside the grid
    pub fn neighbor_coordinate(
        &self,
        coordinate: &TileCoordinate,
        border_index: usize,
    ) -> Option<TileCoordinate> {
        let neighbor =
            BorderDirection::from_index(border_index)?.neighbor_coordinate(coordinate)?;
        self.contains(&neighbor).then_some(neighbor)
    }

    /// Ground width of a tile at `zoom`, equal to `tile_size · resolution(zoom)`
    /// but computed without the rounding of the per-sample resolution.
    fn tile_span(&self, zoom: u8) -> f64 {
        self.extent.width() / self.root_tiles as f64 / 2f64.powi(zoom as i32)
    }
}
