use cgmath::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in the coordinate system of a tiling grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GeographicBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Strict overlap test: rectangles that only share an edge or a corner
    /// do not overlap.
    pub fn overlaps(&self, other: &GeographicBounds) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// South-west quadrant.
    pub fn sw(&self) -> GeographicBounds {
        let c = self.center();
        GeographicBounds::new(self.min_x, self.min_y, c.x, c.y)
    }

    /// North-west quadrant.
    pub fn nw(&self) -> GeographicBounds {
        let c = self.center();
        GeographicBounds::new(self.min_x, c.y, c.x, self.max_y)
    }

    /// North-east quadrant.
    pub fn ne(&self) -> GeographicBounds {
        let c = self.center();
        GeographicBounds::new(c.x, c.y, self.max_x, self.max_y)
    }

    /// South-east quadrant.
    pub fn se(&self) -> GeographicBounds {
        let c = self.center();
        GeographicBounds::new(c.x, self.min_y, self.max_x, c.y)
    }
}

/// Maps integer sample positions of a `width × height` tile grid to
/// geographic coordinates.
///
/// Column 0 lies on `min_x` and row 0 on `max_y` (row-major, north first).
/// The last column and row are pinned to `max_x` and `min_y` instead of being
/// computed from the cell size, so two tiles sharing an edge produce
/// bit-identical coordinates along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    bounds: GeographicBounds,
    cell_x: f64,
    cell_y: f64,
    last_column: u32,
    last_row: u32,
}

impl GridTransform {
    /// # Arguments
    /// * `bounds` - Geographic extent covered by the grid
    /// * `width` - Number of sample columns (at least 2 for a non-degenerate grid)
    /// * `height` - Number of sample rows (at least 2 for a non-degenerate grid)
    pub fn new(bounds: GeographicBounds, width: u32, height: u32) -> Self {
        let columns = width.max(2) - 1;
        let rows = height.max(2) - 1;
        Self {
            bounds,
            cell_x: bounds.width() / columns as f64,
            cell_y: bounds.height() / rows as f64,
            last_column: columns,
            last_row: rows,
        }
    }

    pub fn bounds(&self) -> &GeographicBounds {
        &self.bounds
    }

    /// Geographic `(x, y)` of the sample at column `x`, row `y`.
    pub fn to_geographic(&self, x: u32, y: u32) -> (f64, f64) {
        let geo_x = if x == self.last_column {
            self.bounds.max_x
        } else {
            self.bounds.min_x + x as f64 * self.cell_x
        };
        let geo_y = if y == self.last_row {
            self.bounds.min_y
        } else {
            self.bounds.max_y - y as f64 * self.cell_y
        };
        (geo_x, geo_y)
    }

    /// Fractional `(column, row)` of a geographic position.
    pub fn to_grid(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.bounds.min_x) / self.cell_x,
            (self.bounds.max_y - y) / self.cell_y,
        )
    }
}
