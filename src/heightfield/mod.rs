//! # Heightfield Simplification
//!
//! Decides which samples of a square tile are kept as mesh vertices and emits
//! the resulting triangulation as a single triangle strip.
//!
//! ## Algorithm
//!
//! The tile is a `(2^k + 1) × (2^k + 1)` grid. It is refined top-down as a
//! quadtree: a square is split into four when any sample inside it deviates
//! from the two-triangle surface through its corners by more than the
//! allowed geometric error. Splitting activates the square's centre and the
//! midpoints of its sides; the four tile corners are always active. The
//! activation bitmap therefore encodes the quadtree: a square is split exactly
//! when its centre is active.
//!
//! Neighbouring tiles can activate additional samples on the tile edge
//! (`propagate_border_activation`). These never split a square; the leaf that
//! owns them is triangulated as a fan around its centre instead of as two
//! triangles. The same fan handles a leaf that borders smaller leaves inside
//! the tile, so the mesh has no T-junctions.
//!
//! ## Orientation
//!
//! Rows grow southwards in grid space. Every triangle is emitted
//! counter-clockwise as seen from above in geographic space, which is
//! clockwise in grid space.

pub mod strip;

use crate::raster::HeightBuffer;
use crate::tiling::BorderDirection;
use bitvec::prelude::*;
use cgmath::Point2;
use strip::StripBuilder;
use thiserror::Error;

/// Integer sample position in a tile grid: column `x`, row `y`.
pub type GridVertex = Point2<u32>;

/// A triangle as three grid positions.
pub type GridTriangle = [GridVertex; 3];

/// Receives the vertices of a triangle strip, one at a time.
pub trait VertexSink {
    fn emit_vertex(&mut self, heightfield: &Heightfield<'_>, vertex: GridVertex);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeightfieldError {
    #[error("heightfield size {0} is not 2^k + 1 with k >= 1")]
    InvalidSize(usize),
    #[error("heightfield is {width}x{height}, expected a square grid")]
    NotSquare { width: u32, height: u32 },
    #[error("heightfield of size {size} needs {expected} samples, got {actual}")]
    SampleCount {
        size: usize,
        expected: usize,
        actual: usize,
    },
    #[error("cannot propagate between heightfields of size {0} and {1}")]
    SizeMismatch(usize, usize),
}

/// Checks that `size` is a valid tile edge length.
pub fn validate_size(size: usize) -> Result<(), HeightfieldError> {
    if size < 3 || !(size - 1).is_power_of_two() {
        return Err(HeightfieldError::InvalidSize(size));
    }
    Ok(())
}

/// A square tile of height samples with a per-sample activation bitmap.
pub struct Heightfield<'a> {
    heights: &'a [f32],
    size: usize,
    active: BitVec,
}

impl<'a> Heightfield<'a> {
    /// # Arguments
    /// * `heights` - Row-major samples, row 0 north
    /// * `size` - Samples along each edge; must be `2^k + 1`
    pub fn new(heights: &'a [f32], size: usize) -> Result<Self, HeightfieldError> {
        validate_size(size)?;
        let expected = size * size;
        if heights.len() != expected {
            return Err(HeightfieldError::SampleCount {
                size,
                expected,
                actual: heights.len(),
            });
        }
        Ok(Self {
            heights,
            size,
            active: bitvec![0; expected],
        })
    }

    pub fn from_buffer(buffer: &'a HeightBuffer) -> Result<Self, HeightfieldError> {
        if buffer.width() != buffer.height() {
            return Err(HeightfieldError::NotSquare {
                width: buffer.width(),
                height: buffer.height(),
            });
        }
        Self::new(buffer.heights(), buffer.width() as usize)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Linear index of a sample, unique within the tile.
    pub fn index_of_grid_coordinate(&self, x: u32, y: u32) -> usize {
        y as usize * self.size + x as usize
    }

    pub fn height_at(&self, x: u32, y: u32) -> f64 {
        self.heights[self.index_of_grid_coordinate(x, y)] as f64
    }

    pub fn is_active(&self, x: u32, y: u32) -> bool {
        self.active[self.index_of_grid_coordinate(x, y)]
    }

    pub fn active_count(&self) -> usize {
        self.active.count_ones()
    }

    /// Resets the activation state.
    pub fn clear(&mut self) {
        self.active.fill(false);
    }

    /// Selects the samples needed to stay within `max_error` of the full grid.
    ///
    /// Any previous activation is discarded. With `force_all_mandatory` every
    /// sample is kept.
    pub fn apply_error_threshold(&mut self, max_error: f64, force_all_mandatory: bool) {
        if force_all_mandatory {
            self.active.fill(true);
            return;
        }
        self.clear();
        let last = self.last();
        for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
            self.activate(x, y);
        }
        self.refine(0, 0, last, max_error);
    }

    /// ORs the activation of `other` along the shared `border` into this
    /// heightfield. `border` is the side of `self` that touches `other`.
    pub fn propagate_border_activation(
        &mut self,
        other: &Heightfield<'_>,
        border: BorderDirection,
    ) -> Result<(), HeightfieldError> {
        if other.size != self.size {
            return Err(HeightfieldError::SizeMismatch(self.size, other.size));
        }
        let last = self.last();
        for i in 0..=last {
            let (own, theirs) = match border {
                BorderDirection::West => ((0, i), (last, i)),
                BorderDirection::East => ((last, i), (0, i)),
                BorderDirection::North => ((i, 0), (i, last)),
                BorderDirection::South => ((i, last), (i, 0)),
            };
            if other.is_active(theirs.0, theirs.1) {
                self.activate(own.0, own.1);
            }
        }
        Ok(())
    }

    /// Streams the triangulation of the active samples into `sink` as one
    /// triangle strip.
    pub fn generate_mesh(&self, sink: &mut dyn VertexSink) {
        let mut triangles = Vec::new();
        self.collect_triangles(0, 0, self.last(), &mut triangles);
        for vertex in StripBuilder::from_triangles(&triangles) {
            sink.emit_vertex(self, vertex);
        }
    }

    /// Triangles of the current activation, in emission order.
    pub fn triangles(&self) -> Vec<GridTriangle> {
        let mut triangles = Vec::new();
        self.collect_triangles(0, 0, self.last(), &mut triangles);
        triangles
    }

    fn last(&self) -> u32 {
        (self.size - 1) as u32
    }

    fn activate(&mut self, x: u32, y: u32) {
        let index = self.index_of_grid_coordinate(x, y);
        self.active.set(index, true);
    }

    fn refine(&mut self, x0: u32, y0: u32, side: u32, max_error: f64) {
        if side < 2 || !self.exceeds_error(x0, y0, side, max_error) {
            return;
        }
        let half = side / 2;
        self.activate(x0 + half, y0 + half);
        self.activate(x0 + half, y0);
        self.activate(x0 + side, y0 + half);
        self.activate(x0 + half, y0 + side);
        self.activate(x0, y0 + half);
        for (x, y) in Self::quadrants(x0, y0, half) {
            self.refine(x, y, half, max_error);
        }
    }

    /// Whether any sample of the square deviates from the planar pair of
    /// triangles `(nw, ne, se)` and `(nw, se, sw)` by more than `max_error`.
    fn exceeds_error(&self, x0: u32, y0: u32, side: u32, max_error: f64) -> bool {
        let nw = self.height_at(x0, y0);
        let ne = self.height_at(x0 + side, y0);
        let sw = self.height_at(x0, y0 + side);
        let se = self.height_at(x0 + side, y0 + side);
        let step = 1.0 / side as f64;
        for j in 0..=side {
            let v = j as f64 * step;
            for i in 0..=side {
                let u = i as f64 * step;
                let approximation = if i >= j {
                    nw + u * (ne - nw) + v * (se - ne)
                } else {
                    nw + v * (sw - nw) + u * (se - sw)
                };
                if (self.height_at(x0 + i, y0 + j) - approximation).abs() > max_error {
                    return true;
                }
            }
        }
        false
    }

    /// Child squares in traversal order: NW, NE, SE, SW.
    fn quadrants(x0: u32, y0: u32, half: u32) -> [(u32, u32); 4] {
        [
            (x0, y0),
            (x0 + half, y0),
            (x0 + half, y0 + half),
            (x0, y0 + half),
        ]
    }

    fn collect_triangles(&self, x0: u32, y0: u32, side: u32, out: &mut Vec<GridTriangle>) {
        let half = side / 2;
        if side >= 2 && self.is_active(x0 + half, y0 + half) {
            for (x, y) in Self::quadrants(x0, y0, half) {
                self.collect_triangles(x, y, half, out);
            }
            return;
        }

        let ring = self.boundary_ring(x0, y0, side);
        if ring.len() == 4 {
            let [nw, ne, se, sw] = [ring[0], ring[1], ring[2], ring[3]];
            out.push(oriented(nw, ne, se));
            out.push(oriented(nw, se, sw));
        } else {
            let centre = Point2::new(x0 + half, y0 + half);
            for (k, &vertex) in ring.iter().enumerate() {
                let next = ring[(k + 1) % ring.len()];
                out.push(oriented(centre, vertex, next));
            }
        }
    }

    /// Active samples on the boundary of a square, walking north-west,
    /// north-east, south-east, south-west.
    fn boundary_ring(&self, x0: u32, y0: u32, side: u32) -> Vec<GridVertex> {
        let (x1, y1) = (x0 + side, y0 + side);
        let north = (x0..x1).map(|x| (x, y0));
        let east = (y0..y1).map(|y| (x1, y));
        let south = (x0 + 1..=x1).rev().map(|x| (x, y1));
        let west = (y0 + 1..=y1).rev().map(|y| (x0, y));
        north
            .chain(east)
            .chain(south)
            .chain(west)
            .filter(|&(x, y)| self.is_active(x, y))
            .map(|(x, y)| Point2::new(x, y))
            .collect()
    }
}

/// Twice the signed area of `abc` in grid space; negative means
/// counter-clockwise once rows are flipped to point north.
pub fn orientation(a: GridVertex, b: GridVertex, c: GridVertex) -> i64 {
    let (ax, ay) = (a.x as i64, a.y as i64);
    let (bx, by) = (b.x as i64, b.y as i64);
    let (cx, cy) = (c.x as i64, c.y as i64);
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

fn oriented(a: GridVertex, b: GridVertex, c: GridVertex) -> GridTriangle {
    if orientation(a, b, c) > 0 {
        [a, c, b]
    } else {
        [a, b, c]
    }
}
