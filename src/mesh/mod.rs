//! # Tile Meshes
//!
//! The output side of the tiler: indexed triangle meshes in geographic
//! coordinates and the tiles that carry them.
//!
//! ## Components
//! - `MeshVertex` / `Mesh`: De-duplicated vertices plus a flat index list,
//!   three indices per counter-clockwise triangle
//! - `ChildFlags`: Which of the four child tiles overlap the dataset
//! - `MeshTile`: A tile coordinate, its mesh and its child flags
//! - `MeshAssembler`: Turns the strip emitted by a heightfield into a `Mesh`

pub mod assembler;

pub use assembler::{MeshAssembler, StripWindow};

use crate::tiling::TileCoordinate;
use cgmath::Point3;
use serde::Serialize;

/// A mesh vertex: geographic position plus height in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeshVertex {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

impl From<MeshVertex> for Point3<f64> {
    fn from(vertex: MeshVertex) -> Self {
        Point3::new(vertex.x, vertex.y, vertex.height)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Index triples, one per triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|triangle| [triangle[0], triangle[1], triangle[2]])
    }

    /// Minimum and maximum vertex height, or `None` for an empty mesh.
    pub fn height_range(&self) -> Option<(f64, f64)> {
        self.vertices.iter().fold(None, |range, vertex| {
            let (low, high) = range.unwrap_or((vertex.height, vertex.height));
            Some((low.min(vertex.height), high.max(vertex.height)))
        })
    }
}

/// Presence flags of the four child tiles at the next zoom level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChildFlags {
    pub sw: bool,
    pub nw: bool,
    pub ne: bool,
    pub se: bool,
}

impl ChildFlags {
    pub fn set_all(&mut self, present: bool) {
        *self = ChildFlags {
            sw: present,
            nw: present,
            ne: present,
            se: present,
        };
    }

    pub fn any(&self) -> bool {
        self.sw || self.nw || self.ne || self.se
    }

    /// Coordinates of the flagged children of `parent`, in SW, NW, NE, SE order.
    pub fn child_coordinates(&self, parent: &TileCoordinate) -> Vec<TileCoordinate> {
        let zoom = parent.zoom + 1;
        let (x, y) = (parent.x * 2, parent.y * 2);
        [
            (self.sw, x, y),
            (self.nw, x, y + 1),
            (self.ne, x + 1, y + 1),
            (self.se, x + 1, y),
        ]
        .into_iter()
        .filter(|(present, _, _)| *present)
        .map(|(_, x, y)| TileCoordinate::new(zoom, x, y))
        .collect()
    }
}

/// A finished tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshTile {
    pub coordinate: TileCoordinate,
    pub mesh: Mesh,
    pub children: ChildFlags,
}

impl MeshTile {
    pub fn new(coordinate: TileCoordinate) -> Self {
        Self {
            coordinate,
            mesh: Mesh::new(),
            children: ChildFlags::default(),
        }
    }
}
