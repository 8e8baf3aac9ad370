//! # Mesh Assembler
//!
//! Consumes the triangle strip emitted by `Heightfield::generate_mesh` and
//! builds an indexed mesh.
//!
//! ## Strip Decoding
//! A three-slot `StripWindow` collects vertices. Each time it fills, it
//! yields a triangle, alternately `(v0, v1, v2)` and `(v1, v0, v2)` starting
//! with the former, then drops its oldest vertex. Triangles with repeated
//! grid positions are strip joints and contribute nothing.
//!
//! ## De-duplication
//! Every grid position becomes exactly one mesh vertex. Vertices are keyed by
//! `Heightfield::index_of_grid_coordinate` and appended in first-use order.

use super::{Mesh, MeshVertex};
use crate::heightfield::{GridTriangle, GridVertex, Heightfield, VertexSink};
use crate::tiling::{GeographicBounds, GridTransform};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Rolling three-vertex window over a triangle strip.
#[derive(Debug, Clone)]
pub struct StripWindow {
    slots: [GridVertex; 3],
    filled: usize,
    odd: bool,
}

impl StripWindow {
    pub fn new() -> Self {
        Self {
            slots: [GridVertex::new(0, 0); 3],
            filled: 0,
            odd: false,
        }
    }

    pub fn reset(&mut self) {
        self.filled = 0;
        self.odd = false;
    }

    /// Adds a vertex; returns the triangle it completes, if any.
    pub fn push(&mut self, vertex: GridVertex) -> Option<GridTriangle> {
        self.slots[self.filled] = vertex;
        self.filled += 1;
        if self.filled < 3 {
            return None;
        }
        self.odd = !self.odd;
        let [v0, v1, v2] = self.slots;
        let triangle = if self.odd { [v0, v1, v2] } else { [v1, v0, v2] };
        self.slots = [v1, v2, v2];
        self.filled = 2;
        Some(triangle)
    }
}

impl Default for StripWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the mesh of one tile. Implements `VertexSink`.
pub struct MeshAssembler {
    transform: GridTransform,
    mesh: Mesh,
    vertex_indices: HashMap<usize, u32>,
    window: StripWindow,
}

impl MeshAssembler {
    /// # Arguments
    /// * `bounds` - Geographic bounds of the tile
    /// * `tile_width`, `tile_height` - Sample grid size of the tile
    pub fn new(bounds: GeographicBounds, tile_width: u32, tile_height: u32) -> Self {
        Self {
            transform: GridTransform::new(bounds, tile_width, tile_height),
            mesh: Mesh::new(),
            vertex_indices: HashMap::new(),
            window: StripWindow::new(),
        }
    }

    /// Discards everything assembled so far.
    pub fn clear(&mut self) {
        self.mesh.clear();
        self.vertex_indices.clear();
        self.window.reset();
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    fn append_vertex(&mut self, heightfield: &Heightfield<'_>, vertex: GridVertex) -> u32 {
        let key = heightfield.index_of_grid_coordinate(vertex.x, vertex.y);
        match self.vertex_indices.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = self.mesh.vertices.len() as u32;
                let (x, y) = self.transform.to_geographic(vertex.x, vertex.y);
                self.mesh.vertices.push(MeshVertex {
                    x,
                    y,
                    height: heightfield.height_at(vertex.x, vertex.y),
                });
                entry.insert(index);
                index
            }
        }
    }
}

impl VertexSink for MeshAssembler {
    fn emit_vertex(&mut self, heightfield: &Heightfield<'_>, vertex: GridVertex) {
        let Some([a, b, c]) = self.window.push(vertex) else {
            return;
        };
        if a == b || b == c || a == c {
            return;
        }
        let indices = [
            self.append_vertex(heightfield, a),
            self.append_vertex(heightfield, b),
            self.append_vertex(heightfield, c),
        ];
        self.mesh.indices.extend_from_slice(&indices);
    }
}
