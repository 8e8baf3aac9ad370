//! # Triangle Strip Builder
//!
//! Converts an ordered list of triangles into a single triangle strip.
//!
//! Strip position `t` forms a triangle from the last three vertices; even
//! positions keep the vertex order, odd positions swap the first two. A
//! triangle that shares the current window edge is added with one vertex.
//! When the shared vertex of the following triangle would fall out of the
//! window, the builder repeats it first, which turns the strip around that
//! vertex (one degenerate triangle). Triangles that share no edge with the
//! window are joined with degenerate triangles.
//!
//! Consumers drop degenerate triangles; every non-degenerate triangle of the
//! strip is one of the input triangles with the input winding.

use super::{GridTriangle, GridVertex};

pub struct StripBuilder {
    vertices: Vec<GridVertex>,
}

impl StripBuilder {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
        }
    }

    /// Strip vertices for `triangles`, in order.
    pub fn from_triangles(triangles: &[GridTriangle]) -> Vec<GridVertex> {
        let mut builder = Self::new();
        for (i, triangle) in triangles.iter().enumerate() {
            builder.push_triangle(triangle, triangles.get(i + 1));
        }
        builder.finish()
    }

    pub fn finish(self) -> Vec<GridVertex> {
        self.vertices
    }

    /// Appends `triangle`. `next` is the triangle that will follow, used to
    /// leave the window on an edge the two share.
    pub fn push_triangle(&mut self, triangle: &GridTriangle, next: Option<&GridTriangle>) {
        let n = self.vertices.len();
        if n < 2 {
            self.start(triangle, next);
            return;
        }
        let (a, b) = (self.vertices[n - 2], self.vertices[n - 1]);
        let position = n - 2;
        if a != b && triangle.contains(&a) && triangle.contains(&b) {
            if let Some(&v) = triangle.iter().find(|&&v| v != a && v != b) {
                let emitted = if position % 2 == 0 { [a, b, v] } else { [b, a, v] };
                if same_winding(&emitted, triangle) {
                    let turn = next.is_some_and(|next| {
                        !(next.contains(&v) && next.contains(&b))
                            && next.contains(&v)
                            && next.contains(&a)
                    });
                    if turn {
                        self.vertices.push(a);
                    }
                    self.vertices.push(v);
                    return;
                }
            }
        }
        self.restart(triangle, next, b, position);
    }

    fn start(&mut self, triangle: &GridTriangle, next: Option<&GridTriangle>) {
        let rotations = rotations(triangle);
        let chosen = rotations
            .iter()
            .find(|[_, s1, s2]| next.is_some_and(|next| next.contains(s1) && next.contains(s2)))
            .unwrap_or(&rotations[0]);
        self.vertices.extend_from_slice(chosen);
    }

    /// Joins `triangle` through degenerate triangles: `last, u, u, w, r`.
    /// The triangle lands at `position + 4`, so the order of `u` and `w`
    /// follows the parity of `position`.
    fn restart(
        &mut self,
        triangle: &GridTriangle,
        next: Option<&GridTriangle>,
        last: GridVertex,
        position: usize,
    ) {
        let even = position % 2 == 0;
        let layouts = rotations(triangle).map(|[p, q, r]| if even { (p, q, r) } else { (q, p, r) });
        let &(u, w, r) = layouts
            .iter()
            .find(|(_, w, r)| next.is_some_and(|next| next.contains(w) && next.contains(r)))
            .unwrap_or(&layouts[0]);
        self.vertices.extend_from_slice(&[last, u, u, w, r]);
    }
}

impl Default for StripBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn rotations([a, b, c]: &GridTriangle) -> [GridTriangle; 3] {
    [[*a, *b, *c], [*b, *c, *a], [*c, *a, *b]]
}

fn same_winding(a: &GridTriangle, b: &GridTriangle) -> bool {
    rotations(b).contains(a)
}
