//! Core topology data types.
//!
//! Triangles and edges reference each other by `u32` handles into the arenas
//! owned by [`Topology`](crate::Topology). A triangle stores its vertices in
//! winding order and, for each vertex, the handle of the edge *opposite* to
//! it. An edge stores its two vertices in canonical order (`v[0] < v[1]`) and
//! the one or two triangles incident to it.

use nalgebra::Point3;

/// A mesh vertex. Vertices are append-only and never reindexed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position. Refinement works in the XY plane; `z` is carried through.
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex at a position.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }

    /// Create a vertex from raw coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// A triangle with opposite-vertex edge handles.
///
/// `e[k]` is the edge that does not contain `v[k]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// Vertex handles in winding order.
    pub v: [u32; 3],
    /// Edge handles; `e[k]` is opposite `v[k]`.
    pub e: [u32; 3],
    /// Whether the smallest interior angle is below the current tolerance.
    pub bad: bool,
}

impl Triangle {
    /// Create a triangle that is not flagged bad.
    #[inline]
    pub fn new(v: [u32; 3], e: [u32; 3]) -> Self {
        Self { v, e, bad: false }
    }

    /// Check whether the triangle uses vertex `vertex`.
    #[inline]
    pub fn contains_vertex(&self, vertex: u32) -> bool {
        self.v.contains(&vertex)
    }

    /// Check whether both `a` and `b` are vertices of this triangle.
    #[inline]
    pub fn contains_pair(&self, a: u32, b: u32) -> bool {
        a != b && self.contains_vertex(a) && self.contains_vertex(b)
    }

    /// The vertex that is neither `a` nor `b`, if the triangle contains both.
    pub fn opposite_vertex(&self, a: u32, b: u32) -> Option<u32> {
        if !self.contains_pair(a, b) {
            return None;
        }
        self.v.iter().copied().find(|&v| v != a && v != b)
    }

    /// Local slot (0..3) that holds edge handle `edge`.
    #[inline]
    pub fn edge_slot(&self, edge: u32) -> Option<usize> {
        self.e.iter().position(|&e| e == edge)
    }
}

/// An undirected edge between two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Vertex handles with `v[0] < v[1]`.
    pub v: [u32; 2],
    /// First incident triangle.
    pub ta: u32,
    /// Second incident triangle, `None` on the mesh boundary.
    pub tb: Option<u32>,
    /// Set by terminal-edge detection when this edge ends a Lepp.
    pub terminal: bool,
    /// Set together with `terminal` when the terminal edge is on the boundary.
    pub border: bool,
}

impl Edge {
    /// Create an edge, putting the vertices in canonical order.
    pub fn new(a: u32, b: u32, ta: u32, tb: Option<u32>) -> Self {
        Self {
            v: Self::key(a, b).into(),
            ta,
            tb,
            terminal: false,
            border: false,
        }
    }

    /// Canonical `(min, max)` vertex pair used to look up edges.
    #[inline]
    pub fn key(a: u32, b: u32) -> (u32, u32) {
        if a < b { (a, b) } else { (b, a) }
    }

    /// Whether the edge lies on the mesh boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.tb.is_none()
    }

    /// Whether the edge connects `a` and `b` (in either order).
    #[inline]
    pub fn has_vertices(&self, a: u32, b: u32) -> bool {
        self.v == <[u32; 2]>::from(Self::key(a, b))
    }

    /// Whether the edge uses vertex `vertex`.
    #[inline]
    pub fn contains_vertex(&self, vertex: u32) -> bool {
        self.v.contains(&vertex)
    }

    /// Whether `triangle` is one of the incident triangles.
    #[inline]
    pub fn is_incident(&self, triangle: u32) -> bool {
        self.ta == triangle || self.tb == Some(triangle)
    }

    /// The triangle on the other side from `triangle`; `None` across the boundary.
    ///
    /// Callers must check [`Edge::is_incident`] first.
    #[inline]
    pub fn other_triangle(&self, triangle: u32) -> Option<u32> {
        if self.ta == triangle {
            self.tb
        } else {
            Some(self.ta)
        }
    }

    /// Rewire the side that pointed at `old` to point at `new`.
    ///
    /// Returns `false` when `old` is not incident to this edge.
    pub fn replace_triangle(&mut self, old: u32, new: u32) -> bool {
        if self.ta == old {
            self.ta = new;
            true
        } else if self.tb == Some(old) {
            self.tb = Some(new);
            true
        } else {
            false
        }
    }

    /// Reset the flags written by terminal-edge detection.
    #[inline]
    pub fn clear_flags(&mut self) {
        self.terminal = false;
        self.border = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_canonical_order() {
        let edge = Edge::new(7, 3, 0, None);
        assert_eq!(edge.v, [3, 7]);
        assert!(edge.has_vertices(7, 3));
        assert!(edge.has_vertices(3, 7));
        assert!(!edge.has_vertices(3, 4));
        assert!(edge.is_boundary());
    }

    #[test]
    fn test_edge_other_triangle() {
        let edge = Edge::new(0, 1, 4, Some(9));
        assert_eq!(edge.other_triangle(4), Some(9));
        assert_eq!(edge.other_triangle(9), Some(4));

        let border = Edge::new(0, 1, 4, None);
        assert_eq!(border.other_triangle(4), None);
    }

    #[test]
    fn test_edge_replace_triangle() {
        let mut edge = Edge::new(0, 1, 4, Some(9));
        assert!(edge.replace_triangle(9, 12));
        assert_eq!(edge.tb, Some(12));
        assert!(edge.replace_triangle(4, 5));
        assert_eq!(edge.ta, 5);
        assert!(!edge.replace_triangle(100, 1));
    }

    #[test]
    fn test_triangle_opposite_vertex() {
        let t = Triangle::new([2, 5, 9], [0, 1, 2]);
        assert_eq!(t.opposite_vertex(5, 2), Some(9));
        assert_eq!(t.opposite_vertex(9, 5), Some(2));
        assert_eq!(t.opposite_vertex(1, 5), None);
        assert_eq!(t.opposite_vertex(5, 5), None);
        assert_eq!(t.edge_slot(1), Some(1));
        assert_eq!(t.edge_slot(3), None);
    }
}
