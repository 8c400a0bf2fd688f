//! The triangle/edge topology that refinement operates on.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::debug;

use crate::error::{RefineError, RefineResult};
use crate::quality;
use crate::types::{Edge, Triangle, Vertex};

/// Vertices, edges and triangles with cross-referencing handles.
///
/// Every edge handle stored in a triangle and every triangle handle stored in
/// an edge indexes into the arrays owned here. Refinement only ever appends
/// vertices; triangle and edge slots may be recycled in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) triangles: Vec<Triangle>,
}

/// Axis-aligned bounds of the vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    /// Extent along each axis.
    pub fn dimensions(&self) -> [f64; 3] {
        [
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        ]
    }
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap arrays produced elsewhere without checking them.
    ///
    /// Use [`crate::validate_topology`] before refining a topology built this way.
    pub fn from_parts(vertices: Vec<Vertex>, edges: Vec<Edge>, triangles: Vec<Triangle>) -> Self {
        Self {
            vertices,
            edges,
            triangles,
        }
    }

    /// Build a topology from vertices and an indexed triangle list.
    ///
    /// Edges are created once per unordered vertex pair, in order of first
    /// appearance. The first face to use an edge becomes its `ta`, the second
    /// its `tb`. `e[k]` of each triangle is set to the edge between the two
    /// vertices other than `v[k]`.
    pub fn from_indexed(vertices: Vec<Vertex>, faces: &[[u32; 3]]) -> RefineResult<Self> {
        if vertices.is_empty() {
            return Err(RefineError::empty_mesh("no vertices"));
        }
        if faces.is_empty() {
            return Err(RefineError::empty_mesh("no faces"));
        }
        let vertex_count = vertices.len();
        let triangle_count = u32::try_from(faces.len())
            .map_err(|_| RefineError::invalid_param("faces", faces.len(), "too many faces"))?;

        let mut edges: Vec<Edge> = Vec::with_capacity(faces.len() * 3 / 2 + 2);
        let mut triangles = Vec::with_capacity(faces.len());
        let mut lookup: HashMap<(u32, u32), u32> = HashMap::with_capacity(faces.len() * 2);

        for (face_index, face) in faces.iter().enumerate() {
            for &vertex_index in face {
                if vertex_index as usize >= vertex_count {
                    return Err(RefineError::InvalidVertexIndex {
                        face_index,
                        vertex_index,
                        vertex_count,
                    });
                }
            }
            if face[0] == face[1] || face[0] == face[2] {
                return Err(RefineError::DegenerateFace {
                    face_index,
                    vertex_index: face[0],
                });
            }
            if face[1] == face[2] {
                return Err(RefineError::DegenerateFace {
                    face_index,
                    vertex_index: face[1],
                });
            }

            let t = face_index as u32;
            let mut handles = [0u32; 3];
            for (k, handle) in handles.iter_mut().enumerate() {
                let a = face[(k + 1) % 3];
                let b = face[(k + 2) % 3];
                let key = Edge::key(a, b);
                *handle = match lookup.get(&key) {
                    Some(&existing) => {
                        let edge = &mut edges[existing as usize];
                        if edge.tb.is_some() {
                            return Err(RefineError::NonManifoldEdge {
                                vertex_a: key.0,
                                vertex_b: key.1,
                            });
                        }
                        edge.tb = Some(t);
                        existing
                    }
                    None => {
                        let created = edges.len() as u32;
                        edges.push(Edge::new(a, b, t, None));
                        lookup.insert(key, created);
                        created
                    }
                };
            }
            triangles.push(Triangle::new(*face, handles));
        }

        debug!(
            vertices = vertex_count,
            triangles = triangle_count,
            edges = edges.len(),
            "Built topology from indexed faces"
        );

        Ok(Self {
            vertices,
            edges,
            triangles,
        })
    }

    /// Split back into the owned arrays.
    pub fn into_parts(self) -> (Vec<Vertex>, Vec<Edge>, Vec<Triangle>) {
        (self.vertices, self.edges, self.triangles)
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the topology has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Look up a triangle, reporting a dangling handle as an invariant violation.
    #[inline]
    pub(crate) fn triangle(&self, t: u32) -> RefineResult<&Triangle> {
        self.triangles
            .get(t as usize)
            .ok_or_else(|| RefineError::invariant(format!("triangle handle {t} is dangling")))
    }

    /// Look up an edge, reporting a dangling handle as an invariant violation.
    #[inline]
    pub(crate) fn edge(&self, e: u32) -> RefineResult<&Edge> {
        self.edges
            .get(e as usize)
            .ok_or_else(|| RefineError::invariant(format!("edge handle {e} is dangling")))
    }

    /// Look up a vertex position, reporting a dangling handle as an invariant violation.
    #[inline]
    pub(crate) fn position(&self, v: u32) -> RefineResult<Point3<f64>> {
        self.vertices
            .get(v as usize)
            .map(|vertex| vertex.position)
            .ok_or_else(|| RefineError::invariant(format!("vertex handle {v} is dangling")))
    }

    /// Corner positions of a triangle in winding order.
    pub fn triangle_points(&self, triangle: &Triangle) -> RefineResult<[Point3<f64>; 3]> {
        Ok([
            self.position(triangle.v[0])?,
            self.position(triangle.v[1])?,
            self.position(triangle.v[2])?,
        ])
    }

    /// Squared length of an edge.
    pub fn edge_length_squared(&self, e: u32) -> RefineResult<f64> {
        let edge = self.edge(e)?;
        let a = self.position(edge.v[0])?;
        let b = self.position(edge.v[1])?;
        Ok((b - a).norm_squared())
    }

    /// Faces as an indexed triangle list, in slot order.
    pub fn faces(&self) -> Vec<[u32; 3]> {
        self.triangles.iter().map(|t| t.v).collect()
    }

    /// Number of triangles currently flagged bad.
    pub fn bad_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.bad).count()
    }

    /// Number of edges currently flagged terminal.
    pub fn terminal_count(&self) -> usize {
        self.edges.iter().filter(|e| e.terminal).count()
    }

    /// Number of edges with a single incident triangle.
    pub fn border_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_boundary()).count()
    }

    /// Smallest interior angle over all triangles, in degrees.
    ///
    /// Returns `None` for an empty topology or when a handle dangles.
    pub fn min_angle_deg(&self) -> Option<f64> {
        let mut smallest: Option<f64> = None;
        for triangle in &self.triangles {
            let points = self.triangle_points(triangle).ok()?;
            let angle = quality::min_angle(&points).to_degrees();
            smallest = Some(smallest.map_or(angle, |s| s.min(angle)));
        }
        smallest
    }

    /// Axis-aligned bounds, `None` when there are no vertices.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;
        for vertex in &self.vertices[1..] {
            let p = vertex.position;
            min = Point3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Point3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        Some(Bounds { min, max })
    }

    /// Clear every triangle's bad flag and every edge's terminal flags.
    pub fn clear_flags(&mut self) {
        for triangle in &mut self.triangles {
            triangle.bad = false;
        }
        for edge in &mut self.edges {
            edge.clear_flags();
        }
    }
}
