//! Centroid insertion at interior terminal edges.
//!
//! The two triangles sharing a terminal edge form a quadrilateral
//! `[na, s1, nb, s2]`, where `s1, s2` are the edge endpoints and `na, nb` the
//! vertices opposite it. A new vertex is placed at the mean of the four
//! corners and the quadrilateral is replaced by a fan of four triangles
//! around it.
//!
//! Slot reuse per insertion:
//!
//! | entity    | recycled                  | appended |
//! |-----------|---------------------------|----------|
//! | vertex    | none                      | 1        |
//! | triangle  | both old triangles        | 2        |
//! | edge      | the consumed terminal edge | 3        |
//!
//! Every lookup happens before the first write, so a failed insertion leaves
//! the topology untouched.

use hashbrown::HashSet;
use nalgebra::Point3;
use tracing::debug;

use crate::error::{RefineError, RefineResult};
use crate::topology::Topology;
use crate::types::{Edge, Triangle, Vertex};

/// Handles created or rewritten by one insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// The new centroid vertex.
    pub vertex: u32,
    /// The four fan triangles, in quadrilateral order.
    pub triangles: [u32; 4],
    /// The four spoke edges joining the corners to the centroid.
    pub spokes: [u32; 4],
}

/// Outcome of an insertion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionPass {
    /// Terminal edges split.
    pub inserted: usize,
    /// Terminal edges skipped because a neighbor was already split this pass.
    pub deferred: usize,
}

/// Twice the signed area of the XY projection of `(a, b, c)`.
#[inline]
fn signed_area2(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// Everything needed to apply one insertion, computed without mutation.
struct Plan {
    ring: [u32; 4],
    centroid: Point3<f64>,
    /// Outer edge of fan triangle `i`, with the old triangle it bordered.
    outer: [(u32, u32); 4],
    triangle_slots: [u32; 4],
    spoke_slots: [u32; 4],
}

fn plan(topology: &Topology, edge_handle: u32) -> RefineResult<Plan> {
    let edge = *topology.edge(edge_handle)?;
    let ta = edge.ta;
    let tb = edge.tb.ok_or_else(|| {
        RefineError::invariant(format!("edge {edge_handle} is on the boundary"))
    })?;
    let [s1, s2] = edge.v;

    let tri_a = *topology.triangle(ta)?;
    let tri_b = *topology.triangle(tb)?;
    let na = tri_a.opposite_vertex(s1, s2).ok_or_else(|| {
        RefineError::invariant(format!("triangle {ta} does not contain edge {edge_handle}"))
    })?;
    let nb = tri_b.opposite_vertex(s1, s2).ok_or_else(|| {
        RefineError::invariant(format!("triangle {tb} does not contain edge {edge_handle}"))
    })?;
    if na == nb {
        return Err(RefineError::invariant(format!(
            "triangles {ta} and {tb} share all three vertices"
        )));
    }

    let mut ring = [na, s1, nb, s2];
    let p0 = topology.position(ring[0])?;
    let p1 = topology.position(ring[1])?;
    let p2 = topology.position(ring[2])?;
    if signed_area2(&p0, &p1, &p2) < 0.0 {
        ring.swap(1, 3);
    }
    let p3 = topology.position(ring[3])?;
    let centroid = Point3::from((p0.coords + p1.coords + p2.coords + p3.coords) / 4.0);

    let mut candidates = Vec::with_capacity(4);
    for (old, triangle) in [(ta, &tri_a), (tb, &tri_b)] {
        check_uses_edge(triangle, old, edge_handle)?;
        candidates.extend(
            triangle
                .e
                .iter()
                .filter(|&&e| e != edge_handle)
                .map(|&e| (e, old)),
        );
    }

    let mut outer = [(0u32, 0u32); 4];
    for (i, slot) in outer.iter_mut().enumerate() {
        let (a, b) = (ring[i], ring[(i + 1) % 4]);
        let mut found = None;
        for &(e, old) in &candidates {
            if topology.edge(e)?.has_vertices(a, b) {
                found = Some((e, old));
                break;
            }
        }
        *slot = found.ok_or_else(|| {
            RefineError::invariant(format!(
                "no outer edge ({a}, {b}) around terminal edge {edge_handle}"
            ))
        })?;
        if !topology.edge(slot.0)?.is_incident(slot.1) {
            return Err(RefineError::invariant(format!(
                "outer edge {} does not reference triangle {}",
                slot.0, slot.1
            )));
        }
    }

    let triangle_base = topology.triangle_count() as u32;
    let edge_base = topology.edge_count() as u32;
    Ok(Plan {
        ring,
        centroid,
        outer,
        triangle_slots: [ta, tb, triangle_base, triangle_base + 1],
        spoke_slots: [edge_handle, edge_base, edge_base + 1, edge_base + 2],
    })
}

fn check_uses_edge(triangle: &Triangle, t: u32, edge_handle: u32) -> RefineResult<()> {
    let uses = triangle.e.iter().filter(|&&e| e == edge_handle).count();
    if uses != 1 {
        return Err(RefineError::invariant(format!(
            "triangle {t} lists edge {edge_handle} {uses} times"
        )));
    }
    Ok(())
}

fn apply(topology: &mut Topology, plan: &Plan) -> Insertion {
    let Plan {
        ring,
        centroid,
        outer,
        triangle_slots,
        spoke_slots,
    } = plan;
    let c = topology.vertex_count() as u32;
    topology.vertices.push(Vertex::new(*centroid));

    // Fan triangle i is (ring[i], ring[i+1], c). Its edge opposite ring[i] is
    // spoke i+1, opposite ring[i+1] is spoke i, opposite c is the outer edge.
    for i in 0..4 {
        let triangle = Triangle::new(
            [ring[i], ring[(i + 1) % 4], c],
            [spoke_slots[(i + 1) % 4], spoke_slots[i], outer[i].0],
        );
        write_slot(&mut topology.triangles, triangle_slots[i], triangle);
    }

    // Spoke i joins ring[i] to c and separates fan triangles i-1 and i.
    for i in 0..4 {
        let spoke = Edge::new(
            ring[i],
            c,
            triangle_slots[(i + 3) % 4],
            Some(triangle_slots[i]),
        );
        write_slot(&mut topology.edges, spoke_slots[i], spoke);
    }

    for (i, &(edge, old)) in outer.iter().enumerate() {
        topology.edges[edge as usize].replace_triangle(old, triangle_slots[i]);
    }

    Insertion {
        vertex: c,
        triangles: *triangle_slots,
        spokes: *spoke_slots,
    }
}

/// Overwrite `slot` when it exists, otherwise append (slots are planned in append order).
fn write_slot<T>(items: &mut Vec<T>, slot: u32, value: T) {
    match items.get_mut(slot as usize) {
        Some(existing) => *existing = value,
        None => items.push(value),
    }
}

/// Split the quadrilateral around an interior edge at its centroid.
///
/// Adds one vertex, two triangles and three edges. The edge must have two
/// incident triangles; it does not have to be flagged terminal.
pub fn insert_centroid(topology: &mut Topology, edge: u32) -> RefineResult<Insertion> {
    let plan = plan(topology, edge)?;
    Ok(apply(topology, &plan))
}

/// Insert a centroid at every interior terminal edge.
///
/// Edges are visited in handle order. An edge whose triangles were already
/// replaced earlier in the same pass is skipped and keeps its flag; the next
/// terminal-edge pass recomputes it.
pub fn insert_centroids(topology: &mut Topology) -> RefineResult<InsertionPass> {
    let candidates: Vec<u32> = topology
        .edges()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.terminal && !e.border && !e.is_boundary())
        .map(|(i, _)| i as u32)
        .collect();

    let mut pass = InsertionPass::default();
    let mut touched: HashSet<u32> = HashSet::with_capacity(candidates.len() * 4);
    for handle in candidates {
        let edge = *topology.edge(handle)?;
        if !edge.terminal {
            continue;
        }
        let Some(tb) = edge.tb else {
            continue;
        };
        if touched.contains(&edge.ta) || touched.contains(&tb) {
            pass.deferred += 1;
            continue;
        }
        let insertion = insert_centroid(topology, handle)?;
        touched.extend(insertion.triangles);
        pass.inserted += 1;
    }

    debug!(
        inserted = pass.inserted,
        deferred = pass.deferred,
        vertices = topology.vertex_count(),
        triangles = topology.triangle_count(),
        "Inserted centroids"
    );
    Ok(pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lepp::detect_terminal_edges;
    use crate::quality::detect_bad_triangles;
    use crate::validate::validate_topology;

    fn diamond() -> Topology {
        let vertices = vec![
            Vertex::from_coords(0.0, 0.0, 0.0),
            Vertex::from_coords(4.0, 0.0, 0.0),
            Vertex::from_coords(2.0, 0.5, 0.0),
            Vertex::from_coords(2.0, -0.5, 0.0),
        ];
        Topology::from_indexed(vertices, &[[0, 1, 2], [0, 3, 1]]).unwrap()
    }

    fn shared_edge(topo: &Topology) -> u32 {
        topo.edges().iter().position(|e| !e.is_boundary()).unwrap() as u32
    }

    #[test]
    fn test_insert_centroid_counts() {
        let mut topo = diamond();
        let edge = shared_edge(&topo);
        let insertion = insert_centroid(&mut topo, edge).unwrap();

        assert_eq!(topo.vertex_count(), 5);
        assert_eq!(topo.triangle_count(), 4);
        assert_eq!(topo.edge_count(), 8);
        assert_eq!(insertion.vertex, 4);
        assert_eq!(insertion.triangles, [0, 1, 2, 3]);
        assert_eq!(insertion.spokes, [edge, 5, 6, 7]);

        let c = topo.vertices()[4].position;
        assert!((c.x - 2.0).abs() < 1e-12);
        assert!(c.y.abs() < 1e-12);
        validate_topology(&topo).unwrap();
    }

    #[test]
    fn test_fan_is_counter_clockwise() {
        let mut topo = diamond();
        let edge = shared_edge(&topo);
        insert_centroid(&mut topo, edge).unwrap();
        for triangle in topo.triangles() {
            let p = topo.triangle_points(triangle).unwrap();
            assert!(signed_area2(&p[0], &p[1], &p[2]) > 0.0);
        }
    }

    #[test]
    fn test_every_triangle_touches_centroid() {
        let mut topo = diamond();
        let edge = shared_edge(&topo);
        let insertion = insert_centroid(&mut topo, edge).unwrap();
        for &t in &insertion.triangles {
            assert!(topo.triangles()[t as usize].contains_vertex(insertion.vertex));
        }
        for &s in &insertion.spokes {
            let spoke = topo.edges()[s as usize];
            assert_eq!(spoke.v[1], insertion.vertex);
            assert!(spoke.tb.is_some());
        }
    }

    #[test]
    fn test_insert_on_boundary_edge_fails_cleanly() {
        let mut topo = diamond();
        let boundary = topo.edges().iter().position(|e| e.is_boundary()).unwrap() as u32;
        let before = topo.clone();
        let err = insert_centroid(&mut topo, boundary).unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(topo, before);
    }

    #[test]
    fn test_corrupt_neighbor_leaves_topology_untouched() {
        let mut topo = diamond();
        let edge = shared_edge(&topo);
        // Point one outer edge at a triangle that does not exist.
        let outer = topo.triangles()[1].e.iter().copied().find(|&e| e != edge).unwrap();
        topo.edges[outer as usize].ta = 42;
        let before = topo.clone();
        assert!(insert_centroid(&mut topo, edge).is_err());
        assert_eq!(topo, before);
    }

    #[test]
    fn test_insert_centroids_pass() {
        let mut topo = diamond();
        detect_bad_triangles(30.0, &mut topo).unwrap();
        detect_terminal_edges(&mut topo).unwrap();

        let pass = insert_centroids(&mut topo).unwrap();
        assert_eq!(pass.inserted, 1);
        assert_eq!(pass.deferred, 0);
        assert_eq!(topo.terminal_count(), 0);
        validate_topology(&topo).unwrap();
    }

    #[test]
    fn test_border_terminal_edges_are_skipped() {
        let vertices = vec![
            Vertex::from_coords(0.0, 0.0, 0.0),
            Vertex::from_coords(10.0, 0.0, 0.0),
            Vertex::from_coords(5.0, 0.1, 0.0),
        ];
        let mut topo = Topology::from_indexed(vertices, &[[0, 1, 2]]).unwrap();
        detect_bad_triangles(30.0, &mut topo).unwrap();
        detect_terminal_edges(&mut topo).unwrap();

        let before = topo.clone();
        let pass = insert_centroids(&mut topo).unwrap();
        assert_eq!(pass, InsertionPass::default());
        assert_eq!(topo, before);
    }
}
