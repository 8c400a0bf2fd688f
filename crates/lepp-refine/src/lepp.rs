//! Terminal-edge search along the longest-edge propagating path (Lepp).
//!
//! Starting from a bad triangle, the walk repeatedly crosses the current
//! triangle's longest edge. It stops when:
//!
//! - the longest edge lies on the boundary, which gives a *border* terminal edge, or
//! - the triangle across the longest edge is any of the last three
//!   triangles visited, not only the one two steps back, which gives an
//!   interior terminal edge shared by two triangles whose longest edge it is.
//!
//! Ties between equally long edges resolve to the lowest local slot, so the
//! walk is deterministic for a given topology. The number of steps is capped
//! at the triangle count; exact length ties that would otherwise cycle end at
//! the edge crossed last.

use serde::Serialize;
use tracing::debug;

use crate::error::{RefineError, RefineResult};
use crate::topology::Topology;
use crate::types::Edge;

/// A terminal edge found by a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalEdge {
    /// Edge handle.
    pub edge: u32,
    /// Whether the edge lies on the boundary.
    pub border: bool,
}

/// Summary of the edge flags after a terminal-edge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TerminalScan {
    /// Edges flagged terminal.
    pub terminal_edges: usize,
    /// Terminal edges that lie on the boundary.
    pub border_edges: usize,
    /// Whether any terminal edge is interior, so insertion has work to do.
    pub has_non_border: bool,
}

impl TerminalScan {
    /// Summarize the terminal flags currently stored on `edges`.
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut scan = Self::default();
        for edge in edges.iter().filter(|e| e.terminal) {
            scan.terminal_edges += 1;
            if edge.border {
                scan.border_edges += 1;
            } else {
                scan.has_non_border = true;
            }
        }
        scan
    }
}

/// The last three triangles visited, oldest overwritten first.
///
/// A walk stops when the next triangle matches any slot.
#[derive(Debug, Default)]
struct WalkHistory {
    slots: [Option<u32>; 3],
    next: usize,
}

impl WalkHistory {
    fn push(&mut self, triangle: u32) {
        self.slots[self.next] = Some(triangle);
        self.next = (self.next + 1) % self.slots.len();
    }

    fn contains(&self, triangle: u32) -> bool {
        self.slots.contains(&Some(triangle))
    }
}

/// Handle of the longest edge of triangle `t`.
///
/// Compares strictly, so `e[0]` wins ties over `e[1]`, and `e[1]` over `e[2]`.
pub fn longest_edge(topology: &Topology, t: u32) -> RefineResult<u32> {
    let triangle = topology.triangle(t)?;
    let mut best = triangle.e[0];
    let mut best_len = topology.edge_length_squared(best)?;
    for &candidate in &triangle.e[1..] {
        let len = topology.edge_length_squared(candidate)?;
        if len > best_len {
            best = candidate;
            best_len = len;
        }
    }
    Ok(best)
}

/// Walk the Lepp of triangle `start` and return its terminal edge.
///
/// Does not modify the topology.
pub fn find_terminal_edge(topology: &Topology, start: u32) -> RefineResult<TerminalEdge> {
    let max_steps = topology.triangle_count().max(1);
    let mut history = WalkHistory::default();
    let mut current = start;
    let mut crossed = None;

    for _ in 0..max_steps {
        let handle = longest_edge(topology, current)?;
        let edge = topology.edge(handle)?;
        if !edge.is_incident(current) {
            return Err(RefineError::invariant(format!(
                "triangle {current} lists edge {handle}, which does not reference it back"
            )));
        }

        let Some(next) = edge.other_triangle(current) else {
            return Ok(TerminalEdge {
                edge: handle,
                border: true,
            });
        };
        if history.contains(next) {
            return Ok(TerminalEdge {
                edge: handle,
                border: false,
            });
        }

        history.push(current);
        current = next;
        crossed = Some(handle);
    }

    match crossed {
        Some(edge) => {
            debug!(start, edge, max_steps, "Lepp walk hit the step cap");
            Ok(TerminalEdge {
                edge,
                border: false,
            })
        }
        None => Err(RefineError::invariant(format!(
            "Lepp walk from triangle {start} made no progress"
        ))),
    }
}

/// Flag the terminal edge of every bad triangle.
///
/// Terminal flags from any previous pass are cleared first, so the result
/// depends only on the current bad flags and geometry.
pub fn detect_terminal_edges(topology: &mut Topology) -> RefineResult<TerminalScan> {
    let mut found = Vec::new();
    for (index, triangle) in topology.triangles().iter().enumerate() {
        if triangle.bad {
            found.push(find_terminal_edge(topology, index as u32)?);
        }
    }

    for edge in &mut topology.edges {
        edge.clear_flags();
    }
    for terminal in found {
        let edge = &mut topology.edges[terminal.edge as usize];
        edge.terminal = true;
        edge.border = terminal.border;
    }

    let scan = TerminalScan::from_edges(topology.edges());
    debug!(
        terminal = scan.terminal_edges,
        border = scan.border_edges,
        "Detected terminal edges"
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::detect_bad_triangles;
    use crate::types::Vertex;

    fn diamond() -> Topology {
        let vertices = vec![
            Vertex::from_coords(0.0, 0.0, 0.0),
            Vertex::from_coords(4.0, 0.0, 0.0),
            Vertex::from_coords(2.0, 0.5, 0.0),
            Vertex::from_coords(2.0, -0.5, 0.0),
        ];
        Topology::from_indexed(vertices, &[[0, 1, 2], [0, 3, 1]]).unwrap()
    }

    #[test]
    fn test_longest_edge_tie_prefers_first_slot() {
        // Isosceles: e[0] and e[1] both have length sqrt(10).
        let vertices = vec![
            Vertex::from_coords(0.0, 0.0, 0.0),
            Vertex::from_coords(2.0, 0.0, 0.0),
            Vertex::from_coords(1.0, 3.0, 0.0),
        ];
        let topo = Topology::from_indexed(vertices, &[[0, 1, 2]]).unwrap();
        let expected = topo.triangles()[0].e[0];
        for _ in 0..5 {
            assert_eq!(longest_edge(&topo, 0).unwrap(), expected);
        }
    }

    #[test]
    fn test_interior_terminal_edge() {
        let topo = diamond();
        let found = find_terminal_edge(&topo, 0).unwrap();
        assert!(!found.border);
        assert_eq!(topo.edges()[found.edge as usize].v, [0, 1]);
        assert_eq!(find_terminal_edge(&topo, 1).unwrap(), found);
    }

    #[test]
    fn test_border_terminal_edge() {
        let vertices = vec![
            Vertex::from_coords(0.0, 0.0, 0.0),
            Vertex::from_coords(10.0, 0.0, 0.0),
            Vertex::from_coords(5.0, 0.1, 0.0),
        ];
        let topo = Topology::from_indexed(vertices, &[[0, 1, 2]]).unwrap();
        let found = find_terminal_edge(&topo, 0).unwrap();
        assert!(found.border);
        assert_eq!(topo.edges()[found.edge as usize].v, [0, 1]);
    }

    #[test]
    fn test_walk_propagates() {
        // A thin triangle whose longest edge leads into a larger neighbor,
        // whose own longest edge is on the boundary.
        let vertices = vec![
            Vertex::from_coords(0.0, 0.0, 0.0),
            Vertex::from_coords(10.0, 0.0, 0.0),
            Vertex::from_coords(4.0, 6.0, 0.0),
            Vertex::from_coords(5.6, 4.8, 0.0),
            Vertex::from_coords(7.0, 3.2, 0.0),
        ];
        let topo = Topology::from_indexed(vertices, &[[0, 1, 2], [2, 1, 4], [2, 4, 3]]).unwrap();
        let found = find_terminal_edge(&topo, 2).unwrap();
        assert!(found.border);
        assert_eq!(topo.edges()[found.edge as usize].v, [0, 1]);
    }

    #[test]
    fn test_detect_terminal_edges_flags() {
        let mut topo = diamond();
        detect_bad_triangles(30.0, &mut topo).unwrap();
        let scan = detect_terminal_edges(&mut topo).unwrap();
        assert_eq!(scan.terminal_edges, 1);
        assert_eq!(scan.border_edges, 0);
        assert!(scan.has_non_border);

        // A second pass is idempotent.
        let flags: Vec<_> = topo.edges().iter().map(|e| (e.terminal, e.border)).collect();
        let again = detect_terminal_edges(&mut topo).unwrap();
        assert_eq!(again, scan);
        let flags_again: Vec<_> = topo.edges().iter().map(|e| (e.terminal, e.border)).collect();
        assert_eq!(flags, flags_again);
    }

    #[test]
    fn test_detect_terminal_edges_clears_stale_flags() {
        let mut topo = diamond();
        detect_bad_triangles(30.0, &mut topo).unwrap();
        detect_terminal_edges(&mut topo).unwrap();

        detect_bad_triangles(0.0, &mut topo).unwrap();
        let scan = detect_terminal_edges(&mut topo).unwrap();
        assert_eq!(scan, TerminalScan::default());
        assert_eq!(topo.terminal_count(), 0);
    }

    #[test]
    fn test_dangling_edge_is_reported() {
        let mut topo = diamond();
        topo.triangles[0].e[2] = 99;
        let err = find_terminal_edge(&topo, 0).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
