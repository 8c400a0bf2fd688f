//! Topology validation and reporting.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{EntityKind, RefineError, RefineResult, TopologyLocation};
use crate::topology::{Bounds, Topology};

const TRIANGLE_V: [&str; 3] = ["v[0]", "v[1]", "v[2]"];
const TRIANGLE_E: [&str; 3] = ["e[0]", "e[1]", "e[2]"];
const EDGE_V: [&str; 2] = ["v[0]", "v[1]"];

/// Summary of a topology and any consistency problems found in it.
#[derive(Debug, Clone, Serialize)]
pub struct TopologyReport {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub triangle_count: usize,

    /// Edges with a single incident triangle.
    pub boundary_edge_count: usize,

    /// Triangles currently flagged bad.
    pub bad_count: usize,

    /// Edges currently flagged terminal.
    pub terminal_count: usize,

    /// Vertices with a NaN or infinite coordinate.
    pub non_finite_vertex_count: usize,

    /// Smallest interior angle in degrees.
    pub min_angle_deg: Option<f64>,

    /// Bounds as `(min, max)` corners.
    pub bounds: Option<([f64; 3], [f64; 3])>,

    /// Rendered consistency issues, at most `ISSUE_LIMIT` of them.
    pub issues: Vec<String>,
}

/// Maximum number of issues collected into a report.
pub const ISSUE_LIMIT: usize = 32;

impl TopologyReport {
    /// Whether the topology has triangles and no consistency issues.
    pub fn is_valid(&self) -> bool {
        self.triangle_count > 0 && self.issues.is_empty() && self.non_finite_vertex_count == 0
    }
}

impl std::fmt::Display for TopologyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Topology Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Edges: {}", self.edge_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        writeln!(f, "  Boundary edges: {}", self.boundary_edge_count)?;

        if let Some((min, max)) = &self.bounds {
            writeln!(
                f,
                "  Bounds: [{:.3}, {:.3}, {:.3}] to [{:.3}, {:.3}, {:.3}]",
                min[0], min[1], min[2], max[0], max[1], max[2]
            )?;
        }
        if let Some(angle) = self.min_angle_deg {
            writeln!(f, "  Min angle: {angle:.3} deg")?;
        }
        writeln!(f, "  Bad triangles: {}", self.bad_count)?;
        writeln!(f, "  Terminal edges: {}", self.terminal_count)?;

        if self.non_finite_vertex_count > 0 {
            writeln!(f, "  Non-finite vertices: {}", self.non_finite_vertex_count)?;
        }
        writeln!(
            f,
            "  Consistent: {}",
            if self.issues.is_empty() { "yes" } else { "NO" }
        )?;
        for issue in &self.issues {
            writeln!(f, "    - {issue}")?;
        }
        Ok(())
    }
}

/// Build a report for a topology.
pub fn report_topology(topology: &Topology) -> TopologyReport {
    let issues: Vec<String> = check_topology(topology, ISSUE_LIMIT)
        .into_iter()
        .map(|e| e.to_string())
        .collect();
    let non_finite_vertex_count = topology
        .vertices()
        .iter()
        .filter(|v| !v.position.coords.iter().all(|c| c.is_finite()))
        .count();

    let min_angle_deg = if issues.is_empty() {
        topology.min_angle_deg()
    } else {
        None
    };
    let bounds = topology.bounds().map(|Bounds { min, max }| {
        ([min.x, min.y, min.z], [max.x, max.y, max.z])
    });

    let report = TopologyReport {
        vertex_count: topology.vertex_count(),
        edge_count: topology.edge_count(),
        triangle_count: topology.triangle_count(),
        boundary_edge_count: topology.border_edge_count(),
        bad_count: topology.bad_count(),
        terminal_count: topology.terminal_count(),
        non_finite_vertex_count,
        min_angle_deg,
        bounds,
        issues,
    };

    if report.is_valid() {
        info!(
            vertices = report.vertex_count,
            triangles = report.triangle_count,
            edges = report.edge_count,
            "Topology is consistent"
        );
    } else {
        warn!(
            issues = report.issues.len(),
            non_finite = report.non_finite_vertex_count,
            "Topology has problems"
        );
    }
    report
}

/// Return the first consistency problem, if any.
///
/// Checks run in order: handle ranges, canonical edge order, opposite-edge
/// placement and back-references in triangles, then incident triangles of
/// each edge.
pub fn validate_topology(topology: &Topology) -> RefineResult<()> {
    match check_topology(topology, 1).into_iter().next() {
        Some(err) => Err(err),
        None => {
            debug!(
                triangles = topology.triangle_count(),
                edges = topology.edge_count(),
                "Topology validated"
            );
            Ok(())
        }
    }
}

/// Collect up to `limit` consistency problems.
///
/// Cross-reference checks only run once every handle is in range.
pub fn check_topology(topology: &Topology, limit: usize) -> Vec<RefineError> {
    let mut issues = Vec::new();
    check_ranges(topology, limit, &mut issues);
    if !issues.is_empty() {
        return issues;
    }
    check_references(topology, limit, &mut issues);
    issues
}

fn check_ranges(topology: &Topology, limit: usize, issues: &mut Vec<RefineError>) {
    let nv = topology.vertex_count();
    let ne = topology.edge_count();
    let nt = topology.triangle_count();
    let mut push = |issue: RefineError| {
        if issues.len() < limit {
            issues.push(issue);
        }
    };

    for (index, triangle) in topology.triangles().iter().enumerate() {
        for k in 0..3 {
            if triangle.v[k] as usize >= nv {
                push(RefineError::HandleOutOfRange {
                    entity: EntityKind::Triangle,
                    index,
                    field: TRIANGLE_V[k],
                    handle: triangle.v[k],
                    len: nv,
                });
            }
            if triangle.e[k] as usize >= ne {
                push(RefineError::HandleOutOfRange {
                    entity: EntityKind::Triangle,
                    index,
                    field: TRIANGLE_E[k],
                    handle: triangle.e[k],
                    len: ne,
                });
            }
        }
    }

    for (index, edge) in topology.edges().iter().enumerate() {
        for k in 0..2 {
            if edge.v[k] as usize >= nv {
                push(RefineError::HandleOutOfRange {
                    entity: EntityKind::Edge,
                    index,
                    field: EDGE_V[k],
                    handle: edge.v[k],
                    len: nv,
                });
            }
        }
        if edge.ta as usize >= nt {
            push(RefineError::HandleOutOfRange {
                entity: EntityKind::Edge,
                index,
                field: "ta",
                handle: edge.ta,
                len: nt,
            });
        }
        if let Some(tb) = edge.tb
            && tb as usize >= nt
        {
            push(RefineError::HandleOutOfRange {
                entity: EntityKind::Edge,
                index,
                field: "tb",
                handle: tb,
                len: nt,
            });
        }
    }
}

fn check_references(topology: &Topology, limit: usize, issues: &mut Vec<RefineError>) {
    let edges = topology.edges();
    let triangles = topology.triangles();
    let mut push = |issue: RefineError| {
        if issues.len() < limit {
            issues.push(issue);
        }
    };

    for (index, edge) in edges.iter().enumerate() {
        if edge.v[0] >= edge.v[1] {
            push(RefineError::inconsistent(
                TopologyLocation::Edge { index },
                format!("vertices ({}, {}) are not in ascending order", edge.v[0], edge.v[1]),
            ));
        }
    }

    for (index, triangle) in triangles.iter().enumerate() {
        for k in 0..3 {
            let edge = &edges[triangle.e[k] as usize];
            let (a, b) = (triangle.v[(k + 1) % 3], triangle.v[(k + 2) % 3]);
            if edge.contains_vertex(triangle.v[k]) || !edge.has_vertices(a, b) {
                push(RefineError::inconsistent(
                    TopologyLocation::Triangle { index },
                    format!(
                        "e[{k}] = {} joins ({}, {}), expected the edge opposite vertex {}",
                        triangle.e[k], edge.v[0], edge.v[1], triangle.v[k]
                    ),
                ));
            } else if !edge.is_incident(index as u32) {
                push(RefineError::inconsistent(
                    TopologyLocation::Triangle { index },
                    format!(
                        "e[{k}] = {} does not list this triangle (ta = {}, tb = {:?})",
                        triangle.e[k], edge.ta, edge.tb
                    ),
                ));
            }
        }
    }

    for (index, edge) in edges.iter().enumerate() {
        let [a, b] = edge.v;
        if !triangles[edge.ta as usize].contains_pair(a, b) {
            push(RefineError::inconsistent(
                TopologyLocation::Edge { index },
                format!("ta = {} does not contain both endpoints", edge.ta),
            ));
        }
        if let Some(tb) = edge.tb {
            if tb == edge.ta {
                push(RefineError::inconsistent(
                    TopologyLocation::Edge { index },
                    format!("ta and tb are both {tb}"),
                ));
            } else if !triangles[tb as usize].contains_pair(a, b) {
                push(RefineError::inconsistent(
                    TopologyLocation::Edge { index },
                    format!("tb = {tb} does not contain both endpoints"),
                ));
            }
        }
    }
}
