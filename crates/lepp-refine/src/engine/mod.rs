//! Refinement engines.
//!
//! An engine implements the three phases of a refinement iteration:
//! bad-triangle detection, terminal-edge detection and centroid insertion.
//! [`RefinementEngine::improve`] drives them until no interior terminal edge
//! is left or the iteration cap is reached.
//!
//! - [`SequentialEngine`] runs every phase on the calling thread.
//! - [`DataParallelEngine`] computes detection flags through a
//!   [`ComputeBackend`] (a rayon pool by default, or a GPU) and applies
//!   centroid insertion serially.
//!
//! All engines produce the same topology from the same input, so they are
//! interchangeable between calls.

mod parallel;
mod sequential;

pub use parallel::{ComputeBackend, DataParallelEngine, EdgeFlags, RayonBackend};
pub use sequential::SequentialEngine;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::RefineResult;
use crate::lepp::TerminalScan;
use crate::params::RefineParams;
use crate::topology::Topology;
use crate::tracing_ext::{OperationTimer, log_improve_report};

/// Why an improvement run stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImproveStatus {
    /// No interior terminal edge existed before the first iteration.
    #[default]
    NothingToRefine,
    /// Every remaining terminal edge lies on the boundary.
    Converged,
    /// The iteration cap was reached with interior terminal edges left.
    IterationLimit,
}

impl std::fmt::Display for ImproveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImproveStatus::NothingToRefine => write!(f, "nothing to refine"),
            ImproveStatus::Converged => write!(f, "converged"),
            ImproveStatus::IterationLimit => write!(f, "iteration limit reached"),
        }
    }
}

/// Outcome of [`RefinementEngine::improve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImproveReport {
    pub status: ImproveStatus,
    /// Insertion iterations performed.
    pub iterations: usize,
    /// Centroids inserted over all iterations.
    pub insertions: usize,
    pub vertices_added: usize,
    pub triangles_added: usize,
    pub edges_added: usize,
}

impl ImproveReport {
    /// Whether the run ended without hitting the iteration cap.
    pub fn converged(&self) -> bool {
        self.status != ImproveStatus::IterationLimit
    }
}

impl std::fmt::Display for ImproveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} after {} iteration(s): {} centroid(s), +{} vertices, +{} triangles, +{} edges",
            self.status,
            self.iterations,
            self.insertions,
            self.vertices_added,
            self.triangles_added,
            self.edges_added
        )
    }
}

/// A refinement strategy.
///
/// Each phase either succeeds and commits its results to the topology, or
/// fails and leaves the topology as it was before the phase started.
pub trait RefinementEngine {
    /// Short engine name for logs and reports.
    fn name(&self) -> &str;

    /// Flag every triangle whose smallest angle is below `angle_deg`.
    ///
    /// Returns the number of bad triangles.
    fn detect_bad(&mut self, angle_deg: f64, topology: &mut Topology) -> RefineResult<usize>;

    /// Clear all terminal flags, then flag the terminal edge of each bad triangle.
    fn detect_terminal(&mut self, topology: &mut Topology) -> RefineResult<TerminalScan>;

    /// Insert a centroid at each interior terminal edge.
    ///
    /// Returns the number of insertions.
    fn insert_centroids(&mut self, topology: &mut Topology) -> RefineResult<usize>;

    /// Refine until no interior terminal edge remains.
    ///
    /// Bad flags must already be set by [`RefinementEngine::detect_bad`];
    /// they are recomputed with `params.angle_deg` after every insertion pass.
    fn improve(
        &mut self,
        topology: &mut Topology,
        params: &RefineParams,
    ) -> RefineResult<ImproveReport> {
        run_improve(self, topology, params)
    }
}

impl<E: RefinementEngine + ?Sized> RefinementEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn detect_bad(&mut self, angle_deg: f64, topology: &mut Topology) -> RefineResult<usize> {
        (**self).detect_bad(angle_deg, topology)
    }

    fn detect_terminal(&mut self, topology: &mut Topology) -> RefineResult<TerminalScan> {
        (**self).detect_terminal(topology)
    }

    fn insert_centroids(&mut self, topology: &mut Topology) -> RefineResult<usize> {
        (**self).insert_centroids(topology)
    }

    fn improve(
        &mut self,
        topology: &mut Topology,
        params: &RefineParams,
    ) -> RefineResult<ImproveReport> {
        (**self).improve(topology, params)
    }
}

/// The improvement loop shared by every engine.
///
/// ```text
/// loop:
///   detect terminal edges
///   no interior terminal edge  -> stop (converged)
///   iteration cap reached      -> stop (limit)
///   insert centroids, re-detect bad triangles
/// ```
pub fn run_improve<E: RefinementEngine + ?Sized>(
    engine: &mut E,
    topology: &mut Topology,
    params: &RefineParams,
) -> RefineResult<ImproveReport> {
    params.validate()?;
    let _timer = OperationTimer::with_context("improve_triangulation", topology);

    let start = (
        topology.vertex_count(),
        topology.triangle_count(),
        topology.edge_count(),
    );
    let mut report = ImproveReport::default();

    loop {
        let scan = engine.detect_terminal(topology)?;
        if !scan.has_non_border {
            report.status = if report.iterations == 0 {
                ImproveStatus::NothingToRefine
            } else {
                ImproveStatus::Converged
            };
            break;
        }
        if report.iterations >= params.max_iterations {
            warn!(
                engine = engine.name(),
                max_iterations = params.max_iterations,
                terminal = scan.terminal_edges,
                "Iteration limit reached"
            );
            report.status = ImproveStatus::IterationLimit;
            break;
        }

        let inserted = engine.insert_centroids(topology)?;
        let bad = engine.detect_bad(params.angle_deg, topology)?;
        report.insertions += inserted;
        report.iterations += 1;
        debug!(
            engine = engine.name(),
            iteration = report.iterations,
            inserted,
            bad,
            "Refinement iteration"
        );
    }

    report.vertices_added = topology.vertex_count() - start.0;
    report.triangles_added = topology.triangle_count() - start.1;
    report.edges_added = topology.edge_count() - start.2;

    log_improve_report(engine.name(), &report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_improve_diamond() {
        let mut engine = SequentialEngine::new();
        let mut topo = diamond();
        engine.detect_bad(30.0, &mut topo).unwrap();

        let report = engine
            .improve(&mut topo, &RefineParams::with_angle(30.0))
            .unwrap();
        assert_eq!(report.status, ImproveStatus::Converged);
        assert!(report.iterations >= 1);
        assert_eq!(report.vertices_added, report.insertions);
        assert_eq!(report.triangles_added, 2 * report.insertions);
        assert_eq!(report.edges_added, 3 * report.insertions);
    }

    #[test]
    fn test_improve_without_bad_triangles() {
        let mut engine = SequentialEngine::new();
        let mut topo = diamond();
        let before = topo.clone();
        let report = engine.improve(&mut topo, &RefineParams::default()).unwrap();
        assert_eq!(report.status, ImproveStatus::NothingToRefine);
        assert_eq!(report.iterations, 0);
        assert_eq!(topo, before);
    }

    #[test]
    fn test_iteration_limit() {
        // A flat cap over one outer edge of the diamond makes that edge the
        // next interior terminal edge after the first insertion.
        let vertices = vec![
            Vertex::from_coords(0.0, 0.0, 0.0),
            Vertex::from_coords(4.0, 0.0, 0.0),
            Vertex::from_coords(2.0, 0.5, 0.0),
            Vertex::from_coords(2.0, -0.5, 0.0),
            Vertex::from_coords(0.927, 0.541, 0.0),
        ];
        let mut topo =
            Topology::from_indexed(vertices, &[[0, 1, 2], [0, 3, 1], [0, 2, 4]]).unwrap();
        let mut engine = SequentialEngine::new();
        engine.detect_bad(59.0, &mut topo).unwrap();
        let params = RefineParams::with_angle(59.0).with_max_iterations(1);
        let report = engine.improve(&mut topo, &params).unwrap();
        assert_eq!(report.iterations, 1);
        assert_eq!(report.status, ImproveStatus::IterationLimit);
        assert!(!report.converged());
    }

    #[test]
    fn test_boxed_engine_dispatch() {
        let mut engine: Box<dyn RefinementEngine> = Box::new(SequentialEngine::new());
        let mut topo = diamond();
        assert_eq!(engine.name(), "sequential");
        assert_eq!(engine.detect_bad(30.0, &mut topo).unwrap(), 2);
    }

    #[test]
    fn test_report_display() {
        let report = ImproveReport {
            status: ImproveStatus::Converged,
            iterations: 2,
            insertions: 3,
            vertices_added: 3,
            triangles_added: 6,
            edges_added: 9,
        };
        let text = report.to_string();
        assert!(text.starts_with("converged after 2 iteration(s)"));
        assert!(text.contains("+6 triangles"));
    }
}
