//! High-level refinement facade.
//!
//! [`Model`] owns a topology and the engine used to refine it. The engine can
//! be swapped between calls; all engines produce the same result.
//!
//! # Example
//!
//! ```
//! use lepp_refine::{Model, Topology, Vertex};
//!
//! let vertices = vec![
//!     Vertex::from_coords(0.0, 0.0, 0.0),
//!     Vertex::from_coords(4.0, 0.0, 0.0),
//!     Vertex::from_coords(2.0, 0.5, 0.0),
//!     Vertex::from_coords(2.0, -0.5, 0.0),
//! ];
//! let topology = Topology::from_indexed(vertices, &[[0, 1, 2], [0, 3, 1]]).unwrap();
//!
//! let mut model = Model::new(topology);
//! assert_eq!(model.detect_bad_triangles(30.0).unwrap(), 2);
//! let report = model.improve_triangulation().unwrap();
//! assert_eq!(report.insertions, 1);
//! assert_eq!(model.vertices().len(), 5);
//! ```

use std::path::Path;

use tracing::info;

use crate::engine::{DataParallelEngine, ImproveReport, RefinementEngine, SequentialEngine};
use crate::error::RefineResult;
use crate::io;
use crate::params::RefineParams;
use crate::topology::Topology;
use crate::tracing_ext::log_topology_stats;
use crate::types::{Edge, Triangle, Vertex};
use crate::validate::validate_topology;

/// A topology together with the engine that refines it.
pub struct Model {
    topology: Topology,
    engine: Box<dyn RefinementEngine>,
    params: RefineParams,
    validated: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("engine", &self.engine.name())
            .field("vertices", &self.topology.vertex_count())
            .field("triangles", &self.topology.triangle_count())
            .field("edges", &self.topology.edge_count())
            .field("params", &self.params)
            .finish()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(Topology::default())
    }
}

impl Model {
    /// Wrap a topology, using the sequential engine and default parameters.
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            engine: Box::new(SequentialEngine::new()),
            params: RefineParams::default(),
            validated: false,
        }
    }

    /// Load a mesh file.
    pub fn load(path: impl AsRef<Path>) -> RefineResult<Self> {
        let topology = io::load_topology(path.as_ref())?;
        log_topology_stats(&topology, "loaded");
        Ok(Self::new(topology))
    }

    /// Save the current topology.
    pub fn save(&self, path: impl AsRef<Path>) -> RefineResult<()> {
        io::save_topology(&self.topology, path.as_ref())
    }

    /// Replace the engine. Takes effect at the next call.
    pub fn set_engine(&mut self, engine: Box<dyn RefinementEngine>) {
        info!(from = self.engine.name(), to = engine.name(), "Switching engine");
        self.engine = engine;
    }

    /// Switch back to the sequential engine.
    pub fn set_sequential_engine(&mut self) {
        self.set_engine(Box::new(SequentialEngine::new()));
    }

    /// Switch to the data-parallel engine on rayon's global pool.
    pub fn set_parallel_engine(&mut self) {
        self.set_engine(Box::new(DataParallelEngine::rayon()));
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn params(&self) -> &RefineParams {
        &self.params
    }

    /// Replace the parameters used by [`Model::improve_triangulation`].
    pub fn set_params(&mut self, params: RefineParams) -> RefineResult<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    fn ensure_validated(&mut self) -> RefineResult<()> {
        if self.validated || !self.params.validate_input {
            return Ok(());
        }
        validate_topology(&self.topology)?;
        self.validated = true;
        Ok(())
    }

    /// Flag triangles whose smallest angle is below `angle_deg`.
    ///
    /// The angle becomes the tolerance for later improvement runs. The
    /// topology is validated before the first detection.
    pub fn detect_bad_triangles(&mut self, angle_deg: f64) -> RefineResult<usize> {
        self.ensure_validated()?;
        let bad = self.engine.detect_bad(angle_deg, &mut self.topology)?;
        self.params.angle_deg = angle_deg;
        Ok(bad)
    }

    /// Refine until no interior terminal edge remains or the iteration cap is hit.
    pub fn improve_triangulation(&mut self) -> RefineResult<ImproveReport> {
        self.ensure_validated()?;
        let report = self.engine.improve(&mut self.topology, &self.params)?;
        log_topology_stats(&self.topology, "improved");
        Ok(report)
    }

    /// Detect at `angle_deg`, then improve.
    pub fn refine(&mut self, angle_deg: f64) -> RefineResult<ImproveReport> {
        self.detect_bad_triangles(angle_deg)?;
        self.improve_triangulation()
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.topology.vertices()
    }

    pub fn edges(&self) -> &[Edge] {
        self.topology.edges()
    }

    pub fn triangles(&self) -> &[Triangle] {
        self.topology.triangles()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn into_topology(self) -> Topology {
        self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

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
    fn test_detect_then_improve() {
        let mut model = Model::new(diamond());
        assert_eq!(model.detect_bad_triangles(30.0).unwrap(), 2);
        let report = model.improve_triangulation().unwrap();
        assert_eq!(report.insertions, 1);
        assert_eq!(model.vertices().len(), 5);
        assert_eq!(model.triangles().len(), 4);
        assert_eq!(model.edges().len(), 8);
    }

    #[test]
    fn test_invalid_angle_keeps_previous_tolerance() {
        let mut model = Model::new(diamond());
        model.detect_bad_triangles(25.0).unwrap();
        let err = model.detect_bad_triangles(-5.0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAngle);
        assert_eq!(model.params().angle_deg, 25.0);
    }

    #[test]
    fn test_corrupt_topology_rejected_before_detection() {
        let (vertices, edges, mut triangles) = diamond().into_parts();
        triangles[0].e[1] = 50;
        let mut model = Model::new(Topology::from_parts(vertices, edges, triangles));
        let err = model.detect_bad_triangles(30.0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::HandleOutOfRange);
        assert_eq!(model.topology().bad_count(), 0);
    }

    #[test]
    fn test_dropped_back_reference_rejected_before_detection() {
        let (vertices, mut edges, triangles) = diamond().into_parts();
        for edge in edges.iter_mut() {
            edge.tb = None;
        }
        let mut model = Model::new(Topology::from_parts(vertices, edges, triangles));
        let err = model.detect_bad_triangles(30.0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InconsistentTopology);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_engine_switch() {
        let mut model = Model::new(diamond());
        assert_eq!(model.engine_name(), "sequential");
        model.set_parallel_engine();
        assert_eq!(model.engine_name(), "data-parallel (rayon)");
        model.detect_bad_triangles(30.0).unwrap();
        model.set_sequential_engine();
        let report = model.improve_triangulation().unwrap();
        assert_eq!(report.insertions, 1);
    }

    #[test]
    fn test_set_params_validates() {
        let mut model = Model::default();
        let err = model
            .set_params(RefineParams::default().with_max_iterations(0))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
        assert_eq!(model.params().max_iterations, 64);
    }
}
