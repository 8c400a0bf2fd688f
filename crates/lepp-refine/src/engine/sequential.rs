//! Single-threaded engine.

use crate::centroid;
use crate::error::RefineResult;
use crate::lepp::{self, TerminalScan};
use crate::quality;
use crate::topology::Topology;

use super::RefinementEngine;

/// Runs every phase on the calling thread, in handle order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialEngine;

impl SequentialEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RefinementEngine for SequentialEngine {
    fn name(&self) -> &str {
        "sequential"
    }

    fn detect_bad(&mut self, angle_deg: f64, topology: &mut Topology) -> RefineResult<usize> {
        quality::detect_bad_triangles(angle_deg, topology)
    }

    fn detect_terminal(&mut self, topology: &mut Topology) -> RefineResult<TerminalScan> {
        lepp::detect_terminal_edges(topology)
    }

    fn insert_centroids(&mut self, topology: &mut Topology) -> RefineResult<usize> {
        Ok(centroid::insert_centroids(topology)?.inserted)
    }
}
