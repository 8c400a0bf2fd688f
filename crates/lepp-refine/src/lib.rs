//! Lepp-Delaunay refinement of planar triangle meshes.
//!
//! This crate improves the quality of a 2D triangulation by repeatedly
//! splitting the neighborhood of *terminal edges*. A triangle is *bad* when
//! its smallest interior angle is below a tolerance. From each bad triangle,
//! a walk follows the longest-edge propagating path (Lepp) until it reaches
//! an edge that is the longest edge of every triangle sharing it. Interior
//! terminal edges are then replaced by a fan of four triangles around the
//! centroid of the surrounding quadrilateral.
//!
//! # Features
//!
//! - **Topology model**: vertices, edges and triangles with opposite-edge handles
//! - **Detection**: bad triangles by minimum angle, terminal edges by Lepp walk
//! - **Insertion**: centroid insertion with in-place slot reuse
//! - **Engines**: sequential, and data-parallel with pluggable compute backends
//! - **File I/O**: OFF load and save
//!
//! # Coordinate System
//!
//! Refinement works in the XY plane. The `z` coordinate is read, carried
//! through insertion and written back out, but does not take part in
//! orientation tests.
//!
//! # Quick Start
//!
//! ```no_run
//! use lepp_refine::Model;
//!
//! let mut model = Model::load("mesh.off").unwrap();
//! model.detect_bad_triangles(30.0).unwrap();
//! let report = model.improve_triangulation().unwrap();
//! println!("{report}");
//! model.save("refined.off").unwrap();
//! ```
//!
//! # Engines
//!
//! ```
//! use lepp_refine::{DataParallelEngine, Model, RayonBackend, Topology, Vertex};
//!
//! let vertices = vec![
//!     Vertex::from_coords(0.0, 0.0, 0.0),
//!     Vertex::from_coords(1.0, 0.0, 0.0),
//!     Vertex::from_coords(0.0, 1.0, 0.0),
//! ];
//! let topology = Topology::from_indexed(vertices, &[[0, 1, 2]]).unwrap();
//!
//! let mut model = Model::new(topology);
//! let backend = RayonBackend::with_threads(2).unwrap();
//! model.set_engine(Box::new(DataParallelEngine::new(backend)));
//! assert_eq!(model.detect_bad_triangles(30.0).unwrap(), 0);
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns [`RefineResult`]. Errors carry a
//! machine-readable [`ErrorCode`] and a [`RecoverySuggestion`]. A failed
//! phase leaves the topology as it was before the phase started.

mod error;
mod params;
mod topology;
mod types;

pub mod centroid;
pub mod engine;
pub mod io;
pub mod lepp;
pub mod model;
pub mod quality;
pub mod tracing_ext;
pub mod validate;

// Re-export core types
pub use error::{
    EntityKind, ErrorCode, RecoverySuggestion, RefineError, RefineResult, TopologyLocation,
};
pub use params::{RefineParams, check_angle};
pub use topology::{Bounds, Topology};
pub use types::{Edge, Triangle, Vertex};

// Re-export refinement operations
pub use centroid::{Insertion, InsertionPass, insert_centroid, insert_centroids};
pub use engine::{
    ComputeBackend, DataParallelEngine, EdgeFlags, ImproveReport, ImproveStatus, RayonBackend,
    RefinementEngine, SequentialEngine, run_improve,
};
pub use lepp::{TerminalEdge, TerminalScan, detect_terminal_edges, find_terminal_edge, longest_edge};
pub use model::Model;
pub use quality::{detect_bad_triangles, min_angle, triangle_angles};

// Re-export I/O and validation
pub use io::{MeshFormat, load_topology, save_topology};
pub use validate::{TopologyReport, check_topology, report_topology, validate_topology};

// Re-export tracing extensions
pub use tracing_ext::{OperationTimer, log_improve_report, log_topology_stats};

// Convenience methods on Topology
impl Topology {
    /// Load a topology from a file, detecting the format from its extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> RefineResult<Self> {
        io::load_topology(path.as_ref())
    }

    /// Save the topology, detecting the format from the extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> RefineResult<()> {
        io::save_topology(self, path.as_ref())
    }

    /// Summarize the topology and list any consistency issues.
    pub fn report(&self) -> TopologyReport {
        validate::report_topology(self)
    }

    /// Check every handle and cross reference.
    pub fn validate(&self) -> RefineResult<()> {
        validate::validate_topology(self)
    }
}
