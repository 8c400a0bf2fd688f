//! GPU compute backend for Lepp-Delaunay refinement using WGPU.
//!
//! This crate runs the two detection phases of refinement as compute
//! shaders:
//!
//! - **Bad triangles**: one invocation per triangle computes its smallest angle
//! - **Terminal edges**: one invocation per bad triangle walks its Lepp
//!
//! Centroid insertion stays on the host. [`WgpuBackend`] plugs into
//! [`lepp_refine::DataParallelEngine`], so a GPU engine can be swapped in
//! anywhere a sequential or rayon engine is used.
//!
//! # Precision
//!
//! The shaders work in `f32`. Results match the `f64` host engines unless a
//! triangle's smallest angle lies within rounding of the tolerance or two
//! edges of a triangle differ in length only in the last bits.
//!
//! # GPU Availability
//!
//! There is no global device. [`GpuContext::new`] acquires one and the
//! context releases it when dropped. [`GpuContext::is_available`] probes
//! for an adapter.
//!
//! # Example
//!
//! ```no_run
//! use lepp_gpu::{GpuDevicePreference, gpu_engine};
//! use lepp_refine::Model;
//!
//! let mut model = Model::load("mesh.off").unwrap();
//! match gpu_engine(GpuDevicePreference::Auto) {
//!     Ok(engine) => model.set_engine(Box::new(engine)),
//!     Err(e) => {
//!         eprintln!("GPU unavailable ({e}), using rayon");
//!         model.set_parallel_engine();
//!     }
//! }
//! let report = model.refine(30.0).unwrap();
//! println!("{report}");
//! ```

pub mod backend;
pub mod buffers;
pub mod context;
pub mod error;
pub mod pipeline;

pub use backend::{GpuEngine, WgpuBackend, gpu_engine};
pub use context::{GpuAdapterInfo, GpuContext, GpuDevicePreference};
pub use error::{GpuError, GpuResult};
