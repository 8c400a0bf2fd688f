//! Subcommand implementations.

pub mod detect;
pub mod info;
pub mod refine;
pub mod validate;

use anyhow::{Context, Result};
use lepp_gpu::GpuDevicePreference;
use lepp_refine::{DataParallelEngine, RayonBackend, RefinementEngine, SequentialEngine};
use tracing::warn;

use crate::{EngineKind, output};

/// Build the engine requested on the command line.
///
/// A GPU request without a usable adapter falls back to the rayon engine.
pub fn build_engine(
    kind: EngineKind,
    threads: Option<usize>,
    quiet: bool,
) -> Result<Box<dyn RefinementEngine>> {
    let rayon = || -> Result<Box<dyn RefinementEngine>> {
        match threads {
            Some(n) => {
                let backend = RayonBackend::with_threads(n)
                    .context("Failed to build the worker thread pool")?;
                Ok(Box::new(DataParallelEngine::new(backend)))
            }
            None => Ok(Box::new(DataParallelEngine::rayon())),
        }
    };

    match kind {
        EngineKind::Sequential => Ok(Box::new(SequentialEngine::new())),
        EngineKind::Parallel => rayon(),
        EngineKind::Gpu => match lepp_gpu::gpu_engine(GpuDevicePreference::Auto) {
            Ok(engine) => Ok(Box::new(engine)),
            Err(e) => {
                warn!(error = %e, "GPU engine unavailable, falling back to rayon");
                output::warn(
                    &format!("GPU unavailable ({e}); using the parallel engine"),
                    quiet,
                );
                rayon()
            }
        },
    }
}
