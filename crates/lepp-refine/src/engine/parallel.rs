//! Data-parallel engine.
//!
//! Detection runs one independent work item per triangle. Each item writes
//! only its own bad flag, or stores a constant value into the flag word of
//! the edge its walk ended on, so concurrent writers agree on the final
//! value. Flags are computed into buffers owned by the backend and committed
//! to the topology only after the whole phase succeeds.
//!
//! Centroid insertion restructures neighborhoods and stays serial.

use std::sync::atomic::{AtomicU8, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::centroid;
use crate::error::{RefineError, RefineResult};
use crate::lepp::{self, TerminalScan};
use crate::params::check_angle;
use crate::quality::{self, apply_bad_flags};
use crate::topology::Topology;

use super::RefinementEngine;

/// Terminal flags computed for one edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeFlags {
    pub terminal: bool,
    pub border: bool,
}

impl EdgeFlags {
    /// Bit set in a packed flag word when the edge is terminal.
    pub const TERMINAL_BIT: u32 = 1;
    /// Bit set in a packed flag word when the terminal edge is on the boundary.
    pub const BORDER_BIT: u32 = 2;

    /// Decode a packed flag word.
    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        Self {
            terminal: bits & Self::TERMINAL_BIT != 0,
            border: bits & Self::BORDER_BIT != 0,
        }
    }

    /// Encode into a packed flag word.
    #[inline]
    pub fn to_bits(self) -> u32 {
        let mut bits = 0;
        if self.terminal {
            bits |= Self::TERMINAL_BIT;
        }
        if self.border {
            bits |= Self::BORDER_BIT;
        }
        bits
    }
}

/// Computes detection flags for a [`DataParallelEngine`].
///
/// Implementations read the topology and return fresh flag buffers; they
/// never write to the topology themselves.
pub trait ComputeBackend {
    /// Backend name for logs and error messages.
    fn name(&self) -> &str;

    /// One bad flag per triangle, for a tolerance in radians.
    fn bad_flags(&mut self, tolerance_rad: f64, topology: &Topology) -> RefineResult<Vec<bool>>;

    /// One flag entry per edge, from walks started at every bad triangle.
    fn terminal_flags(&mut self, topology: &Topology) -> RefineResult<Vec<EdgeFlags>>;
}

/// Engine that delegates detection to a [`ComputeBackend`].
#[derive(Debug)]
pub struct DataParallelEngine<B> {
    backend: B,
    name: String,
}

impl<B: ComputeBackend> DataParallelEngine<B> {
    pub fn new(backend: B) -> Self {
        let name = format!("data-parallel ({})", backend.name());
        Self { backend, name }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

impl DataParallelEngine<RayonBackend> {
    /// Engine on rayon's global thread pool.
    pub fn rayon() -> Self {
        Self::new(RayonBackend::new())
    }
}

fn check_len(backend: &str, what: &str, got: usize, expected: usize) -> RefineResult<()> {
    if got != expected {
        return Err(RefineError::backend(
            backend,
            format!("returned {got} {what} flags, expected {expected}"),
        ));
    }
    Ok(())
}

impl<B: ComputeBackend> RefinementEngine for DataParallelEngine<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect_bad(&mut self, angle_deg: f64, topology: &mut Topology) -> RefineResult<usize> {
        let tolerance = check_angle(angle_deg)?;
        let flags = self.backend.bad_flags(tolerance, topology)?;
        check_len(
            self.backend.name(),
            "triangle",
            flags.len(),
            topology.triangle_count(),
        )?;

        let bad = apply_bad_flags(topology, &flags);
        debug!(backend = self.backend.name(), angle_deg, bad, "Detected bad triangles");
        Ok(bad)
    }

    fn detect_terminal(&mut self, topology: &mut Topology) -> RefineResult<TerminalScan> {
        let flags = self.backend.terminal_flags(topology)?;
        check_len(self.backend.name(), "edge", flags.len(), topology.edge_count())?;

        for (edge, flag) in topology.edges.iter_mut().zip(&flags) {
            edge.terminal = flag.terminal;
            edge.border = flag.terminal && flag.border;
        }
        let scan = TerminalScan::from_edges(topology.edges());
        debug!(
            backend = self.backend.name(),
            terminal = scan.terminal_edges,
            border = scan.border_edges,
            "Detected terminal edges"
        );
        Ok(scan)
    }

    fn insert_centroids(&mut self, topology: &mut Topology) -> RefineResult<usize> {
        Ok(centroid::insert_centroids(topology)?.inserted)
    }
}

/// CPU backend running detection on a rayon thread pool.
#[derive(Debug, Default)]
pub struct RayonBackend {
    pool: Option<rayon::ThreadPool>,
}

impl RayonBackend {
    /// Use rayon's global pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Use a dedicated pool with `threads` workers.
    pub fn with_threads(threads: usize) -> RefineResult<Self> {
        if threads == 0 {
            return Err(RefineError::invalid_param(
                "threads",
                threads,
                "must be at least 1",
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("lepp-worker-{i}"))
            .build()
            .map_err(|e| RefineError::backend("rayon", e.to_string()))?;
        info!(threads, "Created rayon thread pool");
        Ok(Self { pool: Some(pool) })
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl ComputeBackend for RayonBackend {
    fn name(&self) -> &str {
        "rayon"
    }

    fn bad_flags(&mut self, tolerance_rad: f64, topology: &Topology) -> RefineResult<Vec<bool>> {
        self.install(|| {
            topology
                .triangles()
                .par_iter()
                .map(|triangle| -> RefineResult<bool> {
                    let points = topology.triangle_points(triangle)?;
                    Ok(quality::is_bad(&points, tolerance_rad))
                })
                .collect()
        })
    }

    fn terminal_flags(&mut self, topology: &Topology) -> RefineResult<Vec<EdgeFlags>> {
        let words: Vec<AtomicU8> = (0..topology.edge_count()).map(|_| AtomicU8::new(0)).collect();

        self.install(|| {
            topology
                .triangles()
                .par_iter()
                .enumerate()
                .filter(|(_, triangle)| triangle.bad)
                .try_for_each(|(index, _)| {
                    let found = lepp::find_terminal_edge(topology, index as u32)?;
                    let flags = EdgeFlags {
                        terminal: true,
                        border: found.border,
                    };
                    words[found.edge as usize].store(flags.to_bits() as u8, Ordering::Relaxed);
                    Ok::<(), RefineError>(())
                })
        })?;

        Ok(words
            .into_iter()
            .map(|word| EdgeFlags::from_bits(u32::from(word.into_inner())))
            .collect())
    }
}
