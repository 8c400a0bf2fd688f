//! Tracing extensions for refinement operations.
//!
//! Refinement emits structured events through the `tracing` ecosystem:
//!
//! - **Timing**: [`OperationTimer`] logs the duration of a top-level operation
//!   under the `lepp_refine::timing` target.
//! - **Topology state**: vertex, edge and triangle counts plus flag counts
//!   under `lepp_refine::topology`.
//! - **Phases**: per-iteration detection and insertion counts at debug level.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // RUST_LOG=lepp_refine=debug shows per-phase progress.
//! ```
//!
//! # Log Levels
//!
//! - **WARN**: Iteration cap reached, backend fallbacks
//! - **INFO**: Operation summaries, timing
//! - **DEBUG**: Per-phase counts, walk cap hits
//! - **TRACE**: Phase timings in microseconds

use std::time::Instant;
use tracing::{Span, debug, info, trace, warn};

use crate::engine::{ImproveReport, ImproveStatus};
use crate::topology::Topology;

/// A performance timer that logs duration on drop.
///
/// ```rust,ignore
/// use lepp_refine::tracing_ext::OperationTimer;
///
/// fn refine_all() {
///     let _timer = OperationTimer::new("refine_all");
///     // ...
/// } // logs elapsed_ms here
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("refine_operation", operation = name);
        debug!(target: "lepp_refine::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer that also records the topology size.
    pub fn with_context(name: &'static str, topology: &Topology) -> Self {
        let span = tracing::info_span!(
            "refine_operation",
            operation = name,
            triangles = topology.triangle_count(),
            vertices = topology.vertex_count()
        );
        debug!(
            target: "lepp_refine::timing",
            operation = name,
            triangles = topology.triangle_count(),
            vertices = topology.vertex_count(),
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "lepp_refine::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log topology statistics at debug level.
pub fn log_topology_stats(topology: &Topology, context: &str) {
    debug!(
        target: "lepp_refine::topology",
        context = context,
        vertices = topology.vertex_count(),
        edges = topology.edge_count(),
        triangles = topology.triangle_count(),
        bad = topology.bad_count(),
        terminal = topology.terminal_count(),
        "Topology state"
    );
}

/// Log the outcome of an improvement run.
pub fn log_improve_report(engine: &str, report: &ImproveReport) {
    match report.status {
        ImproveStatus::IterationLimit => warn!(
            target: "lepp_refine::improve",
            engine = engine,
            iterations = report.iterations,
            insertions = report.insertions,
            "Stopped at the iteration limit with interior terminal edges left"
        ),
        status => info!(
            target: "lepp_refine::improve",
            engine = engine,
            status = %status,
            iterations = report.iterations,
            insertions = report.insertions,
            vertices_added = report.vertices_added,
            triangles_added = report.triangles_added,
            edges_added = report.edges_added,
            "Improvement finished"
        ),
    }
}

/// Log a file I/O operation.
pub fn log_io_operation(operation: &str, path: &std::path::Path, success: bool) {
    if success {
        info!(
            target: "lepp_refine::io",
            operation = operation,
            path = path.display().to_string(),
            "I/O operation completed"
        );
    } else {
        warn!(
            target: "lepp_refine::io",
            operation = operation,
            path = path.display().to_string(),
            "I/O operation failed"
        );
    }
}

/// Log a performance-critical section.
///
/// Returns a guard that logs when dropped.
#[must_use]
pub fn log_perf_section(name: &'static str) -> impl Drop {
    struct PerfGuard {
        name: &'static str,
        start: Instant,
    }
    impl Drop for PerfGuard {
        fn drop(&mut self) {
            trace!(
                target: "lepp_refine::perf",
                section = self.name,
                elapsed_us = self.start.elapsed().as_micros(),
                "Performance section completed"
            );
        }
    }
    PerfGuard {
        name,
        start: Instant::now(),
    }
}
