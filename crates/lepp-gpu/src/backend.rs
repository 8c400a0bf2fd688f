//! [`ComputeBackend`] implementation on wgpu.

use lepp_refine::tracing_ext::log_perf_section;
use lepp_refine::{ComputeBackend, DataParallelEngine, EdgeFlags, RefineResult, Topology};
use tracing::{debug, info};

use crate::buffers::TopologyBuffers;
use crate::context::{GpuAdapterInfo, GpuContext, GpuDevicePreference};
use crate::error::GpuResult;
use crate::pipeline::{Pass, RefinePipeline};

/// Data-parallel engine running detection on the GPU.
pub type GpuEngine = DataParallelEngine<WgpuBackend>;

/// Runs both detection passes as compute shaders.
///
/// Geometry is evaluated in `f32` after shifting positions to the mesh's
/// bounding-box minimum. Triangles whose smallest angle is within rounding
/// of the tolerance, or whose longest edges differ only in the last bits,
/// may be classified differently than by the `f64` host code.
#[derive(Debug)]
pub struct WgpuBackend {
    ctx: GpuContext,
    pipeline: RefinePipeline,
}

impl WgpuBackend {
    /// Acquire a device and build the pipelines.
    pub fn new(preference: GpuDevicePreference) -> GpuResult<Self> {
        Self::from_context(GpuContext::new(preference)?)
    }

    /// Build the pipelines on an existing context.
    pub fn from_context(ctx: GpuContext) -> GpuResult<Self> {
        let pipeline = RefinePipeline::new(&ctx)?;
        Ok(Self { ctx, pipeline })
    }

    pub fn adapter_info(&self) -> &GpuAdapterInfo {
        &self.ctx.adapter_info
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Release the device.
    pub fn release(self) {
        self.ctx.release();
    }

    fn run_bad(&self, tolerance_rad: f64, topology: &Topology) -> GpuResult<Vec<bool>> {
        let _section = log_perf_section("gpu_detect_bad");
        let buffers = TopologyBuffers::upload(&self.ctx, topology, tolerance_rad)?;
        self.pipeline.dispatch(&self.ctx, &buffers, Pass::DetectBad)?;
        let words = self.pipeline.read_bad_flags(&self.ctx, &buffers)?;
        Ok(words.into_iter().map(|word| word != 0).collect())
    }

    fn run_terminal(&self, topology: &Topology) -> GpuResult<Vec<EdgeFlags>> {
        let _section = log_perf_section("gpu_detect_terminal");
        let buffers = TopologyBuffers::upload(&self.ctx, topology, 0.0)?;
        self.pipeline.dispatch(&self.ctx, &buffers, Pass::DetectTerminal)?;
        let words = self.pipeline.read_edge_flags(&self.ctx, &buffers)?;
        Ok(words.into_iter().map(EdgeFlags::from_bits).collect())
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn bad_flags(&mut self, tolerance_rad: f64, topology: &Topology) -> RefineResult<Vec<bool>> {
        if topology.triangle_count() == 0 {
            return Ok(Vec::new());
        }
        let flags = self.run_bad(tolerance_rad, topology)?;
        debug!(triangles = flags.len(), "GPU bad-triangle pass complete");
        Ok(flags)
    }

    fn terminal_flags(&mut self, topology: &Topology) -> RefineResult<Vec<EdgeFlags>> {
        if topology.triangle_count() == 0 || topology.edge_count() == 0 {
            return Ok(vec![EdgeFlags::default(); topology.edge_count()]);
        }
        let flags = self.run_terminal(topology)?;
        debug!(edges = flags.len(), "GPU terminal-edge pass complete");
        Ok(flags)
    }
}

/// Create a data-parallel engine on a GPU matching `preference`.
///
/// # Example
/// ```no_run
/// use lepp_gpu::{GpuDevicePreference, gpu_engine};
/// use lepp_refine::Model;
///
/// let mut model = Model::load("mesh.off").unwrap();
/// match gpu_engine(GpuDevicePreference::Auto) {
///     Ok(engine) => model.set_engine(Box::new(engine)),
///     Err(_) => model.set_parallel_engine(),
/// }
/// model.refine(30.0).unwrap();
/// ```
pub fn gpu_engine(preference: GpuDevicePreference) -> GpuResult<GpuEngine> {
    let backend = WgpuBackend::new(preference)?;
    info!(adapter = %backend.adapter_info().name, "Using GPU refinement backend");
    Ok(DataParallelEngine::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lepp_refine::{RefineParams, RefinementEngine, SequentialEngine, Vertex};

    /// Stretched grid with distinct edge lengths, far from any angle threshold.
    fn grid() -> Topology {
        let (nx, ny) = (6u32, 3u32);
        let mut vertices = Vec::new();
        for j in 0..=ny {
            for i in 0..=nx {
                let shear = if j % 2 == 0 { 0.0 } else { 0.37 };
                vertices.push(Vertex::from_coords(
                    (i as f64 + shear) * 5.0,
                    j as f64 * 1.1,
                    0.0,
                ));
            }
        }
        let idx = |i: u32, j: u32| j * (nx + 1) + i;
        let mut faces = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1));
                faces.push([a, b, c]);
                faces.push([a, c, d]);
            }
        }
        Topology::from_indexed(vertices, &faces).unwrap()
    }

    fn backend() -> Option<WgpuBackend> {
        match WgpuBackend::new(GpuDevicePreference::Auto) {
            Ok(backend) => Some(backend),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }

    #[test]
    fn test_gpu_detection_matches_sequential() {
        let Some(backend) = backend() else { return };
        let mut gpu = DataParallelEngine::new(backend);
        let mut sequential = SequentialEngine::new();

        let mut expected = grid();
        let mut actual = grid();
        assert_eq!(
            sequential.detect_bad(30.0, &mut expected).unwrap(),
            gpu.detect_bad(30.0, &mut actual).unwrap()
        );
        assert_eq!(
            sequential.detect_terminal(&mut expected).unwrap(),
            gpu.detect_terminal(&mut actual).unwrap()
        );
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_gpu_improve_matches_sequential() {
        let Some(backend) = backend() else { return };
        let mut gpu = DataParallelEngine::new(backend);
        let mut sequential = SequentialEngine::new();
        let params = RefineParams::with_angle(30.0).with_max_iterations(1);

        let mut expected = grid();
        sequential.detect_bad(30.0, &mut expected).unwrap();
        let expected_report = sequential.improve(&mut expected, &params).unwrap();

        let mut actual = grid();
        gpu.detect_bad(30.0, &mut actual).unwrap();
        let actual_report = gpu.improve(&mut actual, &params).unwrap();

        assert_eq!(expected_report.insertions, actual_report.insertions);
        assert_eq!(expected.vertex_count(), actual.vertex_count());
    }

    #[test]
    fn test_gpu_engine_name() {
        let Some(backend) = backend() else { return };
        let engine = DataParallelEngine::new(backend);
        assert_eq!(engine.name(), "data-parallel (wgpu)");
    }

    #[test]
    fn test_gpu_rejects_dangling_handle() {
        let Some(backend) = backend() else { return };
        let mut engine = DataParallelEngine::new(backend);
        let (vertices, mut edges, triangles) = grid().into_parts();
        edges[0].ta = 999;
        let mut topo = Topology::from_parts(vertices, edges, triangles);
        let before = topo.clone();
        assert!(engine.detect_bad(30.0, &mut topo).is_err());
        assert_eq!(topo, before);
    }
}
