//! GPU buffer layouts and topology upload.

use bytemuck::{Pod, Zeroable};
use lepp_refine::{RefineError, Topology};
use tracing::debug;
use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages};

use crate::context::GpuContext;
use crate::error::{GpuError, GpuResult};

/// Threads per workgroup in every entry point of `refine.wgsl`.
pub const WORKGROUP_SIZE: u32 = 64;

/// Marks a missing second triangle in [`GpuEdge::tb`].
pub const NO_TRIANGLE: u32 = u32::MAX;

/// GPU-side triangle: corner vertices, opposite edges and the bad flag.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuTriangle {
    pub v: [u32; 3],
    pub bad: u32,
    pub e: [u32; 3],
    pub _padding: u32,
}

/// GPU-side edge. `tb` is [`NO_TRIANGLE`] on the boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuEdge {
    pub v: [u32; 2],
    pub ta: u32,
    pub tb: u32,
}

/// Uniform parameters shared by both passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuRefineParams {
    pub angle_rad: f32,
    pub triangle_count: u32,
    pub edge_count: u32,
    pub max_steps: u32,
}

/// A topology packed into device buffers, with output buffers for both passes.
pub struct TopologyBuffers {
    pub vertices: Buffer,
    pub triangles: Buffer,
    pub edges: Buffer,
    pub params: Buffer,
    pub bad_flags: Buffer,
    pub edge_flags: Buffer,
    pub triangle_count: u32,
    pub edge_count: u32,
}

impl TopologyBuffers {
    /// Pack and upload `topology`.
    ///
    /// Positions are shifted to the bounding-box minimum before conversion
    /// to `f32`. Every handle is checked on the way, so the shaders never
    /// follow a dangling reference.
    pub fn upload(ctx: &GpuContext, topology: &Topology, angle_rad: f64) -> GpuResult<Self> {
        let vertex_count = topology.vertex_count();
        let triangle_count = topology.triangle_count();
        let edge_count = topology.edge_count();

        check_fits::<[f32; 4]>(ctx, "vertices", vertex_count)?;
        check_fits::<GpuTriangle>(ctx, "triangles", triangle_count)?;
        check_fits::<GpuEdge>(ctx, "edges", edge_count)?;
        let max_threads = ctx.max_workgroups_per_dimension() as usize * WORKGROUP_SIZE as usize;
        if triangle_count > max_threads {
            return Err(GpuError::MeshTooLarge {
                kind: "triangles",
                elements: triangle_count,
                max: max_threads,
            });
        }

        let vertices = pack_vertices(topology);
        let triangles = pack_triangles(topology)?;
        let edges = pack_edges(topology)?;

        let params = GpuRefineParams {
            angle_rad: angle_rad as f32,
            triangle_count: triangle_count as u32,
            edge_count: edge_count as u32,
            max_steps: triangle_count.max(1) as u32,
        };

        debug!(
            vertices = vertex_count,
            triangles = triangle_count,
            edges = edge_count,
            "Uploading topology to GPU"
        );

        let device = &ctx.device;
        let storage = |label: &'static str, contents: &[u8]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: BufferUsages::STORAGE,
            })
        };
        let vertices = storage("lepp_vertices", bytemuck::cast_slice(&vertices));
        let triangles = storage("lepp_triangles", bytemuck::cast_slice(&triangles));
        let edges = storage("lepp_edges", bytemuck::cast_slice(&edges));

        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lepp_params"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM,
        });

        let output = |label: &'static str, count: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: word_bytes(count),
                usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let bad_flags = output("lepp_bad_flags", triangle_count);
        let edge_flags = output("lepp_edge_flags", edge_count);

        Ok(Self {
            vertices,
            triangles,
            edges,
            params,
            bad_flags,
            edge_flags,
            triangle_count: triangle_count as u32,
            edge_count: edge_count as u32,
        })
    }

    /// Read back the first `count` words of `buffer`.
    pub fn download_words(ctx: &GpuContext, buffer: &Buffer, count: usize) -> GpuResult<Vec<u32>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let size = (count * std::mem::size_of::<u32>()) as u64;

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lepp_staging"),
            size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lepp_download"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        ctx.queue.submit([encoder.finish()]);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| GpuError::BufferMapping("channel closed".into()))?
            .map_err(|e| GpuError::BufferMapping(format!("{:?}", e)))?;

        let data = slice.get_mapped_range();
        let words: Vec<u32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(words)
    }
}

/// Storage bindings must be non-empty.
fn word_bytes(count: usize) -> u64 {
    (count.max(1) * std::mem::size_of::<u32>()) as u64
}

fn check_fits<T>(ctx: &GpuContext, kind: &'static str, count: usize) -> GpuResult<()> {
    let max = ctx.max_storage_buffer_size() as usize / std::mem::size_of::<T>();
    if count > max {
        return Err(GpuError::MeshTooLarge {
            kind,
            elements: count,
            max,
        });
    }
    Ok(())
}

fn pack_vertices(topology: &Topology) -> Vec<[f32; 4]> {
    let Some(bounds) = topology.bounds() else {
        return vec![[0.0; 4]];
    };
    let origin = bounds.min;
    topology
        .vertices()
        .iter()
        .map(|vertex| {
            let p = vertex.position;
            [
                (p.x - origin.x) as f32,
                (p.y - origin.y) as f32,
                (p.z - origin.z) as f32,
                0.0,
            ]
        })
        .collect()
}

fn pack_triangles(topology: &Topology) -> GpuResult<Vec<GpuTriangle>> {
    let nv = topology.vertex_count() as u32;
    let ne = topology.edge_count() as u32;
    let edges = topology.edges();

    let mut packed = Vec::with_capacity(topology.triangle_count().max(1));
    for (t, triangle) in topology.triangles().iter().enumerate() {
        if let Some(&v) = triangle.v.iter().find(|&&v| v >= nv) {
            return Err(dangling("triangle", t, "vertex", v).into());
        }
        for &e in &triangle.e {
            if e >= ne {
                return Err(dangling("triangle", t, "edge", e).into());
            }
            if !edges[e as usize].is_incident(t as u32) {
                return Err(GpuError::Upload(RefineError::invariant(format!(
                    "triangle {t} lists edge {e}, which does not reference it back"
                ))));
            }
        }
        packed.push(GpuTriangle {
            v: triangle.v,
            bad: u32::from(triangle.bad),
            e: triangle.e,
            _padding: 0,
        });
    }
    if packed.is_empty() {
        packed.push(GpuTriangle::zeroed());
    }
    Ok(packed)
}

fn pack_edges(topology: &Topology) -> GpuResult<Vec<GpuEdge>> {
    let nv = topology.vertex_count() as u32;
    let nt = topology.triangle_count() as u32;

    let mut packed = Vec::with_capacity(topology.edge_count().max(1));
    for (i, edge) in topology.edges().iter().enumerate() {
        if let Some(&v) = edge.v.iter().find(|&&v| v >= nv) {
            return Err(dangling("edge", i, "vertex", v).into());
        }
        if edge.ta >= nt {
            return Err(dangling("edge", i, "triangle", edge.ta).into());
        }
        if let Some(tb) = edge.tb.filter(|&tb| tb >= nt) {
            return Err(dangling("edge", i, "triangle", tb).into());
        }
        packed.push(GpuEdge {
            v: edge.v,
            ta: edge.ta,
            tb: edge.tb.unwrap_or(NO_TRIANGLE),
        });
    }
    if packed.is_empty() {
        packed.push(GpuEdge::zeroed());
    }
    Ok(packed)
}

fn dangling(entity: &str, index: usize, target: &str, handle: u32) -> RefineError {
    RefineError::invariant(format!("{entity} {index} references missing {target} {handle}"))
}
