//! Compute pipelines for the two detection passes.

use tracing::debug;
use wgpu::{BindGroupLayout, ComputePipeline};

use crate::buffers::{TopologyBuffers, WORKGROUP_SIZE};
use crate::context::GpuContext;
use crate::error::{GpuError, GpuResult};

/// Shader source for both passes.
const REFINE_SHADER: &str = include_str!("shaders/refine.wgsl");

/// Which entry point to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    DetectBad,
    DetectTerminal,
}

impl Pass {
    fn label(self) -> &'static str {
        match self {
            Pass::DetectBad => "lepp_detect_bad_pass",
            Pass::DetectTerminal => "lepp_detect_terminal_pass",
        }
    }
}

/// Both compute pipelines with their shared bind group layout.
pub struct RefinePipeline {
    bad_pipeline: ComputePipeline,
    terminal_pipeline: ComputePipeline,
    bind_group_layout: BindGroupLayout,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl RefinePipeline {
    /// Compile the shader and build both pipelines.
    ///
    /// Validation errors raised by the device are collected from an error
    /// scope and reported as [`GpuError::ShaderCompilation`].
    pub fn new(ctx: &GpuContext) -> GpuResult<Self> {
        debug!("Creating refinement compute pipelines");
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("lepp_refine"),
                source: wgpu::ShaderSource::Wgsl(REFINE_SHADER.into()),
            });

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("lepp_bind_group_layout"),
                    entries: &[
                        // Vertices, triangles, edges (read-only)
                        storage_entry(0, true),
                        storage_entry(1, true),
                        storage_entry(2, true),
                        // Params (uniform)
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        // Bad flags, edge flags (read-write)
                        storage_entry(4, false),
                        storage_entry(5, false),
                    ],
                });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("lepp_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let create = |label: &'static str, entry_point: &'static str| {
            ctx.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some(entry_point),
                    compilation_options: Default::default(),
                    cache: None,
                })
        };
        let bad_pipeline = create("lepp_detect_bad_pipeline", "detect_bad_triangles");
        let terminal_pipeline = create("lepp_detect_terminal_pipeline", "detect_terminal_edges");

        if let Some(error) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(GpuError::ShaderCompilation(error.to_string()));
        }

        Ok(Self {
            bad_pipeline,
            terminal_pipeline,
            bind_group_layout,
        })
    }

    /// Run one pass over `buffers` and wait for it to finish.
    ///
    /// The edge flag buffer is cleared before a terminal pass.
    pub fn dispatch(&self, ctx: &GpuContext, buffers: &TopologyBuffers, pass: Pass) -> GpuResult<()> {
        if buffers.triangle_count == 0 {
            return Ok(());
        }

        ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lepp_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.vertices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.triangles.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.edges.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.bad_flags.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: buffers.edge_flags.as_entire_binding(),
                },
            ],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lepp_encoder"),
            });

        let pipeline = match pass {
            Pass::DetectBad => &self.bad_pipeline,
            Pass::DetectTerminal => {
                encoder.clear_buffer(&buffers.edge_flags, 0, None);
                &self.terminal_pipeline
            }
        };

        let workgroups = buffers.triangle_count.div_ceil(WORKGROUP_SIZE);
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(pass.label()),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        }

        ctx.queue.submit([encoder.finish()]);
        ctx.device.poll(wgpu::Maintain::Wait);

        let validation = pollster::block_on(ctx.device.pop_error_scope());
        let out_of_memory = pollster::block_on(ctx.device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            return Err(GpuError::from_scope(error, pass.label()));
        }

        debug!(pass = pass.label(), workgroups, "Dispatch complete");
        Ok(())
    }

    /// Read back one bad flag per triangle.
    pub fn read_bad_flags(&self, ctx: &GpuContext, buffers: &TopologyBuffers) -> GpuResult<Vec<u32>> {
        TopologyBuffers::download_words(ctx, &buffers.bad_flags, buffers.triangle_count as usize)
    }

    /// Read back one packed flag word per edge.
    pub fn read_edge_flags(&self, ctx: &GpuContext, buffers: &TopologyBuffers) -> GpuResult<Vec<u32>> {
        TopologyBuffers::download_words(ctx, &buffers.edge_flags, buffers.edge_count as usize)
    }
}

impl std::fmt::Debug for RefinePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefinePipeline").finish_non_exhaustive()
    }
}
