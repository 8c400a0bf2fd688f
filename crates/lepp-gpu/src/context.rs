//! GPU context management.
//!
//! A [`GpuContext`] owns one device and queue. Contexts are created
//! explicitly and released when dropped, so a backend that is replaced on a
//! model gives its device back.

use tracing::{debug, info};
use wgpu::{Device, DeviceDescriptor, Instance, Queue, RequestAdapterOptions};

use crate::error::{GpuError, GpuResult};

/// GPU device preference for adapter selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GpuDevicePreference {
    /// Automatically select the best available device.
    #[default]
    Auto,
    /// Prefer high-performance discrete GPU.
    HighPerformance,
    /// Prefer low-power integrated GPU.
    LowPower,
}

/// Information about the GPU adapter.
#[derive(Debug, Clone)]
pub struct GpuAdapterInfo {
    /// Device name.
    pub name: String,
    /// Vendor name.
    pub vendor: String,
    /// Device type (discrete, integrated, etc.).
    pub device_type: String,
    /// Backend API (Vulkan, Metal, DX12, etc.).
    pub backend: String,
}

impl From<wgpu::AdapterInfo> for GpuAdapterInfo {
    fn from(info: wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name,
            vendor: format!("{}", info.vendor),
            device_type: format!("{:?}", info.device_type),
            backend: format!("{:?}", info.backend),
        }
    }
}

/// GPU device, queue and adapter information.
pub struct GpuContext {
    /// The WGPU device for creating resources and pipelines.
    pub device: Device,
    /// The command queue for submitting work.
    pub queue: Queue,
    /// Information about the GPU adapter.
    pub adapter_info: GpuAdapterInfo,
    /// Device limits for resource allocation.
    pub limits: wgpu::Limits,
}

impl GpuContext {
    /// Acquire a device matching `preference`.
    ///
    /// # Errors
    /// Returns `GpuError::NotAvailable` if no adapter is found.
    ///
    /// # Example
    /// ```no_run
    /// use lepp_gpu::{GpuContext, GpuDevicePreference};
    ///
    /// match GpuContext::new(GpuDevicePreference::Auto) {
    ///     Ok(ctx) => println!("GPU: {}", ctx.adapter_info.name),
    ///     Err(e) => println!("No GPU: {e}"),
    /// }
    /// ```
    pub fn new(preference: GpuDevicePreference) -> GpuResult<Self> {
        let ctx = pollster::block_on(Self::try_init(preference))?;
        info!(
            adapter = %ctx.adapter_info.name,
            backend = %ctx.adapter_info.backend,
            "GPU context initialized"
        );
        Ok(ctx)
    }

    /// Whether any adapter can be acquired.
    ///
    /// Creates and drops a context, so prefer keeping the result of
    /// [`GpuContext::new`] when a device is going to be used anyway.
    pub fn is_available() -> bool {
        match Self::new(GpuDevicePreference::Auto) {
            Ok(_) => true,
            Err(e) => {
                debug!("GPU unavailable: {}", e);
                false
            }
        }
    }

    async fn try_init(preference: GpuDevicePreference) -> GpuResult<GpuContext> {
        debug!("Initializing GPU context with preference: {:?}", preference);

        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let power_preference = match preference {
            GpuDevicePreference::Auto | GpuDevicePreference::HighPerformance => {
                wgpu::PowerPreference::HighPerformance
            }
            GpuDevicePreference::LowPower => wgpu::PowerPreference::LowPower,
        };

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(GpuError::NotAvailable)?;

        let adapter_info = adapter.get_info();
        debug!(
            name = %adapter_info.name,
            vendor = adapter_info.vendor,
            device_type = ?adapter_info.device_type,
            backend = ?adapter_info.backend,
            "GPU adapter found"
        );

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("lepp-gpu"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

        let limits = device.limits();

        Ok(GpuContext {
            device,
            queue,
            adapter_info: adapter_info.into(),
            limits,
        })
    }

    /// Maximum storage buffer binding size, in bytes.
    pub fn max_storage_buffer_size(&self) -> u32 {
        self.limits.max_storage_buffer_binding_size
    }

    /// Maximum workgroups per dispatch dimension.
    pub fn max_workgroups_per_dimension(&self) -> u32 {
        self.limits.max_compute_workgroups_per_dimension
    }

    /// Release the device now instead of at drop.
    pub fn release(self) {
        debug!(adapter = %self.adapter_info.name, "Releasing GPU context");
        self.device.destroy();
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter_info", &self.adapter_info)
            .field(
                "max_storage_buffer_size",
                &self.limits.max_storage_buffer_binding_size,
            )
            .finish_non_exhaustive()
    }
}
