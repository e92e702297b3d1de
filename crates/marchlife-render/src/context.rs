//! Shared wgpu device and queue.

use marchlife_core::VolumeFormat;

use crate::error::{RenderError, RenderResult};

/// A headless wgpu device.
pub struct GpuContext {
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The command queue.
    pub queue: wgpu::Queue,
    adapter: wgpu::Adapter,
}

impl GpuContext {
    /// Creates a device without a window surface.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("marchlife device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let info = adapter.get_info();
        log::info!("[wgpu] using adapter '{}' ({:?})", info.name, info.backend);

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }

    /// Blocking variant of [`GpuContext::new_headless`].
    pub fn request() -> RenderResult<Self> {
        pollster::block_on(Self::new_headless())
    }

    /// Adapter description.
    #[must_use]
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns true if `format` can be written as a storage texture.
    #[must_use]
    pub fn supports_storage(&self, format: VolumeFormat) -> bool {
        self.adapter
            .get_texture_format_features(texture_format(format))
            .allowed_usages
            .contains(wgpu::TextureUsages::STORAGE_BINDING)
    }

    /// Resolves the volume format, falling back if `preferred` is unsupported.
    #[must_use]
    pub fn volume_format(&self, preferred: VolumeFormat) -> VolumeFormat {
        match preferred {
            VolumeFormat::Rgba8Unorm => preferred,
            VolumeFormat::Rgba16Float => VolumeFormat::select(|f| self.supports_storage(f)),
        }
    }
}

/// wgpu texture format of a volume format.
#[must_use]
pub fn texture_format(format: VolumeFormat) -> wgpu::TextureFormat {
    match format {
        VolumeFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        VolumeFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// WGSL storage texel format name of a volume format.
#[must_use]
pub fn wgsl_format(format: VolumeFormat) -> &'static str {
    match format {
        VolumeFormat::Rgba16Float => "rgba16float",
        VolumeFormat::Rgba8Unorm => "rgba8unorm",
    }
}
