//! Compute pipelines for the seed, step, extract, finalize and colorize kernels.
//!
//! All kernels share one bind group layout, so a grid slot's bind group can be
//! used by any of them.

use std::num::NonZeroU64;

use marchlife_core::{Dispatch, Kernel, VolumeFormat};

use crate::context::{texture_format, wgsl_format};

const COMMON_SOURCE: &str = include_str!("shaders/common.wgsl");

pub(crate) const DEVICE: &str = "wgpu";

/// Compute pipelines and their shared layout.
pub struct ComputeKernels {
    layout: wgpu::BindGroupLayout,
    seed: wgpu::ComputePipeline,
    step: wgpu::ComputePipeline,
    extract: wgpu::ComputePipeline,
    finalize: wgpu::ComputePipeline,
    colorize: wgpu::ComputePipeline,
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

/// Kernel source with the shared declarations prepended.
#[must_use]
pub fn kernel_source(body: &str, format: VolumeFormat) -> String {
    let common = COMMON_SOURCE.replace("{{VOLUME_FORMAT}}", wgsl_format(format));
    format!("{common}\n{body}")
}

impl ComputeKernels {
    /// Compiles every kernel for a volume texture of `format`.
    pub fn new(device: &wgpu::Device, format: VolumeFormat) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kernel bind group layout"),
            entries: &[
                // Kernel parameters
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(96),
                    },
                    count: None,
                },
                // Source cells
                storage_entry(1, true),
                // Destination cells
                storage_entry(2, false),
                // Triangles
                storage_entry(3, false),
                // Reservation counter
                storage_entry(4, false),
                // Frame record
                storage_entry(5, false),
                // Case table
                storage_entry(6, true),
                // Palette
                storage_entry(7, true),
                // Volume texture
                wgpu::BindGroupLayoutEntry {
                    binding: 8,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: texture_format(format),
                        view_dimension: wgpu::TextureViewDimension::D3,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kernel pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let build = |kernel: Kernel, body: &str| {
            let source = kernel_source(body, format);
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kernel.name()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel.name()),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };

        let seed = build(Kernel::Seed, include_str!("shaders/seed.wgsl"));
        let step = build(Kernel::Step, include_str!("shaders/step.wgsl"));
        let extract = build(Kernel::Extract, include_str!("shaders/extract.wgsl"));
        let finalize = build(Kernel::Finalize, include_str!("shaders/finalize.wgsl"));
        let colorize = build(Kernel::Colorize, include_str!("shaders/colorize.wgsl"));

        Self {
            layout,
            seed,
            step,
            extract,
            finalize,
            colorize,
        }
    }

    /// The shared bind group layout.
    #[must_use]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    fn pipeline(&self, kernel: Kernel) -> &wgpu::ComputePipeline {
        match kernel {
            Kernel::Seed => &self.seed,
            Kernel::Step => &self.step,
            Kernel::Extract => &self.extract,
            Kernel::Finalize => &self.finalize,
            Kernel::Colorize => &self.colorize,
        }
    }

    /// Records one compute pass. Empty launches are skipped.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        dispatch: Dispatch,
        bind_group: &wgpu::BindGroup,
    ) {
        if dispatch.is_empty() {
            return;
        }
        dispatch.trace(DEVICE);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(dispatch.kernel.name()),
            timestamp_writes: None,
        });
        pass.set_pipeline(self.pipeline(dispatch.kernel));
        pass.set_bind_group(0, bind_group, &[]);
        let groups = dispatch.workgroups;
        pass.dispatch_workgroups(groups.x, groups.y, groups.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_source_substitutes_format() {
        let source = kernel_source("fn main() {}", VolumeFormat::Rgba8Unorm);
        assert!(source.contains("texture_storage_3d<rgba8unorm, write>"));
        assert!(!source.contains("{{VOLUME_FORMAT}}"));
        assert!(source.ends_with("fn main() {}"));
    }
}
