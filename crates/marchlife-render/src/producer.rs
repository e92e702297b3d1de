//! Device producer: simulation, extraction and colorization as compute passes.
//!
//! Each phase is one queue submission. Submissions execute in order, so a
//! pass always sees the results of the previous one. Extraction waits for its
//! frame record before returning, which makes the clamped triangle count
//! available to the host only after the pass has completed.

use std::sync::Arc;

use marchlife_core::marching_cubes::case_table_words;
use marchlife_core::{
    Cell, CellGrid, Dispatch, DoubleBuffer, GpuTriangle, GridExtent, Kernel, MarchlifeError,
    PipelineConfig, Result, SurfaceFrame, SurfaceProducer, Triangle, VolumeColor, VolumeFormat,
    VOLUME_UPSAMPLE,
};

use crate::buffer::{
    aligned_bytes_per_row, create_output_buffer, create_staging_buffer, create_storage_buffer,
    create_uniform_buffer, read_buffer, read_staging, unpad_rows,
};
use crate::context::{texture_format, GpuContext};
use crate::error::RenderError;
use crate::kernels::{ComputeKernels, DEVICE};
use crate::uniforms::{FrameRecord, KernelUniforms};

const TRIANGLE_BYTES: u64 = std::mem::size_of::<GpuTriangle>() as u64;
const CELL_BYTES: u64 = std::mem::size_of::<Cell>() as u64;
const RECORD_BYTES: u64 = std::mem::size_of::<FrameRecord>() as u64;

/// Borrowed device resources of the extracted surface.
#[derive(Debug, Clone, Copy)]
pub struct GpuSurface<'a> {
    /// Triangle storage buffer.
    pub triangles: &'a wgpu::Buffer,
    /// Frame record; its first 16 bytes are the indirect draw arguments.
    pub frame_record: &'a wgpu::Buffer,
    /// View of the painted volume texture.
    pub volume_view: &'a wgpu::TextureView,
    /// Volume texel format.
    pub format: VolumeFormat,
}

struct GridSlot {
    cells: wgpu::Buffer,
    /// Reads this slot's cells and writes the other slot's.
    bind_group: wgpu::BindGroup,
}

/// Simulates and extracts on a wgpu device.
///
/// Runs the outer-totalistic [`marchlife_core::LifeRule`] of the configuration.
pub struct GpuProducer {
    context: Arc<GpuContext>,
    config: PipelineConfig,
    format: VolumeFormat,
    capacity: u32,
    kernels: ComputeKernels,
    grids: DoubleBuffer<GridSlot>,
    triangles: wgpu::Buffer,
    counters: wgpu::Buffer,
    record: wgpu::Buffer,
    record_staging: wgpu::Buffer,
    volume: wgpu::Texture,
    volume_view: wgpu::TextureView,
    generation: u64,
}

fn check_binding(label: &'static str, size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(RenderError::BufferTooLarge { label, size, limit }.into());
    }
    Ok(())
}

impl GpuProducer {
    /// Allocates every device resource once and seeds both grid buffers.
    pub fn new(context: Arc<GpuContext>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let device = &context.device;
        let extent = config.extent;
        let capacity = config.effective_capacity();
        let format = context.volume_format(config.volume_format);

        let limits = device.limits();
        let binding_limit = u64::from(limits.max_storage_buffer_binding_size);
        let cell_bytes = extent.voxel_count() as u64 * CELL_BYTES;
        let triangle_bytes = u64::from(capacity) * TRIANGLE_BYTES;
        check_binding("cell", cell_bytes, binding_limit)?;
        check_binding("triangle", triangle_bytes, binding_limit)?;
        let volume_size = extent.scaled(VOLUME_UPSAMPLE)?.size();
        if volume_size.max_element() > limits.max_texture_dimension_3d {
            return Err(MarchlifeError::InvalidConfig(format!(
                "volume texture {}x{}x{} exceeds the device limit of {}",
                volume_size.x, volume_size.y, volume_size.z, limits.max_texture_dimension_3d
            )));
        }

        let kernels = ComputeKernels::new(device, format);
        let uniforms = create_uniform_buffer(
            device,
            &KernelUniforms::from_config(&config, capacity),
            Some("kernel uniforms"),
        );
        let cells = [
            create_output_buffer(device, cell_bytes, wgpu::BufferUsages::empty(), Some("cells 0")),
            create_output_buffer(device, cell_bytes, wgpu::BufferUsages::empty(), Some("cells 1")),
        ];
        let triangles = create_output_buffer(
            device,
            triangle_bytes.max(TRIANGLE_BYTES),
            wgpu::BufferUsages::empty(),
            Some("triangles"),
        );
        let counters = create_output_buffer(device, 4, wgpu::BufferUsages::empty(), Some("counters"));
        let record = create_output_buffer(
            device,
            RECORD_BYTES,
            wgpu::BufferUsages::INDIRECT,
            Some("frame record"),
        );
        let record_staging = create_staging_buffer(device, RECORD_BYTES, Some("frame record staging"));
        let case_table = create_storage_buffer(device, &case_table_words(), Some("case table"));
        let palette =
            create_storage_buffer(device, config.colorize.palette.colors(), Some("palette"));

        let volume = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("volume color"),
            size: wgpu::Extent3d {
                width: volume_size.x,
                height: volume_size.y,
                depth_or_array_layers: volume_size.z,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: texture_format(format),
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let volume_view = volume.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = |src: &wgpu::Buffer, dst: &wgpu::Buffer, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: kernels.layout(),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: src.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: dst.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: triangles.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: counters.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: record.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 6,
                        resource: case_table.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 7,
                        resource: palette.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 8,
                        resource: wgpu::BindingResource::TextureView(&volume_view),
                    },
                ],
            })
        };
        let group_0 = bind_group(&cells[0], &cells[1], "grid slot 0");
        let group_1 = bind_group(&cells[1], &cells[0], "grid slot 1");
        let [cells_0, cells_1] = cells;
        let grids = DoubleBuffer::new(
            GridSlot {
                cells: cells_0,
                bind_group: group_0,
            },
            GridSlot {
                cells: cells_1,
                bind_group: group_1,
            },
        );

        let producer = Self {
            context,
            config,
            format,
            capacity,
            kernels,
            grids,
            triangles,
            counters,
            record,
            record_staging,
            volume,
            volume_view,
            generation: 0,
        };
        producer.seed();

        let adapter = producer.context.adapter_info();
        log::info!(
            "[{DEVICE}] pipeline ready on '{}': grid {}x{}x{}, triangle capacity {capacity}, volume {:?}",
            adapter.name,
            extent.width(),
            extent.height(),
            extent.depth(),
            format
        );
        Ok(producer)
    }

    /// Re-seeds both buffers and resets the generation counter.
    pub fn reset(&mut self) {
        self.seed();
        self.generation = 0;
    }

    fn seed(&self) {
        let dispatch = Dispatch::voxels(Kernel::Seed, self.config.extent);
        let mut encoder = self.encoder("seed encoder");
        // Each slot's bind group writes the other slot, so both get seeded.
        self.kernels
            .record(&mut encoder, dispatch, &self.grids.current().bind_group);
        self.kernels
            .record(&mut encoder, dispatch, &self.grids.next().bind_group);
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Shared device context.
    #[must_use]
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    /// Triangle buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Volume format in use after any fallback.
    #[must_use]
    pub fn volume_format(&self) -> VolumeFormat {
        self.format
    }

    /// Copies the current grid buffer to the host.
    pub fn read_grid(&self) -> Result<CellGrid> {
        let extent = self.config.extent;
        let len = extent.voxel_count() as u64 * CELL_BYTES;
        let bytes = read_buffer(
            &self.context.device,
            &self.context.queue,
            &self.grids.current().cells,
            len,
        )?;
        let cells = bytes
            .chunks_exact(CELL_BYTES as usize)
            .map(bytemuck::pod_read_unaligned::<Cell>)
            .collect();
        CellGrid::from_cells(extent, cells)
    }

    /// Copies the first `count` triangles to the host.
    pub fn read_triangles(&self, count: u32) -> Result<Vec<Triangle>> {
        let count = count.min(self.capacity);
        let bytes = read_buffer(
            &self.context.device,
            &self.context.queue,
            &self.triangles,
            u64::from(count) * TRIANGLE_BYTES,
        )?;
        Ok(bytes
            .chunks_exact(TRIANGLE_BYTES as usize)
            .map(|chunk| Triangle::from_gpu(&bytemuck::pod_read_unaligned::<GpuTriangle>(chunk)))
            .collect())
    }

    /// Copies the volume texture to the host.
    pub fn read_volume(&self) -> Result<VolumeColor> {
        let mut volume = VolumeColor::new(self.config.extent, self.format)?;
        let size = volume.extent().size();
        let bpp = self.format.bytes_per_texel() as u32;
        let unpadded = size.x * bpp;
        let padded = aligned_bytes_per_row(unpadded);
        let rows = size.y * size.z;
        let len = u64::from(padded) * u64::from(rows);

        let device = &self.context.device;
        let staging = create_staging_buffer(device, len, Some("volume staging"));
        let mut encoder = self.encoder("volume readback encoder");
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.volume,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(size.y),
                },
            },
            wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: size.z,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let data = read_staging(device, &staging, len)?;
        let texels = unpad_rows(&data, unpadded, padded, rows);
        if texels.len() != volume.bytes().len() {
            return Err(RenderError::ReadbackSize {
                expected: volume.bytes().len(),
                actual: texels.len(),
            }
            .into());
        }
        volume.bytes_mut().copy_from_slice(&texels);
        Ok(volume)
    }

    /// Grid extent.
    #[must_use]
    pub fn extent(&self) -> GridExtent {
        self.config.extent
    }
}

impl SurfaceProducer for GpuProducer {
    type Surface<'a>
        = GpuSurface<'a>
    where
        Self: 'a;

    fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn step(&mut self) -> Result<()> {
        let mut encoder = self.encoder("step encoder");
        self.kernels.record(
            &mut encoder,
            Dispatch::voxels(Kernel::Step, self.config.extent),
            &self.grids.current().bind_group,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
        self.grids.swap();
        self.generation += 1;
        Ok(())
    }

    fn extract(&mut self) -> Result<SurfaceFrame> {
        let bind_group = &self.grids.current().bind_group;
        let mut encoder = self.encoder("extract encoder");
        encoder.clear_buffer(&self.counters, 0, None);
        self.kernels.record(
            &mut encoder,
            Dispatch::cells(Kernel::Extract, self.config.extent),
            bind_group,
        );
        self.kernels
            .record(&mut encoder, Dispatch::linear(Kernel::Finalize, 1), bind_group);
        encoder.copy_buffer_to_buffer(&self.record, 0, &self.record_staging, 0, RECORD_BYTES);
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_staging(&self.context.device, &self.record_staging, RECORD_BYTES)?;
        let record: FrameRecord = bytemuck::pod_read_unaligned(&bytes);
        let requested = record.triangle_count.saturating_add(record.dropped);
        let frame = SurfaceFrame::from_completed_pass(self.generation, requested, self.capacity);
        if frame.is_truncated() {
            log::warn!(
                "[{DEVICE}] generation {}: triangle buffer full, dropped {} of {} triangles",
                self.generation,
                frame.dropped(),
                requested
            );
        }
        Ok(frame)
    }

    fn colorize(&mut self) -> Result<()> {
        let mut encoder = self.encoder("colorize encoder");
        self.kernels.record(
            &mut encoder,
            Dispatch::voxels(Kernel::Colorize, self.config.extent.scaled(VOLUME_UPSAMPLE)?),
            &self.grids.current().bind_group,
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn surface(&self) -> GpuSurface<'_> {
        GpuSurface {
            triangles: &self.triangles,
            frame_record: &self.record,
            volume_view: &self.volume_view,
            format: self.format,
        }
    }
}
