//! GPU buffer management.

use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};

/// Creates a uniform buffer from data.
pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &T,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::bytes_of(data),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Creates a read-only storage buffer from data.
pub fn create_storage_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &[T],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    })
}

/// Creates an uninitialized storage buffer of `size` bytes that can be copied out.
pub fn create_output_buffer(
    device: &wgpu::Device,
    size: u64,
    extra_usage: wgpu::BufferUsages,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size: size.max(4),
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST
            | extra_usage,
        mapped_at_creation: false,
    })
}

/// Creates a host-mappable staging buffer.
pub fn create_staging_buffer(device: &wgpu::Device, size: u64, label: Option<&str>) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size: size.max(4),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Maps a staging buffer after all submitted work completes and copies out its first `len` bytes.
pub fn read_staging(device: &wgpu::Device, staging: &wgpu::Buffer, len: u64) -> RenderResult<Vec<u8>> {
    let slice = staging.slice(..len.max(4));
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::PollType::wait_indefinitely());
    rx.recv()
        .map_err(|_| RenderError::BufferMapFailed)?
        .map_err(|_| RenderError::BufferMapFailed)?;

    let data = slice.get_mapped_range();
    let bytes = data[..len as usize].to_vec();
    drop(data);
    staging.unmap();
    Ok(bytes)
}

/// Copies `len` bytes of `source` into a fresh staging buffer and reads them back.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    len: u64,
) -> RenderResult<Vec<u8>> {
    let staging = create_staging_buffer(device, len, Some("readback staging"));
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    if len > 0 {
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, len);
    }
    queue.submit(std::iter::once(encoder.finish()));
    read_staging(device, &staging, len)
}

/// Row pitch of a texture copy, aligned to `COPY_BYTES_PER_ROW_ALIGNMENT`.
#[must_use]
pub fn aligned_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strips row padding from a texture readback.
#[must_use]
pub fn unpad_rows(data: &[u8], unpadded: u32, padded: u32, rows: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity((unpadded * rows) as usize);
    for row in 0..rows {
        let start = (row * padded) as usize;
        out.extend_from_slice(&data[start..start + unpadded as usize]);
    }
    out
}
