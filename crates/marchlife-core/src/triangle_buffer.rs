//! Extracted triangles, the bounded append buffer they are written into, and
//! the indirect draw arguments derived from a completed extraction.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::grid::GridExtent;
use crate::marching_cubes::MAX_TRIANGLES_PER_CELL;

/// Sub-triangles the renderer expands every source triangle into.
pub const SUB_TRIANGLES_PER_TRIANGLE: u32 = 3;

/// Vertices the renderer emits per source triangle.
pub const VERTICES_PER_TRIANGLE: u32 = SUB_TRIANGLES_PER_TRIANGLE * 3;

/// A surface triangle in grid space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Triangle {
    /// Vertex positions.
    pub positions: [Vec3; 3],
    /// Unit vertex normals.
    pub normals: [Vec3; 3],
}

impl Triangle {
    /// Mean of the three positions.
    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        (self.positions[0] + self.positions[1] + self.positions[2]) / 3.0
    }

    /// Normalized mean of the three vertex normals, or the face normal if they cancel.
    #[must_use]
    pub fn average_normal(&self) -> Vec3 {
        (self.normals[0] + self.normals[1] + self.normals[2])
            .try_normalize()
            .unwrap_or_else(|| self.face_normal())
    }

    /// Unit normal from the cross product of two edges (`+Y` if degenerate).
    #[must_use]
    pub fn face_normal(&self) -> Vec3 {
        let [a, b, c] = self.positions;
        (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Y)
    }

    /// Device layout of this triangle.
    #[must_use]
    pub fn to_gpu(&self) -> GpuTriangle {
        GpuTriangle {
            positions: self.positions.map(|p| p.extend(1.0).to_array()),
            normals: self.normals.map(|n| n.extend(0.0).to_array()),
        }
    }

    /// Reads a triangle back from its device layout.
    #[must_use]
    pub fn from_gpu(gpu: &GpuTriangle) -> Self {
        Self {
            positions: gpu.positions.map(|p| Vec3::new(p[0], p[1], p[2])),
            normals: gpu.normals.map(|n| Vec3::new(n[0], n[1], n[2])),
        }
    }
}

/// Triangle layout in device storage buffers.
/// Layout must match WGSL `Triangle` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    /// Positions, `w = 1`.
    pub positions: [[f32; 4]; 3],
    /// Normals, `w = 0`.
    pub normals: [[f32; 4]; 3],
}

/// Result of a single append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The triangle was written to this slot.
    Written(u32),
    /// The buffer was full; the triangle was counted and discarded.
    Dropped,
}

/// Capacity-bounded multi-producer append buffer.
///
/// Producers reserve slots through a single atomic counter that never passes
/// the capacity; reservations that would overflow are counted in a separate
/// dropped counter and never written. Both counters are reset once per pass
/// (which requires exclusive access) and read after the pass has joined.
#[derive(Debug)]
pub struct TriangleBuffer {
    slots: Box<[OnceLock<Triangle>]>,
    count: AtomicU32,
    dropped: AtomicU32,
}

impl TriangleBuffer {
    /// Allocates a buffer holding `capacity` triangles.
    #[must_use]
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
            count: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Worst-case triangle count of one extraction over `extent`.
    #[must_use]
    pub fn capacity_for(extent: GridExtent) -> u32 {
        let worst = extent.cell_count().saturating_mul(MAX_TRIANGLES_PER_CELL);
        u32::try_from(worst).unwrap_or(u32::MAX)
    }

    /// Number of slots.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Clears the slots written by the previous pass and zeroes both counters.
    pub fn reset(&mut self) {
        let used = (*self.count.get_mut() as usize).min(self.slots.len());
        for slot in &mut self.slots[..used] {
            slot.take();
        }
        *self.count.get_mut() = 0;
        *self.dropped.get_mut() = 0;
    }

    /// Reserves a slot and writes `triangle`, or counts it as dropped when full.
    pub fn push(&self, triangle: Triangle) -> AppendOutcome {
        let capacity = self.capacity();
        let reserved = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            });
        match reserved {
            Ok(slot) => {
                let written = self.slots[slot as usize].set(triangle);
                debug_assert!(written.is_ok(), "slot {slot} reserved twice in one pass");
                AppendOutcome::Written(slot)
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                AppendOutcome::Dropped
            }
        }
    }

    /// Number of written triangles. Never exceeds the capacity.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Number of triangles discarded for lack of space in the current pass.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Acquire)
    }

    /// Triangle in slot `index`, if written.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&Triangle> {
        self.slots.get(index as usize).and_then(OnceLock::get)
    }

    /// Written triangles in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Triangle> + '_ {
        let count = (self.count() as usize).min(self.slots.len());
        self.slots[..count].iter().filter_map(OnceLock::get)
    }
}

/// Arguments of a non-indexed indirect draw.
/// Layout must match the device's indirect draw record exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawArgs {
    /// Number of vertices to draw.
    pub vertex_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// Index of the first vertex.
    pub first_vertex: u32,
    /// Index of the first instance.
    pub first_instance: u32,
}

impl DrawArgs {
    /// Draw arguments covering `triangles` amplified source triangles.
    #[must_use]
    pub fn for_triangles(triangles: u32) -> Self {
        Self {
            vertex_count: triangles.saturating_mul(VERTICES_PER_TRIANGLE),
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    /// Number of source triangles these arguments cover.
    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        self.vertex_count / VERTICES_PER_TRIANGLE
    }
}

/// Host record of one completed extraction pass.
///
/// The draw arguments inside are derived from the same pass's counter, so a
/// frame can never pair a triangle buffer with another pass's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFrame {
    generation: u64,
    triangle_count: u32,
    dropped: u32,
    capacity: u32,
    draw_args: DrawArgs,
}

impl SurfaceFrame {
    /// Builds the record of a pass that has fully completed.
    ///
    /// `requested` is the number of triangles the pass tried to emit; it is
    /// clamped to `capacity` and the excess is reported as dropped.
    #[must_use]
    pub fn from_completed_pass(generation: u64, requested: u32, capacity: u32) -> Self {
        let triangle_count = requested.min(capacity);
        Self {
            generation,
            triangle_count,
            dropped: requested - triangle_count,
            capacity,
            draw_args: DrawArgs::for_triangles(triangle_count),
        }
    }

    /// Generation whose grid produced the triangles.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of triangles in the buffer (clamped to capacity).
    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        self.triangle_count
    }

    /// Number of triangles discarded because the buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Capacity of the buffer the pass wrote into.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns true if some triangles were dropped.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.dropped > 0
    }

    /// Indirect draw arguments for the amplified surface.
    #[must_use]
    pub fn draw_args(&self) -> DrawArgs {
        self.draw_args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tri(x: f32) -> Triangle {
        Triangle {
            positions: [Vec3::new(x, 0.0, 0.0), Vec3::X, Vec3::Y],
            normals: [Vec3::Z; 3],
        }
    }

    #[test]
    fn test_push_until_full_then_drop() {
        let mut buffer = TriangleBuffer::with_capacity(2);
        assert_eq!(buffer.push(tri(0.0)), AppendOutcome::Written(0));
        assert_eq!(buffer.push(tri(1.0)), AppendOutcome::Written(1));
        assert_eq!(buffer.push(tri(2.0)), AppendOutcome::Dropped);
        assert_eq!(buffer.push(tri(3.0)), AppendOutcome::Dropped);
        assert_eq!(buffer.count(), 2);
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(buffer.iter().count(), 2);

        buffer.reset();
        assert_eq!(buffer.count(), 0);
        assert_eq!(buffer.dropped(), 0);
        assert!(buffer.get(0).is_none());
        assert_eq!(buffer.push(tri(4.0)), AppendOutcome::Written(0));
        assert_eq!(buffer.get(0).unwrap().positions[0].x, 4.0);
    }

    #[test]
    fn test_zero_capacity_drops_everything() {
        let buffer = TriangleBuffer::with_capacity(0);
        assert_eq!(buffer.push(tri(0.0)), AppendOutcome::Dropped);
        assert_eq!(buffer.count(), 0);
        assert_eq!(buffer.dropped(), 1);
    }

    #[test]
    fn test_concurrent_push_respects_capacity() {
        let buffer = Arc::new(TriangleBuffer::with_capacity(100));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        buffer.push(tri((t * 50 + i) as f32));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(buffer.count(), 100);
        assert_eq!(buffer.dropped(), 300);
        let mut xs: Vec<i32> = buffer.iter().map(|t| t.positions[0].x as i32).collect();
        xs.sort_unstable();
        xs.dedup();
        assert_eq!(xs.len(), 100, "every written slot holds a distinct triangle");
    }

    #[test]
    fn test_capacity_for_extent() {
        let extent = GridExtent::new(4, 4, 4).unwrap();
        assert_eq!(TriangleBuffer::capacity_for(extent), 27 * 5);
        let flat = GridExtent::new(4, 4, 1).unwrap();
        assert_eq!(TriangleBuffer::capacity_for(flat), 0);
    }

    #[test]
    fn test_frame_clamps_and_derives_draw_args() {
        let frame = SurfaceFrame::from_completed_pass(3, 10, 4);
        assert_eq!(frame.generation(), 3);
        assert_eq!(frame.triangle_count(), 4);
        assert_eq!(frame.dropped(), 6);
        assert!(frame.is_truncated());
        assert_eq!(frame.draw_args().vertex_count, 36);
        assert_eq!(frame.draw_args().instance_count, 1);
        assert_eq!(frame.draw_args().triangle_count(), 4);
    }

    #[test]
    fn test_gpu_layout() {
        assert_eq!(std::mem::size_of::<GpuTriangle>(), 96);
        assert_eq!(std::mem::size_of::<DrawArgs>(), 16);
        let t = tri(0.25);
        assert_eq!(Triangle::from_gpu(&t.to_gpu()), t);
    }

    #[test]
    fn test_normals_helpers() {
        let t = Triangle {
            positions: [Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: [Vec3::X, -Vec3::X, Vec3::ZERO],
        };
        assert_eq!(t.face_normal(), Vec3::Z);
        // Vertex normals cancel, so the face normal is used.
        assert_eq!(t.average_normal(), Vec3::Z);
        assert!((t.centroid() - Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).length() < 1e-6);
    }
}
