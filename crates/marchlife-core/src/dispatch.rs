//! Kernel identifiers and workgroup sizing shared by every device.

use glam::UVec3;

use crate::grid::GridExtent;

/// Workgroup tile for per-voxel and per-cell kernels.
pub const VOXEL_TILE: UVec3 = UVec3::splat(4);

/// Workgroup size for one-dimensional kernels.
pub const LINEAR_TILE: u32 = 64;

/// A data-parallel pass of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Writes the seed pattern into a grid buffer.
    Seed,
    /// Applies the transition rule, current buffer to next.
    Step,
    /// Marching Cubes over the current buffer.
    Extract,
    /// Clamps the triangle count and writes the draw arguments.
    Finalize,
    /// Paints the volume texture from the current buffer.
    Colorize,
}

impl Kernel {
    /// Kernel name, as used in labels and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Step => "step",
            Self::Extract => "extract",
            Self::Finalize => "finalize",
            Self::Colorize => "colorize",
        }
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A kernel launch and its workgroup grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// Kernel to run.
    pub kernel: Kernel,
    /// Workgroup counts per axis.
    pub workgroups: UVec3,
}

impl Dispatch {
    /// Covers `extent` with tiles of `tile` invocations.
    #[must_use]
    pub fn for_extent(kernel: Kernel, extent: UVec3, tile: UVec3) -> Self {
        let tile = tile.max(UVec3::ONE);
        Self {
            kernel,
            workgroups: (extent + tile - UVec3::ONE) / tile,
        }
    }

    /// Covers every voxel of a grid.
    #[must_use]
    pub fn voxels(kernel: Kernel, extent: GridExtent) -> Self {
        Self::for_extent(kernel, extent.size(), VOXEL_TILE)
    }

    /// Covers every marching cube of a grid.
    #[must_use]
    pub fn cells(kernel: Kernel, extent: GridExtent) -> Self {
        Self::for_extent(kernel, extent.cell_size(), VOXEL_TILE)
    }

    /// One-dimensional launch over `count` items.
    #[must_use]
    pub fn linear(kernel: Kernel, count: u32) -> Self {
        Self::for_extent(kernel, UVec3::new(count, 1, 1), UVec3::new(LINEAR_TILE, 1, 1))
    }

    /// Total workgroups launched.
    #[must_use]
    pub fn total_workgroups(&self) -> u64 {
        u64::from(self.workgroups.x) * u64::from(self.workgroups.y) * u64::from(self.workgroups.z)
    }

    /// Returns true if the launch does no work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_workgroups() == 0
    }

    /// Logs the launch at trace level.
    pub fn trace(&self, device: &str) {
        log::trace!(
            "[{device}] dispatch {} workgroups={}x{}x{}",
            self.kernel,
            self.workgroups.x,
            self.workgroups.y,
            self.workgroups.z
        );
    }
}
