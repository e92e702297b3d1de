//! Cell grid storage and the double buffer that alternates read/write roles.
//!
//! Voxels are stored x-fastest: the cell at `(x, y, z)` lives at index
//! `x + width * (y + height * z)`. Marching Cubes treats every voxel as a
//! sample point, so a grid of `w × h × d` voxels forms `(w-1)(h-1)(d-1)` cubes.

use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{MarchlifeError, Result};

/// State of a single voxel.
///
/// Layout must match WGSL `Cell` exactly.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Cell {
    /// Type code: 0 = empty, 1 = alive, 2.. = decaying.
    pub state: u32,
    /// Auxiliary channel, used as the age in generations.
    pub aux: u32,
}

impl Cell {
    /// State code of an empty voxel.
    pub const EMPTY_STATE: u32 = 0;
    /// State code of a live voxel.
    pub const ALIVE_STATE: u32 = 1;

    /// An empty cell.
    pub const EMPTY: Self = Self { state: 0, aux: 0 };

    /// A freshly born cell.
    pub const ALIVE: Self = Self {
        state: Self::ALIVE_STATE,
        aux: 0,
    };

    /// Creates a cell from both channels.
    #[must_use]
    pub const fn new(state: u32, aux: u32) -> Self {
        Self { state, aux }
    }

    /// Returns true if the cell is alive.
    #[must_use]
    pub fn is_alive(self) -> bool {
        self.state == Self::ALIVE_STATE
    }

    /// Returns true if the cell is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.state == Self::EMPTY_STATE
    }
}

#[derive(Deserialize)]
struct ExtentRepr {
    width: i64,
    height: i64,
    depth: i64,
}

impl TryFrom<ExtentRepr> for GridExtent {
    type Error = MarchlifeError;

    fn try_from(repr: ExtentRepr) -> Result<Self> {
        Self::new(repr.width, repr.height, repr.depth)
    }
}

/// Dimensions of the voxel grid. Every dimension is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ExtentRepr")]
pub struct GridExtent {
    width: u32,
    height: u32,
    depth: u32,
}

impl GridExtent {
    /// Creates a validated extent.
    ///
    /// Rejects any dimension that is zero, negative or larger than `u32::MAX`.
    pub fn new(width: i64, height: i64, depth: i64) -> Result<Self> {
        Ok(Self {
            width: checked_dim("width", width)?,
            height: checked_dim("height", height)?,
            depth: checked_dim("depth", depth)?,
        })
    }

    /// Creates a cubic extent.
    pub fn cubic(size: i64) -> Result<Self> {
        Self::new(size, size, size)
    }

    /// Grid width (x).
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height (y).
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Grid depth (z).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Dimensions as a vector.
    #[must_use]
    pub fn size(&self) -> UVec3 {
        UVec3::new(self.width, self.height, self.depth)
    }

    /// Component-wise reciprocal of the dimensions.
    #[must_use]
    pub fn recip(&self) -> Vec3 {
        self.size().as_vec3().recip()
    }

    /// Total number of voxels.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Number of marching cubes per axis (one less than the voxel count per axis).
    #[must_use]
    pub fn cell_size(&self) -> UVec3 {
        self.size().saturating_sub(UVec3::ONE)
    }

    /// Total number of marching cubes.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let c = self.cell_size();
        c.x as usize * c.y as usize * c.z as usize
    }

    /// Extent scaled by an integer factor on every axis.
    ///
    /// Fails if a scaled dimension no longer fits in a `u32`.
    pub fn scaled(&self, factor: u32) -> Result<Self> {
        let scale = |axis: &'static str, value: u32| {
            value.checked_mul(factor).ok_or_else(|| {
                MarchlifeError::InvalidConfig(format!(
                    "{axis} {value} scaled by {factor} overflows u32"
                ))
            })
        };
        Ok(Self {
            width: scale("width", self.width)?,
            height: scale("height", self.height)?,
            depth: scale("depth", self.depth)?,
        })
    }

    /// Linear index of the voxel at `(x, y, z)`.
    #[inline]
    #[must_use]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        x as usize + self.width as usize * (y as usize + self.height as usize * z as usize)
    }

    /// Coordinates of the voxel at a linear index.
    #[inline]
    #[must_use]
    pub fn coords(&self, index: usize) -> UVec3 {
        let w = self.width as usize;
        let h = self.height as usize;
        UVec3::new((index % w) as u32, ((index / w) % h) as u32, (index / (w * h)) as u32)
    }
}

impl Default for GridExtent {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            depth: 32,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn checked_dim(axis: &'static str, value: i64) -> Result<u32> {
    if value <= 0 || value > i64::from(u32::MAX) {
        return Err(MarchlifeError::InvalidExtent { axis, value });
    }
    Ok(value as u32)
}

/// A dense 3D array of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGrid {
    extent: GridExtent,
    cells: Vec<Cell>,
}

impl CellGrid {
    /// Allocates a grid filled with empty cells.
    #[must_use]
    pub fn new(extent: GridExtent) -> Self {
        Self {
            extent,
            cells: vec![Cell::EMPTY; extent.voxel_count()],
        }
    }

    /// Wraps existing cell data.
    pub fn from_cells(extent: GridExtent, cells: Vec<Cell>) -> Result<Self> {
        if cells.len() != extent.voxel_count() {
            return Err(MarchlifeError::SizeMismatch {
                expected: extent.voxel_count(),
                actual: cells.len(),
            });
        }
        Ok(Self { extent, cells })
    }

    /// Grid dimensions.
    #[must_use]
    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    /// Cell at `(x, y, z)`. Coordinates must be in range.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32, z: u32) -> Cell {
        self.cells[self.extent.index(x, y, z)]
    }

    /// Overwrites the cell at `(x, y, z)`. Coordinates must be in range.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, z: u32, cell: Cell) {
        let index = self.extent.index(x, y, z);
        self.cells[index] = cell;
    }

    /// All cells in linear order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// All cells in linear order, mutable.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Number of cells with the given state.
    #[must_use]
    pub fn count_state(&self, state: u32) -> usize {
        self.cells.iter().filter(|c| c.state == state).count()
    }
}

/// Two buffers alternating between the "current" (read) and "next" (write) roles.
///
/// Swapping exchanges the roles only; no data is copied.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    buffers: [T; 2],
    current: usize,
}

impl<T> DoubleBuffer<T> {
    /// Creates a double buffer with `first` as the current buffer.
    pub fn new(first: T, second: T) -> Self {
        Self {
            buffers: [first, second],
            current: 0,
        }
    }

    /// Physical slot (0 or 1) holding the current buffer.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The readable buffer.
    #[must_use]
    pub fn current(&self) -> &T {
        &self.buffers[self.current]
    }

    /// The writable buffer.
    #[must_use]
    pub fn next(&self) -> &T {
        &self.buffers[1 - self.current]
    }

    /// Borrows the current buffer for reading and the next buffer for writing.
    pub fn split(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.buffers;
        if self.current == 0 {
            (&*a, b)
        } else {
            (&*b, a)
        }
    }

    /// Both physical buffers, mutable, in slot order.
    pub fn both_mut(&mut self) -> [&mut T; 2] {
        let [a, b] = &mut self.buffers;
        [a, b]
    }

    /// Exchanges the current and next roles.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

/// Initial grid content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedPattern {
    /// Every cell empty.
    #[default]
    Empty,
    /// A single live voxel.
    Voxel { x: u32, y: u32, z: u32 },
    /// A solid ball of live voxels centered in the grid (radius in voxels).
    Sphere { radius: f32 },
    /// Each voxel alive with probability `density`, from a deterministic hash.
    Random { density: f32, seed: u32 },
}

impl SeedPattern {
    /// Seed kind code shared with the device seed kernel.
    #[must_use]
    pub fn kind_code(&self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Voxel { .. } => 1,
            Self::Sphere { .. } => 2,
            Self::Random { .. } => 3,
        }
    }

    /// Initial cell at `(x, y, z)`.
    #[must_use]
    pub fn cell_at(&self, extent: GridExtent, x: u32, y: u32, z: u32) -> Cell {
        let alive = match *self {
            Self::Empty => false,
            Self::Voxel {
                x: sx,
                y: sy,
                z: sz,
            } => x == sx && y == sy && z == sz,
            Self::Sphere { radius } => {
                let center = (extent.size().as_vec3() - Vec3::ONE) * 0.5;
                let d = UVec3::new(x, y, z).as_vec3() - center;
                d.dot(d) <= radius * radius
            }
            Self::Random { density, seed } => {
                (hash3(x, y, z, seed) & 0xFFFF) < density_threshold(density)
            }
        };
        if alive {
            Cell::ALIVE
        } else {
            Cell::EMPTY
        }
    }
}

/// Integer hash of a voxel coordinate. Identical to `hash3` in the seed kernel.
#[must_use]
pub fn hash3(x: u32, y: u32, z: u32, seed: u32) -> u32 {
    let n = x
        .wrapping_mul(374_761_393)
        .wrapping_add(y.wrapping_mul(668_265_263))
        .wrapping_add(z.wrapping_mul(1_274_126_177))
        .wrapping_add(seed);
    let n = (n ^ (n >> 13)).wrapping_mul(1_103_515_245);
    n ^ (n >> 16)
}

/// Converts a probability into a 16-bit hash threshold.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn density_threshold(density: f32) -> u32 {
    (density.clamp(0.0, 1.0) * 65536.0) as u32
}
