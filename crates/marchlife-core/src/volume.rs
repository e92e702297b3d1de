//! Volumetric color texture painted from the cell grid.

use glam::{UVec3, Vec3, Vec4};
use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::{MarchlifeError, Result};
use crate::grid::{Cell, CellGrid, GridExtent};

/// Volume texels per grid voxel along each axis.
pub const VOLUME_UPSAMPLE: u32 = 2;

/// Largest palette the device kernels accept.
pub const MAX_PALETTE_ENTRIES: usize = 16;

/// Texel format of the volume texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeFormat {
    /// Four half floats per texel.
    #[default]
    Rgba16Float,
    /// Four normalized bytes per texel. Lower precision fallback.
    Rgba8Unorm,
}

impl VolumeFormat {
    /// Size of one texel in bytes.
    #[must_use]
    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba16Float => 8,
            Self::Rgba8Unorm => 4,
        }
    }

    /// Picks `Rgba16Float` when supported, otherwise falls back to `Rgba8Unorm`.
    pub fn select(supported: impl Fn(Self) -> bool) -> Self {
        if supported(Self::Rgba16Float) {
            Self::Rgba16Float
        } else {
            log::warn!("Rgba16Float volume texture unsupported, falling back to Rgba8Unorm");
            Self::Rgba8Unorm
        }
    }

    /// Encodes a color into one texel.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn encode(self, color: Vec4, out: &mut [u8]) {
        match self {
            Self::Rgba16Float => {
                for (chunk, c) in out.chunks_exact_mut(2).zip(color.to_array()) {
                    chunk.copy_from_slice(&f16::from_f32(c).to_bits().to_le_bytes());
                }
            }
            Self::Rgba8Unorm => {
                for (byte, c) in out.iter_mut().zip(color.to_array()) {
                    *byte = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
        }
    }

    /// Decodes one texel.
    #[must_use]
    pub fn decode(self, texel: &[u8]) -> Vec4 {
        match self {
            Self::Rgba16Float => {
                let mut c = [0.0; 4];
                for (v, chunk) in c.iter_mut().zip(texel.chunks_exact(2)) {
                    *v = f16::from_bits(u16::from_le_bytes([chunk[0], chunk[1]])).to_f32();
                }
                Vec4::from_array(c)
            }
            Self::Rgba8Unorm => {
                let mut c = [0.0; 4];
                for (v, &byte) in c.iter_mut().zip(texel) {
                    *v = f32::from(byte) / 255.0;
                }
                Vec4::from_array(c)
            }
        }
    }
}

/// State-to-color table. Entry `i` colors state `i`; states past the end use the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<[f32; 4]>,
}

impl Palette {
    /// Creates a palette from RGBA entries.
    pub fn new(colors: Vec<[f32; 4]>) -> Result<Self> {
        let palette = Self { colors };
        palette.validate()?;
        Ok(palette)
    }

    /// Checks the entry count.
    pub fn validate(&self) -> Result<()> {
        if self.colors.is_empty() || self.colors.len() > MAX_PALETTE_ENTRIES {
            return Err(MarchlifeError::InvalidConfig(format!(
                "palette needs 1..={MAX_PALETTE_ENTRIES} colors, got {}",
                self.colors.len()
            )));
        }
        Ok(())
    }

    /// RGBA entries.
    #[must_use]
    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }

    /// Color of a state.
    #[must_use]
    pub fn color(&self, state: u32) -> Vec4 {
        let last = self.colors.len().saturating_sub(1);
        let index = (state as usize).min(last);
        self.colors.get(index).map_or(Vec4::ZERO, |c| Vec4::from_array(*c))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                [0.0, 0.0, 0.0, 0.0],
                [0.20, 0.55, 0.95, 0.75],
                [0.55, 0.45, 0.85, 0.55],
                [0.80, 0.40, 0.55, 0.40],
                [0.90, 0.45, 0.25, 0.30],
            ],
        }
    }
}

/// Parameters of the colorization pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorizeParams {
    /// State colors.
    pub palette: Palette,
    /// Age (in generations) at which live cells reach their darkest tint. 0 disables aging.
    pub age_fade: u32,
}

impl Default for ColorizeParams {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            age_fade: 32,
        }
    }
}

impl ColorizeParams {
    /// Color painted for a cell.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_color(&self, cell: Cell) -> Vec4 {
        let base = self.palette.color(cell.state);
        if self.age_fade == 0 || !cell.is_alive() {
            return base;
        }
        let k = cell.aux.min(self.age_fade) as f32 / self.age_fade as f32;
        (base.truncate() * (1.0 - 0.5 * k)).extend(base.w)
    }
}

/// Voxel sampled by volume texel `s` (nearest cell at the fixed upsampling factor).
#[inline]
#[must_use]
pub fn source_voxel(sample: UVec3, grid: GridExtent) -> UVec3 {
    (sample / VOLUME_UPSAMPLE).min(grid.size() - UVec3::ONE)
}

/// 3D RGBA texture sized `grid extent × VOLUME_UPSAMPLE`.
///
/// Allocated once; every colorization pass overwrites all texels in place.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeColor {
    extent: GridExtent,
    format: VolumeFormat,
    texels: Vec<u8>,
}

impl VolumeColor {
    /// Allocates a cleared texture for a grid.
    pub fn new(grid: GridExtent, format: VolumeFormat) -> Result<Self> {
        let extent = grid.scaled(VOLUME_UPSAMPLE)?;
        Ok(Self {
            extent,
            format,
            texels: vec![0; extent.voxel_count() * format.bytes_per_texel()],
        })
    }

    /// Texture dimensions.
    #[must_use]
    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    /// Texel format.
    #[must_use]
    pub fn format(&self) -> VolumeFormat {
        self.format
    }

    /// Raw texel bytes, x-fastest.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.texels
    }

    /// Raw texel bytes, mutable.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.texels
    }

    /// Paints texel `index` from `grid`.
    pub fn paint_texel(
        format: VolumeFormat,
        extent: GridExtent,
        grid: &CellGrid,
        params: &ColorizeParams,
        index: usize,
        out: &mut [u8],
    ) {
        let v = source_voxel(extent.coords(index), grid.extent());
        format.encode(params.cell_color(grid.get(v.x, v.y, v.z)), out);
    }

    /// Decoded color of texel `(x, y, z)`.
    #[must_use]
    pub fn texel(&self, x: u32, y: u32, z: u32) -> Vec4 {
        let bpp = self.format.bytes_per_texel();
        let start = self.extent.index(x, y, z) * bpp;
        self.format.decode(&self.texels[start..start + bpp])
    }

    /// Nearest-texel lookup at normalized coordinates in `[0, 1]^3`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample(&self, uvw: Vec3) -> Vec4 {
        let size = self.extent.size();
        let max = size - UVec3::ONE;
        let t = (uvw.clamp(Vec3::ZERO, Vec3::ONE) * size.as_vec3()).floor();
        let p = UVec3::new(t.x as u32, t.y as u32, t.z as u32).min(max);
        self.texel(p.x, p.y, p.z)
    }
}
