//! Pipeline configuration.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{MarchlifeError, Result};
use crate::grid::{GridExtent, SeedPattern};
use crate::marching_cubes::SurfaceSelector;
use crate::rule::{BoundaryPolicy, LifeRule};
use crate::shading::{Lighting, SurfaceMaterial};
use crate::triangle_buffer::TriangleBuffer;
use crate::volume::{ColorizeParams, Palette, VolumeFormat, VOLUME_UPSAMPLE};

/// Everything a producer and renderer need to set up a pipeline.
///
/// Fixed for the lifetime of a pipeline; buffers are sized from it once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Grid dimensions.
    pub extent: GridExtent,
    /// Initial grid content.
    pub seed: SeedPattern,
    /// Neighbor lookup at the grid border.
    pub boundary: BoundaryPolicy,
    /// Transition rule.
    pub rule: LifeRule,
    /// Scalar field the surface is extracted from.
    pub selector: SurfaceSelector,
    /// Triangle buffer capacity. `None` sizes it for the worst case.
    pub triangle_capacity: Option<u32>,
    /// Volume colorization.
    pub colorize: ColorizeParams,
    /// Preferred volume texel format. Devices may fall back.
    pub volume_format: VolumeFormat,
    /// Surface lighting.
    pub lighting: Lighting,
    /// Grid-to-world placement.
    pub material: SurfaceMaterial,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let extent = GridExtent::default();
        Self {
            extent,
            seed: SeedPattern::Random {
                density: 0.35,
                seed: 1,
            },
            boundary: BoundaryPolicy::default(),
            rule: LifeRule::default(),
            selector: SurfaceSelector::default(),
            triangle_capacity: None,
            colorize: ColorizeParams::default(),
            volume_format: VolumeFormat::default(),
            lighting: Lighting::default(),
            material: SurfaceMaterial::centered(extent),
        }
    }
}

impl PipelineConfig {
    /// Default configuration for a grid, with the surface centered at the origin.
    #[must_use]
    pub fn new(extent: GridExtent) -> Self {
        Self {
            extent,
            material: SurfaceMaterial::centered(extent),
            ..Self::default()
        }
    }

    /// Sets the grid extent and re-centers the surface.
    #[must_use]
    pub fn with_extent(mut self, extent: GridExtent) -> Self {
        self.extent = extent;
        self.material = SurfaceMaterial::centered(extent);
        self
    }

    /// Sets the seed pattern.
    #[must_use]
    pub fn with_seed(mut self, seed: SeedPattern) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the boundary policy.
    #[must_use]
    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    /// Sets the transition rule.
    #[must_use]
    pub fn with_rule(mut self, rule: LifeRule) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the surface selector.
    #[must_use]
    pub fn with_selector(mut self, selector: SurfaceSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Overrides the triangle buffer capacity.
    #[must_use]
    pub fn with_triangle_capacity(mut self, capacity: u32) -> Self {
        self.triangle_capacity = Some(capacity);
        self
    }

    /// Sets the state palette.
    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.colorize.palette = palette;
        self
    }

    /// Sets the age at which live cells are fully darkened.
    #[must_use]
    pub fn with_age_fade(mut self, age_fade: u32) -> Self {
        self.colorize.age_fade = age_fade;
        self
    }

    /// Sets the preferred volume format.
    #[must_use]
    pub fn with_volume_format(mut self, format: VolumeFormat) -> Self {
        self.volume_format = format;
        self
    }

    /// Sets the lighting.
    #[must_use]
    pub fn with_lighting(mut self, lighting: Lighting) -> Self {
        self.lighting = lighting;
        self
    }

    /// Sets the world placement.
    #[must_use]
    pub fn with_placement(mut self, world_offset: Vec3, world_scale: f32) -> Self {
        self.material.world_offset = world_offset;
        self.material.world_scale = world_scale;
        self
    }

    /// Capacity the triangle buffer is allocated with.
    #[must_use]
    pub fn effective_capacity(&self) -> u32 {
        self.triangle_capacity
            .unwrap_or_else(|| TriangleBuffer::capacity_for(self.extent))
    }

    /// Surface material with the reciprocal extent filled in.
    #[must_use]
    pub fn material(&self) -> SurfaceMaterial {
        self.material.for_extent(self.extent)
    }

    /// Checks every value a pipeline depends on.
    pub fn validate(&self) -> Result<()> {
        self.extent.scaled(VOLUME_UPSAMPLE)?;
        if self.rule.states() < 2 {
            return Err(MarchlifeError::InvalidConfig(format!(
                "rule needs at least 2 states, got {}",
                self.rule.states()
            )));
        }
        match self.seed {
            SeedPattern::Voxel { x, y, z } => {
                let size = self.extent.size();
                if x >= size.x || y >= size.y || z >= size.z {
                    return Err(MarchlifeError::InvalidConfig(format!(
                        "seed voxel ({x}, {y}, {z}) lies outside the {}x{}x{} grid",
                        size.x, size.y, size.z
                    )));
                }
            }
            SeedPattern::Sphere { radius } if !radius.is_finite() || radius < 0.0 => {
                return Err(MarchlifeError::InvalidConfig(format!(
                    "seed sphere radius must be finite and >= 0, got {radius}"
                )));
            }
            SeedPattern::Random { density, .. } if !(0.0..=1.0).contains(&density) => {
                return Err(MarchlifeError::InvalidConfig(format!(
                    "seed density must be in [0, 1], got {density}"
                )));
            }
            _ => {}
        }
        if self.triangle_capacity == Some(0) {
            return Err(MarchlifeError::InvalidConfig(
                "triangle capacity must be > 0".to_string(),
            ));
        }
        if let SurfaceSelector::Threshold { iso } = self.selector {
            if !iso.is_finite() {
                return Err(MarchlifeError::InvalidConfig(format!(
                    "surface threshold must be finite, got {iso}"
                )));
            }
        }
        self.colorize.palette.validate()?;
        self.lighting.validate()?;
        if !self.material.world_scale.is_finite() || self.material.world_scale <= 0.0 {
            return Err(MarchlifeError::InvalidConfig(format!(
                "world scale must be finite and > 0, got {}",
                self.material.world_scale
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    ///
    /// Without a `material` entry the surface is centered on the loaded extent.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let has_material = value.get("material").is_some();
        let mut config: Self = serde_json::from_value(value)?;
        if !has_material {
            config.material = SurfaceMaterial::centered(config.extent);
        }
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Writes the configuration as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
