//! Uniform and record layouts shared with the WGSL kernels.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use marchlife_core::grid::density_threshold;
use marchlife_core::{
    DrawArgs, LightSource, Lighting, PipelineConfig, SeedPattern, SurfaceMaterial, VOLUME_UPSAMPLE,
};

/// Parameters of every compute kernel. Matches `Params` in `common.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct KernelUniforms {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub capacity: u32,
    pub seed_kind: u32,
    pub seed_x: u32,
    pub seed_y: u32,
    pub seed_z: u32,
    pub seed_value: u32,
    pub density_threshold: u32,
    pub radius: f32,
    pub boundary: u32,
    pub survive_mask: u32,
    pub birth_mask: u32,
    pub states: u32,
    pub neighborhood: u32,
    pub selector: u32,
    pub target_state: u32,
    pub iso: f32,
    pub upsample: u32,
    pub age_fade: u32,
    pub palette_len: u32,
    pub _padding: [u32; 2],
}

impl KernelUniforms {
    /// Packs a validated configuration.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_config(config: &PipelineConfig, capacity: u32) -> Self {
        let size = config.extent.size();
        let (seed_x, seed_y, seed_z, radius, seed_value, density) = match config.seed {
            SeedPattern::Voxel { x, y, z } => (x, y, z, 0.0, 0, 0),
            SeedPattern::Sphere { radius } => (0, 0, 0, radius, 0, 0),
            SeedPattern::Random { density, seed } => (0, 0, 0, 0.0, seed, density_threshold(density)),
            SeedPattern::Empty => (0, 0, 0, 0.0, 0, 0),
        };
        Self {
            width: size.x,
            height: size.y,
            depth: size.z,
            capacity,
            seed_kind: config.seed.kind_code(),
            seed_x,
            seed_y,
            seed_z,
            seed_value,
            density_threshold: density,
            radius,
            boundary: config.boundary.code(),
            survive_mask: config.rule.survive_mask(),
            birth_mask: config.rule.birth_mask(),
            states: config.rule.states(),
            neighborhood: config.rule.neighborhood().code(),
            selector: config.selector.code(),
            target_state: config.selector.target(),
            iso: config.selector.iso(),
            upsample: VOLUME_UPSAMPLE,
            age_fade: config.colorize.age_fade,
            palette_len: config.colorize.palette.colors().len() as u32,
            _padding: [0; 2],
        }
    }
}

/// Result of the finalize kernel. Matches `FrameRecord` in `common.wgsl`.
///
/// The leading draw arguments are consumed directly by `draw_indirect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameRecord {
    pub draw: DrawArgs,
    pub triangle_count: u32,
    pub dropped: u32,
    pub capacity: u32,
    pub _padding: u32,
}

/// Surface shader uniforms. Matches `SurfaceUniforms` in `surface.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SurfaceUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// xyz = direction or position, w = light kind.
    pub light: [f32; 4],
    pub eye: [f32; 4],
    /// ambient, diffuse, specular, shininess.
    pub terms: [f32; 4],
    /// xyz = world offset, w = world scale.
    pub placement: [f32; 4],
    /// xyz = reciprocal grid size, w = bulge.
    pub grid_recip: [f32; 4],
}

impl SurfaceUniforms {
    /// Packs lighting and placement for a camera looking from the eye at the origin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(lighting: &Lighting, material: &SurfaceMaterial, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(lighting.eye, Vec3::ZERO, up_for(lighting.eye));
        let proj = Mat4::perspective_rh(45.0_f32.to_radians(), aspect, 0.01, 100.0);
        let light = lighting.light.vector();
        let kind = match lighting.light {
            LightSource::Directional { .. } => 0.0,
            LightSource::Positional { .. } => 1.0,
        };
        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            light: [light.x, light.y, light.z, kind],
            eye: lighting.eye.extend(1.0).to_array(),
            terms: [
                lighting.ambient,
                lighting.diffuse,
                lighting.specular,
                lighting.shininess,
            ],
            placement: material.world_offset.extend(material.world_scale).to_array(),
            grid_recip: material.grid_recip.extend(lighting.bulge).to_array(),
        }
    }
}

fn up_for(eye: Vec3) -> Vec3 {
    if eye.normalize_or_zero().dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marchlife_core::{GridExtent, LifeRule};

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<KernelUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<FrameRecord>(), 32);
        assert_eq!(std::mem::size_of::<SurfaceUniforms>(), 144);
    }

    #[test]
    fn test_kernel_uniforms_from_config() {
        let config = PipelineConfig::new(GridExtent::new(4, 5, 6).unwrap())
            .with_seed(SeedPattern::Voxel { x: 1, y: 2, z: 3 })
            .with_rule(LifeRule::amoeba())
            .with_triangle_capacity(10);
        let u = KernelUniforms::from_config(&config, config.effective_capacity());
        assert_eq!((u.width, u.height, u.depth), (4, 5, 6));
        assert_eq!((u.seed_kind, u.seed_x, u.seed_y, u.seed_z), (1, 1, 2, 3));
        assert_eq!(u.capacity, 10);
        assert_eq!(u.states, 5);
        assert_eq!(u.birth_mask, LifeRule::amoeba().birth_mask());
        assert_eq!(u.upsample, VOLUME_UPSAMPLE);
    }

    #[test]
    fn test_surface_uniforms_pack_lighting() {
        let lighting = Lighting::default().with_bulge(0.4);
        let material = SurfaceMaterial::default();
        let u = SurfaceUniforms::new(&lighting, &material, 1.0);
        assert_eq!(u.grid_recip[3], 0.4);
        assert_eq!(u.terms[3], lighting.shininess);
        assert_eq!(u.light[3], 0.0);
    }
}
