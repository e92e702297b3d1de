//! Surface amplification and lighting.
//!
//! Every extracted triangle is drawn as a fan of three sub-triangles meeting at
//! its centroid, pushed outward along the averaged normal by an amount that
//! grows with the normal's tilt away from `+Y`. Shading is a per-vertex
//! ambient + diffuse + specular model evaluated in world space.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{MarchlifeError, Result};
use crate::grid::GridExtent;
use crate::triangle_buffer::{Triangle, SUB_TRIANGLES_PER_TRIANGLE, VERTICES_PER_TRIANGLE};

/// Light placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightSource {
    /// Parallel rays travelling along `direction`. No attenuation.
    Directional { direction: Vec3 },
    /// Point light. Attenuated by `1 / distance`.
    Positional { position: Vec3 },
}

impl Default for LightSource {
    fn default() -> Self {
        Self::Directional {
            direction: Vec3::new(0.5, -1.0, 0.3),
        }
    }
}

impl LightSource {
    /// Kind code shared with the surface shader.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::Directional { .. } => 0,
            Self::Positional { .. } => 1,
        }
    }

    /// Direction or position, whichever the kind uses.
    #[must_use]
    pub fn vector(&self) -> Vec3 {
        match *self {
            Self::Directional { direction } => direction,
            Self::Positional { position } => position,
        }
    }

    /// Unit vector from `point` toward the light and the attenuation factor.
    #[must_use]
    pub fn incidence(&self, point: Vec3) -> (Vec3, f32) {
        match *self {
            Self::Directional { direction } => ((-direction).normalize_or_zero(), 1.0),
            Self::Positional { position } => {
                let to_light = position - point;
                let distance = to_light.length();
                if distance <= f32::EPSILON {
                    (Vec3::ZERO, 1.0)
                } else {
                    (to_light / distance, 1.0 / distance)
                }
            }
        }
    }
}

/// Lighting model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lighting {
    /// Light placement.
    pub light: LightSource,
    /// Ambient term.
    pub ambient: f32,
    /// Diffuse coefficient.
    pub diffuse: f32,
    /// Specular coefficient.
    pub specular: f32,
    /// Specular exponent.
    pub shininess: f32,
    /// Centroid push per radian of normal tilt from `+Y`.
    pub bulge: f32,
    /// Viewer position in world space.
    pub eye: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            light: LightSource::default(),
            ambient: 0.2,
            diffuse: 0.7,
            specular: 0.3,
            shininess: 32.0,
            bulge: 0.15,
            eye: Vec3::new(0.0, 0.0, 3.0),
        }
    }
}

impl Lighting {
    /// Sets the light source.
    #[must_use]
    pub fn with_light(mut self, light: LightSource) -> Self {
        self.light = light;
        self
    }

    /// Sets the centroid bulge factor.
    #[must_use]
    pub fn with_bulge(mut self, bulge: f32) -> Self {
        self.bulge = bulge;
        self
    }

    /// Sets the viewer position.
    #[must_use]
    pub fn with_eye(mut self, eye: Vec3) -> Self {
        self.eye = eye;
        self
    }

    /// Checks that every coefficient is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let terms = [
            ("ambient", self.ambient),
            ("diffuse", self.diffuse),
            ("specular", self.specular),
            ("shininess", self.shininess),
            ("bulge", self.bulge),
        ];
        for (name, value) in terms {
            if !value.is_finite() || value < 0.0 {
                return Err(MarchlifeError::InvalidConfig(format!(
                    "lighting {name} must be finite and >= 0, got {value}"
                )));
            }
        }
        if let LightSource::Directional { direction } = self.light {
            if direction.length_squared() <= f32::EPSILON {
                return Err(MarchlifeError::InvalidConfig(
                    "directional light needs a non-zero direction".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Light intensity at a world-space point with unit normal `normal`.
    #[must_use]
    pub fn intensity(&self, point: Vec3, normal: Vec3) -> f32 {
        let (l, attenuation) = self.light.incidence(point);
        let n_dot_l = normal.dot(l);
        let diffuse = self.diffuse * n_dot_l.max(0.0);
        let view = (self.eye - point).normalize_or_zero();
        let reflected = 2.0 * n_dot_l * normal - l;
        let specular = if n_dot_l > 0.0 {
            self.specular * reflected.dot(view).max(0.0).powf(self.shininess)
        } else {
            0.0
        };
        self.ambient + attenuation * (diffuse + specular)
    }
}

/// Grid-to-world placement and texture-space scale of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceMaterial {
    /// World position of grid voxel `(0, 0, 0)`.
    pub world_offset: Vec3,
    /// World size of one voxel.
    pub world_scale: f32,
    /// Reciprocal grid dimensions, maps grid space to texture space.
    #[serde(skip)]
    pub grid_recip: Vec3,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            world_offset: Vec3::ZERO,
            world_scale: 1.0,
            grid_recip: Vec3::ONE,
        }
    }
}

impl SurfaceMaterial {
    /// Material for a grid, keeping this placement.
    #[must_use]
    pub fn for_extent(mut self, extent: GridExtent) -> Self {
        self.grid_recip = extent.recip();
        self
    }

    /// Places the grid centered at the origin, fitting in a unit cube.
    #[must_use]
    pub fn centered(extent: GridExtent) -> Self {
        let size = extent.size().as_vec3();
        let world_scale = 1.0 / size.max_element();
        Self {
            world_offset: -(size - Vec3::ONE) * 0.5 * world_scale,
            world_scale,
            grid_recip: extent.recip(),
        }
    }

    /// Grid space to world space.
    #[inline]
    #[must_use]
    pub fn to_world(&self, grid_pos: Vec3) -> Vec3 {
        grid_pos * self.world_scale + self.world_offset
    }

    /// Grid space to normalized texture coordinates.
    #[inline]
    #[must_use]
    pub fn tex_coord(&self, grid_pos: Vec3) -> Vec3 {
        (grid_pos + 0.5) * self.grid_recip
    }
}

/// Vertices in one amplified fan.
pub const FAN_VERTICES: usize = VERTICES_PER_TRIANGLE as usize;

/// One vertex of an amplified fan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FanVertex {
    /// Grid-space position.
    pub position: Vec3,
    /// Unit normal.
    pub normal: Vec3,
}

/// Offset centroid of a triangle's fan.
#[must_use]
pub fn fan_apex(triangle: &Triangle, bulge: f32) -> FanVertex {
    let normal = triangle.average_normal();
    let tilt = normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos();
    FanVertex {
        position: triangle.centroid() + normal * bulge * tilt,
        normal,
    }
}

/// Expands a triangle into three sub-triangles `(p_k, p_{k+1}, apex)`.
#[must_use]
pub fn amplify_triangle(triangle: &Triangle, bulge: f32) -> [FanVertex; FAN_VERTICES] {
    let apex = fan_apex(triangle, bulge);
    let corner = |k: usize| FanVertex {
        position: triangle.positions[k % 3],
        normal: triangle.normals[k % 3],
    };
    let mut out = [FanVertex::default(); FAN_VERTICES];
    for k in 0..SUB_TRIANGLES_PER_TRIANGLE as usize {
        out[k * 3] = corner(k);
        out[k * 3 + 1] = corner(k + 1);
        out[k * 3 + 2] = apex;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_triangle() -> Triangle {
        Triangle {
            positions: [Vec3::ZERO, Vec3::X, Vec3::Z],
            normals: [Vec3::Y; 3],
        }
    }

    fn tilted_triangle() -> Triangle {
        Triangle {
            positions: [Vec3::ZERO, Vec3::Y, Vec3::Z],
            normals: [Vec3::X; 3],
        }
    }

    #[test]
    fn test_upward_normal_has_no_bulge() {
        let tri = flat_triangle();
        let apex = fan_apex(&tri, 1.0);
        assert!((apex.position - tri.centroid()).length() < 1e-6);
        assert_eq!(apex.normal, Vec3::Y);
    }

    #[test]
    fn test_bulge_scales_with_tilt() {
        let tri = tilted_triangle();
        let apex = fan_apex(&tri, 0.5);
        let expected = tri.centroid() + Vec3::X * 0.5 * std::f32::consts::FRAC_PI_2;
        assert!((apex.position - expected).length() < 1e-5);
    }

    #[test]
    fn test_fan_layout() {
        let tri = tilted_triangle();
        let fan = amplify_triangle(&tri, 0.2);
        let apex = fan_apex(&tri, 0.2);
        for k in 0..3 {
            assert_eq!(fan[k * 3].position, tri.positions[k]);
            assert_eq!(fan[k * 3 + 1].position, tri.positions[(k + 1) % 3]);
            assert_eq!(fan[k * 3 + 2], apex);
        }
    }

    #[test]
    fn test_directional_lighting() {
        let lighting = Lighting {
            light: LightSource::Directional {
                direction: -Vec3::Y,
            },
            specular: 0.0,
            ..Lighting::default()
        };
        let lit = lighting.intensity(Vec3::ZERO, Vec3::Y);
        assert!((lit - (lighting.ambient + lighting.diffuse)).abs() < 1e-6);
        let back = lighting.intensity(Vec3::ZERO, -Vec3::Y);
        assert!((back - lighting.ambient).abs() < 1e-6);
    }

    #[test]
    fn test_positional_attenuation() {
        let lighting = Lighting {
            light: LightSource::Positional {
                position: Vec3::new(0.0, 4.0, 0.0),
            },
            specular: 0.0,
            ..Lighting::default()
        };
        let lit = lighting.intensity(Vec3::ZERO, Vec3::Y);
        assert!((lit - (lighting.ambient + lighting.diffuse / 4.0)).abs() < 1e-6);
    }

    #[test]
    fn test_specular_peaks_on_mirror_direction() {
        let lighting = Lighting {
            light: LightSource::Directional {
                direction: -Vec3::Y,
            },
            eye: Vec3::new(0.0, 10.0, 0.0),
            ..Lighting::default()
        };
        let lit = lighting.intensity(Vec3::ZERO, Vec3::Y);
        let expected = lighting.ambient + lighting.diffuse + lighting.specular;
        assert!((lit - expected).abs() < 1e-5);
    }

    #[test]
    fn test_validate_rejects_negative_terms() {
        assert!(Lighting::default().validate().is_ok());
        let bad = Lighting {
            shininess: -1.0,
            ..Lighting::default()
        };
        assert!(bad.validate().is_err());
        let zero_dir = Lighting::default().with_light(LightSource::Directional {
            direction: Vec3::ZERO,
        });
        assert!(zero_dir.validate().is_err());
    }

    #[test]
    fn test_material_mapping() {
        let extent = GridExtent::new(4, 2, 8).unwrap();
        let material = SurfaceMaterial::centered(extent);
        assert!((material.grid_recip - Vec3::new(0.25, 0.5, 0.125)).length() < 1e-6);
        let center = material.to_world(Vec3::new(1.5, 0.5, 3.5));
        assert!(center.length() < 1e-6);
        assert_eq!(material.tex_coord(Vec3::ZERO), Vec3::new(0.125, 0.25, 0.0625));
    }
}
