//! CPU surface renderer: expands the extracted triangles into shaded fans.

use glam::{Vec3, Vec4};
use rayon::prelude::*;

use super::{CpuProducer, CpuSurface, DEVICE};
use crate::config::PipelineConfig;
use crate::error::{MarchlifeError, Result};
use crate::pipeline::SurfaceRenderer;
use crate::rule::TransitionRule;
use crate::shading::{amplify_triangle, Lighting, SurfaceMaterial};
use crate::triangle_buffer::SurfaceFrame;

/// A lit, colored vertex of the amplified surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    /// World-space position.
    pub position: Vec3,
    /// Unit normal.
    pub normal: Vec3,
    /// Volume color times light intensity; alpha from the volume.
    pub color: Vec4,
}

/// Vertex stream of one draw, nine vertices per source triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanMesh {
    /// Generation the surface was extracted from.
    pub generation: u64,
    /// Non-indexed triangle list.
    pub vertices: Vec<MeshVertex>,
}

impl FanMesh {
    /// Number of triangles in the stream.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Evaluates the surface shading per vertex.
#[derive(Debug, Clone)]
pub struct CpuRenderer {
    lighting: Lighting,
    material: SurfaceMaterial,
}

impl CpuRenderer {
    /// Renderer for a pipeline configuration.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            lighting: config.lighting,
            material: config.material(),
        }
    }

    /// The lighting.
    #[must_use]
    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    /// Replaces the lighting.
    pub fn set_lighting(&mut self, lighting: Lighting) {
        self.lighting = lighting;
    }

    /// The surface material.
    #[must_use]
    pub fn material(&self) -> &SurfaceMaterial {
        &self.material
    }
}

impl<R: TransitionRule> SurfaceRenderer<CpuProducer<R>> for CpuRenderer {
    type Output = FanMesh;

    fn draw(&mut self, frame: &SurfaceFrame, surface: CpuSurface<'_>) -> Result<FanMesh> {
        let triangle_count = frame.draw_args().triangle_count();
        log::trace!(
            "[{DEVICE}] draw {} vertices",
            frame.draw_args().vertex_count
        );
        let lighting = &self.lighting;
        let material = &self.material;

        let source = (0..triangle_count)
            .map(|i| {
                surface.triangles.get(i).copied().ok_or(MarchlifeError::SizeMismatch {
                    expected: triangle_count as usize,
                    actual: i as usize,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let vertices: Vec<MeshVertex> = source
            .par_iter()
            .flat_map_iter(|triangle| amplify_triangle(triangle, lighting.bulge))
            .map(|v| {
                let world = material.to_world(v.position);
                let texel = surface.volume.sample(material.tex_coord(v.position));
                let light = lighting.intensity(world, v.normal);
                MeshVertex {
                    position: world,
                    normal: v.normal,
                    color: (texel.truncate() * light).extend(texel.w),
                }
            })
            .collect();

        debug_assert_eq!(vertices.len(), frame.draw_args().vertex_count as usize);
        Ok(FanMesh {
            generation: frame.generation(),
            vertices,
        })
    }
}
