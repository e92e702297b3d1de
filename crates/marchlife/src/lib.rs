//! marchlife: a 3D cellular automaton rendered as a Marching Cubes surface.
//!
//! Each generation the automaton is stepped on a double-buffered grid, its
//! surface is extracted into a bounded triangle buffer, a volume texture is
//! painted from the cell states, and the surface is drawn with every triangle
//! amplified into a small lit fan.
//!
//! # Quick Start
//!
//! ```no_run
//! use marchlife::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let config = PipelineConfig::new(GridExtent::cubic(32)?)
//!         .with_rule(LifeRule::amoeba())
//!         .with_seed(SeedPattern::Sphere { radius: 6.0 });
//!
//!     let mut pipeline = gpu_headless_pipeline(config, 512, 512)?;
//!     let frame = pipeline.tick()?;
//!     save_image("generation.png", &frame)?;
//!     Ok(())
//! }
//! ```
//!
//! # Devices
//!
//! - [`cpu_pipeline`] runs every pass as a `rayon` parallel iteration and
//!   yields a [`FanMesh`] per frame
//! - [`gpu_headless_pipeline`] runs every pass as a wgpu compute dispatch and
//!   yields a [`RenderedFrame`] per frame

mod cadence;
mod headless;
mod init;

pub use cadence::FixedCadence;
pub use headless::{
    cpu_pipeline, gpu_headless_pipeline, gpu_pipeline, render_to_file, CpuPipeline, GpuPipeline,
};
pub use init::init_logging;

// Re-export core types
pub use marchlife_core::cpu::{CpuProducer, CpuRenderer, FanMesh, MeshVertex};
pub use marchlife_core::{
    BoundaryPolicy, Cell, CellGrid, ColorizeParams, GridExtent, LifeRule, LightSource, Lighting,
    MarchlifeError, Neighborhood, Palette, Phase, PipelineConfig, PipelineSequencer, Result,
    SeedPattern, SurfaceFrame, SurfaceMaterial, SurfaceProducer, SurfaceRenderer,
    SurfaceSelector, TransitionRule, VolumeFormat, UVec3, Vec3, Vec4,
};

// Re-export device types
pub use marchlife_render::{
    encode_png, save_image, GpuContext, GpuProducer, GpuRenderer, RenderError, RenderedFrame,
};
