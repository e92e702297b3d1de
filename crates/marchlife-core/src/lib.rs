//! Core types and algorithms for marchlife.
//!
//! This crate provides the data model and the device-independent pieces of the
//! pipeline:
//! - [`CellGrid`] and its [`DoubleBuffer`], seeded from a [`SeedPattern`]
//! - the [`TransitionRule`] trait and the built-in [`LifeRule`]
//! - Marching Cubes extraction into a bounded [`TriangleBuffer`]
//! - volume colorization and fan amplification with lighting
//! - the [`PipelineSequencer`] and the [`SurfaceProducer`] / [`SurfaceRenderer`] traits
//! - a data-parallel CPU device in [`cpu`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Coordinates are u32 on the device side and usize for indexing
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::many_single_char_names)]

pub mod config;
pub mod cpu;
pub mod dispatch;
pub mod error;
pub mod grid;
pub mod marching_cubes;
pub mod pipeline;
pub mod rule;
pub mod shading;
pub mod triangle_buffer;
pub mod volume;

pub use config::PipelineConfig;
pub use dispatch::{Dispatch, Kernel, LINEAR_TILE, VOXEL_TILE};
pub use error::{MarchlifeError, Result};
pub use grid::{hash3, Cell, CellGrid, DoubleBuffer, GridExtent, SeedPattern};
pub use marching_cubes::{polygonize_cell, SurfaceSelector, MAX_TRIANGLES_PER_CELL};
pub use pipeline::{Phase, PipelineSequencer, SurfaceProducer, SurfaceRenderer};
pub use rule::{apply_rule, BoundaryPolicy, GridView, LifeRule, Neighborhood, TransitionRule};
pub use shading::{amplify_triangle, FanVertex, LightSource, Lighting, SurfaceMaterial};
pub use triangle_buffer::{
    AppendOutcome, DrawArgs, GpuTriangle, SurfaceFrame, Triangle, TriangleBuffer,
    VERTICES_PER_TRIANGLE,
};
pub use volume::{ColorizeParams, Palette, VolumeColor, VolumeFormat, VOLUME_UPSAMPLE};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3, Vec4};
