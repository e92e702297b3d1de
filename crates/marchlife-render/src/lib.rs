//! wgpu device for marchlife.
//!
//! This crate runs the pipeline on a GPU:
//! - compute kernels for seeding, stepping, extraction and colorization (WGSL)
//! - a bounded triangle buffer with a device-written indirect draw record
//! - an offscreen renderer that amplifies and lights the surface
//! - headless capture of rendered frames

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Buffer sizes are u64 on the device side and usize on the host
#![allow(clippy::cast_possible_truncation)]

pub mod buffer;
pub mod capture;
pub mod context;
pub mod error;
pub mod kernels;
pub mod producer;
pub mod renderer;
pub mod uniforms;

pub use capture::{encode_png, save_image};
pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use kernels::ComputeKernels;
pub use producer::{GpuProducer, GpuSurface};
pub use renderer::{GpuRenderer, RenderedFrame, TARGET_FORMAT};
pub use uniforms::{FrameRecord, KernelUniforms, SurfaceUniforms};
