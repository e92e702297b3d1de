//! Pipeline builders and headless helpers.

use std::path::Path;
use std::sync::Arc;

use marchlife_core::cpu::{CpuProducer, CpuRenderer};
use marchlife_core::{PipelineConfig, PipelineSequencer, Result};
use marchlife_render::{save_image, GpuContext, GpuProducer, GpuRenderer};
use pollster::FutureExt;

/// Sequencer over the CPU device.
pub type CpuPipeline = PipelineSequencer<CpuProducer, CpuRenderer>;

/// Sequencer over a wgpu device rendering offscreen.
pub type GpuPipeline = PipelineSequencer<GpuProducer, GpuRenderer>;

/// Builds a pipeline on the CPU device.
///
/// # Example
///
/// ```no_run
/// use marchlife::*;
///
/// let mut pipeline = cpu_pipeline(PipelineConfig::default())?;
/// let mesh = pipeline.tick()?;
/// println!("{} vertices", mesh.vertices.len());
/// # Ok::<(), MarchlifeError>(())
/// ```
pub fn cpu_pipeline(config: PipelineConfig) -> Result<CpuPipeline> {
    let renderer = CpuRenderer::new(&config);
    let producer = CpuProducer::new(config)?;
    Ok(PipelineSequencer::new(producer, renderer))
}

/// Builds a pipeline on a new headless wgpu device with a `width × height` target.
pub fn gpu_headless_pipeline(config: PipelineConfig, width: u32, height: u32) -> Result<GpuPipeline> {
    let context = GpuContext::new_headless().block_on()?;
    gpu_pipeline(Arc::new(context), config, width, height)
}

/// Builds a pipeline on an existing device.
pub fn gpu_pipeline(
    context: Arc<GpuContext>,
    config: PipelineConfig,
    width: u32,
    height: u32,
) -> Result<GpuPipeline> {
    let renderer = GpuRenderer::new(Arc::clone(&context), &config, width, height)?;
    let producer = GpuProducer::new(context, config)?;
    Ok(PipelineSequencer::new(producer, renderer))
}

/// Runs `generations` ticks headless and saves the last frame.
///
/// The image format follows the file extension (`.png`, `.jpg`).
pub fn render_to_file(
    config: PipelineConfig,
    generations: u64,
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> Result<()> {
    let mut pipeline = gpu_headless_pipeline(config, width, height)?;
    let mut last = None;
    pipeline.run(generations.max(1), |_, frame| last = Some(frame))?;
    if let Some(frame) = last {
        save_image(path, &frame)?;
    }
    Ok(())
}
