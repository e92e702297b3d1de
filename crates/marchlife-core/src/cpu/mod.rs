//! Data-parallel CPU device.
//!
//! Every kernel is a `rayon` parallel iteration over voxels, cells or texels.
//! The join at the end of each iteration is the pass barrier.

mod renderer;

pub use renderer::{CpuRenderer, FanMesh, MeshVertex};

use glam::UVec3;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::dispatch::{Dispatch, Kernel};
use crate::error::Result;
use crate::grid::{CellGrid, DoubleBuffer};
use crate::marching_cubes::polygonize_cell;
use crate::pipeline::SurfaceProducer;
use crate::rule::{GridView, LifeRule, TransitionRule};
use crate::triangle_buffer::{SurfaceFrame, TriangleBuffer};
use crate::volume::VolumeColor;

const DEVICE: &str = "cpu";

/// Borrowed view of a CPU producer's outputs.
#[derive(Debug, Clone, Copy)]
pub struct CpuSurface<'a> {
    /// Extracted triangles.
    pub triangles: &'a TriangleBuffer,
    /// Painted volume texture.
    pub volume: &'a VolumeColor,
}

/// Simulates and extracts on the CPU.
pub struct CpuProducer<R = LifeRule> {
    config: PipelineConfig,
    rule: R,
    grids: DoubleBuffer<CellGrid>,
    triangles: TriangleBuffer,
    volume: VolumeColor,
    generation: u64,
}

impl CpuProducer<LifeRule> {
    /// Builds a producer running the configured rule.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let rule = config.rule;
        Self::with_rule(config, rule)
    }
}

impl<R: TransitionRule> CpuProducer<R> {
    /// Builds a producer running a custom rule.
    ///
    /// Allocates both grid buffers, the triangle buffer and the volume texture
    /// once, then seeds both grids.
    pub fn with_rule(config: PipelineConfig, rule: R) -> Result<Self> {
        config.validate()?;
        let extent = config.extent;
        let capacity = config.effective_capacity();
        let mut producer = Self {
            rule,
            grids: DoubleBuffer::new(CellGrid::new(extent), CellGrid::new(extent)),
            triangles: TriangleBuffer::with_capacity(capacity),
            volume: VolumeColor::new(extent, config.volume_format)?,
            generation: 0,
            config,
        };
        producer.seed();
        log::info!(
            "[{DEVICE}] pipeline ready: grid {}x{}x{}, triangle capacity {capacity}",
            extent.width(),
            extent.height(),
            extent.depth()
        );
        Ok(producer)
    }

    /// Re-seeds both buffers and resets the generation counter.
    pub fn reset(&mut self) {
        self.seed();
        self.generation = 0;
    }

    fn seed(&mut self) {
        let extent = self.config.extent;
        let seed = self.config.seed;
        for grid in self.grids.both_mut() {
            Dispatch::voxels(Kernel::Seed, extent).trace(DEVICE);
            grid.cells_mut()
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, cell)| {
                    let p = extent.coords(i);
                    *cell = seed.cell_at(extent, p.x, p.y, p.z);
                });
        }
    }

    /// The current grid buffer.
    pub fn grid(&self) -> &CellGrid {
        self.grids.current()
    }

    /// The transition rule.
    pub fn rule(&self) -> &R {
        &self.rule
    }

    /// The triangle buffer.
    pub fn triangles(&self) -> &TriangleBuffer {
        &self.triangles
    }

    /// The volume texture.
    pub fn volume(&self) -> &VolumeColor {
        &self.volume
    }
}

impl<R: TransitionRule> SurfaceProducer for CpuProducer<R> {
    type Surface<'a>
        = CpuSurface<'a>
    where
        Self: 'a;

    fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn step(&mut self) -> Result<()> {
        let extent = self.config.extent;
        Dispatch::voxels(Kernel::Step, extent).trace(DEVICE);
        let rule = &self.rule;
        let (current, next) = self.grids.split();
        let view = GridView::new(current, self.config.boundary);
        next.cells_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, cell)| {
                let p = extent.coords(i);
                *cell = rule.apply(&view, p.x, p.y, p.z);
            });
        self.grids.swap();
        self.generation += 1;
        Ok(())
    }

    fn extract(&mut self) -> Result<SurfaceFrame> {
        let extent = self.config.extent;
        let selector = self.config.selector;
        Dispatch::cells(Kernel::Extract, extent).trace(DEVICE);

        self.triangles.reset();
        let cells = extent.cell_size();
        let grid = self.grids.current();
        let triangles = &self.triangles;
        (0..extent.cell_count()).into_par_iter().for_each(|i| {
            let c = cell_coords(cells, i);
            for triangle in polygonize_cell(grid, selector, c.x, c.y, c.z).as_slice() {
                triangles.push(*triangle);
            }
        });

        let requested = triangles.count().saturating_add(triangles.dropped());
        let frame =
            SurfaceFrame::from_completed_pass(self.generation, requested, triangles.capacity());
        if frame.is_truncated() {
            log::warn!(
                "[{DEVICE}] generation {}: triangle buffer full, dropped {} of {} triangles",
                self.generation,
                frame.dropped(),
                requested
            );
        }
        Ok(frame)
    }

    fn colorize(&mut self) -> Result<()> {
        let extent = self.volume.extent();
        let format = self.volume.format();
        let bpp = format.bytes_per_texel();
        Dispatch::voxels(Kernel::Colorize, extent).trace(DEVICE);
        let grid = self.grids.current();
        let params = &self.config.colorize;
        self.volume
            .bytes_mut()
            .par_chunks_mut(bpp)
            .enumerate()
            .for_each(|(i, texel)| {
                VolumeColor::paint_texel(format, extent, grid, params, i, texel);
            });
        Ok(())
    }

    fn surface(&self) -> CpuSurface<'_> {
        CpuSurface {
            triangles: &self.triangles,
            volume: &self.volume,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cell_coords(cells: UVec3, index: usize) -> UVec3 {
    let w = cells.x as usize;
    let h = cells.y as usize;
    UVec3::new((index % w) as u32, ((index / w) % h) as u32, (index / (w * h)) as u32)
}
