//! Phase sequencing of the simulate → extract → render cycle.
//!
//! A [`SurfaceProducer`] owns the grid buffers, the triangle buffer and the
//! volume texture; a [`SurfaceRenderer`] borrows them through the producer's
//! surface view for one draw. The [`PipelineSequencer`] holds both and runs
//! the phases in order over `&mut self`, so no phase can overlap another.

use crate::config::PipelineConfig;
use crate::error::{MarchlifeError, Result};
use crate::triangle_buffer::SurfaceFrame;

/// Last phase the sequencer completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// A generation was stepped and the buffers swapped.
    Stepping,
    /// The current generation's surface was extracted.
    Extracting,
    /// The surface was colorized and drawn.
    Rendering,
}

/// A device that simulates the automaton and extracts its surface.
pub trait SurfaceProducer {
    /// Read-only view of the extracted surface and volume texture.
    type Surface<'a>
    where
        Self: 'a;

    /// Configuration the producer was built from.
    fn config(&self) -> &PipelineConfig;

    /// Number of completed steps.
    fn generation(&self) -> u64;

    /// Applies the rule once and swaps the buffers.
    fn step(&mut self) -> Result<()>;

    /// Extracts the surface of the current buffer.
    ///
    /// Returns once the pass has completed, with the clamped triangle count.
    fn extract(&mut self) -> Result<SurfaceFrame>;

    /// Repaints the volume texture from the current buffer.
    fn colorize(&mut self) -> Result<()>;

    /// Borrows the extracted surface.
    fn surface(&self) -> Self::Surface<'_>;
}

/// Draws a producer's surface.
pub trait SurfaceRenderer<P: SurfaceProducer + ?Sized> {
    /// What one draw yields.
    type Output;

    /// Draws `frame.draw_args()` vertices of the amplified surface.
    fn draw(&mut self, frame: &SurfaceFrame, surface: P::Surface<'_>) -> Result<Self::Output>;
}

/// Runs the pipeline phases in order.
pub struct PipelineSequencer<P, R> {
    producer: P,
    renderer: R,
    phase: Phase,
    frame: Option<SurfaceFrame>,
}

impl<P, R> PipelineSequencer<P, R>
where
    P: SurfaceProducer,
    R: SurfaceRenderer<P>,
{
    /// Creates a sequencer over a freshly seeded producer.
    pub fn new(producer: P, renderer: R) -> Self {
        Self {
            producer,
            renderer,
            phase: Phase::Idle,
            frame: None,
        }
    }

    /// Last completed phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.producer.generation()
    }

    /// Record of the most recent extraction of the current generation.
    pub fn frame(&self) -> Option<&SurfaceFrame> {
        self.frame.as_ref()
    }

    /// The producer.
    pub fn producer(&self) -> &P {
        &self.producer
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, mutable.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Advances one generation.
    ///
    /// Invalidates the previous extraction: its triangles describe the old grid.
    pub fn step(&mut self) -> Result<()> {
        self.frame = None;
        self.producer.step()?;
        self.phase = Phase::Stepping;
        log::debug!("step complete, generation {}", self.producer.generation());
        Ok(())
    }

    /// Extracts the current generation's surface.
    pub fn extract(&mut self) -> Result<SurfaceFrame> {
        let frame = self.producer.extract()?;
        self.frame = Some(frame);
        self.phase = Phase::Extracting;
        log::debug!(
            "extract complete, generation {} triangles {} dropped {}",
            frame.generation(),
            frame.triangle_count(),
            frame.dropped()
        );
        Ok(frame)
    }

    /// Colorizes the volume and draws the last extracted surface.
    ///
    /// Fails with [`MarchlifeError::NoSurface`] if the current generation has
    /// not been extracted.
    pub fn render(&mut self) -> Result<R::Output> {
        let frame = self.frame.ok_or(MarchlifeError::NoSurface)?;
        self.producer.colorize()?;
        let output = self.renderer.draw(&frame, self.producer.surface())?;
        self.phase = Phase::Rendering;
        log::debug!(
            "render complete, generation {} vertices {}",
            frame.generation(),
            frame.draw_args().vertex_count
        );
        Ok(output)
    }

    /// One full cycle: step, extract, render.
    pub fn tick(&mut self) -> Result<R::Output> {
        self.step()?;
        self.extract()?;
        self.render()
    }

    /// Runs `ticks` cycles, handing each output to `sink`.
    pub fn run(&mut self, ticks: u64, mut sink: impl FnMut(u64, R::Output)) -> Result<()> {
        for _ in 0..ticks {
            let output = self.tick()?;
            sink(self.producer.generation(), output);
        }
        Ok(())
    }
}
