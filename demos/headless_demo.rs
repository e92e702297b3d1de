//! Renders a few generations of the amoeba rule to PNG files.
//!
//! Run with: cargo run --example headless_demo [config.json]
//!
//! Outputs PNG files to target/marchlife/

use std::path::PathBuf;

use marchlife::*;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const GENERATIONS: u64 = 24;
const SAVE_EVERY: u64 = 6;

fn main() -> Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::new(GridExtent::cubic(48)?)
            .with_rule(LifeRule::amoeba())
            .with_boundary(BoundaryPolicy::Wrap)
            .with_seed(SeedPattern::Random {
                density: 0.3,
                seed: 2024,
            })
            .with_lighting(Lighting::default().with_bulge(0.25)),
    };

    let out_dir = PathBuf::from("target/marchlife");
    std::fs::create_dir_all(&out_dir)?;

    let mut pipeline = gpu_headless_pipeline(config, WIDTH, HEIGHT)?;
    for _ in 0..GENERATIONS {
        pipeline.step()?;
        let frame = pipeline.extract()?;
        if pipeline.generation() % SAVE_EVERY != 0 {
            continue;
        }
        let image = pipeline.render()?;
        let path = out_dir.join(format!("generation_{:04}.png", image.generation));
        save_image(&path, &image)?;
        println!(
            "generation {:>3}: {:>6} triangles, {} dropped -> {}",
            frame.generation(),
            frame.triangle_count(),
            frame.dropped(),
            path.display()
        );
    }
    Ok(())
}
