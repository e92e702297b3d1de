//! Runs the CPU device at a fixed cadence and prints surface statistics.
//!
//! Run with: cargo run --example cpu_demo

use std::time::{Duration, Instant};

use marchlife::*;

const RUN_FOR: Duration = Duration::from_secs(3);

fn main() -> Result<()> {
    init_logging();

    let config = PipelineConfig::new(GridExtent::cubic(32)?)
        .with_rule(LifeRule::clouds())
        .with_seed(SeedPattern::Random {
            density: 0.45,
            seed: 7,
        });
    let mut pipeline = cpu_pipeline(config)?;
    let mut cadence = FixedCadence::per_second(20);

    let start = Instant::now();
    let mut last = start;
    while start.elapsed() < RUN_FOR {
        let now = Instant::now();
        for _ in 0..cadence.advance(now - last) {
            let mesh = pipeline.tick()?;
            let alive = pipeline.producer().grid().count_state(Cell::ALIVE_STATE);
            println!(
                "generation {:>3}: {:>5} alive, {:>6} fan triangles",
                mesh.generation,
                alive,
                mesh.triangle_count()
            );
        }
        last = now;
        std::thread::sleep(cadence.period() / 4);
    }
    println!("skipped {} ticks", cadence.skipped());
    Ok(())
}
