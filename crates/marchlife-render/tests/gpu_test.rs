//! Device integration tests.
//!
//! These tests need a GPU adapter (real or software fallback). When none is
//! available each test prints a note and returns early.

use std::sync::Arc;

use marchlife_core::cpu::CpuProducer;
use marchlife_core::*;
use marchlife_render::*;

fn context() -> Option<Arc<GpuContext>> {
    match GpuContext::request() {
        Ok(context) => Some(Arc::new(context)),
        Err(e) => {
            eprintln!("Skipping device test: no GPU adapter available ({e})");
            None
        }
    }
}

fn config(size: i64, seed: SeedPattern) -> PipelineConfig {
    PipelineConfig::new(GridExtent::cubic(size).unwrap()).with_seed(seed)
}

fn sorted_vertices(triangles: &[Triangle]) -> Vec<[i32; 3]> {
    let mut keys: Vec<[i32; 3]> = triangles
        .iter()
        .flat_map(|t| t.positions)
        .map(|p| {
            let q = (p * 1000.0).round();
            [q.x as i32, q.y as i32, q.z as i32]
        })
        .collect();
    keys.sort_unstable();
    keys
}

#[test]
fn test_single_voxel_surface() {
    let Some(context) = context() else { return };
    let seed = SeedPattern::Voxel { x: 1, y: 1, z: 1 };
    let mut producer = GpuProducer::new(context, config(4, seed)).unwrap();
    let frame = producer.extract().unwrap();
    assert_eq!(frame.triangle_count(), 8);
    assert_eq!(frame.dropped(), 0);
    assert_eq!(frame.draw_args().vertex_count, 72);

    let gpu = producer.read_triangles(frame.triangle_count()).unwrap();
    let mut cpu_producer = CpuProducer::new(config(4, seed)).unwrap();
    cpu_producer.extract().unwrap();
    let cpu: Vec<Triangle> = cpu_producer.triangles().iter().copied().collect();
    assert_eq!(sorted_vertices(&gpu), sorted_vertices(&cpu));
    for triangle in &gpu {
        for n in triangle.normals {
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
    }
}

#[test]
fn test_overflow_is_clamped() {
    let Some(context) = context() else { return };
    let config = config(4, SeedPattern::Voxel { x: 1, y: 1, z: 1 }).with_triangle_capacity(1);
    let mut producer = GpuProducer::new(context, config).unwrap();
    let frame = producer.extract().unwrap();
    assert_eq!(frame.triangle_count(), 1);
    assert_eq!(frame.dropped(), 7);
    assert_eq!(frame.draw_args().vertex_count, 9);
}

#[test]
fn test_steps_match_cpu() {
    let Some(context) = context() else { return };
    for boundary in [BoundaryPolicy::Clamp, BoundaryPolicy::Wrap] {
        let config = config(
            6,
            SeedPattern::Random {
                density: 0.4,
                seed: 7,
            },
        )
        .with_rule(LifeRule::amoeba())
        .with_boundary(boundary);
        let mut gpu = GpuProducer::new(context.clone(), config.clone()).unwrap();
        let mut cpu = CpuProducer::new(config).unwrap();
        assert_eq!(&gpu.read_grid().unwrap(), cpu.grid(), "seed, {boundary:?}");
        for step in 1..=4 {
            gpu.step().unwrap();
            cpu.step().unwrap();
            assert_eq!(&gpu.read_grid().unwrap(), cpu.grid(), "step {step}, {boundary:?}");
        }
        assert_eq!(gpu.generation(), 4);
    }
}

#[test]
fn test_reset_reseeds_grid() {
    let Some(context) = context() else { return };
    let config = config(
        6,
        SeedPattern::Random {
            density: 0.4,
            seed: 3,
        },
    )
    .with_rule(LifeRule::amoeba());
    let mut gpu = GpuProducer::new(context, config.clone()).unwrap();
    let seeded = gpu.read_grid().unwrap();
    for _ in 0..3 {
        gpu.step().unwrap();
    }
    gpu.reset();
    assert_eq!(gpu.generation(), 0);
    assert_eq!(gpu.read_grid().unwrap(), seeded);
    gpu.step().unwrap();
    let mut cpu = CpuProducer::new(config).unwrap();
    cpu.step().unwrap();
    assert_eq!(&gpu.read_grid().unwrap(), cpu.grid());
}

#[test]
fn test_extraction_matches_cpu_count() {
    let Some(context) = context() else { return };
    let config = config(
        8,
        SeedPattern::Random {
            density: 0.3,
            seed: 11,
        },
    );
    let mut gpu = GpuProducer::new(context, config.clone()).unwrap();
    let mut cpu = CpuProducer::new(config).unwrap();
    gpu.step().unwrap();
    cpu.step().unwrap();
    let gpu_frame = gpu.extract().unwrap();
    let cpu_frame = cpu.extract().unwrap();
    assert_eq!(gpu_frame.triangle_count(), cpu_frame.triangle_count());
    assert_eq!(gpu_frame.generation(), 1);
}

#[test]
fn test_colorize_matches_cpu() {
    let Some(context) = context() else { return };
    for format in [VolumeFormat::Rgba8Unorm, VolumeFormat::Rgba16Float] {
        let config = config(5, SeedPattern::Sphere { radius: 1.5 })
            .with_rule(LifeRule::amoeba())
            .with_volume_format(format);
        let mut gpu = GpuProducer::new(context.clone(), config.clone()).unwrap();
        let mut cpu = CpuProducer::new(config).unwrap();
        for _ in 0..2 {
            gpu.step().unwrap();
            cpu.step().unwrap();
        }
        gpu.colorize().unwrap();
        gpu.colorize().unwrap();
        cpu.colorize().unwrap();

        let volume = gpu.read_volume().unwrap();
        let reference = cpu.volume();
        assert_eq!(volume.extent(), reference.extent());
        if volume.format() != reference.format() {
            // Device fell back to another format
            continue;
        }
        let size = volume.extent().size();
        for z in 0..size.z {
            for y in 0..size.y {
                for x in 0..size.x {
                    let a = volume.texel(x, y, z);
                    let b = reference.texel(x, y, z);
                    assert!(
                        (a - b).abs().max_element() < 1.0 / 128.0,
                        "{format:?} texel ({x}, {y}, {z}): {a} vs {b}"
                    );
                }
            }
        }
    }
}

#[test]
fn test_render_covers_pixels() {
    let Some(context) = context() else { return };
    let config = config(8, SeedPattern::Sphere { radius: 2.5 });
    let renderer = GpuRenderer::new(context.clone(), &config, 64, 48).unwrap();
    let producer = GpuProducer::new(context, config).unwrap();
    let mut pipeline = PipelineSequencer::new(producer, renderer);

    let frame = pipeline.extract().unwrap();
    assert!(frame.triangle_count() > 0);
    let image = pipeline.render().unwrap();
    assert_eq!((image.width, image.height), (64, 48));
    assert_eq!(image.pixels.len(), 64 * 48 * 4);
    assert!(image.covered_pixels() > 0);
    assert_eq!(pipeline.phase(), Phase::Rendering);
}

#[test]
fn test_empty_grid_renders_background() {
    let Some(context) = context() else { return };
    let config = config(6, SeedPattern::Empty);
    let renderer = GpuRenderer::new(context.clone(), &config, 32, 32).unwrap();
    let producer = GpuProducer::new(context, config).unwrap();
    let mut pipeline = PipelineSequencer::new(producer, renderer);

    let image = pipeline.tick().unwrap();
    assert_eq!(image.generation, 1);
    assert_eq!(image.covered_pixels(), 0);
}

#[test]
fn test_clear_color_fills_background() {
    let Some(context) = context() else { return };
    let config = config(6, SeedPattern::Empty);
    let renderer = GpuRenderer::new(context.clone(), &config, 16, 8).unwrap();
    let producer = GpuProducer::new(context, config).unwrap();
    let mut pipeline = PipelineSequencer::new(producer, renderer);
    pipeline.renderer_mut().set_clear_color([1.0, 0.0, 0.0, 1.0]);

    let image = pipeline.tick().unwrap();
    assert_eq!(image.covered_pixels(), 16 * 8);
    assert_eq!(image.pixel(0, 0), [255, 0, 0, 255]);
    assert_eq!(image.pixel(15, 7), [255, 0, 0, 255]);
}

#[test]
fn test_render_without_extract_fails() {
    let Some(context) = context() else { return };
    let config = config(4, SeedPattern::Voxel { x: 1, y: 1, z: 1 });
    let renderer = GpuRenderer::new(context.clone(), &config, 16, 16).unwrap();
    let producer = GpuProducer::new(context, config).unwrap();
    let mut pipeline = PipelineSequencer::new(producer, renderer);
    pipeline.extract().unwrap();
    pipeline.step().unwrap();
    assert!(matches!(pipeline.render(), Err(MarchlifeError::NoSurface)));
}

#[test]
fn test_zero_sized_target_rejected() {
    let Some(context) = context() else { return };
    let config = PipelineConfig::default();
    assert!(GpuRenderer::new(context, &config, 0, 16).is_err());
}
