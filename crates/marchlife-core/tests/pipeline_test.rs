//! End-to-end tests of the CPU device through the pipeline sequencer.

use marchlife_core::cpu::{CpuProducer, CpuRenderer};
use marchlife_core::*;

fn single_voxel_config() -> PipelineConfig {
    PipelineConfig::new(GridExtent::cubic(4).unwrap()).with_seed(SeedPattern::Voxel {
        x: 1,
        y: 1,
        z: 1,
    })
}

fn triangle_keys(buffer: &TriangleBuffer) -> Vec<[u32; 18]> {
    let mut keys: Vec<[u32; 18]> = buffer
        .iter()
        .map(|t| {
            let mut key = [0; 18];
            for (k, v) in t.positions.iter().chain(&t.normals).enumerate() {
                key[k * 3] = v.x.to_bits();
                key[k * 3 + 1] = v.y.to_bits();
                key[k * 3 + 2] = v.z.to_bits();
            }
            key
        })
        .collect();
    keys.sort_unstable();
    keys
}

#[test]
fn test_single_voxel_surface() {
    let config = single_voxel_config();
    let renderer = CpuRenderer::new(&config);
    let producer = CpuProducer::new(config).unwrap();
    let mut pipeline = PipelineSequencer::new(producer, renderer);

    let frame = pipeline.extract().unwrap();
    assert_eq!(frame.generation(), 0);
    assert_eq!(frame.triangle_count(), 8);
    assert_eq!(frame.dropped(), 0);
    assert_eq!(frame.draw_args().vertex_count, 72);
    assert_eq!(frame.draw_args().instance_count, 1);

    let mesh = pipeline.render().unwrap();
    assert_eq!(mesh.vertices.len(), 72);
    assert_eq!(mesh.triangle_count(), 24);
    assert_eq!(pipeline.phase(), Phase::Rendering);

    // Every vertex lies on an edge incident to the live voxel.
    for t in pipeline.producer().triangles().iter() {
        for p in t.positions {
            assert!((p - Vec3::ONE).length() <= 0.5 + 1e-5, "{p:?}");
        }
    }
}

#[test]
fn test_normals_point_away_from_live_voxel() {
    let mut producer = CpuProducer::new(single_voxel_config()).unwrap();
    producer.extract().unwrap();
    for t in producer.triangles().iter() {
        let outward = (t.centroid() - Vec3::ONE).normalize();
        assert!(t.average_normal().dot(outward) > 0.0);
    }
}

#[test]
fn test_overflow_is_clamped_and_counted() {
    let config = single_voxel_config().with_triangle_capacity(1);
    let renderer = CpuRenderer::new(&config);
    let producer = CpuProducer::new(config).unwrap();
    let mut pipeline = PipelineSequencer::new(producer, renderer);

    let frame = pipeline.extract().unwrap();
    assert_eq!(frame.triangle_count(), 1);
    assert_eq!(frame.dropped(), 7);
    assert!(frame.is_truncated());
    assert_eq!(frame.draw_args().vertex_count, 9);
    assert_eq!(pipeline.producer().triangles().count(), 1);

    let mesh = pipeline.render().unwrap();
    assert_eq!(mesh.vertices.len(), 9);
}

#[test]
fn test_extraction_is_order_independent() {
    let config = PipelineConfig::new(GridExtent::cubic(10).unwrap()).with_seed(SeedPattern::Random {
        density: 0.45,
        seed: 1234,
    });
    let mut producer = CpuProducer::new(config).unwrap();
    producer.step().unwrap();

    let first = producer.extract().unwrap();
    let first_keys = triangle_keys(producer.triangles());
    let second = producer.extract().unwrap();
    let second_keys = triangle_keys(producer.triangles());

    assert!(first.triangle_count() > 0);
    assert_eq!(first, second);
    assert_eq!(first_keys, second_keys);
}

#[test]
fn test_colorize_is_idempotent() {
    for format in [VolumeFormat::Rgba16Float, VolumeFormat::Rgba8Unorm] {
        let config = PipelineConfig::new(GridExtent::new(6, 5, 4).unwrap())
            .with_seed(SeedPattern::Sphere { radius: 2.0 })
            .with_volume_format(format);
        let mut producer = CpuProducer::new(config).unwrap();
        producer.colorize().unwrap();
        let first = producer.volume().bytes().to_vec();
        producer.colorize().unwrap();
        assert_eq!(first, producer.volume().bytes());
        assert!(first.iter().any(|&b| b != 0));
    }
}

#[test]
fn test_colorize_upsamples_nearest_cell() {
    let config = single_voxel_config().with_age_fade(0);
    let palette = config.colorize.palette.clone();
    let mut producer = CpuProducer::new(config).unwrap();
    producer.colorize().unwrap();
    let volume = producer.volume();
    assert_eq!(volume.extent().size(), UVec3::splat(8));

    let alive = palette.color(Cell::ALIVE_STATE);
    let empty = palette.color(Cell::EMPTY_STATE);
    for (x, y, z) in [(2, 2, 2), (3, 3, 3), (2, 3, 2)] {
        assert!((volume.texel(x, y, z) - alive).abs().max_element() < 1e-2);
    }
    for (x, y, z) in [(0, 0, 0), (4, 4, 4), (1, 2, 2)] {
        assert!((volume.texel(x, y, z) - empty).abs().max_element() < 1e-2);
    }
}

#[test]
fn test_double_buffer_matches_repeated_rule() {
    for boundary in [BoundaryPolicy::Clamp, BoundaryPolicy::Wrap] {
        for rule in [LifeRule::clouds(), LifeRule::amoeba()] {
            let config = PipelineConfig::new(GridExtent::new(7, 6, 5).unwrap())
                .with_seed(SeedPattern::Random {
                    density: 0.5,
                    seed: 77,
                })
                .with_boundary(boundary)
                .with_rule(rule);
            let mut producer = CpuProducer::new(config).unwrap();
            let mut reference = producer.grid().clone();

            for k in 1..=5 {
                producer.step().unwrap();
                let mut fresh = CellGrid::new(reference.extent());
                apply_rule(&rule, boundary, &reference, &mut fresh).unwrap();
                reference = fresh;
                assert_eq!(producer.grid(), &reference, "{boundary:?} step {k}");
                assert_eq!(producer.generation(), k);
            }
        }
    }
}

#[test]
fn test_custom_rule_runs_on_cpu() {
    /// Every voxel copies its +x neighbor (clamped).
    struct ShiftLeft;

    impl TransitionRule for ShiftLeft {
        fn apply(&self, view: &GridView<'_>, x: u32, y: u32, z: u32) -> Cell {
            view.neighbor(x, y, z, 1, 0, 0)
        }
    }

    let config = PipelineConfig::new(GridExtent::cubic(4).unwrap())
        .with_seed(SeedPattern::Voxel { x: 2, y: 1, z: 1 });
    let mut producer = CpuProducer::with_rule(config, ShiftLeft).unwrap();
    producer.step().unwrap();
    assert!(producer.grid().get(1, 1, 1).is_alive());
    assert!(producer.grid().get(2, 1, 1).is_empty());
}

#[test]
fn test_tick_runs_full_cycle() {
    let config = PipelineConfig::new(GridExtent::cubic(8).unwrap())
        .with_seed(SeedPattern::Sphere { radius: 2.5 })
        .with_rule(LifeRule::amoeba());
    let renderer = CpuRenderer::new(&config);
    let producer = CpuProducer::new(config).unwrap();
    let mut pipeline = PipelineSequencer::new(producer, renderer);

    let mut generations = Vec::new();
    pipeline
        .run(3, |generation, mesh| {
            assert_eq!(mesh.generation, generation);
            assert_eq!(mesh.vertices.len() % 9, 0);
            generations.push(generation);
        })
        .unwrap();
    assert_eq!(generations, vec![1, 2, 3]);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = PipelineConfig::default().with_triangle_capacity(0);
    assert!(matches!(
        CpuProducer::new(config),
        Err(MarchlifeError::InvalidConfig(_))
    ));
}
