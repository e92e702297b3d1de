//! Property tests over random grids.

use marchlife_core::cpu::{CpuProducer, CpuRenderer};
use marchlife_core::marching_cubes::{case_triangle_count, case_triangles, EDGE_CORNERS};
use marchlife_core::*;
use proptest::prelude::*;

fn random_config(w: i64, h: i64, d: i64, density: f32, seed: u32) -> PipelineConfig {
    PipelineConfig::new(GridExtent::new(w, h, d).unwrap())
        .with_seed(SeedPattern::Random { density, seed })
}

/// Triangles a sequential sweep over every cube would emit.
fn expected_triangles(grid: &CellGrid, selector: SurfaceSelector) -> u32 {
    let cells = grid.extent().cell_size();
    let mut total = 0;
    for z in 0..cells.z {
        for y in 0..cells.y {
            for x in 0..cells.x {
                total += polygonize_cell(grid, selector, x, y, z).len() as u32;
            }
        }
    }
    total
}

#[test]
fn test_case_table_is_total() {
    for config in 0..=255_u8 {
        let n = case_triangle_count(config);
        assert!(n <= MAX_TRIANGLES_PER_CELL, "case {config}: {n}");
        assert_eq!(case_triangles(config).count(), n);
        for tri in case_triangles(config) {
            assert!(tri.iter().all(|&e| e < EDGE_CORNERS.len()));
        }
    }
    assert_eq!(case_triangle_count(0), 0);
    assert_eq!(case_triangle_count(255), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_count_never_exceeds_capacity(
        w in 2_i64..7,
        h in 2_i64..7,
        d in 2_i64..7,
        density in 0.0_f32..1.0,
        seed in any::<u32>(),
        capacity in 1_u32..40,
    ) {
        let config = random_config(w, h, d, density, seed).with_triangle_capacity(capacity);
        let mut producer = CpuProducer::new(config).unwrap();
        let total = expected_triangles(producer.grid(), SurfaceSelector::default());

        let frame = producer.extract().unwrap();
        prop_assert!(producer.triangles().count() <= capacity);
        prop_assert_eq!(frame.triangle_count(), total.min(capacity));
        prop_assert_eq!(frame.dropped(), total - total.min(capacity));
        prop_assert_eq!(
            frame.draw_args().vertex_count,
            total.min(capacity) * VERTICES_PER_TRIANGLE
        );
    }

    #[test]
    fn prop_default_capacity_never_drops(
        w in 2_i64..7,
        h in 2_i64..7,
        d in 2_i64..7,
        density in 0.0_f32..1.0,
        seed in any::<u32>(),
    ) {
        let mut producer = CpuProducer::new(random_config(w, h, d, density, seed)).unwrap();
        let frame = producer.extract().unwrap();
        prop_assert_eq!(frame.dropped(), 0);
        let total = expected_triangles(producer.grid(), SurfaceSelector::default());
        prop_assert_eq!(frame.triangle_count(), total);
    }

    #[test]
    fn prop_steps_match_reference(
        w in 1_i64..6,
        h in 1_i64..6,
        d in 1_i64..6,
        density in 0.0_f32..1.0,
        seed in any::<u32>(),
        steps in 1_u64..4,
        wrap in any::<bool>(),
    ) {
        let boundary = if wrap { BoundaryPolicy::Wrap } else { BoundaryPolicy::Clamp };
        let config = random_config(w, h, d, density, seed)
            .with_rule(LifeRule::amoeba())
            .with_boundary(boundary);
        let mut producer = CpuProducer::new(config).unwrap();
        let mut reference = producer.grid().clone();
        for _ in 0..steps {
            producer.step().unwrap();
            let mut next = CellGrid::new(reference.extent());
            apply_rule(&LifeRule::amoeba(), boundary, &reference, &mut next).unwrap();
            reference = next;
        }
        prop_assert_eq!(producer.grid(), &reference);
        prop_assert_eq!(producer.generation(), steps);
    }

    #[test]
    fn prop_fan_mesh_matches_draw_args(
        size in 2_i64..6,
        density in 0.0_f32..1.0,
        seed in any::<u32>(),
    ) {
        let config = random_config(size, size, size, density, seed);
        let renderer = CpuRenderer::new(&config);
        let producer = CpuProducer::new(config).unwrap();
        let mut pipeline = PipelineSequencer::new(producer, renderer);
        let frame = pipeline.extract().unwrap();
        let mesh = pipeline.render().unwrap();
        prop_assert_eq!(mesh.vertices.len(), frame.draw_args().vertex_count as usize);
        for v in &mesh.vertices {
            prop_assert!(v.color.is_finite());
            prop_assert!((v.normal.length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn prop_random_seed_is_deterministic(
        size in 1_i64..6,
        density in 0.0_f32..1.0,
        seed in any::<u32>(),
    ) {
        let a = CpuProducer::new(random_config(size, size, size, density, seed)).unwrap();
        let b = CpuProducer::new(random_config(size, size, size, density, seed)).unwrap();
        prop_assert_eq!(a.grid(), b.grid());
    }
}
