//! Integration tests for somgrid Self-Organizing Map training.

use somgrid::som::topology::HEX_SCALE;
use somgrid::som::{LinearDecreasing, ToroidalEuclidean};
use somgrid::{DistanceKind, Grid, Som, SomConfig, SomError, Topology};
use std::fs;
use tempfile::tempdir;

/// Four evenly spaced one-dimensional samples.
fn line_samples() -> Vec<Vec<f64>> {
    vec![vec![0.0], vec![0.33], vec![0.66], vec![1.0]]
}

fn argmin_weight(grid: &Grid) -> usize {
    let weights = grid.node_weights();
    (0..weights.len())
        .min_by(|&a, &b| weights[a][0].total_cmp(&weights[b][0]))
        .unwrap()
}

fn argmax_weight(grid: &Grid) -> usize {
    let weights = grid.node_weights();
    (0..weights.len())
        .max_by(|&a, &b| weights[a][0].total_cmp(&weights[b][0]))
        .unwrap()
}

#[test]
fn test_end_to_end_training() {
    let grid = Grid::square(2, 2).feature_depth(1).seed(42).build().unwrap();
    let mut som = Som::builder(grid).seed(7).build();

    let summary = som.train(&line_samples(), 50, false).unwrap();
    assert_eq!(summary.epochs, 50);
    assert_eq!(summary.iterations, 200);

    // Every update is a convex step toward a sample in [0, 1]
    for w in som.grid().node_weights() {
        assert!((0.0..=1.0).contains(&w[0]), "weight {} escaped [0, 1]", w[0]);
    }

    let low = som.predict(&[0.0]).unwrap();
    let high = som.predict(&[1.0]).unwrap();
    assert_eq!(low.node_id, argmin_weight(som.grid()));
    assert_eq!(high.node_id, argmax_weight(som.grid()));
    assert_ne!(low.node_id, high.node_id);

    // Larger samples map to nodes with larger weights
    let weights = som.grid().node_weights();
    let predicted: Vec<f64> = som
        .predict_batch(&line_samples())
        .unwrap()
        .iter()
        .map(|p| weights[p.node_id][0])
        .collect();
    for pair in predicted.windows(2) {
        assert!(pair[0] <= pair[1], "weights out of order: {:?}", predicted);
    }
    assert!(predicted[0] < predicted[3]);
}

#[test]
fn test_training_is_reproducible() {
    let config = SomConfig {
        topology: Topology::Hex {
            height: 4,
            width: 4,
        },
        feature_depth: 2,
        epochs: 3,
        seed: Some(12345),
        ..Default::default()
    };
    let samples: Vec<Vec<f64>> = (0..20)
        .map(|i| vec![i as f64 / 20.0, 1.0 - i as f64 / 20.0])
        .collect();

    // Train twice with same seed
    let mut som1 = config.build().unwrap();
    som1.train(&samples, config.epochs, true).unwrap();

    let mut som2 = config.build().unwrap();
    som2.train(&samples, config.epochs, true).unwrap();

    assert_eq!(som1.grid().node_weights(), som2.grid().node_weights());
}

#[test]
fn test_hex_neighbors_are_equidistant() {
    let grid = Grid::hex(3, 3).feature_depth(1).seed(1).build().unwrap();
    let center = grid.flat_index(&[1, 1]).unwrap();

    let coords = grid.node(&[1, 0]).unwrap().coords().to_vec();
    assert!((coords[0] - HEX_SCALE).abs() < 1e-12);
    assert!((coords[1] - 0.5).abs() < 1e-12);

    let neighbors = [[1, 0], [1, 2], [0, 1], [0, 2], [2, 1], [2, 2]];
    for idx in neighbors {
        let other = grid.flat_index(&idx).unwrap();
        let d = grid.node_distance(center, other).unwrap();
        assert!((d - 1.0).abs() < 1e-9, "{:?} at distance {}", idx, d);
    }

    let far = grid.flat_index(&[1, 0]).unwrap();
    let corner = grid.flat_index(&[0, 2]).unwrap();
    assert!(grid.node_distance(far, corner).unwrap() > 1.0 + 1e-9);
}

#[test]
fn test_hex_alt_layout() {
    let grid = Grid::hex_alt(3, 4).feature_depth(2).seed(3).build().unwrap();
    assert_eq!(grid.len(), 11);

    let rows = grid.rows().unwrap();
    let lengths: Vec<usize> = rows.iter().map(|r| r.len()).collect();
    assert_eq!(lengths, vec![4, 3, 4]);

    assert_eq!(grid.multi_index(4).unwrap(), vec![1, 0]);
    assert_eq!(grid.flat_index(&[2, 0]).unwrap(), 7);
    assert!(matches!(
        grid.flat_index(&[1, 3]),
        Err(SomError::IndexOutOfRange { index: 3, max: 3 })
    ));

    let coords = grid.nodes()[4].coords();
    assert!((coords[0] - HEX_SCALE).abs() < 1e-12);
    assert!((coords[1] - 0.5).abs() < 1e-12);
}

#[test]
fn test_cube_grid_training() {
    let grid = Grid::cube(2, 3, 4).feature_depth(3).seed(5).build().unwrap();
    assert_eq!(grid.len(), 24);
    assert_eq!(grid.node(&[1, 2, 3]).unwrap().coords(), &[1.0, 2.0, 3.0]);
    assert!(grid.rows().is_none());

    let mut som = Som::builder(grid).seed(5).build();
    let samples = vec![vec![0.1, 0.2, 0.3], vec![0.9, 0.8, 0.7]];
    som.train(&samples, 10, true).unwrap();

    let batch = som.predict_batch(&samples).unwrap();
    assert_eq!(batch.len(), 2);
    assert!(som.quantization_error(&samples).unwrap() >= 0.0);
}

#[test]
fn test_bmu_tie_break_reaches_every_tied_node() {
    let mut grid = Grid::square(2, 2)
        .weights(vec![vec![0.5, 0.5]; 4])
        .seed(11)
        .build()
        .unwrap();

    let mut hits = [0usize; 4];
    for _ in 0..400 {
        let best = grid.best_match(&[0.1, 0.9]).unwrap();
        hits[best.node_id] += 1;
    }

    assert!(hits.iter().all(|&h| h > 0), "hits: {:?}", hits);
}

#[test]
fn test_bmu_is_minimal() {
    let weights = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
    let mut grid = Grid::square(2, 2).weights(weights).build().unwrap();

    let best = grid.best_match(&[0.9, 0.8]).unwrap();
    assert_eq!(best.node_id, 3);
    assert!((best.distance - 0.05).abs() < 1e-12);
}

#[test]
fn test_toroidal_grid_distance() {
    let grid = Grid::square(1, 5)
        .feature_depth(1)
        .neighborhood_distance(ToroidalEuclidean::new(vec![1.0, 5.0], vec![false, true]).unwrap())
        .build()
        .unwrap();

    // Opposite edges of a wrapped row are direct neighbors
    assert!((grid.node_distance(0, 4).unwrap() - 1.0).abs() < 1e-12);
    assert!((grid.node_distance(0, 2).unwrap() - 2.0).abs() < 1e-12);
}

#[test]
fn test_mismatched_sample_leaves_grid_untouched() {
    let grid = Grid::square(3, 3).feature_depth(2).seed(9).build().unwrap();
    let mut som = Som::new(grid);
    let before = som.grid().node_weights();

    let samples = vec![vec![0.1, 0.2], vec![0.3]];
    assert!(matches!(
        som.train(&samples, 2, false),
        Err(SomError::DimensionMismatch {
            expected: 2,
            actual: 1
        })
    ));
    assert_eq!(som.grid().node_weights(), before);
}

#[test]
fn test_custom_schedules() {
    let grid = Grid::square(4, 4).feature_depth(1).seed(2).build().unwrap();
    let mut som = Som::builder(grid)
        .alpha(LinearDecreasing::new(0.5))
        .sigma(|t: usize, total: usize| 2.0 - t as f64 / total.max(1) as f64)
        .seed(2)
        .build();

    let summary = som.train(&line_samples(), 5, true).unwrap();
    assert_eq!(summary.iterations, 20);
    assert!(summary.end_alpha.abs() < 1e-12);
    assert!((summary.end_sigma - 1.0).abs() < 1e-12);
}

#[test]
fn test_config_file_roundtrip() {
    let config = SomConfig {
        topology: Topology::HexAlt {
            height: 6,
            width: 4,
        },
        grid_distance: DistanceKind::Toroidal {
            wrap: vec![true, false],
        },
        feature_depth: 2,
        epochs: 2,
        seed: Some(99),
        ..Default::default()
    };

    // Save
    let dir = tempdir().unwrap();
    let path = dir.path().join("som.json");
    fs::write(&path, config.to_json_string().unwrap()).unwrap();

    // Load
    let loaded = SomConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);

    let mut som = loaded.build().unwrap();
    assert_eq!(som.grid().len(), 21);

    let samples = vec![vec![0.2, 0.4], vec![0.6, 0.8]];
    som.train(&samples, loaded.epochs, loaded.shuffle).unwrap();
    let te = som.topographic_error(&samples).unwrap();
    assert!((0.0..=1.0).contains(&te));
}

#[test]
fn test_toroidal_bmu_distance_is_rejected() {
    let config = SomConfig {
        bmu_distance: DistanceKind::Toroidal {
            wrap: vec![true, true],
        },
        feature_depth: 1,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(SomError::Config(_))));

    let deep = SomConfig {
        feature_depth: 3,
        ..config
    };
    assert!(matches!(deep.build(), Err(SomError::Config(_))));
}

#[test]
fn test_hex_torus_wraps_edge_rows() {
    let grid = Grid::hex(4, 4)
        .feature_depth(1)
        .neighborhood_distance(
            ToroidalEuclidean::new(
                Topology::Hex {
                    height: 4,
                    width: 4,
                }
                .extents(),
                vec![true, false],
            )
            .unwrap(),
        )
        .seed(6)
        .build()
        .unwrap();

    let first = grid.flat_index(&[0, 1]).unwrap();
    let last = grid.flat_index(&[3, 1]).unwrap();
    let next = grid.flat_index(&[1, 1]).unwrap();
    let d_last = grid.node_distance(first, last).unwrap();
    let d_next = grid.node_distance(first, next).unwrap();
    assert!((d_last - d_next).abs() < 1e-9, "{} vs {}", d_last, d_next);
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");
    assert!(matches!(
        SomConfig::from_json_file(&path),
        Err(SomError::FileNotFound(_))
    ));
}

#[test]
fn test_empty_and_edge_cases() {
    // Missing feature depth and weights
    assert!(matches!(
        Grid::square(2, 2).build(),
        Err(SomError::UninitializedState(_))
    ));

    // Zero-sized grids are rejected
    assert!(Grid::square(0, 2).feature_depth(1).build().is_err());

    // Training on nothing is a no-op
    let grid = Grid::square(2, 2).feature_depth(1).seed(4).build().unwrap();
    let mut som = Som::new(grid);
    let before = som.grid().node_weights();
    let empty: Vec<Vec<f64>> = Vec::new();
    let summary = som.train(&empty, 10, true).unwrap();
    assert_eq!(summary.iterations, 0);
    assert_eq!(som.grid().node_weights(), before);
}
