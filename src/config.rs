//! Configuration for a complete SOM training run.

use crate::error::{Result, SomError};
use crate::som::{
    DistanceKind, Grid, LinearDecreasing, NeighborhoodKind, ScheduleKind, Som, TimeFunction,
    Topology, WeightInit,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Offset between the grid seed and the training seed, so that weight
/// initialization and shuffling draw from different streams.
const TRAINING_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// Self-Organizing Map configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SomConfig {
    /// Grid layout.
    /// Default: 10 x 10 square.
    pub topology: Topology,

    /// Grid-space distance between node coordinates.
    /// Default: Euclidean.
    pub grid_distance: DistanceKind,

    /// Feature-space distance for the best-matching-unit search. Toroidal
    /// wrapping applies to grid coordinates only and is rejected here.
    /// Default: squared distance.
    pub bmu_distance: DistanceKind,

    /// Dimensionality of samples and node weights.
    /// Default: 3.
    pub feature_depth: usize,

    /// Rule for the initial node weights.
    /// Default: uniform in [0, 1).
    pub weight_init: WeightInit,

    /// Number of passes over the samples.
    /// Default: 5.
    pub epochs: usize,

    /// Visit samples in a fresh random order every epoch.
    /// Default: true.
    pub shuffle: bool,

    /// Learning-rate schedule.
    /// Default: linear from 1.0 to 0.
    pub alpha: ScheduleKind,

    /// Neighborhood-radius schedule. When unset, the radius decays linearly from
    /// `sigma_factor` times the norm of the grid extents down to 0.5.
    /// Default: None.
    pub sigma: Option<ScheduleKind>,

    /// Scale of the default sigma schedule.
    /// Default: 1.0.
    pub sigma_factor: f64,

    /// Neighborhood scaling function.
    /// Default: exponential with factor -0.5.
    pub neighborhood: NeighborhoodKind,

    /// Random seed for reproducibility.
    /// Default: None (random).
    pub seed: Option<u64>,
}

impl Default for SomConfig {
    fn default() -> Self {
        Self {
            topology: Topology::Square {
                height: 10,
                width: 10,
            },
            grid_distance: DistanceKind::Euclidean,
            bmu_distance: DistanceKind::Squared,
            feature_depth: 3,
            weight_init: WeightInit::default(),
            epochs: 5,
            shuffle: true,
            alpha: ScheduleKind::Linear {
                factor: 1.0,
                floor: 0.0,
            },
            sigma: None,
            sigma_factor: 1.0,
            neighborhood: NeighborhoodKind::default(),
            seed: None,
        }
    }
}

impl SomConfig {
    /// Returns the total number of nodes in the grid.
    #[inline]
    pub fn total_nodes(&self) -> usize {
        self.topology.node_count()
    }

    /// Checks every parameter without building anything.
    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;
        if self.feature_depth == 0 {
            return Err(SomError::Config("Feature depth must be non-zero".to_string()));
        }
        self.weight_init.validate(self.feature_depth)?;
        if !(self.sigma_factor > 0.0) || !self.sigma_factor.is_finite() {
            return Err(SomError::Config(format!(
                "Sigma factor must be positive, got {}",
                self.sigma_factor
            )));
        }

        if let DistanceKind::Toroidal { .. } = self.bmu_distance {
            return Err(SomError::Config(
                "Toroidal distance wraps grid axes and cannot compare feature vectors".to_string(),
            ));
        }
        if let DistanceKind::Toroidal { wrap } = &self.grid_distance {
            self.topology.check_wrap(wrap)?;
        }

        let extents = self.topology.extents();
        self.grid_distance.build(&extents)?;
        self.bmu_distance.build(&extents)?;
        self.neighborhood.build()?;
        self.alpha.build()?;
        if let Some(sigma) = &self.sigma {
            sigma.build()?;
        }
        Ok(())
    }

    /// Builds the grid with its initial weights.
    pub fn build_grid(&self) -> Result<Grid> {
        self.validate()?;
        let extents = self.topology.extents();

        Grid::builder(self.topology)
            .distance_boxed(self.bmu_distance.build(&extents)?)
            .neighborhood_distance_boxed(self.grid_distance.build(&extents)?)
            .feature_depth(self.feature_depth)
            .weight_init(self.weight_init.clone())
            .maybe_seed(self.seed)
            .build()
    }

    /// Builds the grid and wraps it in a ready-to-train map.
    pub fn build(&self) -> Result<Som> {
        let grid = self.build_grid()?;
        let dims = grid.dims();

        let sigma: Box<dyn TimeFunction> = match &self.sigma {
            Some(kind) => kind.build()?,
            None => Box::new(LinearDecreasing::default_sigma(&dims, self.sigma_factor)),
        };

        Ok(Som::builder(grid)
            .neighborhood_boxed(self.neighborhood.build()?)
            .alpha_boxed(self.alpha.build()?)
            .sigma_boxed(sigma)
            .maybe_seed(self.seed.map(|s| s.wrapping_add(TRAINING_SEED_OFFSET)))
            .build())
    }

    /// Reads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SomError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON form of the configuration.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SomConfig::default();
        assert_eq!(config.total_nodes(), 100);
        assert_eq!(config.feature_depth, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_hex_alt_total_nodes() {
        let config = SomConfig {
            topology: Topology::HexAlt {
                height: 5,
                width: 4,
            },
            ..Default::default()
        };
        assert_eq!(config.total_nodes(), 18);
    }

    #[test]
    fn test_invalid_configs() {
        let zero_depth = SomConfig {
            feature_depth: 0,
            ..Default::default()
        };
        assert!(zero_depth.validate().is_err());

        let zero_grid = SomConfig {
            topology: Topology::Square {
                height: 0,
                width: 3,
            },
            ..Default::default()
        };
        assert!(zero_grid.validate().is_err());

        let bad_wrap = SomConfig {
            grid_distance: DistanceKind::Toroidal { wrap: vec![true] },
            ..Default::default()
        };
        assert!(bad_wrap.validate().is_err());

        let bad_sigma = SomConfig {
            sigma_factor: 0.0,
            ..Default::default()
        };
        assert!(bad_sigma.validate().is_err());
    }

    #[test]
    fn test_toroidal_bmu_distance_rejected() {
        for feature_depth in [1, 3] {
            let config = SomConfig {
                bmu_distance: DistanceKind::Toroidal {
                    wrap: vec![true, true],
                },
                feature_depth,
                seed: Some(1),
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(SomError::Config(_))));
            assert!(config.build().is_err());
        }
    }

    #[test]
    fn test_hex_row_wrap_uses_row_spacing() {
        let config = SomConfig {
            topology: Topology::Hex {
                height: 4,
                width: 4,
            },
            grid_distance: DistanceKind::Toroidal {
                wrap: vec![true, false],
            },
            feature_depth: 1,
            seed: Some(3),
            ..Default::default()
        };
        let grid = config.build_grid().unwrap();

        let top = grid.flat_index(&[0, 0]).unwrap();
        let below = grid.flat_index(&[1, 0]).unwrap();
        let wrapped = grid.flat_index(&[3, 0]).unwrap();
        let d_below = grid.node_distance(top, below).unwrap();
        let d_wrapped = grid.node_distance(top, wrapped).unwrap();
        assert!((d_below - 1.0).abs() < 1e-9);
        assert!((d_wrapped - 1.0).abs() < 1e-9, "wrapped rows at {}", d_wrapped);

        let odd = SomConfig {
            topology: Topology::Hex {
                height: 5,
                width: 4,
            },
            ..config
        };
        assert!(odd.validate().is_err());
    }

    #[test]
    fn test_build_is_reproducible() {
        let config = SomConfig {
            seed: Some(42),
            ..Default::default()
        };
        let a = config.build().unwrap();
        let b = config.build().unwrap();
        assert_eq!(a.grid().node_weights(), b.grid().node_weights());
        assert_eq!(a.grid().len(), 100);
    }

    #[test]
    fn test_json_roundtrip_with_partial_input() {
        let json = r#"{
            "topology": { "kind": "hex", "height": 4, "width": 6 },
            "feature_depth": 2,
            "seed": 7
        }"#;
        let config: SomConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.topology,
            Topology::Hex {
                height: 4,
                width: 6
            }
        );
        assert_eq!(config.epochs, 5);
        assert_eq!(config.bmu_distance, DistanceKind::Squared);

        let back: SomConfig = serde_json::from_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
