//! SOM training and prediction.
//!
//! Training is online and strictly sequential: every step finishes updating all
//! node weights before the next sample's BMU search reads them. Only the
//! per-node work inside a single step may run in parallel (see
//! [`crate::som::grid::PARALLEL_THRESHOLD`]).

use crate::error::{Result, SomError};
use crate::som::distance::{DistanceFunction, EuclideanNorm};
use crate::som::grid::{Grid, Prediction, PARALLEL_THRESHOLD};
use crate::som::neighborhood::{ExponentialDecreasing, NeighborhoodFunction};
use crate::som::schedule::{LinearDecreasing, TimeFunction};
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a [`Som::train`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Number of epochs run.
    pub epochs: usize,
    /// Number of steps run, `epochs * samples`.
    pub iterations: usize,
    /// Learning rate at the end of the schedule.
    pub end_alpha: f64,
    /// Neighborhood radius at the end of the schedule.
    pub end_sigma: f64,
}

/// A Self-Organizing Map: a [`Grid`] plus the neighborhood function, the
/// alpha (learning rate) and sigma (radius) schedules, and a random source
/// for shuffling and BMU tie-breaks.
///
/// `train` can be called repeatedly; each call runs its own schedule and keeps
/// moving the same grid weights.
pub struct Som {
    grid: Grid,
    neighborhood: Box<dyn NeighborhoodFunction>,
    alpha: Box<dyn TimeFunction>,
    sigma: Box<dyn TimeFunction>,
    rng: ChaCha8Rng,
}

impl fmt::Debug for Som {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Som")
            .field("grid", &self.grid)
            .finish_non_exhaustive()
    }
}

impl Som {
    /// Wraps `grid` with the default exponential neighborhood, linear alpha
    /// schedule from 1.0 and the grid-scaled default sigma schedule.
    pub fn new(grid: Grid) -> Self {
        SomBuilder::new(grid).build()
    }

    /// Starts configuring a map around `grid`.
    pub fn builder(grid: Grid) -> SomBuilder {
        SomBuilder::new(grid)
    }

    /// The trained grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable access to the grid, e.g. to reseed weights.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Releases the grid.
    pub fn into_grid(self) -> Grid {
        self.grid
    }

    fn check_samples<S: AsRef<[f64]>>(&self, samples: &[S]) -> Result<()> {
        let depth = self.grid.feature_depth();
        samples
            .iter()
            .try_for_each(|s| SomError::check_dim(depth, s.as_ref().len()))
    }

    /// Learning rate and radius at iteration `t` of `total`.
    pub fn schedule_at(&self, t: usize, total: usize) -> Result<(f64, f64)> {
        let alpha = self.alpha.at_time(t, total);
        let sigma = self.sigma.at_time(t, total);

        if !alpha.is_finite() || !sigma.is_finite() {
            return Err(SomError::Config(format!(
                "Schedules produced non-finite values at t={}/{}: alpha={}, sigma={}",
                t, total, alpha, sigma
            )));
        }
        Ok((alpha, sigma))
    }

    /// One training step: find the BMU for `sample` and pull every node toward
    /// the sample by its neighborhood factor. Returns the BMU.
    pub fn step(&mut self, sample: &[f64], t: usize, total: usize) -> Result<Prediction> {
        let (alpha, sigma) = self.schedule_at(t, total)?;

        let bmu = self.grid.find_best_node_id_and_score(sample, &mut self.rng)?;
        let bmu_coords = self.grid.nodes()[bmu.node_id].coords().to_vec();
        let dists = self.grid.calc_node_distances_to_point(&bmu_coords)?;

        // Alpha is already folded into the neighborhood factor.
        let nh = &self.neighborhood;
        let factors: Vec<f64> = if dists.len() >= PARALLEL_THRESHOLD {
            dists.par_iter().map(|&d| nh.scale(d, sigma, alpha)).collect()
        } else {
            dists.iter().map(|&d| nh.scale(d, sigma, alpha)).collect()
        };

        self.grid.apply_update(sample, &factors)?;
        Ok(bmu)
    }

    /// Runs epoch `epoch` of an `epochs`-long run over `samples`.
    ///
    /// The global iteration counter is `epoch * samples.len() + i`, so calling
    /// this for `epoch in 0..epochs` is equivalent to [`Som::train`].
    pub fn train_epoch<S: AsRef<[f64]>>(
        &mut self,
        samples: &[S],
        epoch: usize,
        epochs: usize,
        shuffle: bool,
    ) -> Result<usize> {
        if samples.is_empty() || epochs == 0 {
            return Ok(0);
        }
        if epoch >= epochs {
            return Err(SomError::IndexOutOfRange {
                index: epoch,
                max: epochs,
            });
        }
        self.check_samples(samples)?;

        let n = samples.len();
        let max_iter = epochs * n;
        let checkpoint = (max_iter / 100).max(1);

        let mut order: Vec<usize> = (0..n).collect();
        if shuffle {
            order.shuffle(&mut self.rng);
        }

        let mut t = epoch * n;
        for idx in order {
            self.step(samples[idx].as_ref(), t, max_iter)?;
            t += 1;

            if t % checkpoint == 0 {
                info!("Training: {}% ({}/{})", 100 * t / max_iter, t, max_iter);
            }
        }

        debug!("Epoch {}/{} finished", epoch + 1, epochs);
        Ok(n)
    }

    /// Trains the map for `epochs` passes over `samples`.
    ///
    /// The alpha and sigma schedules run over the global iteration count
    /// `epochs * samples.len()` and are not reset between epochs. With
    /// `shuffle`, each epoch visits the samples in a fresh random order. Empty
    /// `samples` or zero `epochs` is a no-op.
    pub fn train<S: AsRef<[f64]>>(
        &mut self,
        samples: &[S],
        epochs: usize,
        shuffle: bool,
    ) -> Result<TrainingSummary> {
        let max_iter = epochs * samples.len();
        let (end_alpha, end_sigma) = self.schedule_at(max_iter, max_iter)?;

        if max_iter == 0 {
            return Ok(TrainingSummary {
                epochs: 0,
                iterations: 0,
                end_alpha,
                end_sigma,
            });
        }
        self.check_samples(samples)?;

        info!(
            "Training SOM: {} samples, {} nodes, {} features, {} epochs",
            samples.len(),
            self.grid.len(),
            self.grid.feature_depth(),
            epochs
        );

        let mut iterations = 0;
        for epoch in 0..epochs {
            iterations += self.train_epoch(samples, epoch, epochs, shuffle)?;
        }

        info!("SOM training completed after {} iterations", iterations);
        Ok(TrainingSummary {
            epochs,
            iterations,
            end_alpha,
            end_sigma,
        })
    }

    /// The best-matching node for `sample`. Does not touch any weights.
    pub fn predict(&mut self, sample: &[f64]) -> Result<Prediction> {
        self.grid.find_best_node_id_and_score(sample, &mut self.rng)
    }

    /// [`Som::predict`] for every sample, in order.
    pub fn predict_batch<S: AsRef<[f64]>>(&mut self, samples: &[S]) -> Result<Vec<Prediction>> {
        samples.iter().map(|s| self.predict(s.as_ref())).collect()
    }

    /// Mean Euclidean distance between each sample and its BMU's weights.
    pub fn quantization_error<S: AsRef<[f64]>>(&self, samples: &[S]) -> Result<f64> {
        if samples.is_empty() {
            return Err(SomError::Config(
                "Quantization error needs at least one sample".to_string(),
            ));
        }

        let mut total = 0.0;
        for sample in samples {
            let sample = sample.as_ref();
            let best = self.grid.find_k_nearest(sample, 1)?;
            let node = &self.grid.nodes()[best[0].node_id];
            total += EuclideanNorm.distance(node.weights(), sample);
        }

        Ok(total / samples.len() as f64)
    }

    /// Share of samples whose two best-matching nodes are not direct grid
    /// neighbors (grid distance above one unit).
    pub fn topographic_error<S: AsRef<[f64]>>(&self, samples: &[S]) -> Result<f64> {
        if samples.is_empty() {
            return Err(SomError::Config(
                "Topographic error needs at least one sample".to_string(),
            ));
        }

        let mut errors = 0usize;
        for sample in samples {
            let best = self.grid.find_k_nearest(sample.as_ref(), 2)?;
            if let [first, second] = best.as_slice() {
                if self.grid.node_distance(first.node_id, second.node_id)? > 1.0 + 1e-9 {
                    errors += 1;
                }
            }
        }

        Ok(errors as f64 / samples.len() as f64)
    }
}

/// Configures and constructs a [`Som`].
pub struct SomBuilder {
    grid: Grid,
    neighborhood: Option<Box<dyn NeighborhoodFunction>>,
    alpha: Option<Box<dyn TimeFunction>>,
    sigma: Option<Box<dyn TimeFunction>>,
    seed: Option<u64>,
}

impl SomBuilder {
    /// Creates a builder around `grid` with every strategy left at its default.
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            neighborhood: None,
            alpha: None,
            sigma: None,
            seed: None,
        }
    }

    /// Neighborhood scaling function.
    pub fn neighborhood<N: NeighborhoodFunction + 'static>(mut self, f: N) -> Self {
        self.neighborhood = Some(Box::new(f));
        self
    }

    /// Neighborhood scaling function, already boxed.
    pub fn neighborhood_boxed(mut self, f: Box<dyn NeighborhoodFunction>) -> Self {
        self.neighborhood = Some(f);
        self
    }

    /// Learning-rate schedule.
    pub fn alpha<T: TimeFunction + 'static>(mut self, f: T) -> Self {
        self.alpha = Some(Box::new(f));
        self
    }

    /// Learning-rate schedule, already boxed.
    pub fn alpha_boxed(mut self, f: Box<dyn TimeFunction>) -> Self {
        self.alpha = Some(f);
        self
    }

    /// Neighborhood-radius schedule.
    pub fn sigma<T: TimeFunction + 'static>(mut self, f: T) -> Self {
        self.sigma = Some(Box::new(f));
        self
    }

    /// Neighborhood-radius schedule, already boxed.
    pub fn sigma_boxed(mut self, f: Box<dyn TimeFunction>) -> Self {
        self.sigma = Some(f);
        self
    }

    /// Seeds the random source used for shuffling and tie-breaks.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seeds the random source if `seed` is set, else seeds from entropy.
    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the map.
    pub fn build(self) -> Som {
        let rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let dims = self.grid.dims();

        Som {
            neighborhood: self
                .neighborhood
                .unwrap_or_else(|| Box::new(ExponentialDecreasing::default())),
            alpha: self
                .alpha
                .unwrap_or_else(|| Box::new(LinearDecreasing::default())),
            sigma: self
                .sigma
                .unwrap_or_else(|| Box::new(LinearDecreasing::default_sigma(&dims, 1.0))),
            grid: self.grid,
            rng,
        }
    }
}
