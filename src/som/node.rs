//! Node representation for the Self-Organizing Map.

use crate::error::{Result, SomError};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// How a node's weight vector is filled at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    /// Uniform in `[lower, upper)`; `lower == upper` fills the constant.
    Uniform {
        /// Inclusive lower bound.
        lower: f64,
        /// Exclusive upper bound.
        upper: f64,
    },
    /// Uniform with independent bounds per weight index, e.g. one range per
    /// colour channel.
    PerIndex {
        /// Lower bound of every weight index.
        lower: Vec<f64>,
        /// Upper bound of every weight index.
        upper: Vec<f64>,
    },
    /// Normally distributed around `mean`.
    Normal {
        /// Mean of the distribution.
        mean: f64,
        /// Standard deviation, strictly positive.
        std_dev: f64,
    },
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Uniform {
            lower: 0.0,
            upper: 1.0,
        }
    }
}

#[inline]
fn uniform<R: Rng + ?Sized>(lower: f64, upper: f64, rng: &mut R) -> f64 {
    if lower == upper {
        lower
    } else {
        rng.gen_range(lower..upper)
    }
}

fn check_range(lower: f64, upper: f64) -> Result<()> {
    if !lower.is_finite() || !upper.is_finite() || lower > upper {
        return Err(SomError::Config(format!(
            "Invalid weight range [{}, {})",
            lower, upper
        )));
    }
    Ok(())
}

impl WeightInit {
    /// Checks the rule against a feature depth without drawing any values.
    pub fn validate(&self, depth: usize) -> Result<()> {
        match self {
            WeightInit::Uniform { lower, upper } => check_range(*lower, *upper),
            WeightInit::PerIndex { lower, upper } => {
                SomError::check_dim(depth, lower.len())?;
                SomError::check_dim(depth, upper.len())?;
                lower
                    .iter()
                    .zip(upper)
                    .try_for_each(|(&lo, &hi)| check_range(lo, hi))
            }
            WeightInit::Normal { mean, std_dev } => {
                if !mean.is_finite() || !(*std_dev > 0.0) || !std_dev.is_finite() {
                    return Err(SomError::Config(format!(
                        "Invalid normal distribution N({}, {})",
                        mean, std_dev
                    )));
                }
                Ok(())
            }
        }
    }

    /// Draws a weight vector of length `depth`.
    pub fn sample<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> Result<Vec<f64>> {
        self.validate(depth)?;

        Ok(match self {
            WeightInit::Uniform { lower, upper } => {
                (0..depth).map(|_| uniform(*lower, *upper, rng)).collect()
            }
            WeightInit::PerIndex { lower, upper } => lower
                .iter()
                .zip(upper)
                .map(|(&lo, &hi)| uniform(lo, hi, rng))
                .collect(),
            WeightInit::Normal { mean, std_dev } => {
                let normal = Normal::new(*mean, *std_dev)
                    .map_err(|e| SomError::Config(e.to_string()))?;
                (0..depth).map(|_| normal.sample(rng)).collect()
            }
        })
    }
}

/// A node on the grid.
///
/// The coordinate vector is fixed once the node is built; the weight vector
/// keeps its length and is moved toward samples during training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    coords: Vec<f64>,
    weights: Vec<f64>,
}

impl Node {
    /// Starts building a node.
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// The node's position in grid space.
    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// The node's weight vector in feature space.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The feature depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.weights.len()
    }

    /// Replaces the weights with a vector of the same length.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        SomError::check_dim(self.weights.len(), weights.len())?;
        self.weights = weights;
        Ok(())
    }

    /// Redraws the weights from `init`, keeping the current depth.
    pub fn reinit_weights<R: Rng + ?Sized>(&mut self, init: &WeightInit, rng: &mut R) -> Result<()> {
        self.weights = init.sample(self.weights.len(), rng)?;
        Ok(())
    }

    /// Redraws the weights with a new depth. Only the grid may change the
    /// depth, and only for every node at once.
    pub(crate) fn redraw_weights<R: Rng + ?Sized>(
        &mut self,
        init: &WeightInit,
        depth: usize,
        rng: &mut R,
    ) -> Result<()> {
        self.weights = init.sample(depth, rng)?;
        Ok(())
    }

    /// Moves every weight a fraction `delta` of the way toward `sample`:
    /// `w += (s - w) * delta`.
    #[inline]
    pub fn update_towards(&mut self, sample: &[f64], delta: f64) {
        debug_assert_eq!(
            self.weights.len(),
            sample.len(),
            "Weight and sample dimensions must match"
        );

        for (w, s) in self.weights.iter_mut().zip(sample) {
            *w += (s - *w) * delta;
        }
    }
}

/// Two-phase construction of a [`Node`]: both coordinates and weights must be
/// supplied before [`NodeBuilder::build`] succeeds.
#[derive(Debug, Clone, Default)]
pub struct NodeBuilder {
    coords: Option<Vec<f64>>,
    weights: Option<Vec<f64>>,
}

impl NodeBuilder {
    /// Sets the coordinate vector.
    pub fn coords(mut self, coords: Vec<f64>) -> Self {
        self.coords = Some(coords);
        self
    }

    /// Sets an explicit weight vector.
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Draws the weight vector from `init`.
    pub fn init_weights<R: Rng + ?Sized>(
        mut self,
        init: &WeightInit,
        depth: usize,
        rng: &mut R,
    ) -> Result<Self> {
        self.weights = Some(init.sample(depth, rng)?);
        Ok(self)
    }

    /// Finishes the node.
    pub fn build(self) -> Result<Node> {
        let coords = self
            .coords
            .ok_or_else(|| SomError::UninitializedState("node coordinates not set".to_string()))?;
        let weights = self
            .weights
            .ok_or_else(|| SomError::UninitializedState("node weights not set".to_string()))?;

        Ok(Node { coords, weights })
    }
}
