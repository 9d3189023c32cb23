//! Neighborhood scaling functions.
//!
//! A neighborhood function turns the grid distance between a node and the BMU
//! into the fraction of the way the node's weights move toward the sample. The
//! learning rate `alpha` is folded in here, so the update step applies the
//! returned factor directly and never multiplies by alpha a second time.

use crate::error::{Result, SomError};
use serde::{Deserialize, Serialize};

/// Default exponent factor of [`ExponentialDecreasing`].
pub const DEFAULT_NEIGHBORHOOD_FACTOR: f64 = -0.5;

/// Maps `(distance, sigma, alpha)` to a non-negative update factor that
/// decreases as the distance grows.
pub trait NeighborhoodFunction: Send + Sync {
    /// Computes the update factor for a node at grid `distance` from the BMU.
    fn scale(&self, distance: f64, sigma: f64, alpha: f64) -> f64;
}

impl<F> NeighborhoodFunction for F
where
    F: Fn(f64, f64, f64) -> f64 + Send + Sync,
{
    fn scale(&self, distance: f64, sigma: f64, alpha: f64) -> f64 {
        self(distance, sigma, alpha)
    }
}

/// Gaussian-shaped neighborhood: `max(alpha * exp(factor * d^2 / sigma^2), 0)`.
///
/// Equals `alpha` at distance 0. A radius of `sigma <= 0` collapses the
/// neighborhood onto the BMU: `alpha` at distance 0 and 0 everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialDecreasing {
    factor: f64,
}

impl ExponentialDecreasing {
    /// Creates the function with a custom exponent factor, which must be negative.
    pub fn new(factor: f64) -> Result<Self> {
        if !(factor < 0.0) || !factor.is_finite() {
            return Err(SomError::Config(format!(
                "Neighborhood factor must be negative and finite, got {}",
                factor
            )));
        }
        Ok(Self { factor })
    }

    /// The exponent factor.
    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl Default for ExponentialDecreasing {
    fn default() -> Self {
        Self {
            factor: DEFAULT_NEIGHBORHOOD_FACTOR,
        }
    }
}

impl NeighborhoodFunction for ExponentialDecreasing {
    #[inline]
    fn scale(&self, distance: f64, sigma: f64, alpha: f64) -> f64 {
        if sigma <= 0.0 {
            return if distance == 0.0 { alpha.max(0.0) } else { 0.0 };
        }
        (alpha * (self.factor * distance * distance / (sigma * sigma)).exp()).max(0.0)
    }
}

/// Step neighborhood: `alpha` for every node within `sigma` of the BMU, 0 outside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bubble;

impl NeighborhoodFunction for Bubble {
    #[inline]
    fn scale(&self, distance: f64, sigma: f64, alpha: f64) -> f64 {
        if distance <= sigma.max(0.0) {
            alpha.max(0.0)
        } else {
            0.0
        }
    }
}

/// Serializable selection of the built-in neighborhood functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodKind {
    /// [`ExponentialDecreasing`] with the given factor.
    Exponential {
        /// Negative exponent factor.
        factor: f64,
    },
    /// [`Bubble`].
    Bubble,
}

impl Default for NeighborhoodKind {
    fn default() -> Self {
        NeighborhoodKind::Exponential {
            factor: DEFAULT_NEIGHBORHOOD_FACTOR,
        }
    }
}

impl NeighborhoodKind {
    /// Instantiates the neighborhood function.
    pub fn build(&self) -> Result<Box<dyn NeighborhoodFunction>> {
        Ok(match *self {
            NeighborhoodKind::Exponential { factor } => {
                Box::new(ExponentialDecreasing::new(factor)?)
            }
            NeighborhoodKind::Bubble => Box::new(Bubble),
        })
    }
}
