//! Distance functions between two equal-length vectors.
//!
//! The grid uses one distance function in feature space (node weights vs. sample,
//! for the BMU search) and another in grid space (node coordinates vs. the BMU's
//! coordinates, fed into the neighborhood function). Both are plain values that
//! implement [`DistanceFunction`]; closures work too.
//!
//! Arguments are not assumed to commute: [`ScalarProduct`] is not a metric and
//! [`ToroidalEuclidean`] may wrap only some axes. Callers always pass
//! `(node_vector, other)` in that order.

use crate::error::{Result, SomError};
use serde::{Deserialize, Serialize};

/// A pure function computing a scalar from two vectors of the same length.
pub trait DistanceFunction: Send + Sync {
    /// Evaluates the distance between `first` and `second`.
    fn distance(&self, first: &[f64], second: &[f64]) -> f64;
}

impl<F> DistanceFunction for F
where
    F: Fn(&[f64], &[f64]) -> f64 + Send + Sync,
{
    fn distance(&self, first: &[f64], second: &[f64]) -> f64 {
        self(first, second)
    }
}

/// Sum of squared differences, unrolled so the main loop autovectorizes.
#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    let chunks = a.len() / 4;
    let remainder = a.len() % 4;

    let mut sum = 0.0f64;

    for i in 0..chunks {
        let base = i * 4;
        let d0 = a[base] - b[base];
        let d1 = a[base + 1] - b[base + 1];
        let d2 = a[base + 2] - b[base + 2];
        let d3 = a[base + 3] - b[base + 3];

        sum += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
    }

    let base = chunks * 4;
    for i in 0..remainder {
        let d = a[base + i] - b[base + i];
        sum += d * d;
    }

    sum
}

/// Euclidean norm of the difference: `sqrt(sum((a - b)^2))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanNorm;

impl DistanceFunction for EuclideanNorm {
    #[inline]
    fn distance(&self, first: &[f64], second: &[f64]) -> f64 {
        squared_distance(first, second).sqrt()
    }
}

/// Sum of squared differences. Orders nodes the same way as [`EuclideanNorm`]
/// without the square root, which is why the BMU search defaults to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredDistance;

impl DistanceFunction for SquaredDistance {
    #[inline]
    fn distance(&self, first: &[f64], second: &[f64]) -> f64 {
        squared_distance(first, second)
    }
}

/// Smallest absolute per-index difference.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinNorm;

impl DistanceFunction for MinNorm {
    fn distance(&self, first: &[f64], second: &[f64]) -> f64 {
        first
            .iter()
            .zip(second)
            .map(|(a, b)| (a - b).abs())
            .fold(f64::INFINITY, f64::min)
    }
}

/// Largest absolute per-index difference (Chebyshev distance).
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxNorm;

impl DistanceFunction for MaxNorm {
    fn distance(&self, first: &[f64], second: &[f64]) -> f64 {
        first
            .iter()
            .zip(second)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// Dot product. Larger means more similar, so it is not a true distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarProduct;

impl DistanceFunction for ScalarProduct {
    fn distance(&self, first: &[f64], second: &[f64]) -> f64 {
        first.iter().zip(second).map(|(a, b)| a * b).sum()
    }
}

/// Euclidean distance on a grid whose edges wrap around on selected axes.
///
/// For a wrapped axis spanning `extent` in coordinate space, the per-axis
/// difference is `min(|d|, extent - |d|)`; other axes use the plain difference.
/// Points of any other dimensionality than the extents have no distance and
/// yield NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToroidalEuclidean {
    extents: Vec<f64>,
    wrap: Vec<bool>,
}

impl ToroidalEuclidean {
    /// Creates a toroidal distance over `extents`, wrapping the axes flagged in `wrap`.
    pub fn new(extents: Vec<f64>, wrap: Vec<bool>) -> Result<Self> {
        if extents.len() != wrap.len() {
            return Err(SomError::Config(format!(
                "Toroidal distance has {} dimensions but {} wrap flags",
                extents.len(),
                wrap.len()
            )));
        }
        if extents.iter().any(|&e| !(e > 0.0) || !e.is_finite()) {
            return Err(SomError::Config(format!(
                "Toroidal distance extents must be positive, got {:?}",
                extents
            )));
        }
        Ok(Self { extents, wrap })
    }

    /// Wraps every axis of `extents`.
    pub fn wrap_all(extents: Vec<f64>) -> Result<Self> {
        let wrap = vec![true; extents.len()];
        Self::new(extents, wrap)
    }

    /// The per-axis extents.
    pub fn extents(&self) -> &[f64] {
        &self.extents
    }
}

impl DistanceFunction for ToroidalEuclidean {
    fn distance(&self, first: &[f64], second: &[f64]) -> f64 {
        let n = self.extents.len();
        if first.len() != n || second.len() != n {
            return f64::NAN;
        }

        let mut sum = 0.0;
        for i in 0..n {
            let diff = (first[i] - second[i]).abs();
            let d = if self.wrap[i] {
                diff.min(self.extents[i] - diff)
            } else {
                diff
            };
            sum += d * d;
        }

        sum.sqrt()
    }
}

/// Serializable selection of the built-in distance functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    /// [`EuclideanNorm`].
    #[default]
    Euclidean,
    /// [`SquaredDistance`].
    Squared,
    /// [`MinNorm`].
    MinNorm,
    /// [`MaxNorm`].
    MaxNorm,
    /// [`ScalarProduct`].
    ScalarProduct,
    /// [`ToroidalEuclidean`] wrapping the flagged axes of the grid.
    Toroidal {
        /// Which grid axes wrap around.
        wrap: Vec<bool>,
    },
}

impl DistanceKind {
    /// Instantiates the distance function. `extents` are the coordinate-space
    /// extents of the grid (see [`crate::som::Topology::extents`]), only used
    /// by the toroidal variant.
    pub fn build(&self, extents: &[f64]) -> Result<Box<dyn DistanceFunction>> {
        Ok(match self {
            DistanceKind::Euclidean => Box::new(EuclideanNorm),
            DistanceKind::Squared => Box::new(SquaredDistance),
            DistanceKind::MinNorm => Box::new(MinNorm),
            DistanceKind::MaxNorm => Box::new(MaxNorm),
            DistanceKind::ScalarProduct => Box::new(ScalarProduct),
            DistanceKind::Toroidal { wrap } => {
                Box::new(ToroidalEuclidean::new(extents.to_vec(), wrap.clone())?)
            }
        })
    }
}
