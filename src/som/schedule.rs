//! Time-decay schedules for the learning rate (alpha) and neighborhood radius (sigma).
//!
//! A schedule is evaluated at the global iteration `t` out of `total`
//! iterations of a training run. Every built-in schedule treats `total == 0`
//! as a fixed schedule and returns its value at `t = 0`, so no division by
//! zero ever reaches the weights.

use crate::error::{Result, SomError};
use serde::{Deserialize, Serialize};

/// Smallest neighborhood radius the default sigma schedule decays to.
pub const DEFAULT_SIGMA_FLOOR: f64 = 0.5;

/// Maps `(t, total)` to a schedule value.
pub trait TimeFunction: Send + Sync {
    /// Evaluates the schedule at iteration `t` of `total`.
    fn at_time(&self, t: usize, total: usize) -> f64;
}

impl<F> TimeFunction for F
where
    F: Fn(usize, usize) -> f64 + Send + Sync,
{
    fn at_time(&self, t: usize, total: usize) -> f64 {
        self(t, total)
    }
}

#[inline]
fn progress(t: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        t as f64 / total as f64
    }
}

/// `max(factor * (1 - t / total), floor)`.
///
/// Reaches `floor` (0 by default) at `t == total`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearDecreasing {
    factor: f64,
    floor: f64,
}

impl LinearDecreasing {
    /// Linear decay from `factor` to 0.
    pub fn new(factor: f64) -> Self {
        Self { factor, floor: 0.0 }
    }

    /// Linear decay from `factor`, clamped from below at `floor`.
    pub fn with_floor(factor: f64, floor: f64) -> Self {
        Self { factor, floor }
    }

    /// The default sigma schedule for a grid with extents `dims`: linear decay
    /// from `factor * |dims|` (Euclidean norm of the extent vector), floored at
    /// [`DEFAULT_SIGMA_FLOOR`].
    pub fn default_sigma(dims: &[usize], factor: f64) -> Self {
        let norm = dims
            .iter()
            .map(|&d| (d * d) as f64)
            .sum::<f64>()
            .sqrt();
        Self::with_floor(factor * norm, DEFAULT_SIGMA_FLOOR)
    }

    /// The value at `t = 0`.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// The lower clamp.
    pub fn floor(&self) -> f64 {
        self.floor
    }
}

impl Default for LinearDecreasing {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TimeFunction for LinearDecreasing {
    #[inline]
    fn at_time(&self, t: usize, total: usize) -> f64 {
        (self.factor * (1.0 - progress(t, total))).max(self.floor)
    }
}

/// Geometric decay `initial * (final / initial)^(t / total)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialDecay {
    initial: f64,
    final_value: f64,
}

impl ExponentialDecay {
    /// Creates the schedule. Both endpoints must be strictly positive.
    pub fn new(initial: f64, final_value: f64) -> Result<Self> {
        if !(initial > 0.0) || !(final_value > 0.0) {
            return Err(SomError::Config(format!(
                "Exponential decay endpoints must be positive, got {} -> {}",
                initial, final_value
            )));
        }
        Ok(Self {
            initial,
            final_value,
        })
    }
}

impl TimeFunction for ExponentialDecay {
    #[inline]
    fn at_time(&self, t: usize, total: usize) -> f64 {
        self.initial * (self.final_value / self.initial).powf(progress(t, total))
    }
}

/// Serializable selection of the built-in schedules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// [`LinearDecreasing`] with an optional floor.
    Linear {
        /// Value at `t = 0`.
        factor: f64,
        /// Lower clamp.
        #[serde(default)]
        floor: f64,
    },
    /// [`ExponentialDecay`].
    Exponential {
        /// Value at `t = 0`.
        initial: f64,
        /// Value at `t = total`.
        final_value: f64,
    },
}

impl ScheduleKind {
    /// Instantiates the schedule.
    pub fn build(&self) -> Result<Box<dyn TimeFunction>> {
        Ok(match *self {
            ScheduleKind::Linear { factor, floor } => {
                Box::new(LinearDecreasing::with_floor(factor, floor))
            }
            ScheduleKind::Exponential {
                initial,
                final_value,
            } => Box::new(ExponentialDecay::new(initial, final_value)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_endpoints() {
        for total in [1usize, 2, 7, 100, 12_345] {
            let f = LinearDecreasing::new(0.8);
            assert!((f.at_time(0, total) - 0.8).abs() < 1e-12);
            assert!(f.at_time(total, total).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linear_monotonic() {
        let f = LinearDecreasing::new(1.0);
        let total = 250;
        let mut prev = f64::INFINITY;
        for t in 0..=total {
            let v = f.at_time(t, total);
            assert!(v < prev);
            prev = v;
        }
    }

    #[test]
    fn test_linear_zero_total_is_fixed() {
        let f = LinearDecreasing::new(0.6);
        assert_eq!(f.at_time(0, 0), 0.6);
        assert_eq!(f.at_time(3, 0), 0.6);
        assert!(f.at_time(0, 0).is_finite());
    }

    #[test]
    fn test_linear_floor() {
        let f = LinearDecreasing::with_floor(4.0, 0.5);
        assert_eq!(f.at_time(100, 100), 0.5);
        assert!((f.at_time(50, 100) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_sigma_scaled_by_dims() {
        let f = LinearDecreasing::default_sigma(&[3, 4], 1.0);
        assert!((f.at_time(0, 10) - 5.0).abs() < 1e-12);
        assert_eq!(f.at_time(10, 10), DEFAULT_SIGMA_FLOOR);

        let half = LinearDecreasing::default_sigma(&[3, 4], 0.5);
        assert!((half.factor() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_decay() {
        let f = ExponentialDecay::new(0.1, 0.01).unwrap();
        assert!((f.at_time(0, 100) - 0.1).abs() < 1e-12);
        assert!((f.at_time(100, 100) - 0.01).abs() < 1e-12);
        assert!(f.at_time(50, 100) < 0.1);
        assert!((f.at_time(5, 0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_decay_rejects_non_positive() {
        assert!(ExponentialDecay::new(0.0, 0.1).is_err());
        assert!(ExponentialDecay::new(0.1, -1.0).is_err());
    }

    #[test]
    fn test_kind_build() {
        let f = ScheduleKind::Linear {
            factor: 2.0,
            floor: 0.0,
        }
        .build()
        .unwrap();
        assert!((f.at_time(1, 2) - 1.0).abs() < 1e-12);
    }
}
