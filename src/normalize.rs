//! Linear rescaling of feature values, e.g. from `[0, 255]` to `[0, 1]`.

use crate::error::{Result, SomError};
use log::warn;
use serde::{Deserialize, Serialize};

/// Maps values from a data range onto a target range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataNormalizer {
    data_min: f64,
    data_max: f64,
    norm_min: f64,
    norm_max: f64,
}

impl DataNormalizer {
    /// Creates a normalizer from `[data_min, data_max]` onto `[norm_min, norm_max]`.
    pub fn new(data_min: f64, data_max: f64, norm_min: f64, norm_max: f64) -> Self {
        Self {
            data_min,
            data_max,
            norm_min,
            norm_max,
        }
    }

    /// Creates a normalizer onto `[0, 1]`.
    pub fn unit(data_min: f64, data_max: f64) -> Self {
        Self::new(data_min, data_max, 0.0, 1.0)
    }

    /// Derives the data range from the observed `values`.
    pub fn from_data(values: &[f64], norm_min: f64, norm_max: f64) -> Result<Self> {
        if values.is_empty() {
            return Err(SomError::Config(
                "Cannot derive a data range from no values".to_string(),
            ));
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min == max {
            warn!("Data range is empty ({}); every value maps to {}", min, norm_min);
        }

        Ok(Self::new(min, max, norm_min, norm_max))
    }

    /// Derives the data range from column `feature` of `samples`.
    pub fn from_feature(
        samples: &[Vec<f64>],
        feature: usize,
        norm_min: f64,
        norm_max: f64,
    ) -> Result<Self> {
        let values = samples
            .iter()
            .map(|s| {
                s.get(feature).copied().ok_or(SomError::IndexOutOfRange {
                    index: feature,
                    max: s.len(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::from_data(&values, norm_min, norm_max)
    }

    /// Rescales one value. A zero-width data range maps everything to `norm_min`.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        let data_range = self.data_max - self.data_min;
        if data_range == 0.0 {
            return self.norm_min;
        }
        (value - self.data_min) / data_range * (self.norm_max - self.norm_min) + self.norm_min
    }

    /// Rescales column `feature` of every sample in place.
    pub fn normalize_feature(&self, samples: &mut [Vec<f64>], feature: usize) -> Result<()> {
        for sample in samples.iter_mut() {
            let len = sample.len();
            let v = sample.get_mut(feature).ok_or(SomError::IndexOutOfRange {
                index: feature,
                max: len,
            })?;
            *v = self.normalize(*v);
        }
        Ok(())
    }
}

/// Rescales every feature column of `samples` onto `[0, 1]` independently.
/// Ragged input is rejected before any value changes.
pub fn normalize_columns(samples: &mut [Vec<f64>]) -> Result<Vec<DataNormalizer>> {
    let depth = match samples.first() {
        Some(s) => s.len(),
        None => return Ok(Vec::new()),
    };
    samples
        .iter()
        .try_for_each(|s| SomError::check_dim(depth, s.len()))?;

    let mut normalizers = Vec::with_capacity(depth);
    for feature in 0..depth {
        let n = DataNormalizer::from_feature(samples, feature, 0.0, 1.0)?;
        n.normalize_feature(samples, feature)?;
        normalizers.push(n);
    }
    Ok(normalizers)
}
