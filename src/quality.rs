//! Scoring contiguous runs of ordered, weighted points by how compact they are.
use crate::numeric::{nan_max, nan_min};

/// Something that can rate a contiguous run of ordered points. Lower scores are
/// better, and `f64::INFINITY` marks a run that cannot be scored.
pub trait SegmentQuality {
    /// Score `values` with parallel `weights`. `values` are assumed to be sorted
    /// ascending and of the same length as `weights`.
    fn quality(&self, values: &[f64], weights: &[f64]) -> f64;
}

/// The compactness index: one plus the weighted standard deviation, divided by
/// the span of the run.
///
/// Runs narrower than [`CompactnessQuality::min_width`] or carrying no more than
/// [`CompactnessQuality::min_weight`] total weight are degenerate and score
/// `f64::INFINITY`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompactnessQuality {
    /// The span (last minus first value) at or below which a run is degenerate
    pub min_width: f64,
    /// The total weight at or below which a run is degenerate
    pub min_weight: f64,
}

impl Default for CompactnessQuality {
    fn default() -> Self {
        Self {
            min_width: 0.1,
            min_weight: 1e-3,
        }
    }
}

impl CompactnessQuality {
    pub fn min_width(mut self, min_width: f64) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = min_weight;
        self
    }
}

impl SegmentQuality for CompactnessQuality {
    fn quality(&self, values: &[f64], weights: &[f64]) -> f64 {
        let (first, last) = match (values.first(), values.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return f64::INFINITY,
        };
        if last - first <= self.min_width {
            return f64::INFINITY;
        }
        let total: f64 = weights.iter().sum();
        if total <= self.min_weight {
            return f64::INFINITY;
        }

        let mean: f64 = values
            .iter()
            .zip(weights.iter())
            .map(|(v, w)| v * (w / total))
            .sum();
        let variance: f64 = values
            .iter()
            .zip(weights.iter())
            .map(|(v, w)| {
                let d = v - mean;
                d * d * (w / total)
            })
            .sum();

        (variance.sqrt() + 1.0) / (nan_max(values) - nan_min(values))
    }
}

/// Score a run with the default [`CompactnessQuality`]
pub fn quality_index(values: &[f64], weights: &[f64]) -> f64 {
    CompactnessQuality::default().quality(values, weights)
}
