//! Filtering features by a per-feature characteristic (a mean intensity, a
//! variance, ...) using the thresholds of a mixture fitted to that
//! characteristic.
//!
//! The candidate thresholds are tried from the most to the least restrictive,
//! and the first one that keeps enough features wins.
use log::debug;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mixture::MixtureError;
use crate::threshold::fetch_thresholds;

/// All the ways choosing a feature threshold can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdSelectionError {
    #[error("Cannot take the logarithm of the negative characteristic {value} at {index}")]
    NegativeCharacteristic { index: usize, value: f64 },
    #[error(transparent)]
    Mixture(#[from] MixtureError),
}

/// The outcome of [`ThresholdSelector::select`]
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdSelection {
    /// The chosen threshold on the transformed characteristics, `-inf` when
    /// everything is kept
    pub threshold: f64,
    /// [`ThresholdSelection::threshold`] mapped back onto the original
    /// characteristic scale
    pub raw_threshold: f64,
    /// Whether each feature was kept
    pub selected: Vec<bool>,
    /// Every threshold the mixture produced, before truncation
    pub candidates: Vec<f64>,
}

impl ThresholdSelection {
    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    /// The indices of the kept features
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(i, s)| if *s { Some(i) } else { None })
            .collect()
    }
}

/// Chooses which features to keep from a characteristic of each feature
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdSelector {
    /// Work on the natural logarithm of the characteristic
    pub use_log: bool,
    /// How many candidate thresholds to consider. `None` considers all of them,
    /// a non-negative value keeps at most that many from the low end and a
    /// negative value drops that many from the high end.
    pub n_candidates: Option<isize>,
    /// The fewest features a threshold may keep
    pub min_features: usize,
    /// The fewest features a threshold may keep, as a fraction of all features
    pub min_features_rate: f64,
    /// Keep the features with high characteristics rather than low ones
    pub preserve_high: bool,
    /// The largest mixture to fit
    pub max_components: usize,
}

impl Default for ThresholdSelector {
    fn default() -> Self {
        Self {
            use_log: false,
            n_candidates: None,
            min_features: 1,
            min_features_rate: 0.0,
            preserve_high: true,
            max_components: 10,
        }
    }
}

impl ThresholdSelector {
    pub fn use_log(mut self, use_log: bool) -> Self {
        self.use_log = use_log;
        self
    }

    pub fn n_candidates(mut self, n_candidates: Option<isize>) -> Self {
        self.n_candidates = n_candidates;
        self
    }

    pub fn min_features(mut self, min_features: usize) -> Self {
        self.min_features = min_features;
        self
    }

    pub fn min_features_rate(mut self, min_features_rate: f64) -> Self {
        self.min_features_rate = min_features_rate;
        self
    }

    pub fn preserve_high(mut self, preserve_high: bool) -> Self {
        self.preserve_high = preserve_high;
        self
    }

    pub fn max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    /// Map characteristics onto the scale thresholds are searched on
    pub fn transform(&self, characteristics: &[f64]) -> Result<Vec<f64>, ThresholdSelectionError> {
        let mut values = Vec::with_capacity(characteristics.len());
        for (index, value) in characteristics.iter().copied().enumerate() {
            let mut v = value;
            if self.use_log {
                if v < 0.0 {
                    return Err(ThresholdSelectionError::NegativeCharacteristic { index, value });
                }
                v = v.ln();
            }
            if !self.preserve_high {
                v = -v;
            }
            values.push(v);
        }
        Ok(values)
    }

    /// Map a threshold on the transformed scale back to the characteristic scale
    pub fn to_raw(&self, threshold: f64) -> f64 {
        let mut t = threshold;
        if !self.preserve_high {
            t = -t;
        }
        if self.use_log {
            t = t.exp();
        }
        t
    }

    fn truncate_candidates<'a>(&self, candidates: &'a [f64]) -> &'a [f64] {
        let n = candidates.len();
        let end = match self.n_candidates {
            None => n,
            Some(k) if k >= 0 => (k as usize).min(n),
            Some(k) => n.saturating_sub(k.unsigned_abs()),
        };
        &candidates[..end]
    }

    pub fn select(
        &self,
        characteristics: &[f64],
    ) -> Result<ThresholdSelection, ThresholdSelectionError> {
        let values = self.transform(characteristics)?;
        let candidates = fetch_thresholds(&values, self.max_components)?;
        let min_features =
            (self.min_features as f64).max(self.min_features_rate * values.len() as f64);

        let chosen = self
            .truncate_candidates(&candidates)
            .iter()
            .rev()
            .copied()
            .find(|t| {
                let kept = values.iter().filter(|v| **v >= *t).count();
                kept as f64 >= min_features
            });

        let (threshold, selected): (f64, Vec<bool>) = match chosen {
            Some(t) => (t, values.iter().map(|v| *v >= t).collect()),
            None => (f64::NEG_INFINITY, vec![true; values.len()]),
        };
        debug!(
            "Chose threshold {threshold} from candidates {candidates:?}, keeping {} of {} features",
            selected.iter().filter(|s| **s).count(),
            values.len()
        );
        Ok(ThresholdSelection {
            threshold,
            raw_threshold: self.to_raw(threshold),
            selected,
            candidates,
        })
    }
}
