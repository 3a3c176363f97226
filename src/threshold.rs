//! Locating the thresholds separating the peaks of a fitted mixture.
//!
//! A threshold is the point between two component means where the upper
//! envelope of their weighted densities bottoms out, provided each component
//! dominates the pair at its own mean and the crossing is not buried under a
//! third component's density.
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::minimize::{BoundedMinimizer, MinimizerConfig};
use crate::mixture::{upper_envelope, MixtureComponent, MixtureError};
use crate::model_selection::{ModelSelector, SelectionConfig};
use crate::numeric::{nan_last_cmp, values_agree};

/// Configure [`fetch_thresholds_with`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdConfig {
    pub selection: SelectionConfig,
    pub minimizer: MinimizerConfig,
    /// The largest difference at which two densities are considered equal.
    /// Zero requires exact equality.
    pub tolerance: f64,
}

impl ThresholdConfig {
    pub fn new(max_components: usize) -> Self {
        Self {
            selection: SelectionConfig::new(max_components),
            ..Default::default()
        }
    }

    pub fn selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    pub fn minimizer(mut self, minimizer: MinimizerConfig) -> Self {
        self.minimizer = minimizer;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            minimizer: MinimizerConfig::default(),
            tolerance: 0.0,
        }
    }
}

/// Finds the crossings between the components of a mixture
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdFinder {
    pub minimizer: BoundedMinimizer,
    pub tolerance: f64,
}

impl ThresholdFinder {
    pub fn new(minimizer: BoundedMinimizer, tolerance: f64) -> Self {
        Self {
            minimizer,
            tolerance,
        }
    }

    /// Whether `component` has the largest density of `pair` at its own mean
    fn dominates_own_mean(
        &self,
        pair: &[MixtureComponent; 2],
        component: &MixtureComponent,
    ) -> bool {
        let x = component.mean;
        values_agree(upper_envelope(pair, x), component.density(x), self.tolerance)
    }

    /// The crossing between `left` and `right`, if it lies on the upper envelope
    /// of all of `components`
    pub fn crossing(
        &self,
        components: &[MixtureComponent],
        left: &MixtureComponent,
        right: &MixtureComponent,
    ) -> Option<f64> {
        let pair = [*left, *right];
        if !(self.dominates_own_mean(&pair, left) && self.dominates_own_mean(&pair, right)) {
            debug!("Components at {} and {} overlap", left.mean, right.mean);
            return None;
        }
        let lo = left.mean.min(right.mean);
        let hi = left.mean.max(right.mean);
        let result = self.minimizer.minimize(|x| upper_envelope(&pair, x), lo, hi);
        let x = result.x;
        if values_agree(upper_envelope(components, x), upper_envelope(&pair, x), self.tolerance) {
            debug!("Accepted crossing at {x} between {} and {}", left.mean, right.mean);
            Some(x)
        } else {
            debug!("Crossing at {x} between {} and {} is hidden", left.mean, right.mean);
            None
        }
    }

    /// All valid crossings between pairs of `components`, in ascending order
    pub fn find_thresholds(&self, components: &[MixtureComponent]) -> Vec<f64> {
        let mut thresholds = Vec::new();
        for (j, left) in components.iter().enumerate() {
            for right in components.iter().skip(j + 1) {
                if let Some(x) = self.crossing(components, left, right) {
                    thresholds.push(x);
                }
            }
        }
        thresholds.sort_by(nan_last_cmp);
        thresholds
    }
}

/// Fit mixtures of up to `max_components` components to `values` and return
/// the thresholds of the one with the best BIC, in ascending order.
///
/// An empty result means the best model has a single component or that no
/// usable model was found.
pub fn fetch_thresholds(values: &[f64], max_components: usize) -> Result<Vec<f64>, MixtureError> {
    fetch_thresholds_with(values, &ThresholdConfig::new(max_components))
}

/// Like [`fetch_thresholds`], with full control over each stage
pub fn fetch_thresholds_with(
    values: &[f64],
    config: &ThresholdConfig,
) -> Result<Vec<f64>, MixtureError> {
    if config.selection.max_components == 0 {
        return Err(MixtureError::NoComponents);
    }
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let selection = ModelSelector::new(config.selection.clone()).select(values)?;
    let thresholds = match selection.best() {
        Some(best) if best.len() > 1 => {
            ThresholdFinder::new(BoundedMinimizer::new(config.minimizer), config.tolerance)
                .find_thresholds(&best.components)
        }
        _ => Vec::new(),
    };
    debug!("Found thresholds {thresholds:?}");
    Ok(thresholds)
}
