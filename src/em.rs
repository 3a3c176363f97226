//! Expectation-Maximization refinement of a one dimensional Gaussian mixture.
//!
//! Each iteration floors the component weights, computes the weighted density
//! of every sample point under every component, normalizes these into
//! posterior responsibilities and re-estimates the weights, means and
//! variances from them. Iteration stops when the summed change in weights plus
//! the mean change in variances drops to the convergence threshold, or when the
//! iteration budget is spent. Running out of iterations is not an error.
use log::trace;
use nalgebra::DMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mixture::MixtureComponent;
use crate::numeric::{nan_last_cmp, normal_pdf};

/// Hyperparameters for fitting a mixture with [`EMEstimator`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EMConfig {
    /// The maximum number of iterations to run
    pub max_iter: usize,
    /// The change in parameters at or below which the fit has converged
    pub convergence: f64,
    /// The smallest weight a component may enter an iteration with
    pub min_weight: f64,
    /// The smallest variance a component may have
    pub min_variance: f64,
}

impl EMConfig {
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn convergence(mut self, convergence: f64) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn min_weight(mut self, min_weight: f64) -> Self {
        self.min_weight = min_weight;
        self
    }

    pub fn min_variance(mut self, min_variance: f64) -> Self {
        self.min_variance = min_variance;
        self
    }
}

impl Default for EMConfig {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            convergence: 1.5e-4,
            min_weight: 0.001,
            min_variance: 0.01,
        }
    }
}

/// Describe the output of [`EMEstimator::fit`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EMFitResult {
    /// The fitted components, sorted by mean
    pub components: Vec<MixtureComponent>,
    /// The log-likelihood of the sample under the parameters the last
    /// iteration started from
    pub log_likelihood: f64,
    /// The number of iterations run
    pub iterations: usize,
    /// Whether the fit converged before the iteration budget ran out
    pub converged: bool,
}

/// A Gaussian mixture EM fitter
#[derive(Debug, Clone, Default)]
pub struct EMEstimator {
    pub config: EMConfig,
}

#[derive(Debug)]
struct ExpectationStep {
    /// Component by sample weighted densities, normalized in place
    responsibilities: DMatrix<f64>,
    /// The unnormalized density of each sample point
    totals: Vec<f64>,
}

impl EMEstimator {
    pub fn new(config: EMConfig) -> Self {
        Self { config }
    }

    fn expectation(
        &self,
        sample: &[f64],
        weights: &[f64],
        means: &[f64],
        variances: &[f64],
    ) -> ExpectationStep {
        let k = weights.len();
        let n = sample.len();
        let sigmas: Vec<f64> = variances.iter().map(|v| v.sqrt()).collect();
        let mut responsibilities = DMatrix::from_fn(k, n, |i, j| {
            weights[i] * normal_pdf(sample[j], means[i], sigmas[i])
        });
        let mut totals = Vec::with_capacity(n);
        for mut col in responsibilities.column_iter_mut() {
            let total: f64 = col.iter().sum();
            totals.push(total);
            col.iter_mut().for_each(|r| *r /= total);
        }
        ExpectationStep {
            responsibilities,
            totals,
        }
    }

    /// Refine `initial` against `sample`.
    ///
    /// Initial standard deviations are converted to variances and floored at
    /// [`EMConfig::min_variance`] before the first iteration.
    pub fn fit(&self, sample: &[f64], initial: &[MixtureComponent]) -> EMFitResult {
        let k = initial.len();
        let n = sample.len();
        if k == 0 {
            return EMFitResult::default();
        }
        let mut weights: Vec<f64> = initial.iter().map(|c| c.weight).collect();
        let mut means: Vec<f64> = initial.iter().map(|c| c.mean).collect();
        let mut variances: Vec<f64> = initial
            .iter()
            .map(|c| (c.std * c.std).max(self.config.min_variance))
            .collect();

        let mut change = 1.0;
        let mut iterations = 0;
        let mut totals: Option<Vec<f64>> = None;

        while change > self.config.convergence && iterations < self.config.max_iter {
            iterations += 1;
            let previous_weights = weights.clone();
            let previous_variances = variances.clone();
            weights
                .iter_mut()
                .for_each(|w| *w = w.max(self.config.min_weight));

            let step = self.expectation(sample, &weights, &means, &variances);
            let resp = &step.responsibilities;

            for i in 0..k {
                let row = resp.row(i);
                let mass: f64 = row.iter().sum();
                weights[i] = mass / n as f64;
                let mean: f64 = row
                    .iter()
                    .zip(sample.iter())
                    .map(|(r, x)| r * x)
                    .sum::<f64>()
                    / mass;
                let spread: f64 = row
                    .iter()
                    .zip(sample.iter())
                    .map(|(r, x)| {
                        let d = x - mean;
                        r * d * d
                    })
                    .sum::<f64>()
                    / mass;
                means[i] = mean;
                variances[i] = spread.max(self.config.min_variance);
            }

            let weight_change: f64 = weights
                .iter()
                .zip(previous_weights.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            let variance_change: f64 = variances
                .iter()
                .zip(previous_variances.iter())
                .map(|(a, b)| (a - b).abs())
                .sum();
            change = weight_change + variance_change / k as f64;
            trace!(
                "Iteration {iterations}: change {change}, weights {weights:?}, \
                 means {means:?}, variances {variances:?}"
            );
            totals = Some(step.totals);
        }

        let totals = match totals {
            Some(totals) => totals,
            None => self.expectation(sample, &weights, &means, &variances).totals,
        };
        let log_likelihood: f64 = totals.iter().map(|t| t.ln()).sum();

        let mut components: Vec<MixtureComponent> = (0..k)
            .map(|i| MixtureComponent::new(weights[i], means[i], variances[i].sqrt()))
            .collect();
        components.sort_by(|a, b| nan_last_cmp(&a.mean, &b.mean));

        EMFitResult {
            components,
            log_likelihood,
            iterations,
            converged: change <= self.config.convergence,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::Normal;
    use rstest::{fixture, rstest};

    #[fixture]
    fn two_populations() -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let low = Normal::new(10.0, 1.0).unwrap();
        let high = Normal::new(30.0, 1.0).unwrap();
        let mut sample: Vec<f64> = (0..200).map(|_| low.sample(&mut rng)).collect();
        sample.extend((0..200).map(|_| high.sample(&mut rng)));
        sample
    }

    #[rstest]
    #[test_log::test]
    fn test_recovers_separated_means(two_populations: Vec<f64>) {
        let initial = [
            MixtureComponent::new(0.3, 30.0, 4.0),
            MixtureComponent::new(0.7, 12.0, 4.0),
        ];
        let fit = EMEstimator::default().fit(&two_populations, &initial);
        assert!(fit.converged);
        assert!(fit.log_likelihood.is_finite());

        // sorted by mean on the way out
        let means: Vec<f64> = fit.components.iter().map(|c| c.mean).collect();
        assert!((means[0] - 10.0).abs() / 10.0 < 0.05, "{means:?}");
        assert!((means[1] - 30.0).abs() / 30.0 < 0.05, "{means:?}");

        let total: f64 = fit.components.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-6);
        for c in fit.components.iter() {
            assert!((c.weight - 0.5).abs() < 0.05);
            assert!(c.std >= 0.1);
        }
    }

    #[rstest]
    fn test_iteration_budget(two_populations: Vec<f64>) {
        let initial = [
            MixtureComponent::new(0.5, 5.0, 1.0),
            MixtureComponent::new(0.5, 35.0, 1.0),
        ];
        let estimator = EMEstimator::new(EMConfig::default().max_iter(1));
        let fit = estimator.fit(&two_populations, &initial);
        assert_eq!(fit.iterations, 1);
        assert!(!fit.converged);

        let estimator = EMEstimator::new(EMConfig::default().max_iter(0));
        let fit = estimator.fit(&two_populations, &initial);
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.components, initial.to_vec());
        assert!(fit.log_likelihood.is_finite());
    }

    #[test]
    fn test_variance_floor() {
        let sample = [0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let initial = [
            MixtureComponent::new(0.5, 2.5, 0.0),
            MixtureComponent::new(0.5, 7.5, 0.0),
        ];
        let fit = EMEstimator::default().fit(&sample, &initial);
        for c in fit.components.iter() {
            assert!((c.std - 0.1).abs() < 1e-12);
            assert!((c.weight - 0.5).abs() < 1e-9);
        }
        assert!((fit.components[0].mean - 0.0).abs() < 1e-9);
        assert!((fit.components[1].mean - 10.0).abs() < 1e-9);
        assert!((fit.log_likelihood - -1870.8570037246232).abs() < 1e-6);
    }

    #[test]
    fn test_weight_floor_revives_empty_component() {
        let sample = [0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let initial = [
            MixtureComponent::new(0.5, 0.0, 1.0),
            MixtureComponent::new(0.0, 5.0, 1.0),
            MixtureComponent::new(0.5, 10.0, 1.0),
        ];

        // the empty component enters the iteration at the floor weight
        let estimator = EMEstimator::new(EMConfig::default().max_iter(1));
        let fit = estimator.fit(&sample, &initial);
        let revived = fit.components[1];
        assert!(revived.weight > 0.0 && revived.weight < 1e-6, "{revived:?}");
        assert!((revived.mean - 5.0).abs() < 1e-9, "{revived:?}");
        assert!(fit.log_likelihood.is_finite());

        // without the floor it takes no responsibility and its mean is undefined
        let estimator = EMEstimator::new(EMConfig::default().max_iter(1).min_weight(0.0));
        let fit = estimator.fit(&sample, &initial);
        let collapsed = fit.components[2];
        assert_eq!(collapsed.weight, 0.0);
        assert!(collapsed.mean.is_nan());

        let fit = EMEstimator::default().fit(&sample, &initial);
        assert!(fit.components.iter().all(|c| c.mean.is_finite()), "{:?}", fit.components);
    }

    #[test]
    fn test_no_components() {
        let fit = EMEstimator::default().fit(&[1.0, 2.0], &[]);
        assert!(fit.components.is_empty());
        assert_eq!(fit.iterations, 0);
    }
}
