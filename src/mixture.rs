//! One dimensional Gaussian mixture models and fitting them to a sample with a
//! fixed number of components.
use std::fmt::Display;

use log::debug;
use thiserror::Error;

use crate::em::{EMConfig, EMEstimator};
use crate::initialize::MixtureInitializer;
use crate::numeric::{nan_max, normal_pdf};
use crate::segment::SegmentationError;

/// All the ways fitting a mixture can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixtureError {
    #[error("The sample ({0}) and counts ({1}) arrays do not match in length")]
    LengthMismatch(usize, usize),
    #[error("Cannot fit a mixture to an empty sample")]
    EmptySample,
    #[error("A mixture must have at least one component")]
    NoComponents,
    #[error("Cannot initialize {components} components from a histogram with {bins} bins")]
    TooManyComponents { components: usize, bins: usize },
    #[error(transparent)]
    Segmentation(#[from] SegmentationError),
}

/// A single weighted normal distribution
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixtureComponent {
    pub weight: f64,
    pub mean: f64,
    pub std: f64,
}

impl MixtureComponent {
    pub fn new(weight: f64, mean: f64, std: f64) -> Self {
        Self { weight, mean, std }
    }

    /// The weighted density of this component at `x`
    #[inline]
    pub fn density(&self, x: f64) -> f64 {
        self.weight * normal_pdf(x, self.mean, self.std)
    }

    /// The density of this component at `x` as if it had unit weight
    #[inline]
    pub fn pdf(&self, x: f64) -> f64 {
        normal_pdf(x, self.mean, self.std)
    }

    pub fn variance(&self) -> f64 {
        self.std * self.std
    }
}

impl Display for MixtureComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MixtureComponent({}, {}, {})",
            self.weight, self.mean, self.std
        )
    }
}

/// A fitted mixture with components sorted by mean.
///
/// `log_likelihood` may be NaN or infinite for degenerate fits, and is NaN for
/// the single component estimate, which is not produced by EM.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianMixture {
    pub components: Vec<MixtureComponent>,
    pub log_likelihood: f64,
    /// The total intensity of the sample, `sum(x * count)`
    pub tic: f64,
}

impl GaussianMixture {
    pub fn new(components: Vec<MixtureComponent>, log_likelihood: f64, tic: f64) -> Self {
        Self {
            components,
            log_likelihood,
            tic,
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MixtureComponent> {
        self.components.iter()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    pub fn means(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.mean).collect()
    }

    pub fn stds(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.std).collect()
    }

    /// The mixture density at `x`
    pub fn density(&self, x: f64) -> f64 {
        self.components.iter().map(|c| c.density(x)).sum()
    }

    /// The largest weighted component density at `x`
    pub fn upper_envelope(&self, x: f64) -> f64 {
        upper_envelope(&self.components, x)
    }

    /// The log-likelihood of `sample` under this mixture
    pub fn log_likelihood_of(&self, sample: &[f64]) -> f64 {
        sample.iter().map(|x| self.density(*x).ln()).sum()
    }

    /// The Bayesian Information Criterion of this mixture's own log-likelihood
    /// for a sample of size `n`
    pub fn bic(&self, n: usize) -> f64 {
        bic(self.log_likelihood, self.len(), n)
    }
}

impl<'a> IntoIterator for &'a GaussianMixture {
    type Item = &'a MixtureComponent;
    type IntoIter = std::slice::Iter<'a, MixtureComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

/// The largest weighted density among `components` at `x`, skipping NaN
pub fn upper_envelope(components: &[MixtureComponent], x: f64) -> f64 {
    let densities: Vec<f64> = components.iter().map(|c| c.density(x)).collect();
    nan_max(&densities)
}

/// `-2 ln L + (3K - 1) ln n`
pub fn bic(log_likelihood: f64, components: usize, n: usize) -> f64 {
    -2.0 * log_likelihood + (3 * components as i64 - 1) as f64 * (n as f64).ln()
}

/// Fit a `components`-component mixture to `sample` with the default [`EMConfig`].
///
/// `counts` is only used to compute [`GaussianMixture::tic`].
pub fn fit_gaussian_mixture(
    sample: &[f64],
    counts: &[f64],
    components: usize,
) -> Result<GaussianMixture, MixtureError> {
    fit_gaussian_mixture_with(sample, counts, components, &EMConfig::default())
}

/// Fit a `components`-component mixture to `sample`.
///
/// A single component is estimated directly from the sample mean and standard
/// deviation and carries a NaN log-likelihood. Otherwise the components are
/// seeded from an optimal segmentation of the sample's histogram and refined by EM.
pub fn fit_gaussian_mixture_with(
    sample: &[f64],
    counts: &[f64],
    components: usize,
    config: &EMConfig,
) -> Result<GaussianMixture, MixtureError> {
    if sample.len() != counts.len() {
        return Err(MixtureError::LengthMismatch(sample.len(), counts.len()));
    }
    if components == 0 {
        return Err(MixtureError::NoComponents);
    }
    if sample.is_empty() {
        return Err(MixtureError::EmptySample);
    }

    let tic: f64 = sample.iter().zip(counts.iter()).map(|(x, c)| x * c).sum();
    let initializer: MixtureInitializer = MixtureInitializer::default();

    if components == 1 {
        let component = initializer.single_component(sample);
        return Ok(GaussianMixture::new(vec![component], f64::NAN, tic));
    }

    let initial = initializer.from_sample(sample, components)?;
    let fit = EMEstimator::new(config.clone()).fit(sample, &initial);
    debug!(
        "Fit {components} components in {} iterations (converged: {}), log-likelihood {}",
        fit.iterations, fit.converged, fit.log_likelihood
    );
    Ok(GaussianMixture::new(fit.components, fit.log_likelihood, tic))
}
