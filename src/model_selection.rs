//! Choosing the number of mixture components by the Bayesian Information Criterion.
//!
//! Every component count from one up to the configured maximum is fitted
//! independently, in parallel when the `parallelism` feature is enabled. The
//! results are collected in component count order, so the outcome does not
//! depend on scheduling.
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::em::EMConfig;
use crate::mixture::{bic, fit_gaussian_mixture_with, GaussianMixture, MixtureError};
use crate::numeric::nan_argmin;

/// Configure [`ModelSelector`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectionConfig {
    /// The largest number of components to try
    pub max_components: usize,
    /// The EM parameters used for every fit
    pub em: EMConfig,
    /// Whether to score the single component fit by its log-likelihood.
    ///
    /// The single component estimate does not come from EM and carries no
    /// log-likelihood of its own. When this is `false` its BIC is NaN and it
    /// can only be chosen when no other fit has a usable score.
    pub score_single_component: bool,
}

impl SelectionConfig {
    pub fn new(max_components: usize) -> Self {
        Self {
            max_components,
            ..Default::default()
        }
    }

    pub fn max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    pub fn em(mut self, em: EMConfig) -> Self {
        self.em = em;
        self
    }

    pub fn score_single_component(mut self, score_single_component: bool) -> Self {
        self.score_single_component = score_single_component;
        self
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_components: 10,
            em: EMConfig::default(),
            score_single_component: true,
        }
    }
}

/// The BIC of each component count, starting from one component
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BICTable {
    pub scores: Vec<f64>,
}

impl BICTable {
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }

    /// The BIC of the `components`-component fit, if it was attempted
    pub fn get(&self, components: usize) -> Option<f64> {
        components
            .checked_sub(1)
            .and_then(|i| self.scores.get(i))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.scores.iter().enumerate().map(|(i, s)| (i + 1, *s))
    }

    /// The component count with the smallest BIC, with ties going to the fewest
    /// components and NaN scores passed over.
    ///
    /// Returns `None` when the table is empty or when the smallest score is
    /// `+inf`, meaning no fit was usable. If every score is NaN, one component is
    /// reported.
    pub fn best_component_count(&self) -> Option<usize> {
        match nan_argmin(&self.scores) {
            Some((_, score)) if score == f64::INFINITY => None,
            Some((i, _)) => Some(i + 1),
            None => None,
        }
    }
}

/// The outcome of [`ModelSelector::select`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSelection {
    /// The fit for each component count, or `None` where fitting failed
    pub fits: Vec<Option<GaussianMixture>>,
    pub bic: BICTable,
    pub best_component_count: Option<usize>,
}

impl ModelSelection {
    /// The mixture with the best BIC, if any fit was usable
    pub fn best(&self) -> Option<&GaussianMixture> {
        self.best_component_count
            .and_then(|k| self.fits.get(k - 1))
            .and_then(|fit| fit.as_ref())
    }
}

/// Fits mixtures with increasing numbers of components and picks the best by BIC
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub config: SelectionConfig,
}

cfg_if::cfg_if! {
    if #[cfg(feature = "parallelism")] {
        fn fit_each_count<T, F>(max_components: usize, fitter: F) -> Vec<T>
        where
            T: Send,
            F: Fn(usize) -> T + Sync + Send,
        {
            (1..=max_components).into_par_iter().map(fitter).collect()
        }
    } else {
        fn fit_each_count<T, F>(max_components: usize, fitter: F) -> Vec<T>
        where
            F: Fn(usize) -> T,
        {
            (1..=max_components).map(fitter).collect()
        }
    }
}

impl ModelSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    fn fit_one(
        &self,
        sample: &[f64],
        counts: &[f64],
        components: usize,
    ) -> (Option<GaussianMixture>, f64) {
        let n = sample.len();
        match fit_gaussian_mixture_with(sample, counts, components, &self.config.em) {
            Ok(fit) => {
                let log_likelihood = if components == 1 && self.config.score_single_component {
                    fit.log_likelihood_of(sample)
                } else {
                    fit.log_likelihood
                };
                let score = bic(log_likelihood, components, n);
                debug!("BIC for {components} components: {score}");
                (Some(fit), score)
            }
            Err(e) => {
                debug!("Failed to fit {components} components: {e}");
                (None, f64::INFINITY)
            }
        }
    }

    /// Fit `1..=max_components` mixtures to `sample` and choose among them.
    ///
    /// Every sample point is given a count of one. Fits that fail are recorded
    /// with a BIC of `+inf`. Only a request for zero components is an error.
    pub fn select(&self, sample: &[f64]) -> Result<ModelSelection, MixtureError> {
        let counts = vec![1.0; sample.len()];
        self.select_weighted(sample, &counts)
    }

    /// Like [`ModelSelector::select`], with an explicit count for each sample
    /// point. The counts only feed [`GaussianMixture::tic`].
    pub fn select_weighted(
        &self,
        sample: &[f64],
        counts: &[f64],
    ) -> Result<ModelSelection, MixtureError> {
        if self.config.max_components == 0 {
            return Err(MixtureError::NoComponents);
        }
        if sample.len() != counts.len() {
            return Err(MixtureError::LengthMismatch(sample.len(), counts.len()));
        }
        let (fits, scores): (Vec<_>, Vec<_>) =
            fit_each_count(self.config.max_components, |k| self.fit_one(sample, counts, k))
                .into_iter()
                .unzip();

        let bic = BICTable::new(scores);
        let best_component_count = bic.best_component_count();
        debug!("Selected {best_component_count:?} components from {:?}", bic.scores);
        Ok(ModelSelection {
            fits,
            bic,
            best_component_count,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::numeric::isclose;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::Normal;
    use rstest::rstest;

    #[rstest]
    #[case(vec![3.0, 1.0, 2.0], Some(2))]
    #[case(vec![f64::NAN, 1.0, 1.0], Some(2))]
    #[case(vec![f64::NAN, f64::NAN], Some(1))]
    #[case(vec![f64::INFINITY, f64::INFINITY], None)]
    #[case(vec![f64::NAN, f64::INFINITY, -2.0], Some(3))]
    #[case(vec![], None)]
    fn test_best_component_count(#[case] scores: Vec<f64>, #[case] expected: Option<usize>) {
        assert_eq!(BICTable::new(scores).best_component_count(), expected);
    }

    #[test]
    fn test_table_access() {
        let table = BICTable::new(vec![5.0, 4.0]);
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(1), Some(5.0));
        assert_eq!(table.get(3), None);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![(1, 5.0), (2, 4.0)]);
    }

    #[test_log::test]
    fn test_two_point_clusters() {
        let sample = [1.0, 1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let selector = ModelSelector::new(SelectionConfig::new(3));
        let selection = selector.select(&sample).unwrap();
        assert_eq!(selection.bic.len(), 3);
        assert_eq!(selection.best_component_count, Some(2));
        assert!(isclose(selection.bic.scores[1], -2.297062119618319));
        // three components never gets a score
        assert!(selection.bic.scores[2].is_nan());
        let best = selection.best().unwrap();
        assert_eq!(best.len(), 2);
    }

    #[test]
    fn test_unscored_single_component() {
        let sample = [1.0, 1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let selector =
            ModelSelector::new(SelectionConfig::new(2).score_single_component(false));
        let selection = selector.select(&sample).unwrap();
        assert!(selection.bic.scores[0].is_nan());
        assert_eq!(selection.best_component_count, Some(2));

        let selector = ModelSelector::new(SelectionConfig::new(2));
        let selection = selector.select(&sample).unwrap();
        assert!(isclose(selection.bic.scores[0], 63.11909394218528));
    }

    #[test_log::test]
    fn test_single_population_prefers_one_component() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let dist = Normal::new(0.0, 1.0).unwrap();
        let sample: Vec<f64> = (0..100).map(|_| dist.sample(&mut rng)).collect();
        let selection = ModelSelector::new(SelectionConfig::new(3))
            .select(&sample)
            .unwrap();
        let best = selection.best_component_count.unwrap();
        assert!((1..=3).contains(&best));
        assert_eq!(best, 1);
        assert!(selection.bic.scores[0].is_finite());
    }

    #[test]
    fn test_failed_fits_are_infinite() {
        // four points only support two histogram bins
        let sample = [1.0, 2.0, 8.0, 9.0];
        let selection = ModelSelector::new(SelectionConfig::new(4))
            .select(&sample)
            .unwrap();
        assert_eq!(selection.bic.scores[2], f64::INFINITY);
        assert_eq!(selection.bic.scores[3], f64::INFINITY);
        assert!(selection.fits[2].is_none());
        assert!(selection.fits[0].is_some());
    }

    #[test]
    fn test_empty_sample_has_no_best() {
        let selection = ModelSelector::default().select(&[]).unwrap();
        assert_eq!(selection.best_component_count, None);
        assert!(selection.best().is_none());
        assert!(selection.bic.scores.iter().all(|s| *s == f64::INFINITY));
    }

    #[test]
    fn test_weighted_counts_reach_fits() {
        let sample = [1.0, 1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let counts = [2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 3.0];
        let selector = ModelSelector::new(SelectionConfig::new(2));
        let weighted = selector.select_weighted(&sample, &counts).unwrap();
        let unweighted = selector.select(&sample).unwrap();
        assert_eq!(weighted.bic, unweighted.bic);
        assert_eq!(weighted.best().unwrap().tic, 76.0);
        assert_eq!(unweighted.best().unwrap().tic, 55.0);

        assert_eq!(
            selector.select_weighted(&sample, &counts[..3]),
            Err(MixtureError::LengthMismatch(10, 3))
        );
    }

    #[test]
    fn test_zero_components() {
        let selector = ModelSelector::new(SelectionConfig::new(0));
        assert_eq!(selector.select(&[1.0]), Err(MixtureError::NoComponents));
    }
}
