//! `mzmixture` is a library for decomposing a one dimensional intensity
//! distribution into a mixture of Gaussians and finding the thresholds that
//! separate its peaks.
//!
//! The pipeline bins a sample into a histogram, splits the histogram into
//! contiguous groups of bins with an optimal [`segment::OptimalSegmenter`],
//! uses those groups to seed an [`em::EMEstimator`] and repeats this for a range
//! of component counts, keeping the fit with the best Bayesian Information
//! Criterion. The crossings between the chosen fit's components are then
//! located with a [`minimize::BoundedMinimizer`].
//!
//! Most callers want [`fetch_thresholds`], or [`fit_gaussian_mixture`] when the
//! number of components is already known. [`ThresholdSelector`] turns the
//! thresholds into a feature filter.
//!
//! # Usage
//! ```
//! use mzmixture;
//!
//! let values = [1.0, 1.0, 1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 10.0, 10.0];
//! let thresholds = mzmixture::fetch_thresholds(&values, 3).unwrap();
//! assert_eq!(thresholds.len(), 1);
//! assert!((thresholds[0] - 5.5).abs() < 0.01);
//!
//! let counts = [1.0; 6];
//! let sample = [0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
//! let fit = mzmixture::fit_gaussian_mixture(&sample, &counts, 2).unwrap();
//! for component in fit.iter() {
//!     println!("{}", component);
//! }
//! ```
//!
//! ## Features
//! - `parallelism`, enabled by default, fits each component count on the
//!   `rayon` thread pool.
//! - `serde` derives `Serialize` and `Deserialize` for the fitted models and
//!   configuration types.
pub mod em;
pub mod histogram;
pub mod initialize;
pub mod minimize;
pub mod mixture;
pub mod model_selection;
pub mod numeric;
pub mod prelude;
pub mod quality;
pub mod segment;
pub mod selector;
pub mod text;
pub mod threshold;

pub use crate::histogram::Histogram;
pub use crate::mixture::{
    fit_gaussian_mixture, fit_gaussian_mixture_with, GaussianMixture, MixtureComponent,
    MixtureError,
};
pub use crate::model_selection::{BICTable, ModelSelection, ModelSelector, SelectionConfig};
pub use crate::selector::{ThresholdSelection, ThresholdSelectionError, ThresholdSelector};
pub use crate::threshold::{
    fetch_thresholds, fetch_thresholds_with, ThresholdConfig, ThresholdFinder,
};

#[cfg(all(test, feature = "serde"))]
mod test {
    use super::*;

    #[test]
    fn test_serde_mixture() {
        let mixture = GaussianMixture::new(
            vec![
                MixtureComponent::new(0.5, 0.0, 0.1),
                MixtureComponent::new(0.5, 10.0, 0.1),
            ],
            -12.5,
            30.0,
        );
        let text = serde_json::to_string(&mixture).unwrap();
        let dup: GaussianMixture = serde_json::from_str(&text).unwrap();
        assert_eq!(mixture, dup);

        let config = ThresholdConfig::new(4).tolerance(1e-9);
        let text = serde_json::to_string(&config).unwrap();
        let dup: ThresholdConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config, dup);
    }
}
