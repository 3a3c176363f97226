pub use crate::em::{EMConfig, EMEstimator};
pub use crate::mixture::{GaussianMixture, MixtureComponent, MixtureError};
pub use crate::model_selection::{ModelSelector, SelectionConfig};
pub use crate::quality::SegmentQuality;
pub use crate::threshold::{ThresholdConfig, ThresholdFinder};
pub use crate::selector::ThresholdSelector;
