//! Seeding mixture components from an optimal segmentation of a histogram.
use crate::histogram::Histogram;
use crate::mixture::{MixtureComponent, MixtureError};
use crate::numeric::{nan_max, nan_mean, nan_min, sample_std};
use crate::quality::{CompactnessQuality, SegmentQuality};
use crate::segment::OptimalSegmenter;

/// Produces the starting point for EM by splitting a histogram into as many
/// contiguous groups of bins as there are components.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixtureInitializer<Q: SegmentQuality = CompactnessQuality> {
    pub segmenter: OptimalSegmenter<Q>,
}

impl<Q: SegmentQuality> MixtureInitializer<Q> {
    pub fn new(segmenter: OptimalSegmenter<Q>) -> Self {
        Self { segmenter }
    }

    /// The number of histogram bins used for a sample of size `n`
    pub fn bin_count_for(n: usize) -> usize {
        (n as f64).sqrt().floor() as usize
    }

    /// Estimate a lone component from the sample moments
    pub fn single_component(&self, sample: &[f64]) -> MixtureComponent {
        MixtureComponent::new(1.0, nan_mean(sample), sample_std(sample))
    }

    /// Bin `sample` into `floor(sqrt(n))` bins and initialize `components`
    /// components from the histogram
    pub fn from_sample(
        &self,
        sample: &[f64],
        components: usize,
    ) -> Result<Vec<MixtureComponent>, MixtureError> {
        let bins = Self::bin_count_for(sample.len());
        if components > bins {
            return Err(MixtureError::TooManyComponents { components, bins });
        }
        let hist = Histogram::new(sample, bins);
        self.initialize(&hist.bin_centers(), &hist.bin_count, components)
    }

    /// Split the bins into `components` groups and describe each group.
    ///
    /// Each group's weight is its share of the total count, its mean is the
    /// count-weighted mean of its bin centers and its spread is half the
    /// distance between its outermost bin centers.
    pub fn initialize(
        &self,
        bin_centers: &[f64],
        bin_counts: &[f64],
        components: usize,
    ) -> Result<Vec<MixtureComponent>, MixtureError> {
        if components == 0 {
            return Err(MixtureError::NoComponents);
        }
        if bin_centers.len() != bin_counts.len() {
            return Err(MixtureError::LengthMismatch(
                bin_centers.len(),
                bin_counts.len(),
            ));
        }
        let bins = bin_centers.len();
        if components > bins {
            return Err(MixtureError::TooManyComponents { components, bins });
        }

        let aux = self.segmenter.auxiliary_matrix(bin_centers, bin_counts)?;
        let segmentation =
            self.segmenter
                .segment(bin_centers, bin_counts, components - 1, &aux)?;

        let total: f64 = bin_counts.iter().sum();
        let initial = segmentation
            .segments(bins)
            .into_iter()
            .map(|group| {
                let centers = &bin_centers[group.clone()];
                let counts = &bin_counts[group];
                let group_total: f64 = counts.iter().sum();
                let mean: f64 = centers
                    .iter()
                    .zip(counts.iter())
                    .map(|(c, w)| c * (w / group_total))
                    .sum();
                let spread = 0.5 * (nan_max(centers) - nan_min(centers));
                MixtureComponent::new(group_total / total, mean, spread)
            })
            .collect();
        Ok(initial)
    }
}
