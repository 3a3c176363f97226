//! Optimal partitioning of an ordered, weighted sequence into contiguous groups
//! by dynamic programming over a precomputed table of segment qualities.
//!
//! The sweep works from the right: after stage `s`, the running cost at index
//! `k` is the best total quality of splitting the suffix starting at `k` with
//! `s` breakpoints. Each stage records its winning split points so the final
//! partition can be recovered by walking the stages back down.
use std::ops::Range;

use log::trace;
use nalgebra::DMatrix;
use thiserror::Error;

use crate::numeric::nan_argmin;
use crate::quality::{CompactnessQuality, SegmentQuality};

/// All the ways a segmentation request can be malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentationError {
    #[error("The values ({0}) and weights ({1}) arrays do not match in length")]
    LengthMismatch(usize, usize),
    #[error("Cannot place {breakpoints} breakpoints in a sequence of {bins} bins")]
    TooManyBreakpoints { breakpoints: usize, bins: usize },
    #[error("The quality matrix is {matrix}x{matrix} but the sequence has {bins} bins")]
    MatrixDimensionMismatch { matrix: usize, bins: usize },
}

/// The qualities of every sub-range of a sequence.
///
/// Entry `(i, j)` holds the score of the half-open range `[i, j)` for
/// `0 <= i < j < N`. The lower triangle and diagonal are left at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryMatrix {
    table: DMatrix<f64>,
}

impl AuxiliaryMatrix {
    /// Score every sub-range of `values` using `scorer`
    pub fn build<Q: SegmentQuality>(
        values: &[f64],
        weights: &[f64],
        scorer: &Q,
    ) -> Result<Self, SegmentationError> {
        if values.len() != weights.len() {
            return Err(SegmentationError::LengthMismatch(
                values.len(),
                weights.len(),
            ));
        }
        let n = values.len();
        let mut table = DMatrix::zeros(n, n);
        for i in 0..n.saturating_sub(1) {
            for j in (i + 1)..n {
                table[(i, j)] = scorer.quality(&values[i..j], &weights[i..j]);
            }
        }
        Ok(Self { table })
    }

    /// The number of rows (and columns) of the table
    pub fn dim(&self) -> usize {
        self.table.nrows()
    }

    /// The score of the half-open range `[start, end)`
    #[inline]
    pub fn get(&self, start: usize, end: usize) -> f64 {
        self.table[(start, end)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.table
    }
}

/// The outcome of [`OptimalSegmenter::segment`]
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segmentation {
    /// The optimal total quality after each stage, one per breakpoint
    pub scores: Vec<f64>,
    /// The strictly increasing start indices of every group after the first
    pub breakpoints: Vec<usize>,
}

impl Segmentation {
    /// The group boundaries for a sequence of length `n`, including the
    /// sentinels `0` and `n`
    pub fn boundaries(&self, n: usize) -> Vec<usize> {
        let mut bounds = Vec::with_capacity(self.breakpoints.len() + 2);
        bounds.push(0);
        bounds.extend_from_slice(&self.breakpoints);
        bounds.push(n);
        bounds
    }

    /// The half-open index ranges of each group for a sequence of length `n`
    pub fn segments(&self, n: usize) -> Vec<Range<usize>> {
        self.boundaries(n).windows(2).map(|w| w[0]..w[1]).collect()
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}

/// Splits an ordered sequence into contiguous groups minimizing the summed
/// segment quality.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimalSegmenter<Q: SegmentQuality = CompactnessQuality> {
    pub scorer: Q,
}

impl<Q: SegmentQuality> OptimalSegmenter<Q> {
    pub fn new(scorer: Q) -> Self {
        Self { scorer }
    }

    /// Build the [`AuxiliaryMatrix`] for `values` with this segmenter's scorer
    pub fn auxiliary_matrix(
        &self,
        values: &[f64],
        weights: &[f64],
    ) -> Result<AuxiliaryMatrix, SegmentationError> {
        AuxiliaryMatrix::build(values, weights, &self.scorer)
    }

    /// Place `breakpoints` split points in `values`, producing `breakpoints + 1` groups.
    ///
    /// `aux` must have been built from the same `values` and `weights`. Candidate
    /// ties are resolved in favor of the earliest split, and NaN costs are passed
    /// over unless every candidate is NaN.
    pub fn segment(
        &self,
        values: &[f64],
        weights: &[f64],
        breakpoints: usize,
        aux: &AuxiliaryMatrix,
    ) -> Result<Segmentation, SegmentationError> {
        let n = values.len();
        if n != weights.len() {
            return Err(SegmentationError::LengthMismatch(n, weights.len()));
        }
        if aux.dim() != n {
            return Err(SegmentationError::MatrixDimensionMismatch {
                matrix: aux.dim(),
                bins: n,
            });
        }
        if breakpoints == 0 {
            return Ok(Segmentation::default());
        }
        if breakpoints >= n {
            return Err(SegmentationError::TooManyBreakpoints {
                breakpoints,
                bins: n,
            });
        }

        let mut suffix_cost: Vec<f64> = (0..n)
            .map(|k| self.scorer.quality(&values[k..], &weights[k..]))
            .collect();
        let mut split_table = vec![vec![0usize; n]; breakpoints + 1];
        let mut scores = Vec::with_capacity(breakpoints);
        let mut candidates = Vec::with_capacity(n);

        for stage in 1..=breakpoints {
            let last_split = n - stage;
            for k in 0..last_split {
                candidates.clear();
                for j in (k + 1)..=last_split {
                    candidates.push(aux.get(k, j) + suffix_cost[j]);
                }
                if let Some((offset, cost)) = nan_argmin(&candidates) {
                    suffix_cost[k] = cost;
                    split_table[stage][k] = k + 1 + offset;
                }
            }
            trace!("Stage {stage} optimal cost {}", suffix_cost[0]);
            scores.push(suffix_cost[0]);
        }

        let mut found = vec![0usize; breakpoints];
        found[0] = split_table[breakpoints][0];
        for stage in (1..breakpoints).rev() {
            let i = breakpoints - stage;
            found[i] = split_table[stage][found[i - 1]];
        }

        Ok(Segmentation {
            scores,
            breakpoints: found,
        })
    }
}

/// Build the quality table and segment `values` into `breakpoints + 1` groups
/// with the default [`CompactnessQuality`]
pub fn optimal_segmentation(
    values: &[f64],
    weights: &[f64],
    breakpoints: usize,
) -> Result<Segmentation, SegmentationError> {
    let segmenter = OptimalSegmenter::<CompactnessQuality>::default();
    let aux = segmenter.auxiliary_matrix(values, weights)?;
    segmenter.segment(values, weights, breakpoints, &aux)
}
