//! Binning a raw sample into a histogram with "nice" round bin edges.
//!
//! Bin edges are chosen by snapping the bin width to a power-of-ten multiple
//! wide enough to cover the finite range of the data with exactly the requested
//! number of bins, anchored at or below the smallest value. A sample whose range
//! is negligible relative to its magnitude is instead padded out to half-integer
//! edges. Non-finite values never influence the edges and are never counted.

/// The distance from `x` to the next larger representable magnitude
fn spacing(x: f64) -> f64 {
    let x = x.abs();
    if x <= f64::MIN_POSITIVE {
        return f64::from_bits(1);
    }
    let (_, exponent) = libm::frexp(x);
    libm::ldexp(1.0, exponent - 53)
}

/// The smallest and largest finite values in `values`, or `None` if there are none
pub fn minmax(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((*v, *v)),
            Some((min, max)) => Some((min.min(*v), max.max(*v))),
        })
}

/// `n` evenly spaced points from `start` to `end`, which stay finite even when
/// `end - start` overflows
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![end; n];
    }
    let last = (n - 1) as f64;
    let mut points = vec![0.0; n];
    points[0] = start;
    points[n - 1] = end;
    if start == -end {
        for (k, point) in points.iter_mut().enumerate().take(n - 1).skip(1) {
            *point = end * (((2 * k) as f64 - last) / last);
        }
        if n % 2 == 1 {
            points[n / 2] = 0.0;
        }
    } else if (start < 0.0) != (end < 0.0) && start.abs().max(end.abs()) > f64::MAX / 2.0 {
        let start_step = start / last;
        let end_step = end / last;
        for (k, point) in points.iter_mut().enumerate().take(n - 1).skip(1) {
            *point = start + end_step * k as f64 - start_step * k as f64;
        }
    } else {
        let step = (end - start) / last;
        for (k, point) in points.iter_mut().enumerate().take(n - 1).skip(1) {
            *point = start + step * k as f64;
        }
    }
    points
}

/// Compute `bins + 1` bin edges for `values`
pub fn bin_edges(values: &[f64], bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let (lo, hi) = match minmax(values) {
        Some(bounds) => bounds,
        None => return (0..=bins).map(|i| i as f64).collect(),
    };

    let eps = spacing(lo.abs().max(hi.abs()));
    let range = hi - lo;
    let raw_width = (range / bins as f64).max(eps);

    let (left, right, width) = if range > eps.sqrt().max(f64::MIN_POSITIVE) {
        let power = libm::pow(10.0, raw_width.log10().floor());
        let mut width = power * (raw_width / power).floor();
        let left = (width * (lo / width).floor()).min(lo).max(-f64::MAX);
        if bins > 1 {
            let snapped = (hi - left) / bins as f64;
            let gap = (hi - left) / (bins - 1) as f64 - snapped;
            let power = libm::pow(10.0, gap.log10().floor());
            width = power * (snapped / power).ceil();
        }
        let right = (left + bins as f64 * width).max(hi).min(f64::MAX);
        (left, right, width)
    } else {
        let pad = (bins as f64 * eps).ceil().max(1.0);
        let left = (2.0 * (lo - pad / 4.0)).floor() / 2.0;
        let right = (2.0 * (hi + pad / 4.0)).ceil() / 2.0;
        (left, right, (right - left) / bins as f64)
    };

    if !width.is_finite() {
        return linspace(left, right, bins + 1);
    }

    let mut edges = Vec::with_capacity(bins + 1);
    edges.push(left);
    edges.extend((1..bins).map(|i| left + i as f64 * width));
    edges.push(right);
    edges
}

/// A histogram of a sample with real-valued counts so that it can be used
/// directly as a weight vector.
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Histogram {
    pub bin_count: Vec<f64>,
    pub bin_edges: Vec<f64>,
}

impl Histogram {
    pub fn new(values: &[f64], bins: usize) -> Histogram {
        let mut hist = Histogram::default();
        hist.populate(values, bins);
        hist
    }

    pub fn clear(&mut self) {
        self.bin_count.clear();
        self.bin_edges.clear();
    }

    /// Replace the contents of this histogram with the binned `values`.
    ///
    /// Each value is placed in the bin `[edges[i], edges[i + 1])`, except that
    /// values equal to the last edge land in the last bin.
    pub fn populate(&mut self, values: &[f64], bins: usize) {
        self.clear();
        self.bin_edges = bin_edges(values, bins);
        let n_bins = self.bin_edges.len() - 1;
        self.bin_count.resize(n_bins, 0.0);

        let first = self.bin_edges[0];
        let last = self.bin_edges[n_bins];
        for x in values.iter().copied() {
            if !(x >= first && x <= last) {
                continue;
            }
            let i = self.bin_edges.partition_point(|e| *e <= x);
            let j = i.saturating_sub(1).min(n_bins - 1);
            self.bin_count[j] += 1.0;
        }
    }

    /// The midpoint of each bin
    pub fn bin_centers(&self) -> Vec<f64> {
        self.bin_edges
            .windows(2)
            .map(|w| (w[0] + w[1]) / 2.0)
            .collect()
    }

    pub fn total(&self) -> f64 {
        self.bin_count.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.bin_count.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bin_count.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::numeric::isclose;
    use rstest::rstest;

    #[test]
    fn test_integer_sample() {
        let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let hist = Histogram::new(&values, 3);
        assert_eq!(hist.bin_edges, vec![0.0, 4.0, 8.0, 12.0]);
        assert_eq!(hist.bin_count, vec![3.0, 4.0, 3.0]);
        assert_eq!(hist.bin_centers(), vec![2.0, 6.0, 10.0]);
    }

    #[test]
    fn test_round_edges() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let hist = Histogram::new(&values, 10);
        let expected: Vec<f64> = (0..=10).map(|i| (i * 10) as f64).collect();
        assert_eq!(hist.bin_edges, expected);
        assert_eq!(hist.bin_count, vec![10.0; 10]);
        assert_eq!(hist.total(), 100.0);
    }

    #[test]
    fn test_fractional_edges() {
        let hist = Histogram::new(&[0.13, 0.27, 0.5, 0.81, 0.95], 4);
        let expected = [0.0, 0.24, 0.48, 0.72, 0.96];
        assert_eq!(hist.len(), 4);
        for (a, b) in hist.bin_edges.iter().zip(expected.iter()) {
            assert!(isclose(*a, *b), "{a} != {b}");
        }
        assert_eq!(hist.bin_count, vec![1.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_constant_sample_is_padded() {
        let hist = Histogram::new(&[5.0, 5.0, 5.0], 4);
        assert_eq!(hist.bin_edges, vec![4.5, 4.75, 5.0, 5.25, 5.5]);
        assert_eq!(hist.bin_count, vec![0.0, 0.0, 3.0, 0.0]);

        let hist = Histogram::new(&[7.0], 1);
        assert_eq!(hist.bin_edges, vec![6.5, 7.5]);
        assert_eq!(hist.bin_count, vec![1.0]);
    }

    #[test]
    fn test_non_finite_ignored() {
        let hist = Histogram::new(&[f64::NAN, 2.0, f64::INFINITY, 3.0], 2);
        assert_eq!(hist.bin_edges, vec![2.0, 2.5, 3.0]);
        assert_eq!(hist.bin_count, vec![1.0, 1.0]);
    }

    #[test]
    fn test_maximum_lands_in_last_bin() {
        let hist = Histogram::new(&[-3.5, -1.0, 2.0], 1);
        assert_eq!(hist.bin_edges, vec![-5.0, 2.0]);
        assert_eq!(hist.bin_count, vec![3.0]);
    }

    #[test]
    fn test_empty_sample() {
        let hist = Histogram::new(&[], 10);
        let expected: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        assert_eq!(hist.bin_edges, expected);
        assert_eq!(hist.bin_count, vec![0.0; 10]);

        let hist = Histogram::new(&[f64::NAN], 1);
        assert_eq!(hist.bin_edges, vec![0.0, 1.0]);
        assert_eq!(hist.bin_count, vec![0.0]);
    }

    #[test]
    fn test_zero_bins_becomes_one() {
        let hist = Histogram::new(&[1.0, 2.0], 0);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.total(), 2.0);
    }

    #[rstest]
    #[case(&[-1.7e308, 0.0, 1.7e308], 2)]
    #[case(&[-1.7e308, 1.0e308], 3)]
    #[case(&[-f64::MAX, 5.0, f64::MAX], 4)]
    #[case(&[1.0e308, -1.0e308, 0.5], 5)]
    fn test_overflowing_range(#[case] values: &[f64], #[case] bins: usize) {
        let hist = Histogram::new(values, bins);
        assert_eq!(hist.len(), bins);
        assert!(hist.bin_edges.iter().all(|e| e.is_finite()), "{:?}", hist.bin_edges);
        for w in hist.bin_edges.windows(2) {
            assert!(w[0] < w[1], "{:?}", hist.bin_edges);
        }
        let (lo, hi) = minmax(values).unwrap();
        assert_eq!(hist.bin_edges[0], lo);
        assert_eq!(hist.bin_edges[bins], hi);
        assert_eq!(hist.total(), values.len() as f64);
    }

    #[test]
    fn test_symmetric_overflowing_range() {
        let hist = Histogram::new(&[-1.7e308, 0.0, 1.7e308], 2);
        assert_eq!(hist.bin_edges, vec![-1.7e308, 0.0, 1.7e308]);
        assert_eq!(hist.bin_count, vec![1.0, 2.0]);
    }

    #[test]
    fn test_minmax() {
        assert_eq!(minmax(&[f64::NAN, 3.0, -f64::INFINITY, -2.0]), Some((-2.0, 3.0)));
        assert_eq!(minmax(&[f64::NAN]), None);
    }
}
