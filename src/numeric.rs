//! Shared numeric helpers.
//!
//! All extrema in this crate follow the same NaN rule: the scan starts at the
//! first non-NaN element and proceeds with strict comparisons, so the earliest
//! extremum wins ties. When every element is NaN, the first element is reported.
use std::cmp::Ordering;

use num_traits::Float;

/// $`\sqrt{2\pi}`$
pub const SQRT_2PI: f64 = 2.5066282746310002;

pub fn _isclose<T>(x: T, y: T, rtol: T, atol: T) -> bool
where
    T: Float,
{
    (x - y).abs() <= (atol + rtol * y.abs())
}

pub fn isclose(x: f64, y: f64) -> bool {
    _isclose(x, y, 1e-5, 1e-8)
}

/// Compare two values, either exactly when `tolerance` is zero or within an
/// absolute `tolerance` otherwise. NaN never agrees with anything.
#[inline]
pub fn values_agree(x: f64, y: f64, tolerance: f64) -> bool {
    x == y || (tolerance > 0.0 && (x - y).abs() <= tolerance)
}

#[inline]
fn first_non_nan<T: Float>(values: &[T]) -> Option<usize> {
    values.iter().position(|v| !v.is_nan())
}

/// The maximum of `values`, skipping NaN
pub fn nan_max<T: Float>(values: &[T]) -> T {
    if values.is_empty() {
        return T::nan();
    }
    match first_non_nan(values) {
        Some(start) => {
            let mut best = values[start];
            for v in values[start + 1..].iter() {
                if best < *v {
                    best = *v;
                }
            }
            best
        }
        None => values[0],
    }
}

/// The minimum of `values`, skipping NaN
pub fn nan_min<T: Float>(values: &[T]) -> T {
    nan_argmin(values).map(|(_, v)| v).unwrap_or_else(T::nan)
}

/// The position and value of the minimum of `values`, skipping NaN.
///
/// Returns `None` only when `values` is empty.
pub fn nan_argmin<T: Float>(values: &[T]) -> Option<(usize, T)> {
    if values.is_empty() {
        return None;
    }
    match first_non_nan(values) {
        Some(start) => {
            let mut best_idx = start;
            let mut best = values[start];
            for (i, v) in values.iter().enumerate().skip(start + 1) {
                if best > *v {
                    best = *v;
                    best_idx = i;
                }
            }
            Some((best_idx, best))
        }
        None => Some((0, values[0])),
    }
}

/// An ordering for sorting where NaN sorts after every number
pub fn nan_last_cmp(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

/// The arithmetic mean of the non-NaN entries of `values`
pub fn nan_mean(values: &[f64]) -> f64 {
    let (total, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(total, count), v| (total + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

/// The sample standard deviation (`n - 1` denominator).
///
/// Deviations are accumulated relative to the running largest deviation so
/// that very large or very small magnitudes neither overflow nor underflow.
pub fn sample_std(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => {
            if values[0].is_finite() {
                0.0
            } else {
                f64::NAN
            }
        }
        n => {
            let mean = values.iter().sum::<f64>() / n as f64;
            let mut scale = 3.3121686421112381e-170;
            let mut acc = 0.0;
            for v in values {
                let dev = (v - mean).abs();
                if dev > scale {
                    let t = scale / dev;
                    acc = 1.0 + acc * t * t;
                    scale = dev;
                } else {
                    let t = dev / scale;
                    acc += t * t;
                }
            }
            scale * acc.sqrt() / ((n - 1) as f64).sqrt()
        }
    }
}

/// The normal probability density at `x`.
///
/// A non-positive `sigma` yields NaN rather than an error.
#[inline]
pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if sigma > 0.0 {
        let t = (x - mu) / sigma;
        (-0.5 * t * t).exp() / (SQRT_2PI * sigma)
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_nan_extrema_skip_leading_nan() {
        let values = [f64::NAN, 3.0, f64::NAN, -1.0, 7.0];
        assert_eq!(nan_max(&values), 7.0);
        assert_eq!(nan_min(&values), -1.0);
        assert_eq!(nan_argmin(&values), Some((3, -1.0)));
    }

    #[test]
    fn test_nan_argmin_first_wins_ties() {
        let values = [2.0, 1.0, 5.0, 1.0];
        assert_eq!(nan_argmin(&values), Some((1, 1.0)));

        let values = [f64::INFINITY, f64::INFINITY];
        assert_eq!(nan_argmin(&values), Some((0, f64::INFINITY)));
    }

    #[test]
    fn test_all_nan_reports_first() {
        let values = [f64::NAN, f64::NAN];
        let (idx, v) = nan_argmin(&values).unwrap();
        assert_eq!(idx, 0);
        assert!(v.is_nan());
        assert!(nan_max(&values).is_nan());
        assert!(nan_argmin::<f64>(&[]).is_none());
        assert!(nan_min::<f64>(&[]).is_nan());
    }

    #[test]
    fn test_nan_mean() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[f64::NAN]).is_nan());
        assert!(nan_mean(&[]).is_nan());
    }

    #[test]
    fn test_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population std is 2, sample std is 2 * sqrt(8 / 7)
        let expected = 2.0 * (8.0f64 / 7.0).sqrt();
        assert!(isclose(sample_std(&values), expected));
        assert_eq!(sample_std(&[3.0]), 0.0);
        assert!(sample_std(&[f64::INFINITY]).is_nan());
        assert!(sample_std(&[]).is_nan());
    }

    #[test]
    fn test_normal_pdf() {
        let peak = normal_pdf(0.0, 0.0, 1.0);
        assert!(isclose(peak, 0.3989422804014327));
        assert!(isclose(normal_pdf(1.0, 0.0, 1.0), 0.24197072451914337));
        assert!(normal_pdf(0.0, 0.0, 0.0).is_nan());
        assert!(normal_pdf(0.0, 0.0, -1.0).is_nan());
    }

    #[test]
    fn test_values_agree() {
        assert!(values_agree(1.0, 1.0, 0.0));
        assert!(!values_agree(1.0, 1.0 + 1e-12, 0.0));
        assert!(values_agree(1.0, 1.0 + 1e-12, 1e-9));
        assert!(!values_agree(f64::NAN, f64::NAN, 1.0));
        assert!(values_agree(f64::INFINITY, f64::INFINITY, 0.0));
    }

    #[test]
    fn test_nan_last_cmp() {
        let mut values = vec![3.0, f64::NAN, 1.0, 2.0];
        values.sort_by(nan_last_cmp);
        assert_eq!(&values[..3], &[1.0, 2.0, 3.0]);
        assert!(values[3].is_nan());
    }
}
