//! Small summary statistics shared by the segmentation steps
//!

use statrs::statistics::Statistics;

/// Arithmetic mean, NaN for empty input
pub fn mean(x: &[f64]) -> f64 {
    x.mean()
}

/// Median, averaging the two central values for even-length input
///
/// Returns NaN for empty input
///
pub fn median(x: &[f64]) -> f64 {
    let n = x.len();
    if n == 0 {
        return f64::NAN;
    }
    let mut x = x.to_vec();
    let mid = n / 2;
    let (lower, upper, _) = x.select_nth_unstable_by(mid, f64::total_cmp);
    if n % 2 == 1 {
        *upper
    } else {
        let lower_max = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lower_max + *upper) / 2.0
    }
}

/// Median of an odd-length window, reordering the window in place
///
pub fn odd_median(window: &mut [f64]) -> f64 {
    assert!(window.len() % 2 == 1);
    let mid = window.len() / 2;
    *window.select_nth_unstable_by(mid, f64::total_cmp).1
}

/// Median of three values
pub fn med3(a: f64, b: f64, c: f64) -> f64 {
    a.min(b).max(a.max(b).min(c))
}

/// Scale factor making the median absolute deviation a consistent estimator of the standard
/// deviation for normally distributed data
const MAD_SCALE: f64 = 1.4826;

/// Scaled median absolute deviation around the median
pub fn mad(x: &[f64]) -> f64 {
    let center = median(x);
    let deviations = x.iter().map(|v| (v - center).abs()).collect::<Vec<_>>();
    MAD_SCALE * median(&deviations)
}
