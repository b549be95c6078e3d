//! Robust noise scale estimation for BAF tracks
//!

use serde::{Deserialize, Serialize};

use crate::stats_utils::{mad, med3, odd_median};

pub const DEFAULT_NOISE_WINDOW_HALF_SIZE: usize = 25;

/// Minimum noise scale, close to the binomial spread of a heterozygous call at moderate depth
///
/// Loss-of-heterozygosity regions otherwise collapse the noise estimate toward zero, which makes
/// the segmentation penalty vanish.
///
pub const DEFAULT_MIN_NOISE_SDEV: f64 = 0.09;

/// Project a BAF value onto [0, 0.5]
pub fn fold_baf(baf: f64) -> f64 {
    if baf < 0.5 { baf } else { 1.0 - baf }
}

/// Smooth the `half_size` values at each end of a running median track
///
/// Interior positions are left as-is. End positions get medians of symmetric windows shrinking
/// toward the track edge, and the two extreme points use Tukey's end-point rule.
///
/// Requires at least 3 values.
///
fn smooth_ends(y: &[f64], half_size: usize) -> Vec<f64> {
    let n = y.len();
    assert!(n >= 3);

    let mut sm = y.to_vec();
    if half_size >= 2 {
        sm[1] = med3(y[0], y[1], y[2]);
        sm[n - 2] = med3(y[n - 1], y[n - 2], y[n - 3]);

        let mut window = Vec::new();
        for i in 3..=half_size {
            if 2 * i > n {
                break;
            }
            window.clear();
            window.extend_from_slice(&y[..2 * i - 1]);
            sm[i - 1] = odd_median(&mut window);

            window.clear();
            window.extend_from_slice(&y[n + 1 - 2 * i..]);
            sm[n - i] = odd_median(&mut window);
        }
    }

    sm[0] = med3(y[0], sm[1], 3.0 * sm[1] - 2.0 * sm[2]);
    sm[n - 1] = med3(y[n - 1], sm[n - 2], 3.0 * sm[n - 2] - 2.0 * sm[n - 3]);
    sm
}

/// Running median over an odd window width, with median smoothing at both ends
///
fn running_median(y: &[f64], width: usize) -> Vec<f64> {
    assert!(width % 2 == 1);
    let half_size = width / 2;
    if half_size == 0 {
        return y.to_vec();
    }

    let n = y.len();
    assert!(width <= n);

    let mut result = y.to_vec();
    let mut window = Vec::with_capacity(width);
    for i in half_size..(n - half_size) {
        window.clear();
        window.extend_from_slice(&y[i - half_size..=i + half_size]);
        result[i] = odd_median(&mut window);
    }
    smooth_ends(&result, half_size)
}

/// Running median filter with window `2 * half_size + 1`
///
/// The window is reduced to the largest odd width that fits when the input is too short for it.
///
pub fn median_filter(x: &[f64], half_size: usize) -> Vec<f64> {
    let n = x.len();
    let mut width = 2 * half_size + 1;
    if width > n {
        width = if n == 0 {
            1
        } else if n % 2 == 0 {
            n - 1
        } else {
            n
        };
    }
    running_median(x, width)
}

/// Scaled MAD of the residuals left after removing a running median from `x`
///
/// Exact zeros are removed first, these usually reflect imputed values rather than observations.
///
/// Returns None when fewer than 2 values remain.
///
pub fn get_mad(x: &[f64], half_size: usize) -> Option<f64> {
    let x = x.iter().copied().filter(|&v| v != 0.0).collect::<Vec<_>>();
    if x.len() < 2 {
        return None;
    }
    let run_median = median_filter(&x, half_size);
    let residuals = x
        .iter()
        .zip(run_median.iter())
        .map(|(v, m)| v - m)
        .collect::<Vec<_>>();
    Some(mad(&residuals))
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NoiseEstimator {
    pub window_half_size: usize,
    pub min_sdev: f64,
}

impl Default for NoiseEstimator {
    fn default() -> Self {
        Self {
            window_half_size: DEFAULT_NOISE_WINDOW_HALF_SIZE,
            min_sdev: DEFAULT_MIN_NOISE_SDEV,
        }
    }
}

impl NoiseEstimator {
    /// Noise scale of a BAF track, folded onto [0, 0.5] and floored at `min_sdev`
    ///
    pub fn estimate_sdev(&self, bafs: &[f64]) -> f64 {
        let folded = bafs.iter().map(|&x| fold_baf(x)).collect::<Vec<_>>();
        let sdev = get_mad(&folded, self.window_half_size).unwrap_or(0.0);
        if sdev < self.min_sdev {
            self.min_sdev
        } else {
            sdev
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_baf() {
        assert_eq!(fold_baf(0.2), 0.2);
        approx::assert_ulps_eq!(fold_baf(0.8), 0.2, max_ulps = 4);
        assert_eq!(fold_baf(0.5), 0.5);
    }

    #[test]
    fn test_median_filter_short_input() {
        assert!(median_filter(&[], 25).is_empty());
        assert_eq!(median_filter(&[0.3], 25), vec![0.3]);

        // Even length input reduces window to 1, so input is returned unchanged
        assert_eq!(median_filter(&[0.3, 0.1], 25), vec![0.3, 0.1]);
    }

    #[test]
    fn test_median_filter_width3() {
        // Value should match `runmed(c(1,5,2,8,3), 3, endrule="median")` in R:
        let x = [1.0, 5.0, 2.0, 8.0, 3.0];
        let y = median_filter(&x, 1);
        assert_eq!(y, vec![1.0, 2.0, 5.0, 3.0, 3.0]);
    }

    #[test]
    fn test_median_filter_removes_spike() {
        let mut x = vec![0.4; 21];
        x[10] = 0.9;
        let y = median_filter(&x, 3);
        assert!(y.iter().all(|&v| v == 0.4));
    }

    #[test]
    fn test_get_mad_undefined() {
        assert_eq!(get_mad(&[], 25), None);
        assert_eq!(get_mad(&[0.3], 25), None);
        assert_eq!(get_mad(&[0.0, 0.3, 0.0], 25), None);
    }

    #[test]
    fn test_noise_floor() {
        let estimator = NoiseEstimator::default();

        // constant track has no residual variance
        let sdev = estimator.estimate_sdev(&[0.5; 100]);
        approx::assert_ulps_eq!(sdev, DEFAULT_MIN_NOISE_SDEV, max_ulps = 4);

        // undefined estimate is also floored
        let sdev = estimator.estimate_sdev(&[0.3]);
        approx::assert_ulps_eq!(sdev, DEFAULT_MIN_NOISE_SDEV, max_ulps = 4);
    }

    #[test]
    fn test_noisy_track_above_floor() {
        let estimator = NoiseEstimator::default();
        let bafs = (0..500)
            .map(|i| 0.3 + 0.4 * (((i * 7919) % 101) as f64 / 100.0 - 0.5))
            .collect::<Vec<_>>();
        let sdev = estimator.estimate_sdev(&bafs);
        assert!(sdev > DEFAULT_MIN_NOISE_SDEV);
    }
}
