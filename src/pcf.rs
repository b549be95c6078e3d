//! Piecewise constant fitting (PCF) of a one dimensional signal
//!
//! The segmentation engine only depends on the [PiecewiseConstantFit] trait, so alternate fitting
//! methods can be swapped in without touching the orchestration logic.
//!

use crate::stats_utils::mean;

/// One segment of a piecewise constant fit, covering input values `start..start + len`
#[derive(Clone, Debug, PartialEq)]
pub struct PcfSegment {
    pub start: usize,
    pub len: usize,
    pub mean: f64,
}

/// Expand segments into one fitted value per input position
pub fn expand_segments(segments: &[PcfSegment]) -> Vec<f64> {
    segments
        .iter()
        .flat_map(|s| std::iter::repeat_n(s.mean, s.len))
        .collect()
}

pub trait PiecewiseConstantFit: Sync {
    /// Partition `values` into contiguous segments
    ///
    /// # Arguments
    /// * `kmin` - Minimum number of values in each segment
    /// * `gamma` - Penalty for each additional segment, larger values give fewer segments
    ///
    /// Segments are returned in order and cover all input values. Identical input must always
    /// produce identical output.
    ///
    fn fit_segments(&self, values: &[f64], kmin: usize, gamma: f64) -> Vec<PcfSegment>;

    /// Fitted value at every input position
    fn fit(&self, values: &[f64], kmin: usize, gamma: f64) -> Vec<f64> {
        expand_segments(&self.fit_segments(values, kmin, gamma))
    }
}

/// Return the whole input as one segment
fn single_segment(values: &[f64]) -> Vec<PcfSegment> {
    if values.is_empty() {
        return Vec::new();
    }
    vec![PcfSegment {
        start: 0,
        len: values.len(),
        mean: mean(values),
    }]
}

/// A segment start that is still under consideration by the optimal partitioning recursion
struct StartCandidate {
    boundary: usize,

    /// Boundary at which this candidate was shown to be suboptimal. It can still be used for any
    /// segment end less than `kmin` values beyond this point.
    pruned_at: Option<usize>,
}

/// Minimize the penalized least-squares cost over segmentations of `values`
///
/// Segment boundaries are restricted to the exclusive block ends given in `block_ends`, the last
/// of which must be `values.len()`. Every segment contains at least `kmin` values.
///
/// Cost of a segment with sum `S` over `n` values is `-S^2/n`, plus `gamma` per segment.
/// Candidate starts are pruned as in PELT, except that a pruned start is kept until the pruning
/// boundary itself becomes a legal start, which keeps the result exact under the minimum length
/// restriction.
///
fn segment_blocks(
    values: &[f64],
    block_ends: &[usize],
    kmin: usize,
    gamma: f64,
) -> Vec<PcfSegment> {
    let block_count = block_ends.len();
    assert_eq!(block_ends.last().copied(), Some(values.len()));

    // Prefix value counts and sums at each block boundary
    let mut count = Vec::with_capacity(block_count + 1);
    let mut sum = Vec::with_capacity(block_count + 1);
    count.push(0);
    sum.push(0.0);
    let mut last_end = 0;
    let mut total = 0.0;
    for &end in block_ends {
        assert!(end > last_end);
        total += values[last_end..end].iter().sum::<f64>();
        count.push(end);
        sum.push(total);
        last_end = end;
    }

    let segment_cost = |start: usize, end: usize| {
        let s = sum[end] - sum[start];
        -(s * s) / ((count[end] - count[start]) as f64)
    };

    let mut best = vec![f64::INFINITY; block_count + 1];
    let mut back_pointer = vec![0usize; block_count + 1];
    best[0] = 0.0;

    let mut candidates: Vec<StartCandidate> = Vec::new();
    let mut next_boundary = 0;
    for end in 1..=block_count {
        while next_boundary < end && count[end] - count[next_boundary] >= kmin {
            if best[next_boundary].is_finite() {
                candidates.push(StartCandidate {
                    boundary: next_boundary,
                    pruned_at: None,
                });
            }
            next_boundary += 1;
        }

        candidates.retain(|c| c.pruned_at.is_none_or(|p| count[end] - count[p] < kmin));

        let mut end_best = f64::INFINITY;
        let mut end_back = 0;
        for c in candidates.iter() {
            let score = best[c.boundary] + segment_cost(c.boundary, end) + gamma;
            if score < end_best {
                end_best = score;
                end_back = c.boundary;
            }
        }
        best[end] = end_best;
        back_pointer[end] = end_back;

        if end_best.is_finite() {
            for c in candidates.iter_mut().filter(|c| c.pruned_at.is_none()) {
                if best[c.boundary] + segment_cost(c.boundary, end) > end_best {
                    c.pruned_at = Some(end);
                }
            }
        }
    }

    assert!(best[block_count].is_finite());

    let mut segments = Vec::new();
    let mut end = block_count;
    while end > 0 {
        let start = back_pointer[end];
        let start_pos = count[start];
        let end_pos = count[end];
        segments.push(PcfSegment {
            start: start_pos,
            len: end_pos - start_pos,
            mean: mean(&values[start_pos..end_pos]),
        });
        end = start;
    }
    segments.reverse();
    segments
}

/// Exact penalized least-squares PCF
///
/// Any position can be a segment boundary. Runtime is quadratic in the worst case, so this is
/// mostly useful on shorter tracks.
///
#[derive(Clone, Default)]
pub struct ExactPcf;

impl PiecewiseConstantFit for ExactPcf {
    fn fit_segments(&self, values: &[f64], kmin: usize, gamma: f64) -> Vec<PcfSegment> {
        let kmin = kmin.max(1);
        if values.len() < 2 * kmin {
            return single_segment(values);
        }
        let block_ends = (1..=values.len()).collect::<Vec<_>>();
        segment_blocks(values, &block_ends, kmin, gamma)
    }
}

/// Segment gain threshold used to mark candidate boundaries, as a fraction of gamma
const MARK_GAIN_FRACTION: f64 = 0.25;

/// Number of doublings of the boundary scan window above kmin
const MARK_SCALE_COUNT: u32 = 5;

/// Find candidate segment boundaries in `values`
///
/// At each scan scale `L`, a boundary is marked where the difference between the means of the `L`
/// values on either side is a local maximum and large enough that splitting two such flanks would
/// recover a meaningful fraction of `gamma`.
///
/// Returns sorted exclusive block ends, always including `values.len()`
///
fn mark_candidate_boundaries(values: &[f64], kmin: usize, gamma: f64) -> Vec<usize> {
    let n = values.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for v in values {
        prefix.push(prefix.last().unwrap() + v);
    }

    let mut is_marked = vec![false; n + 1];
    is_marked[n] = true;

    let mut diffs = vec![0.0; n + 1];
    for scale_index in 0..MARK_SCALE_COUNT {
        let scale = kmin << scale_index;
        if 2 * scale > n {
            break;
        }
        let min_diff = (2.0 * gamma * MARK_GAIN_FRACTION / scale as f64).sqrt();

        for i in scale..=(n - scale) {
            let left = (prefix[i] - prefix[i - scale]) / scale as f64;
            let right = (prefix[i + scale] - prefix[i]) / scale as f64;
            diffs[i] = (left - right).abs();
        }

        let half_window = std::cmp::max(scale / 2, 1);
        for i in scale..=(n - scale) {
            if diffs[i] < min_diff {
                continue;
            }
            let lo = std::cmp::max(i.saturating_sub(half_window), scale);
            let hi = std::cmp::min(i + half_window, n - scale);
            let is_local_max = (lo..=hi).all(|j| {
                diffs[j] < diffs[i] || (diffs[j] == diffs[i] && j >= i)
            });
            if is_local_max {
                is_marked[i] = true;
            }
        }
    }

    is_marked
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, &m)| if m { Some(i) } else { None })
        .collect()
}

pub const DEFAULT_MAX_EXACT_PCF_LEN: usize = 1000;

/// PCF using the exact method for short tracks, and a compacted version of the same method for
/// long tracks
///
/// The compacted method first marks candidate boundaries with a multi-scale step filter, then
/// solves the exact recursion over the resulting blocks.
///
#[derive(Clone)]
pub struct SelectPcf {
    pub max_exact_len: usize,
}

impl Default for SelectPcf {
    fn default() -> Self {
        Self {
            max_exact_len: DEFAULT_MAX_EXACT_PCF_LEN,
        }
    }
}

impl PiecewiseConstantFit for SelectPcf {
    fn fit_segments(&self, values: &[f64], kmin: usize, gamma: f64) -> Vec<PcfSegment> {
        let kmin = kmin.max(1);
        if values.len() < self.max_exact_len {
            return ExactPcf.fit_segments(values, kmin, gamma);
        }
        if values.len() < 2 * kmin {
            return single_segment(values);
        }
        let block_ends = mark_candidate_boundaries(values, kmin, gamma);
        segment_blocks(values, &block_ends, kmin, gamma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic noise in [-amplitude, amplitude]
    fn get_test_noise(len: usize, amplitude: f64) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * (2.0 * ((i * 7919 + 13) % 101) as f64 / 100.0 - 1.0))
            .collect()
    }

    /// Reference optimal partitioning without any pruning
    fn unpruned_segment_cost(values: &[f64], kmin: usize, gamma: f64) -> f64 {
        let n = values.len();
        let mut prefix = vec![0.0];
        for v in values {
            prefix.push(prefix.last().unwrap() + v);
        }
        let mut best = vec![f64::INFINITY; n + 1];
        best[0] = 0.0;
        for end in kmin..=n {
            for start in 0..=(end - kmin) {
                if !best[start].is_finite() {
                    continue;
                }
                let s = prefix[end] - prefix[start];
                let score = best[start] - (s * s) / (end - start) as f64 + gamma;
                if score < best[end] {
                    best[end] = score;
                }
            }
        }
        best[n]
    }

    fn get_segment_cost(values: &[f64], segments: &[PcfSegment], gamma: f64) -> f64 {
        segments
            .iter()
            .map(|s| {
                let total = values[s.start..(s.start + s.len)].iter().sum::<f64>();
                -(total * total) / s.len as f64 + gamma
            })
            .sum()
    }

    #[test]
    fn test_expand_segments() {
        let segments = vec![
            PcfSegment {
                start: 0,
                len: 2,
                mean: 0.1,
            },
            PcfSegment {
                start: 2,
                len: 1,
                mean: 0.7,
            },
        ];
        assert_eq!(expand_segments(&segments), vec![0.1, 0.1, 0.7]);
    }

    #[test]
    fn test_exact_pcf_empty_and_short() {
        assert!(ExactPcf.fit_segments(&[], 3, 1.0).is_empty());

        let segments = ExactPcf.fit_segments(&[0.1, 0.9, 0.1, 0.9, 0.1], 3, 0.0);
        assert_eq!(segments.len(), 1);
        approx::assert_abs_diff_eq!(segments[0].mean, 0.42, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_pcf_step() {
        let mut values = vec![0.2; 10];
        values.extend(vec![0.8; 10]);
        let segments = ExactPcf.fit_segments(&values, 3, 0.1);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len, 10);
        approx::assert_ulps_eq!(segments[0].mean, 0.2, max_ulps = 4);
        approx::assert_ulps_eq!(segments[1].mean, 0.8, max_ulps = 4);

        let fit = ExactPcf.fit(&values, 3, 0.1);
        assert_eq!(fit.len(), values.len());
    }

    #[test]
    fn test_exact_pcf_flat() {
        let values = get_test_noise(200, 0.05)
            .into_iter()
            .map(|x| x + 0.5)
            .collect::<Vec<_>>();
        let segments = ExactPcf.fit_segments(&values, 3, 1.0);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_exact_pcf_min_length() {
        let mut values = vec![0.0; 10];
        values.extend([1.0, 1.0]);
        values.extend(vec![0.0; 10]);
        let segments = ExactPcf.fit_segments(&values, 3, 0.01);
        assert!(segments.iter().all(|s| s.len >= 3));
        assert_eq!(segments.iter().map(|s| s.len).sum::<usize>(), values.len());
    }

    #[test]
    fn test_exact_pcf_matches_unpruned() {
        let noise = get_test_noise(120, 0.2);
        let values = noise
            .iter()
            .enumerate()
            .map(|(i, x)| x + if (30..55).contains(&i) { 0.6 } else { 0.3 })
            .collect::<Vec<_>>();
        for kmin in [1, 3, 5] {
            for gamma in [0.05, 0.3, 1.0] {
                let segments = ExactPcf.fit_segments(&values, kmin, gamma);
                approx::assert_abs_diff_eq!(
                    get_segment_cost(&values, &segments, gamma),
                    unpruned_segment_cost(&values, kmin, gamma),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_select_pcf_long_step() {
        let mut values = vec![0.3; 1500];
        values.extend(vec![0.7; 1500]);
        let segments = SelectPcf::default().fit_segments(&values, 3, 0.5);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len, 1500);
        approx::assert_ulps_eq!(segments[1].mean, 0.7, max_ulps = 4);
    }

    #[test]
    fn test_mark_candidate_boundaries() {
        let mut values = vec![0.3; 100];
        values.extend(vec![0.9; 100]);
        let marks = mark_candidate_boundaries(&values, 3, 0.5);
        assert_eq!(marks, vec![100, 200]);
    }
}
