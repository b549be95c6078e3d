use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::stats_utils::median;

/// Statistic used to report the BAF value of each segment
///
/// Discriminants match the numeric option codes accepted on the command line.
///
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display, strum::FromRepr,
)]
#[repr(u8)]
pub enum SegmentValueStatistic {
    /// Median of the phased BAF values in the segment
    Median = 1,
    /// Keep the segment mean reported by the segmentation fit
    Mean = 2,
}

impl SegmentValueStatistic {
    /// Translate a numeric option code into a segment statistic
    ///
    /// Unrecognized codes are not fatal, a warning is logged and the mean is used.
    ///
    pub fn from_option_code(code: u8) -> Self {
        match Self::from_repr(code) {
            Some(x) => x,
            None => {
                warn!(
                    "Unrecognized segment BAF option '{code}', segment values will be reported as the segmentation mean"
                );
                Self::Mean
            }
        }
    }
}

/// Reduce a track to (value, run length) pairs over maximal runs of equal consecutive values
///
pub fn get_value_runs(values: &[f64]) -> Vec<(f64, usize)> {
    let runs = values.iter().chunk_by(|&&x| x);
    runs.into_iter().map(|(x, run)| (x, run.count())).collect()
}

/// Recompute segment values from the phased BAF values of each segment
///
/// Each maximal run of equal `segment_bafs` values is treated as one segment.
///
/// Returns the adjusted segment value for every position
///
pub fn get_adjusted_segment_bafs(
    phased_bafs: &[f64],
    segment_bafs: &[f64],
    statistic: SegmentValueStatistic,
) -> Vec<f64> {
    assert_eq!(phased_bafs.len(), segment_bafs.len());

    let mut run_start = 0;
    get_value_runs(segment_bafs)
        .into_iter()
        .flat_map(|(value, run_len)| {
            let run = run_start..(run_start + run_len);
            run_start += run_len;
            let value = match statistic {
                SegmentValueStatistic::Median => median(&phased_bafs[run]),
                SegmentValueStatistic::Mean => value,
            };
            std::iter::repeat_n(value, run_len)
        })
        .collect()
}
