//! Split a chromosome into intervals which are segmented independently
//!
//! Intervals are seeded by SV breakpoints and by large gaps between consecutive SNPs, such as those
//! spanning centromeres.
//!

use std::ops::Range;

use itertools::Itertools;
use serde::Serialize;

/// Consecutive SNPs at least this far apart are always placed in separate intervals
pub const DEFAULT_MAX_SNP_DISTANCE: i64 = 3_000_000;

/// A range of chromosome positions segmented as one independent unit
///
/// Both `start` and `end` are included in the interval.
///
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BreakpointInterval {
    pub start: i64,
    pub end: i64,
}

impl BreakpointInterval {
    pub fn contains(&self, pos: i64) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// Add intervals covering `positions`, starting at `start` and closing at `end`, with an extra
/// interval boundary at each large gap between consecutive positions
///
fn add_gap_split_intervals(
    positions: &[i64],
    start: i64,
    end: i64,
    max_snp_distance: i64,
    intervals: &mut Vec<BreakpointInterval>,
) {
    let mut start = start;
    for (&left, &right) in positions.iter().tuple_windows() {
        if right - left >= max_snp_distance {
            intervals.push(BreakpointInterval { start, end: left });
            start = right;
        }
    }
    intervals.push(BreakpointInterval { start, end });
}

/// Get the presegmentation intervals for one chromosome
///
/// # Arguments
/// * `positions` - SNP positions of the chromosome in ascending order
/// * `sv_positions` - SV breakpoint positions on the chromosome, in any order
/// * `max_snp_distance` - Gap size between consecutive SNPs which always triggers a new interval
///
/// Intervals are returned in ascending order, are pairwise disjoint, and every SNP position falls
/// in exactly one of them. An interval may contain no SNPs if the first SV breakpoint precedes all
/// SNPs.
///
pub fn get_chrom_presegment_intervals(
    positions: &[i64],
    sv_positions: &[i64],
    max_snp_distance: i64,
) -> Vec<BreakpointInterval> {
    let mut intervals = Vec::new();
    if positions.is_empty() {
        return intervals;
    }
    let last_pos = positions[positions.len() - 1];

    let mut sv_positions = sv_positions.to_vec();
    sv_positions.sort_unstable();
    sv_positions.dedup();

    if sv_positions.is_empty() {
        add_gap_split_intervals(
            positions,
            positions[0],
            last_pos,
            max_snp_distance,
            &mut intervals,
        );
        return intervals;
    }

    // The first interval always closes at the first breakpoint
    let first_sv_pos = sv_positions[0];
    let first_start = std::cmp::min(positions[0], first_sv_pos);
    let mut next_index = positions.partition_point(|&p| p <= first_sv_pos);
    add_gap_split_intervals(
        &positions[..next_index],
        first_start,
        first_sv_pos,
        max_snp_distance,
        &mut intervals,
    );

    for &sv_pos in sv_positions.iter().skip(1) {
        if next_index == positions.len() {
            break;
        }
        let end_index = positions.partition_point(|&p| p <= sv_pos);
        if end_index <= next_index {
            // No SNPs between the current start and this breakpoint
            continue;
        }
        add_gap_split_intervals(
            &positions[next_index..end_index],
            positions[next_index],
            positions[end_index - 1],
            max_snp_distance,
            &mut intervals,
        );
        next_index = end_index;
    }

    if next_index < positions.len() {
        add_gap_split_intervals(
            &positions[next_index..],
            positions[next_index],
            last_pos,
            max_snp_distance,
            &mut intervals,
        );
    }

    intervals
}

/// Translate intervals into ranges of SNP indices over `positions`
///
pub fn get_interval_index_ranges(
    positions: &[i64],
    intervals: &[BreakpointInterval],
) -> Vec<Range<usize>> {
    intervals
        .iter()
        .map(|x| {
            let begin = positions.partition_point(|&p| p < x.start);
            let end = positions.partition_point(|&p| p <= x.end);
            begin..std::cmp::max(begin, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bi(start: i64, end: i64) -> BreakpointInterval {
        BreakpointInterval { start, end }
    }

    /// Check that intervals are ordered, disjoint and place every position exactly once
    fn check_interval_partition(positions: &[i64], intervals: &[BreakpointInterval]) {
        for (a, b) in intervals.iter().tuple_windows() {
            assert!(a.start <= a.end);
            assert!(a.end < b.start);
        }
        for &pos in positions {
            assert_eq!(intervals.iter().filter(|x| x.contains(pos)).count(), 1);
        }
        let ranges = get_interval_index_ranges(positions, intervals);
        let total = ranges.iter().map(|x| x.len()).sum::<usize>();
        assert_eq!(total, positions.len());
    }

    fn get_test_positions() -> Vec<i64> {
        (1..=10).map(|x| x * 100).collect()
    }

    #[test]
    fn test_no_svs() {
        let positions = get_test_positions();
        let intervals =
            get_chrom_presegment_intervals(&positions, &[], DEFAULT_MAX_SNP_DISTANCE);
        assert_eq!(intervals, vec![bi(100, 1000)]);
    }

    #[test]
    fn test_no_snps() {
        let intervals = get_chrom_presegment_intervals(&[], &[500], DEFAULT_MAX_SNP_DISTANCE);
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_gap_split_boundary() {
        let positions = [100, 200, 3_000_200, 3_000_300];
        let intervals =
            get_chrom_presegment_intervals(&positions, &[], DEFAULT_MAX_SNP_DISTANCE);
        assert_eq!(intervals, vec![bi(100, 200), bi(3_000_200, 3_000_300)]);

        // One base closer than the gap threshold
        let positions = [100, 200, 3_000_199, 3_000_300];
        let intervals =
            get_chrom_presegment_intervals(&positions, &[], DEFAULT_MAX_SNP_DISTANCE);
        assert_eq!(intervals, vec![bi(100, 3_000_300)]);
    }

    #[test]
    fn test_svs() {
        let positions = get_test_positions();
        let intervals =
            get_chrom_presegment_intervals(&positions, &[750, 450], DEFAULT_MAX_SNP_DISTANCE);
        assert_eq!(intervals, vec![bi(100, 450), bi(500, 700), bi(800, 1000)]);
        check_interval_partition(&positions, &intervals);
    }

    #[test]
    fn test_sv_on_snp_position() {
        let positions = get_test_positions();
        let intervals =
            get_chrom_presegment_intervals(&positions, &[400, 700], DEFAULT_MAX_SNP_DISTANCE);
        assert_eq!(intervals, vec![bi(100, 400), bi(500, 700), bi(800, 1000)]);
    }

    #[test]
    fn test_sv_before_first_snp() {
        let positions = get_test_positions();
        let intervals =
            get_chrom_presegment_intervals(&positions, &[50, 450], DEFAULT_MAX_SNP_DISTANCE);
        assert_eq!(intervals, vec![bi(50, 50), bi(100, 400), bi(500, 1000)]);
        check_interval_partition(&positions, &intervals);

        let ranges = get_interval_index_ranges(&positions, &intervals);
        assert!(ranges[0].is_empty());
    }

    #[test]
    fn test_sv_without_snps_is_skipped() {
        let positions = get_test_positions();
        let intervals = get_chrom_presegment_intervals(
            &positions,
            &[450, 460, 470, 750],
            DEFAULT_MAX_SNP_DISTANCE,
        );
        assert_eq!(intervals, vec![bi(100, 450), bi(500, 700), bi(800, 1000)]);
    }

    #[test]
    fn test_svs_after_last_snp() {
        let positions = get_test_positions();
        let intervals = get_chrom_presegment_intervals(
            &positions,
            &[450, 2000, 3000],
            DEFAULT_MAX_SNP_DISTANCE,
        );
        assert_eq!(intervals, vec![bi(100, 450), bi(500, 1000)]);
    }

    #[test]
    fn test_svs_with_gap_split() {
        let positions = [100, 200, 300, 5_000_000, 5_000_100, 9_000_000, 9_000_100];
        let intervals =
            get_chrom_presegment_intervals(&positions, &[150, 9_000_050], 3_000_000);
        assert_eq!(
            intervals,
            vec![
                bi(100, 150),
                bi(200, 300),
                bi(5_000_000, 5_000_100),
                bi(9_000_000, 9_000_000),
                bi(9_000_100, 9_000_100),
            ]
        );
        check_interval_partition(&positions, &intervals);
    }

    #[test]
    fn test_partition_property() {
        let positions = (0..500)
            .scan(0i64, |pos, i| {
                *pos += if i % 97 == 0 { 3_500_000 } else { 1 + (i * 31) % 500 };
                Some(*pos)
            })
            .collect::<Vec<_>>();
        let sv_positions = [1_000, 20_000_000, 3_600_000, 3_600_000, 9_000_000, 80_000];
        let intervals =
            get_chrom_presegment_intervals(&positions, &sv_positions, DEFAULT_MAX_SNP_DISTANCE);
        check_interval_partition(&positions, &intervals);
    }
}
