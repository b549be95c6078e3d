//! Two-pass segmentation of phased BAF tracks
//!
//! The first (short) pass only resolves the haplotype phase of each SNP. The second pass segments
//! the phase-corrected track, after which each segment value is recomputed with a robust statistic.
//!

mod segment_value;

use std::ops::Range;
use std::sync::mpsc::channel;

use log::{debug, info};
use serde::Serialize;
use thousands::Separable;

pub use self::segment_value::{SegmentValueStatistic, get_adjusted_segment_bafs, get_value_runs};
use crate::baf_input::{ChromBafTrack, GenomeBafTrack};
use crate::log_utils::debug_msg;
use crate::noise_estimate::NoiseEstimator;
use crate::pcf::PiecewiseConstantFit;
use crate::presegment::{
    BreakpointInterval, get_chrom_presegment_intervals, get_interval_index_ranges,
};
use crate::stats_utils::mean;
use crate::sv_input::GenomeSvPositions;

/// Intervals with fewer SNPs than this are assigned their mean value instead of being segmented
pub const DEFAULT_MIN_PCF_SNP_COUNT: usize = 50;

/// Parameters controlling both segmentation passes
#[derive(Clone, Debug, Serialize)]
pub struct SegmentationParams {
    /// Penalty multiplier for the final segmentation pass
    pub gamma: f64,

    /// Minimum segment length for the final segmentation pass
    pub kmin: usize,

    /// Penalty multiplier for the phase correction pass
    pub phase_gamma: f64,

    /// Minimum segment length for the phase correction pass
    pub phase_kmin: usize,

    pub segment_value_statistic: SegmentValueStatistic,

    /// Skip the final segmentation pass, so that each interval is reported as a single segment
    pub no_segmentation: bool,

    /// Flip the phase of SNPs again when their final segment value is not above 0.5
    pub reresolve_phase: bool,

    pub min_pcf_snp_count: usize,

    pub noise_estimator: NoiseEstimator,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            gamma: 10.0,
            kmin: 3,
            phase_gamma: 3.0,
            phase_kmin: 3,
            segment_value_statistic: SegmentValueStatistic::Median,
            no_segmentation: false,
            reresolve_phase: false,
            min_pcf_snp_count: DEFAULT_MIN_PCF_SNP_COUNT,
            noise_estimator: NoiseEstimator::default(),
        }
    }
}

/// Describes how each chromosome is divided before segmentation
pub enum PresegmentMode<'a> {
    /// Segment each chromosome as a single unit
    WholeChromosome,

    /// Segment independently within intervals defined by SV breakpoints and large SNP gaps
    Presegmented {
        sv_positions: &'a GenomeSvPositions,
        max_snp_distance: i64,
    },
}

/// Per-SNP segmentation values for one chromosome, or any part of one
///
/// All vectors have the same length, one entry per SNP in position order.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentedBafTrack {
    pub positions: Vec<i64>,

    /// Input BAF
    pub bafs: Vec<f64>,

    /// BAF after haplotype phase correction
    pub phased_bafs: Vec<f64>,

    /// Value of the segment containing each SNP
    pub segment_bafs: Vec<f64>,
}

impl SegmentedBafTrack {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn append(&mut self, mut other: Self) {
        self.positions.append(&mut other.positions);
        self.bafs.append(&mut other.bafs);
        self.phased_bafs.append(&mut other.phased_bafs);
        self.segment_bafs.append(&mut other.segment_bafs);
    }
}

/// Hooks called at the two diagnostic points of each chromosome segmentation
pub trait SegmentationObserver: Sync {
    /// Called with the final segmentation fit, before segment values are recomputed
    fn before_adjustment(&self, chrom_label: &str, track: &SegmentedBafTrack);

    /// Called with the completed chromosome result
    fn after_adjustment(&self, chrom_label: &str, track: &SegmentedBafTrack);
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ChromSegmentationStats {
    pub snp_count: usize,
    pub interval_count: usize,

    /// Intervals assigned a single mean value because they were too short to segment
    pub short_interval_count: usize,

    pub segment_count: usize,
}

pub struct ChromSegmentationResult {
    pub chrom_label: String,
    pub track: SegmentedBafTrack,
    pub stats: ChromSegmentationStats,
}

/// Fitted value at every position of `values`, or the mean of `values` for short tracks
fn fit_or_mean(
    pcf: &dyn PiecewiseConstantFit,
    values: &[f64],
    min_pcf_snp_count: usize,
    kmin: usize,
    gamma: f64,
    skip_fit: bool,
) -> Vec<f64> {
    if values.len() < min_pcf_snp_count || skip_fit {
        vec![mean(values); values.len()]
    } else {
        pcf.fit(values, kmin, gamma)
    }
}

/// Runs the phase correction and final segmentation passes over single intervals
pub struct IntervalSegmenter<'a> {
    params: &'a SegmentationParams,
    pcf: &'a dyn PiecewiseConstantFit,
}

impl<'a> IntervalSegmenter<'a> {
    pub fn new(params: &'a SegmentationParams, pcf: &'a dyn PiecewiseConstantFit) -> Self {
        Self { params, pcf }
    }

    /// Resolve the haplotype phase of each SNP in an interval
    ///
    /// A short segmentation pass over the raw BAF decides whether each SNP sits on the side of 0.5
    /// it was reported on. SNPs are flipped to `1 - BAF` unless the fitted value is above 0.5.
    ///
    pub fn get_phased_bafs(&self, bafs: &[f64]) -> Vec<f64> {
        let sdev = self.params.noise_estimator.estimate_sdev(bafs);
        let fit = fit_or_mean(
            self.pcf,
            bafs,
            self.params.min_pcf_snp_count,
            self.params.phase_kmin,
            self.params.phase_gamma * sdev,
            false,
        );
        bafs.iter()
            .zip(fit)
            .map(|(&baf, f)| if f > 0.5 { baf } else { 1.0 - baf })
            .collect()
    }

    /// Run the final segmentation pass over the phase-corrected BAF of an interval
    ///
    /// Returns the provisional segment value of each SNP. When phase re-resolution is enabled,
    /// `phased_bafs` is also updated for SNPs flipped by the final fit.
    ///
    pub fn get_segment_bafs(&self, phased_bafs: &mut [f64]) -> Vec<f64> {
        let sdev = self.params.noise_estimator.estimate_sdev(phased_bafs);
        let mut fit = fit_or_mean(
            self.pcf,
            phased_bafs,
            self.params.min_pcf_snp_count,
            self.params.kmin,
            self.params.gamma * sdev,
            self.params.no_segmentation,
        );

        if self.params.reresolve_phase {
            for (baf, f) in phased_bafs.iter_mut().zip(fit.iter_mut()) {
                if *f <= 0.5 {
                    *baf = 1.0 - *baf;
                    *f = 1.0 - *f;
                }
            }
        }
        fit
    }

    /// Run both segmentation passes over one interval
    ///
    /// Segment values are left as the provisional values of the final fit.
    ///
    pub fn segment_interval(&self, positions: &[i64], bafs: &[f64]) -> SegmentedBafTrack {
        assert_eq!(positions.len(), bafs.len());
        let mut phased_bafs = self.get_phased_bafs(bafs);
        let segment_bafs = self.get_segment_bafs(&mut phased_bafs);
        SegmentedBafTrack {
            positions: positions.to_vec(),
            bafs: bafs.to_vec(),
            phased_bafs,
            segment_bafs,
        }
    }
}

/// Segment the BAF track of one chromosome
///
/// Intervals are segmented independently and concatenated in position order, so no segment ever
/// spans an interval boundary.
///
pub fn segment_chrom_bafs(
    chrom_track: &ChromBafTrack,
    mode: &PresegmentMode,
    params: &SegmentationParams,
    pcf: &dyn PiecewiseConstantFit,
    observer: Option<&dyn SegmentationObserver>,
) -> ChromSegmentationResult {
    let debug = false;

    let positions = &chrom_track.positions;
    let intervals = match mode {
        PresegmentMode::WholeChromosome => {
            if positions.is_empty() {
                Vec::new()
            } else {
                vec![BreakpointInterval {
                    start: positions[0],
                    end: positions[positions.len() - 1],
                }]
            }
        }
        PresegmentMode::Presegmented {
            sv_positions,
            max_snp_distance,
        } => get_chrom_presegment_intervals(
            positions,
            sv_positions.get_chrom_positions(&chrom_track.label),
            *max_snp_distance,
        ),
    };
    let index_ranges = get_interval_index_ranges(positions, &intervals);

    let segmenter = IntervalSegmenter::new(params, pcf);
    let mut stats = ChromSegmentationStats {
        snp_count: positions.len(),
        interval_count: intervals.len(),
        ..Default::default()
    };
    let mut track = SegmentedBafTrack::default();
    for (interval, range) in intervals.iter().zip(index_ranges.iter()) {
        debug_msg!(
            debug,
            "Segmenting {} interval {}-{} with {} SNPs",
            chrom_track.label,
            interval.start,
            interval.end,
            range.len()
        );
        debug_assert!(positions[range.clone()].iter().all(|&p| interval.contains(p)));
        if range.len() < params.min_pcf_snp_count {
            stats.short_interval_count += 1;
        }
        let interval_track = segmenter.segment_interval(
            &positions[range.clone()],
            &chrom_track.bafs[range.clone()],
        );
        track.append(interval_track);
    }

    // Every SNP must be assigned to exactly one interval
    assert_eq!(track.len(), positions.len());

    if let Some(observer) = observer {
        observer.before_adjustment(&chrom_track.label, &track);
    }

    stats.segment_count = adjust_interval_segment_bafs(
        &mut track,
        &index_ranges,
        params.segment_value_statistic,
    );

    if let Some(observer) = observer {
        observer.after_adjustment(&chrom_track.label, &track);
    }

    ChromSegmentationResult {
        chrom_label: chrom_track.label.clone(),
        track,
        stats,
    }
}

/// Recompute segment values separately within each interval of the track
///
/// Returns the total segment count
///
fn adjust_interval_segment_bafs(
    track: &mut SegmentedBafTrack,
    index_ranges: &[Range<usize>],
    statistic: SegmentValueStatistic,
) -> usize {
    let mut segment_count = 0;
    for range in index_ranges.iter() {
        let phased_bafs = &track.phased_bafs[range.clone()];
        let segment_bafs = &mut track.segment_bafs[range.clone()];
        segment_count += get_value_runs(segment_bafs).len();
        let adjusted = get_adjusted_segment_bafs(phased_bafs, segment_bafs, statistic);
        segment_bafs.copy_from_slice(&adjusted);
    }
    segment_count
}

/// Segment the BAF tracks of all chromosomes
///
/// Chromosomes are processed in parallel on `thread_count` worker threads. Results are returned in
/// the input chromosome order.
///
pub fn segment_genome_bafs(
    thread_count: usize,
    genome_track: &GenomeBafTrack,
    mode: &PresegmentMode,
    params: &SegmentationParams,
    pcf: &dyn PiecewiseConstantFit,
    observer: Option<&dyn SegmentationObserver>,
) -> Vec<ChromSegmentationResult> {
    info!(
        "Segmenting BAF track over {} chromosomes",
        genome_track.chroms.len()
    );
    debug!("Segmentation parameters: {params:?}");

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let (tx, rx) = channel();
    worker_pool.scope(move |scope| {
        for (chrom_index, chrom_track) in genome_track.chroms.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = segment_chrom_bafs(chrom_track, mode, params, pcf, observer);
                tx.send((chrom_index, result)).unwrap();
            });
        }
    });

    let mut results = rx.into_iter().collect::<Vec<_>>();
    results.sort_by_key(|x| x.0);

    for (_, result) in results.iter() {
        let stats = &result.stats;
        info!(
            "Chromosome {}: {} SNPs in {} intervals, {} segments",
            result.chrom_label,
            stats.snp_count.separate_with_commas(),
            stats.interval_count,
            stats.segment_count
        );
    }

    results.into_iter().map(|x| x.1).collect()
}
