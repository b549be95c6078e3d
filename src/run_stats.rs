//! Track stats for the whole bafseg run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use unwrap::unwrap;

use crate::baf_input::BafInputStats;
use crate::baf_segmentation::{ChromSegmentationResult, ChromSegmentationStats};
use crate::segment_baf::RUN_STATS_FILENAME;

#[derive(Serialize)]
pub struct ChromRunStats {
    pub chrom_label: String,

    #[serde(flatten)]
    pub stats: ChromSegmentationStats,
}

#[derive(Default, Serialize)]
pub struct SegmentationRunStats {
    pub input_stats: BafInputStats,

    /// Count of SV breakpoints read from the SV table, if any
    pub sv_breakpoint_count: Option<usize>,

    pub segmented_snp_count: usize,
    pub total_segment_count: usize,
    pub chrom_stats: Vec<ChromRunStats>,

    pub total_segmentation_time_secs: f64,
}

impl SegmentationRunStats {
    pub fn add_chrom_results(&mut self, results: &[ChromSegmentationResult]) {
        for result in results.iter() {
            self.segmented_snp_count += result.track.len();
            self.total_segment_count += result.stats.segment_count;
            self.chrom_stats.push(ChromRunStats {
                chrom_label: result.chrom_label.clone(),
                stats: result.stats.clone(),
            });
        }
    }
}

/// Write run_stats structure out in json format
pub fn write_run_stats(output_dir: &Utf8Path, run_stats: &SegmentationRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
