use std::error;

use camino::Utf8Path;
use log::info;

use crate::baf_input::read_baf_table;
use crate::baf_output::{DiagnosticTrackWriter, write_segmented_baf_table};
use crate::baf_segmentation::{
    PresegmentMode, SegmentationObserver, SegmentationParams, segment_genome_bafs,
};
use crate::cli;
use crate::pcf::SelectPcf;
use crate::run_stats::{SegmentationRunStats, write_run_stats};
use crate::sv_input::read_sv_table;

pub const DIAGNOSTIC_TRACK_DIRNAME: &str = "diagnostic_tracks";
pub const RUN_STATS_FILENAME: &str = "run.stats.json";
pub const SEGMENTED_BAF_FILENAME: &str = "baf.segmented.tsv";
pub const SETTINGS_FILENAME: &str = "segment.settings.json";

/// Segment all chromosomes in the BAF table and write results to `output_dir`
///
fn run_segmentation(
    shared_settings: &cli::SharedSettings,
    output_dir: &Utf8Path,
    baf_filename: &Utf8Path,
    mode: &PresegmentMode,
    params: &SegmentationParams,
    mut run_stats: SegmentationRunStats,
) -> Result<(), Box<dyn error::Error>> {
    let (genome_track, input_stats) = read_baf_table(baf_filename)?;
    run_stats.input_stats = input_stats;

    let diagnostic_track_writer = if shared_settings.debug_tracks {
        Some(DiagnosticTrackWriter::new(
            &output_dir.join(DIAGNOSTIC_TRACK_DIRNAME),
        ))
    } else {
        None
    };
    let observer = diagnostic_track_writer
        .as_ref()
        .map(|x| x as &dyn SegmentationObserver);

    let pcf = SelectPcf::default();
    let start = std::time::Instant::now();
    let results = segment_genome_bafs(
        shared_settings.thread_count,
        &genome_track,
        mode,
        params,
        &pcf,
        observer,
    );
    run_stats.total_segmentation_time_secs = start.elapsed().as_secs_f64();
    run_stats.add_chrom_results(&results);

    info!(
        "Finished segmentation with {} total segments",
        run_stats.total_segment_count
    );

    write_segmented_baf_table(&output_dir.join(SEGMENTED_BAF_FILENAME), &results);
    write_run_stats(output_dir, &run_stats);
    Ok(())
}

pub fn run_segment(
    shared_settings: &cli::SharedSettings,
    settings: &cli::SegmentSettings,
) -> Result<(), Box<dyn error::Error>> {
    cli::write_settings(&settings.output_dir, settings);

    let params = settings.segmentation.get_segmentation_params(false);
    run_segmentation(
        shared_settings,
        &settings.output_dir,
        &settings.baf_filename,
        &PresegmentMode::WholeChromosome,
        &params,
        SegmentationRunStats::default(),
    )
}

pub fn run_segment_sv(
    shared_settings: &cli::SharedSettings,
    settings: &cli::SegmentSvSettings,
) -> Result<(), Box<dyn error::Error>> {
    cli::write_settings(&settings.output_dir, settings);

    let sv_positions = read_sv_table(&settings.svs_filename)?;
    let run_stats = SegmentationRunStats {
        sv_breakpoint_count: Some(sv_positions.sv_count()),
        ..Default::default()
    };

    let params = settings
        .segmentation
        .get_segmentation_params(settings.no_segmentation);
    let mode = PresegmentMode::Presegmented {
        sv_positions: &sv_positions,
        max_snp_distance: settings.max_snp_distance,
    };
    run_segmentation(
        shared_settings,
        &settings.output_dir,
        &settings.baf_filename,
        &mode,
        &params,
        run_stats,
    )
}
