//! Write segmentation results
//!

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use unwrap::unwrap;

use crate::baf_segmentation::{
    ChromSegmentationResult, SegmentationObserver, SegmentedBafTrack, get_value_runs,
};
use crate::os_utils::create_dir_all;

const SEGMENTED_BAF_HEADER: [&str; 5] = ["Chromosome", "Position", "BAF", "BAFphased", "BAFseg"];

/// Write the per-SNP segmentation table
///
/// Rows are written in the given chromosome order, and in position order within each chromosome.
///
pub fn write_segmented_baf_table(filename: &Utf8Path, results: &[ChromSegmentationResult]) {
    info!("Writing segmented BAF table to file: '{filename}'");

    let f = unwrap!(
        File::create(filename),
        "Unable to create segmented BAF table file: '{filename}'"
    );
    let mut f = BufWriter::new(f);

    writeln!(f, "{}", SEGMENTED_BAF_HEADER.join("\t")).unwrap();
    for result in results.iter() {
        let track = &result.track;
        for i in 0..track.len() {
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}",
                result.chrom_label,
                track.positions[i],
                track.bafs[i],
                track.phased_bafs[i],
                track.segment_bafs[i]
            )
            .unwrap();
        }
    }
}

/// Write segment values of one chromosome track in bedgraph format
///
/// Each run of equal segment values is written as a single record spanning the first to last SNP of
/// the run.
///
fn write_segment_bedgraph(filename: &Utf8Path, chrom_label: &str, track: &SegmentedBafTrack) {
    let f = unwrap!(
        File::create(filename),
        "Unable to create bedgraph segment track file: '{filename}'"
    );
    let mut f = BufWriter::new(f);
    if track.is_empty() {
        return;
    }

    let mut run_start = 0;
    for (value, run_len) in get_value_runs(&track.segment_bafs) {
        let run_end = run_start + run_len;
        writeln!(
            f,
            "{}\t{}\t{}\t{}",
            chrom_label,
            track.positions[run_start] - 1,
            track.positions[run_end - 1],
            value
        )
        .unwrap();
        run_start = run_end;
    }
}

/// Writes per-chromosome bedgraph tracks of segment values before and after segment value
/// adjustment
pub struct DiagnosticTrackWriter {
    track_dir: Utf8PathBuf,
}

impl DiagnosticTrackWriter {
    pub fn new(track_dir: &Utf8Path) -> Self {
        info!("Writing diagnostic segmentation tracks to directory: '{track_dir}'");
        create_dir_all(track_dir, "diagnostic track");
        Self {
            track_dir: track_dir.to_owned(),
        }
    }

    fn get_track_filename(&self, chrom_label: &str, stage: &str) -> Utf8PathBuf {
        self.track_dir
            .join(format!("{chrom_label}.{stage}.bedgraph"))
    }
}

impl SegmentationObserver for DiagnosticTrackWriter {
    fn before_adjustment(&self, chrom_label: &str, track: &SegmentedBafTrack) {
        let filename = self.get_track_filename(chrom_label, "before_adjustment");
        write_segment_bedgraph(&filename, chrom_label, track);
    }

    fn after_adjustment(&self, chrom_label: &str, track: &SegmentedBafTrack) {
        let filename = self.get_track_filename(chrom_label, "after_adjustment");
        write_segment_bedgraph(&filename, chrom_label, track);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baf_segmentation::ChromSegmentationStats;
    use crate::utils::test_utils::get_test_dir;

    fn get_test_track() -> SegmentedBafTrack {
        SegmentedBafTrack {
            positions: vec![100, 200, 300],
            bafs: vec![0.3, 0.8, 0.9],
            phased_bafs: vec![0.7, 0.8, 0.9],
            segment_bafs: vec![0.75, 0.75, 0.9],
        }
    }

    #[test]
    fn test_write_segmented_baf_table() {
        let dir = get_test_dir("write_segmented_baf_table");
        let filename = dir.join("out.tsv");
        let results = vec![ChromSegmentationResult {
            chrom_label: "chr1".to_string(),
            track: get_test_track(),
            stats: ChromSegmentationStats::default(),
        }];
        write_segmented_baf_table(&filename, &results);

        let content = std::fs::read_to_string(&filename).unwrap();
        let lines = content.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Chromosome\tPosition\tBAF\tBAFphased\tBAFseg");
        assert_eq!(lines[1], "chr1\t100\t0.3\t0.7\t0.75");
    }

    #[test]
    fn test_diagnostic_tracks() {
        let dir = get_test_dir("diagnostic_tracks");
        let track_dir = dir.join("tracks");
        let writer = DiagnosticTrackWriter::new(&track_dir);
        writer.after_adjustment("chr1", &get_test_track());

        let content =
            std::fs::read_to_string(track_dir.join("chr1.after_adjustment.bedgraph")).unwrap();
        assert_eq!(content, "chr1\t99\t200\t0.75\nchr1\t299\t300\t0.9\n");
    }
}
