//! Read the per-SNP BAF input table
//!

use std::collections::HashMap;

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use simple_error::{SimpleResult, bail};
use thousands::Separable;

use crate::utils::open_tsv_reader;

const REQUIRED_BAF_COLUMNS: [&str; 3] = ["Chromosome", "Position", "BAF"];

/// BAF observations for one chromosome, in ascending position order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChromBafTrack {
    pub label: String,
    pub positions: Vec<i64>,
    pub bafs: Vec<f64>,
}

/// BAF observations for all chromosomes, in the order each chromosome is first found in the input
#[derive(Clone, Debug, Default)]
pub struct GenomeBafTrack {
    pub chroms: Vec<ChromBafTrack>,
}

impl GenomeBafTrack {
    pub fn snp_count(&self) -> usize {
        self.chroms.iter().map(|x| x.positions.len()).sum()
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BafInputStats {
    pub input_row_count: usize,

    /// Rows dropped because the BAF value was missing or not a finite number
    pub missing_baf_count: usize,

    /// Rows dropped because the BAF value was outside of [0,1]
    pub out_of_range_baf_count: usize,

    pub snp_count: usize,
}

enum BafValue {
    Valid(f64),
    Missing,
    OutOfRange,
}

fn parse_baf(s: &str) -> BafValue {
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() => {
            if (0.0..=1.0).contains(&x) {
                BafValue::Valid(x)
            } else {
                BafValue::OutOfRange
            }
        }
        _ => BafValue::Missing,
    }
}

/// Read the BAF table from `filename`
///
/// The first three header columns must be 'Chromosome', 'Position' and 'BAF'. Additional columns
/// are ignored. Rows with a missing or invalid BAF value are skipped and counted in the returned
/// stats, while a malformed position or a position decreasing within a chromosome is an error.
///
pub fn read_baf_table(filename: &Utf8Path) -> SimpleResult<(GenomeBafTrack, BafInputStats)> {
    info!("Reading BAF table from file: '{filename}'");

    let mut rdr = open_tsv_reader(filename, "BAF table")?;

    let headers = match rdr.headers() {
        Ok(x) => x.clone(),
        Err(e) => bail!(
            "Unable to read header from BAF table file '{}': {}",
            filename,
            e
        ),
    };
    for (index, &expected) in REQUIRED_BAF_COLUMNS.iter().enumerate() {
        if headers.get(index) != Some(expected) {
            bail!(
                "BAF table file '{}' must start with header columns: {}",
                filename,
                REQUIRED_BAF_COLUMNS.join(", ")
            );
        }
    }

    let mut genome_track = GenomeBafTrack::default();
    let mut chrom_index_map = HashMap::new();
    let mut stats = BafInputStats::default();

    for result in rdr.records() {
        let record = match result {
            Ok(x) => x,
            Err(e) => bail!(
                "Failed to parse record from BAF table file '{}': {}",
                filename,
                e
            ),
        };
        let line = record.position().map(|x| x.line()).unwrap_or(0);
        stats.input_row_count += 1;

        let (Some(chrom), Some(pos), Some(baf)) = (record.get(0), record.get(1), record.get(2))
        else {
            bail!(
                "Missing required columns on line {} of BAF table file '{}'",
                line,
                filename
            );
        };

        let pos = match pos.parse::<i64>() {
            Ok(x) => x,
            Err(_) => bail!(
                "Invalid position '{}' on line {} of BAF table file '{}'",
                pos,
                line,
                filename
            ),
        };

        let baf = match parse_baf(baf) {
            BafValue::Valid(x) => x,
            BafValue::Missing => {
                stats.missing_baf_count += 1;
                continue;
            }
            BafValue::OutOfRange => {
                stats.out_of_range_baf_count += 1;
                continue;
            }
        };

        let chrom_index = *chrom_index_map.entry(chrom.to_string()).or_insert_with(|| {
            genome_track.chroms.push(ChromBafTrack {
                label: chrom.to_string(),
                ..Default::default()
            });
            genome_track.chroms.len() - 1
        });
        let chrom_track = &mut genome_track.chroms[chrom_index];
        if let Some(&last_pos) = chrom_track.positions.last() {
            if pos < last_pos {
                bail!(
                    "Position {} on line {} of BAF table file '{}' is lower than the previous position {} on chromosome '{}'. BAF table must be sorted by position within each chromosome.",
                    pos,
                    line,
                    filename,
                    last_pos,
                    chrom
                );
            }
        }
        chrom_track.positions.push(pos);
        chrom_track.bafs.push(baf);
    }

    stats.snp_count = genome_track.snp_count();

    info!(
        "Read {} SNPs on {} chromosomes from BAF table. Skipped {} rows with missing BAF and {} rows with out of range BAF",
        stats.snp_count.separate_with_commas(),
        genome_track.chroms.len(),
        stats.missing_baf_count.separate_with_commas(),
        stats.out_of_range_baf_count.separate_with_commas()
    );

    Ok((genome_track, stats))
}
