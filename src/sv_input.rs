//! Read SV breakpoint positions used to seed presegmentation
//!

use std::collections::HashMap;

use camino::Utf8Path;
use log::info;
use simple_error::{SimpleResult, bail};
use thousands::Separable;

use crate::utils::open_tsv_reader;

const SV_CHROM_COLUMN: &str = "chromosome";
const SV_POS_COLUMN: &str = "position";

/// SV breakpoint positions for each chromosome
///
/// Positions are stored in input order, and may be unsorted or include duplicates.
///
#[derive(Debug, Default)]
pub struct GenomeSvPositions {
    chrom_positions: HashMap<String, Vec<i64>>,
}

impl GenomeSvPositions {
    pub fn add_position(&mut self, chrom: &str, pos: i64) {
        self.chrom_positions
            .entry(chrom.to_string())
            .or_default()
            .push(pos);
    }

    /// Breakpoint positions on `chrom`, empty if the chromosome has no SVs
    pub fn get_chrom_positions(&self, chrom: &str) -> &[i64] {
        self.chrom_positions
            .get(chrom)
            .map(|x| x.as_slice())
            .unwrap_or_default()
    }

    pub fn sv_count(&self) -> usize {
        self.chrom_positions.values().map(|x| x.len()).sum()
    }
}

/// Read SV breakpoint positions from `filename`
///
/// The table must have a header row including the columns 'chromosome' and 'position'. All other
/// columns are ignored.
///
pub fn read_sv_table(filename: &Utf8Path) -> SimpleResult<GenomeSvPositions> {
    info!("Reading SV breakpoints from file: '{filename}'");

    let mut rdr = open_tsv_reader(filename, "SV table")?;

    let headers = match rdr.headers() {
        Ok(x) => x.clone(),
        Err(e) => bail!(
            "Unable to read header from SV table file '{}': {}",
            filename,
            e
        ),
    };
    let get_column_index = |label: &str| -> SimpleResult<usize> {
        match headers.iter().position(|x| x == label) {
            Some(x) => Ok(x),
            None => bail!(
                "SV table file '{}' is missing required column '{}'",
                filename,
                label
            ),
        }
    };
    let chrom_index = get_column_index(SV_CHROM_COLUMN)?;
    let pos_index = get_column_index(SV_POS_COLUMN)?;

    let mut sv_positions = GenomeSvPositions::default();
    for result in rdr.records() {
        let record = match result {
            Ok(x) => x,
            Err(e) => bail!(
                "Failed to parse record from SV table file '{}': {}",
                filename,
                e
            ),
        };
        let line = record.position().map(|x| x.line()).unwrap_or(0);

        let (Some(chrom), Some(pos)) = (record.get(chrom_index), record.get(pos_index)) else {
            bail!(
                "Missing required columns on line {} of SV table file '{}'",
                line,
                filename
            );
        };
        let pos = match pos.parse::<i64>() {
            Ok(x) => x,
            Err(_) => bail!(
                "Invalid position '{}' on line {} of SV table file '{}'",
                pos,
                line,
                filename
            ),
        };
        sv_positions.add_position(chrom, pos);
    }

    info!(
        "Read {} SV breakpoints on {} chromosomes",
        sv_positions.sv_count().separate_with_commas(),
        sv_positions.chrom_positions.len()
    );

    Ok(sv_positions)
}
