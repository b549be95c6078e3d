use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::Serialize;
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use super::utils::check_required_filename;
use crate::baf_segmentation::{DEFAULT_MIN_PCF_SNP_COUNT, SegmentValueStatistic, SegmentationParams};
use crate::noise_estimate::{
    DEFAULT_MIN_NOISE_SDEV, DEFAULT_NOISE_WINDOW_HALF_SIZE, NoiseEstimator,
};
use crate::presegment::DEFAULT_MAX_SNP_DISTANCE;
use crate::segment_baf::SETTINGS_FILENAME;

/// Segmentation options shared by all segmentation commands
#[derive(Args, Clone, Serialize)]
pub struct SegmentationArgs {
    /// Penalty multiplier for the final segmentation. Higher values produce fewer segments.
    ///
    /// The penalty applied to each new segment is this value times the estimated BAF noise level.
    ///
    #[arg(long, default_value_t = 10.0)]
    pub gamma: f64,

    /// Minimum number of SNPs in each final segment
    #[arg(long, default_value_t = 3)]
    pub kmin: usize,

    /// Penalty multiplier for the segmentation used to correct haplotype phase switch errors
    #[arg(long = "phasegamma", default_value_t = 3.0)]
    pub phase_gamma: f64,

    /// Minimum number of SNPs in each segment used to correct haplotype phase switch errors
    #[arg(long = "phasekmin", default_value_t = 3)]
    pub phase_kmin: usize,

    /// Statistic used to report the BAF value of each segment: 1 = median of the phased BAF
    /// values, 2 = segmentation mean.
    ///
    /// Other values are accepted with a warning and treated as 2.
    ///
    #[arg(long, value_name = "OPTION", default_value_t = 1)]
    pub calc_seg_baf_option: u8,

    /// After final segmentation, flip the phase of SNPs in segments with BAF at or below 0.5
    #[arg(long)]
    pub reresolve_phase: bool,

    /// Half-width of the running median window used in BAF noise estimation, in SNPs
    #[arg(hide = true, long, default_value_t = DEFAULT_NOISE_WINDOW_HALF_SIZE)]
    pub noise_window: usize,

    /// Minimum BAF noise level used to scale segmentation penalties
    #[arg(hide = true, long, default_value_t = DEFAULT_MIN_NOISE_SDEV)]
    pub min_noise_sdev: f64,

    /// Intervals with fewer SNPs than this are not segmented, and are instead assigned their mean
    /// BAF
    #[arg(hide = true, long = "min-pcf-snps", default_value_t = DEFAULT_MIN_PCF_SNP_COUNT)]
    pub min_pcf_snp_count: usize,
}

impl SegmentationArgs {
    pub fn get_segmentation_params(&self, no_segmentation: bool) -> SegmentationParams {
        SegmentationParams {
            gamma: self.gamma,
            kmin: self.kmin,
            phase_gamma: self.phase_gamma,
            phase_kmin: self.phase_kmin,
            segment_value_statistic: SegmentValueStatistic::from_option_code(
                self.calc_seg_baf_option,
            ),
            no_segmentation,
            reresolve_phase: self.reresolve_phase,
            min_pcf_snp_count: self.min_pcf_snp_count,
            noise_estimator: NoiseEstimator {
                window_half_size: self.noise_window,
                min_sdev: self.min_noise_sdev,
            },
        }
    }
}

fn validate_segmentation_args(args: &SegmentationArgs) -> SimpleResult<()> {
    if args.gamma.is_nan() || args.gamma <= 0.0 {
        bail!("--gamma argument must be greater than 0");
    }
    if args.phase_gamma.is_nan() || args.phase_gamma <= 0.0 {
        bail!("--phasegamma argument must be greater than 0");
    }
    if args.kmin == 0 {
        bail!("--kmin argument must be greater than 0");
    }
    if args.phase_kmin == 0 {
        bail!("--phasekmin argument must be greater than 0");
    }
    if args.min_noise_sdev.is_nan() || args.min_noise_sdev < 0.0 {
        bail!("--min-noise-sdev argument must not be negative");
    }
    if args.min_pcf_snp_count == 0 {
        bail!("--min-pcf-snps argument must be greater than 0");
    }
    Ok(())
}

#[derive(Args, Serialize)]
pub struct SegmentSettings {
    /// Directory for all segment command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_segment_output"))]
    pub output_dir: Utf8PathBuf,

    /// Phased SNP BAF table, tab-separated, optionally gzipped.
    ///
    /// The first three header columns must be 'Chromosome', 'Position' and 'BAF'.
    ///
    #[arg(long = "baf", value_name = "FILE")]
    pub baf_filename: Utf8PathBuf,

    #[command(flatten)]
    pub segmentation: SegmentationArgs,
}

pub fn validate_and_fix_segment_settings(
    settings: SegmentSettings,
) -> SimpleResult<SegmentSettings> {
    check_required_filename(&settings.baf_filename, "BAF table")?;
    validate_segmentation_args(&settings.segmentation)?;
    Ok(settings)
}

#[derive(Args, Serialize)]
pub struct SegmentSvSettings {
    /// Directory for all segment-sv command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_segment-sv_output"))]
    pub output_dir: Utf8PathBuf,

    /// Phased SNP BAF table, tab-separated, optionally gzipped.
    ///
    /// The first three header columns must be 'Chromosome', 'Position' and 'BAF'.
    ///
    #[arg(long = "baf", value_name = "FILE")]
    pub baf_filename: Utf8PathBuf,

    /// SV breakpoint table, tab-separated, optionally gzipped.
    ///
    /// The header must include 'chromosome' and 'position' columns. Each breakpoint closes a
    /// segmentation interval, so that no segment spans an SV breakpoint.
    ///
    #[arg(long = "svs", value_name = "FILE")]
    pub svs_filename: Utf8PathBuf,

    /// Skip the final segmentation, reporting each SV-delimited interval as a single segment
    #[arg(long)]
    pub no_segmentation: bool,

    /// Consecutive SNPs separated by at least this distance are always segmented independently
    #[arg(long, default_value_t = DEFAULT_MAX_SNP_DISTANCE)]
    pub max_snp_distance: i64,

    #[command(flatten)]
    pub segmentation: SegmentationArgs,
}

pub fn validate_and_fix_segment_sv_settings(
    settings: SegmentSvSettings,
) -> SimpleResult<SegmentSvSettings> {
    check_required_filename(&settings.baf_filename, "BAF table")?;
    check_required_filename(&settings.svs_filename, "SV table")?;
    validate_segmentation_args(&settings.segmentation)?;
    if settings.max_snp_distance <= 0 {
        bail!("--max-snp-distance argument must be greater than 0");
    }
    Ok(settings)
}

/// Write command settings out in json format
pub fn write_settings<T: Serialize>(output_dir: &Utf8Path, settings: &T) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing segment settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create segment settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_default_args() -> SegmentationArgs {
        SegmentationArgs {
            gamma: 10.0,
            kmin: 3,
            phase_gamma: 3.0,
            phase_kmin: 3,
            calc_seg_baf_option: 1,
            reresolve_phase: false,
            noise_window: DEFAULT_NOISE_WINDOW_HALF_SIZE,
            min_noise_sdev: DEFAULT_MIN_NOISE_SDEV,
            min_pcf_snp_count: DEFAULT_MIN_PCF_SNP_COUNT,
        }
    }

    #[test]
    fn test_validate_segmentation_args() {
        assert!(validate_segmentation_args(&get_default_args()).is_ok());

        let mut args = get_default_args();
        args.gamma = 0.0;
        assert!(validate_segmentation_args(&args).is_err());

        let mut args = get_default_args();
        args.phase_kmin = 0;
        assert!(validate_segmentation_args(&args).is_err());

        let mut args = get_default_args();
        args.min_noise_sdev = f64::NAN;
        assert!(validate_segmentation_args(&args).is_err());
    }

    #[test]
    fn test_get_segmentation_params() {
        let mut args = get_default_args();
        args.calc_seg_baf_option = 2;
        let params = args.get_segmentation_params(true);
        assert_eq!(params.segment_value_statistic, SegmentValueStatistic::Mean);
        assert!(params.no_segmentation);
        assert_eq!(params.kmin, 3);
    }

    #[test]
    fn test_missing_baf_file() {
        let settings = SegmentSettings {
            output_dir: Utf8PathBuf::from("out"),
            baf_filename: Utf8PathBuf::from("./test_data/not_there.tsv"),
            segmentation: get_default_args(),
        };
        assert!(validate_and_fix_segment_settings(settings).is_err());
    }
}
