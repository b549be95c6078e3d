mod segment;
mod shared;
mod utils;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::{SimpleResult, bail};

pub use self::segment::{SegmentSettings, SegmentSvSettings, write_settings};
use self::segment::{validate_and_fix_segment_settings, validate_and_fix_segment_sv_settings};
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;

#[derive(Subcommand)]
pub enum Commands {
    /// Segment the phased BAF track of each chromosome as a single unit
    Segment(SegmentSettings),

    /// Segment the phased BAF track independently between SV breakpoints and large SNP gaps
    SegmentSv(SegmentSvSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_output_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Segment(x) => &x.output_dir,
            Commands::SegmentSv(x) => &x.output_dir,
        }
    }
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{} already exists: \"{}\"", label, dirname);
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    settings.command = match settings.command {
        Commands::Segment(x) => {
            let x = validate_and_fix_segment_settings(x)?;
            Commands::Segment(x)
        }
        Commands::SegmentSv(x) => {
            let x = validate_and_fix_segment_sv_settings(x)?;
            Commands::SegmentSv(x)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {msg}");
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_sv_command() {
        let settings = Settings::try_parse_from([
            "bafseg",
            "segment-sv",
            "--baf",
            "baf.tsv",
            "--svs",
            "svs.tsv",
            "--phasegamma",
            "4",
            "--no-segmentation",
            "--threads",
            "2",
        ])
        .unwrap();

        assert_eq!(settings.get_output_dir().as_str(), "bafseg_segment-sv_output");
        let Commands::SegmentSv(x) = &settings.command else {
            panic!("Unexpected command");
        };
        assert_eq!(x.svs_filename.as_str(), "svs.tsv");
        assert!(x.no_segmentation);
        assert_eq!(x.max_snp_distance, 3_000_000);
        assert_eq!(x.segmentation.phase_gamma, 4.0);
        assert_eq!(x.segmentation.gamma, 10.0);
        assert_eq!(x.segmentation.calc_seg_baf_option, 1);
    }

    #[test]
    fn test_segment_command_requires_baf() {
        assert!(Settings::try_parse_from(["bafseg", "segment"]).is_err());
    }

    #[test]
    fn test_zero_threads() {
        let settings =
            Settings::try_parse_from(["bafseg", "--threads", "0", "segment", "--baf", "x.tsv"])
                .unwrap();
        assert!(validate_and_fix_settings_impl(settings).is_err());
    }
}
