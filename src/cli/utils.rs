use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &Utf8Path, label: &str) -> SimpleResult<()> {
    if filename.as_str().is_empty() {
        bail!("Must specify {} file", label);
    }
    if !filename.exists() {
        bail!("Can't find specified {} file: '{}'", label, filename);
    }
    if !filename.is_file() {
        bail!(
            "Specified {} file path does not appear to be a file: '{}'",
            label,
            filename
        );
    }
    Ok(())
}
