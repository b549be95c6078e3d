use std::fs::File;
use std::io::{BufReader, Read};

use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use flate2::read::MultiGzDecoder;
use simple_error::{SimpleResult, map_err_with};

/// Open a tab-separated table with a header row
///
/// Input is transparently decompressed when the filename ends in '.gz'. Lines starting with '#'
/// are skipped.
///
pub fn open_tsv_reader(
    filename: &Utf8Path,
    label: &str,
) -> SimpleResult<csv::Reader<Box<dyn Read>>> {
    let file = map_err_with!(
        File::open(filename),
        "Unable to open {} file: '{}'",
        label,
        filename
    )?;
    let file = BufReader::new(file);
    let input: Box<dyn Read> = if filename.as_str().ends_with(".gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .from_reader(input))
}

#[cfg(test)]
pub mod test_utils {
    use std::io::Write;

    use camino::Utf8PathBuf;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    /// Get a fresh scratch directory for file-level tests
    pub fn get_test_dir(label: &str) -> Utf8PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "{}_test_{}_{}",
            env!("CARGO_PKG_NAME"),
            label,
            std::process::id()
        ));
        let dir = Utf8PathBuf::from_path_buf(dir).unwrap();
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write `content` to `filename`, gzip-compressing it if the filename ends in '.gz'
    pub fn write_test_file(filename: &Utf8PathBuf, content: &str) {
        let f = std::fs::File::create(filename).unwrap();
        if filename.as_str().ends_with(".gz") {
            let mut f = GzEncoder::new(f, Compression::default());
            f.write_all(content.as_bytes()).unwrap();
            f.finish().unwrap();
        } else {
            let mut f = f;
            f.write_all(content.as_bytes()).unwrap();
        }
    }
}
