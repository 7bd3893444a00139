//! Opening query and data files.
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::bufread::MultiGzDecoder;

/// Query source name that reads standard input.
pub const STDIN_SOURCE: &str = "-";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompress `reader` when its content starts with the gzip magic bytes.
fn sniff_gzip<R: BufRead + 'static>(mut reader: R) -> io::Result<Box<dyn BufRead>> {
    let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

///
/// Open a plain or gzipped data file. Compression is detected from the content, so
/// files need no `.gz` suffix.
///
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    sniff_gzip(BufReader::new(file)).with_context(|| format!("Failed reading {}", path.display()))
}

///
/// Open a query source: a file path, or `-` for standard input. Both may be gzipped.
///
pub fn open_query_source(source: &str) -> Result<Box<dyn BufRead>> {
    if source == STDIN_SOURCE {
        return sniff_gzip(io::stdin().lock()).context("Failed reading standard input");
    }
    open_input(Path::new(source))
}

///
/// Read all query lines from a source, dropping line endings.
///
pub fn read_query_lines(source: &str) -> Result<Vec<String>> {
    let reader = open_query_source(source)?;
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed reading {}", source))?;
        lines.push(line.trim_end_matches(['\r', '\n']).to_string());
    }
    Ok(lines)
}
