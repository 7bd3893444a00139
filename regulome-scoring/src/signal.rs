//! Information-content signal tracks.
//!
//! Two tracks are consulted per scored region: `IC_max` (all motif matches) and
//! `IC_matched_max` (motif matches whose target is confirmed by a QTL). Readers hold open
//! file handles, so every worker opens its own [`SignalTracks`] from shared
//! [`SignalTrackPaths`].
use std::io::BufRead;
use std::path::{Path, PathBuf};

use bigtools::BigWigRead;
use bigtools::utils::reopen::ReopenableFile;
use fxhash::FxHashMap;
use log::{debug, warn};
use rust_lapper::{Interval, Lapper};
use serde::{Deserialize, Serialize};

use regulome_core::errors::{RegulomeError, Result};
use regulome_core::models::{Region, normalize_chromosome};
use regulome_core::traits::SignalTrack;
use regulome_core::utils::open_input;

fn fold_max(acc: Option<f64>, value: f64) -> Option<f64> {
    if value.is_nan() {
        return acc;
    }
    Some(acc.map_or(value, |m| m.max(value)))
}

///
/// A bigWig file read through `bigtools`.
///
pub struct BigWigTrack {
    path: PathBuf,
    reader: BigWigRead<ReopenableFile>,
}

impl BigWigTrack {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = BigWigRead::open_file(&*path.to_string_lossy()).map_err(|e| {
            RegulomeError::SignalTrack(format!("cannot open {}: {:?}", path.display(), e))
        })?;
        Ok(BigWigTrack {
            path: path.to_path_buf(),
            reader,
        })
    }
}

impl SignalTrack for BigWigTrack {
    fn max_value(&mut self, chrom: &str, start: u32, end: u32) -> Result<Option<f64>> {
        if !self.reader.chroms().iter().any(|c| c.name == chrom) {
            return Ok(None);
        }
        let end = end.max(start.saturating_add(1));
        let values = self.reader.get_interval(chrom, start, end).map_err(|e| {
            RegulomeError::SignalTrack(format!("{}: {:?}", self.path.display(), e))
        })?;

        let mut max = None;
        for value in values {
            let value = value.map_err(|e| {
                RegulomeError::SignalTrack(format!("{}: {:?}", self.path.display(), e))
            })?;
            max = fold_max(max, value.value as f64);
        }
        Ok(max)
    }
}

///
/// A bedGraph (`chrom start end value`, optionally gzipped) held in memory.
///
pub struct BedGraphTrack {
    values: Vec<f64>,
    trees: FxHashMap<String, Lapper<u32, usize>>,
}

impl BedGraphTrack {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = open_input(path)
            .map_err(|e| RegulomeError::SignalTrack(format!("{e:#}")))?;

        let mut values = Vec::new();
        let mut intervals: FxHashMap<String, Vec<Interval<u32, usize>>> = FxHashMap::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return Err(RegulomeError::SignalTrack(format!(
                    "{}:{}: expected 4 columns",
                    path.display(),
                    line_no + 1
                )));
            }
            let parsed = (
                parts[1].parse::<u32>(),
                parts[2].parse::<u32>(),
                parts[3].parse::<f64>(),
            );
            let (Ok(start), Ok(stop), Ok(value)) = parsed else {
                return Err(RegulomeError::SignalTrack(format!(
                    "{}:{}: cannot parse '{}'",
                    path.display(),
                    line_no + 1,
                    line
                )));
            };
            intervals
                .entry(normalize_chromosome(parts[0]))
                .or_default()
                .push(Interval {
                    start,
                    stop,
                    val: values.len(),
                });
            values.push(value);
        }

        debug!("Loaded {} signal intervals from {}", values.len(), path.display());
        Ok(BedGraphTrack {
            values,
            trees: intervals
                .into_iter()
                .map(|(chrom, ivs)| (chrom, Lapper::new(ivs)))
                .collect(),
        })
    }
}

impl SignalTrack for BedGraphTrack {
    fn max_value(&mut self, chrom: &str, start: u32, end: u32) -> Result<Option<f64>> {
        let Some(tree) = self.trees.get(chrom) else {
            return Ok(None);
        };
        let end = end.max(start.saturating_add(1));
        Ok(tree
            .find(start, end)
            .fold(None, |acc, iv| fold_max(acc, self.values[iv.val])))
    }
}

///
/// Open a signal track, choosing the reader by file extension.
///
pub fn open_track(path: &Path) -> Result<Box<dyn SignalTrack>> {
    let name = path.to_string_lossy().to_lowercase();
    if name.ends_with(".bw") || name.ends_with(".bigwig") {
        Ok(Box::new(BigWigTrack::open(path)?))
    } else {
        Ok(Box::new(BedGraphTrack::open(path)?))
    }
}

/// Locations of the two information-content tracks. Cheap to clone and share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalTrackPaths {
    pub ic_max: Option<PathBuf>,
    pub ic_matched_max: Option<PathBuf>,
}

impl SignalTrackPaths {
    /// Open fresh readers for one worker.
    pub fn open(&self) -> Result<SignalTracks> {
        Ok(SignalTracks {
            ic_max: self.ic_max.as_deref().map(open_track).transpose()?,
            ic_matched_max: self.ic_matched_max.as_deref().map(open_track).transpose()?,
        })
    }
}

///
/// The pair of tracks owned by one worker. Missing tracks read as no value.
///
#[derive(Default)]
pub struct SignalTracks {
    pub ic_max: Option<Box<dyn SignalTrack>>,
    pub ic_matched_max: Option<Box<dyn SignalTrack>>,
}

impl SignalTracks {
    pub fn new(
        ic_max: Option<Box<dyn SignalTrack>>,
        ic_matched_max: Option<Box<dyn SignalTrack>>,
    ) -> Self {
        SignalTracks {
            ic_max,
            ic_matched_max,
        }
    }

    ///
    /// Read `IC_max` over a region. A failing read is logged and reported as no value;
    /// it never fails the scoring of the region.
    ///
    pub fn read_ic_max(&mut self, region: &Region) -> Option<f64> {
        read_track(self.ic_max.as_mut(), region)
    }

    /// Read `IC_matched_max` over a region, with the same failure handling.
    pub fn read_ic_matched_max(&mut self, region: &Region) -> Option<f64> {
        read_track(self.ic_matched_max.as_mut(), region)
    }
}

fn read_track(track: Option<&mut Box<dyn SignalTrack>>, region: &Region) -> Option<f64> {
    let track = track?;
    let (start, end) = region.query_span();
    match track.max_value(&region.chr, start, end) {
        Ok(value) => value,
        Err(e) => {
            warn!("Signal read failed for {}: {}", region, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[fixture]
    fn bedgraph() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".bedGraph").tempfile().unwrap();
        writeln!(file, "track type=bedGraph").unwrap();
        writeln!(file, "chr1\t39492455\t39492461\t0.5").unwrap();
        writeln!(file, "chr1\t39492461\t39492462\t2.0").unwrap();
        writeln!(file, "chr1\t39492462\t39492470\tnan").unwrap();
        writeln!(file, "chr10\t104529660\t104529670\t0.45").unwrap();
        file
    }

    #[rstest]
    #[case("chr1", 39492461, 39492462, Some(2.0))]
    #[case("chr1", 39492450, 39492470, Some(2.0))]
    #[case("chr1", 39492455, 39492461, Some(0.5))]
    #[case("chr1", 39492462, 39492470, None)]
    #[case("chr2", 0, 100, None)]
    #[case("chr10", 104529666, 104529666, Some(0.45))]
    fn test_bedgraph_max(
        bedgraph: NamedTempFile,
        #[case] chrom: &str,
        #[case] start: u32,
        #[case] end: u32,
        #[case] expected: Option<f64>,
    ) {
        let mut track = BedGraphTrack::open(bedgraph.path()).unwrap();
        assert_eq!(track.max_value(chrom, start, end).unwrap(), expected);
    }

    #[rstest]
    fn test_tracks_from_paths(bedgraph: NamedTempFile) {
        let paths = SignalTrackPaths {
            ic_max: Some(bedgraph.path().to_path_buf()),
            ic_matched_max: None,
        };
        let mut tracks = paths.open().unwrap();
        let region = Region::new("chr1", 39492461, 39492462);
        assert_eq!(tracks.read_ic_max(&region), Some(2.0));
        assert_eq!(tracks.read_ic_matched_max(&region), None);
    }

    #[rstest]
    fn test_malformed_bedgraph() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t10").unwrap();
        assert!(BedGraphTrack::open(file.path()).is_err());
    }
}
