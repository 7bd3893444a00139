use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::errors::{RegulomeError, Result};

///
/// A genomic coordinate, half-open `[start, end)` and 0-based.
///
/// Every coordinate that enters the engine is normalized into this form exactly once,
/// at the boundary where it is read (index documents, web services, user input).
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region {
    pub chr: String,
    pub start: u32,
    pub end: u32,
}

impl Region {
    ///
    /// Create a new Region, normalizing the chromosome name and
    /// swapping reversed positions so that `start <= end`.
    ///
    pub fn new(chr: &str, start: u32, end: u32) -> Self {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        Region {
            chr: normalize_chromosome(chr),
            start,
            end,
        }
    }

    ///
    /// Get the width of the region
    ///
    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    ///
    /// The interval actually sent to an overlap query. A zero-width region
    /// (a single position given as `chr:pos`) is widened to the one base it names.
    ///
    pub fn query_span(&self) -> (u32, u32) {
        if self.is_empty() {
            (self.start, self.start.saturating_add(1))
        } else {
            (self.start, self.end)
        }
    }

    /// Check if two regions overlap (same chromosome, half-open semantics)
    pub fn overlaps(&self, other: &Region) -> bool {
        let (start, end) = other.query_span();
        self.chr == other.chr && self.start < end && self.end > start
    }

    ///
    /// Canonical `chr:start-end` representation, used as a deduplication key
    ///
    pub fn to_coordinate_string(&self) -> String {
        format!("{}:{}-{}", self.chr, self.start, self.end)
    }

    ///
    /// Get a BED line for the Region
    ///
    pub fn as_bed_string(&self) -> String {
        format!("{}\t{}\t{}", self.chr, self.start, self.end)
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_coordinate_string())
    }
}

///
/// Coordinates as they are stored in index documents: a lower bound and either an
/// exclusive (`lt`) or an inclusive (`lte`) upper bound. Both forms exist in the data.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCoordinates {
    pub gte: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<u32>,
}

impl RawCoordinates {
    ///
    /// Convert to a half-open Region on the given chromosome.
    ///
    pub fn into_region(self, chr: &str) -> Result<Region> {
        let end = match (self.lt, self.lte) {
            (Some(lt), _) => lt,
            (None, Some(lte)) => lte.checked_add(1).ok_or_else(|| {
                RegulomeError::MalformedDocument(format!("coordinate overflow: lte={lte}"))
            })?,
            (None, None) => {
                return Err(RegulomeError::MalformedDocument(format!(
                    "coordinates without upper bound: gte={}",
                    self.gte
                )));
            }
        };
        Ok(Region::new(chr, self.gte, end))
    }
}

impl From<&Region> for RawCoordinates {
    fn from(region: &Region) -> Self {
        RawCoordinates {
            gte: region.start,
            lt: Some(region.end),
            lte: None,
        }
    }
}

///
/// Normalize a chromosome name to `chrN`/`chrX`/`chrY`/`chrM`.
///
/// Accepts names with or without a `chr` prefix in any case, e.g. `10`, `CHR10`, `chrx`.
///
pub fn normalize_chromosome(raw: &str) -> String {
    let trimmed = raw.trim();
    let bare = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };
    let bare = match bare.to_ascii_lowercase().as_str() {
        "x" => "X".to_string(),
        "y" => "Y".to_string(),
        "m" | "mt" => "M".to_string(),
        _ => bare.to_string(),
    };
    format!("chr{}", bare)
}
