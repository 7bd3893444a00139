//! Summary of a pasted block of query lines.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use regulome_core::models::{Assembly, Region};
use regulome_coords::CoordinateResolver;

use crate::engine::ScoringEngine;
use crate::features::Features;
use crate::nearby::rsids_in_region;
use crate::ranking::Score;
use crate::signal::SignalTracks;

pub const DEFAULT_LIMIT: usize = 25;

static LINE_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").unwrap());
static SKIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:#.*|\s*)$").unwrap());

///
/// Parse an assembly from a request, falling back to GRCh37 for anything unknown.
///
pub fn request_assembly(raw: &str) -> Assembly {
    raw.parse().unwrap_or_else(|e| {
        warn!("{}; using {}", e, Assembly::default());
        Assembly::default()
    })
}

/// Outcome of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success,
    InvalidInput,
    ScoredBefore,
    NotScorable,
    Failed(String),
}

impl Notification {
    pub fn is_success(&self) -> bool {
        matches!(self, Notification::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Notification::InvalidInput | Notification::NotScorable | Notification::Failed(_)
        )
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Success => write!(f, "Success"),
            Notification::InvalidInput => write!(f, "Failed: invalid region input"),
            Notification::ScoredBefore => write!(f, "Skipped: scored before"),
            Notification::NotScorable => {
                write!(f, "Failed: Non-SNP or multi-nucleotide region is not scorable")
            }
            Notification::Failed(e) => write!(f, "Failed: {}", e),
        }
    }
}

impl Serialize for Notification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryNotification {
    pub query: String,
    pub status: Notification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub rsids: Vec<String>,
    pub features: Features,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    pub assembly: Assembly,
    /// canonical coordinate → rsIDs inside it
    pub variants: BTreeMap<String, Vec<String>>,
    /// one per non-comment line: resolution outcomes first, then scoring outcomes
    pub notifications: Vec<QueryNotification>,
    pub summaries: Vec<RegionSummary>,
}

impl SummaryResult {
    pub fn successes(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.status.is_success())
            .count()
    }

    pub fn failures(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.status.is_failure())
            .count()
    }
}

///
/// Resolve, deduplicate and score every line of `blob`.
///
/// Comment and blank lines are skipped. Lines resolving to a coordinate already seen are
/// reported as skipped. At most `limit` distinct regions are scored; later lines are
/// ignored. A failure on one line never affects the others.
///
pub fn summarize_regions(
    blob: &str,
    limit: usize,
    resolver: &CoordinateResolver,
    engine: &ScoringEngine,
    tracks: &mut SignalTracks,
) -> SummaryResult {
    let assembly = engine.assembly();
    let mut notifications = Vec::new();
    let mut seen = BTreeSet::new();
    let mut regions: Vec<(String, Region)> = Vec::new();

    for line in LINE_SPLIT_RE.split(blob) {
        if SKIP_RE.is_match(line) {
            continue;
        }
        if regions.len() >= limit {
            debug!("Summary limit of {} regions reached", limit);
            break;
        }
        let term = line.trim();
        let status = match resolver.resolve(term, assembly) {
            Err(e) => {
                debug!("{}", e);
                Notification::InvalidInput
            }
            Ok(region) if !seen.insert(region.to_coordinate_string()) => Notification::ScoredBefore,
            Ok(region) => {
                regions.push((term.to_string(), region));
                continue;
            }
        };
        notifications.push(QueryNotification {
            query: term.to_string(),
            status,
        });
    }

    let mut variants = BTreeMap::new();
    let mut summaries = Vec::new();
    for (term, region) in regions {
        let status = match summarize_region(&region, engine, tracks) {
            Ok((rsids, summary)) => {
                variants.insert(region.to_coordinate_string(), rsids);
                match summary {
                    Some(summary) => {
                        summaries.push(summary);
                        Notification::Success
                    }
                    None => Notification::NotScorable,
                }
            }
            Err(e) => {
                warn!("Summary of {} failed: {}", region, e);
                Notification::Failed(e.to_string())
            }
        };
        notifications.push(QueryNotification {
            query: term,
            status,
        });
    }

    SummaryResult {
        assembly,
        variants,
        notifications,
        summaries,
    }
}

/// rsIDs in `region`, and its summary when it is scorable.
fn summarize_region(
    region: &Region,
    engine: &ScoringEngine,
    tracks: &mut SignalTracks,
) -> regulome_core::Result<(Vec<String>, Option<RegionSummary>)> {
    let rsids = rsids_in_region(engine.index(), engine.assembly(), region)?;
    if rsids.is_empty() && region.width() > 1 {
        return Ok((rsids, None));
    }
    let report = engine.evaluate(region, tracks, false)?;
    let summary = RegionSummary {
        chrom: region.chr.clone(),
        start: region.start,
        end: region.end,
        rsids: rsids.clone(),
        features: report.features,
        score: report.score,
    };
    Ok((rsids, Some(summary)))
}
