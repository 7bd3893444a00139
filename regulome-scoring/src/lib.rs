//! Evidence aggregation and RegulomeDB scoring.
//!
//! A query flows through these stages:
//! 1. [`evidence::find_overlaps`] collects the peaks overlapping a region and reduces them
//!    to distinct files and datasets.
//! 2. [`features::classify_evidence`] buckets the datasets into evidence categories and
//!    reads the information-content tracks.
//! 3. [`ranking::score`] ranks the resulting [`features::Features`] and attaches a
//!    probability from a [`ranking::ProbabilityModel`].
//!
//! [`engine::ScoringEngine`] ties the stages together. [`nearby`], [`batch`] and
//! [`summary`] build on it.
pub mod batch;
pub mod classify;
pub mod engine;
pub mod evidence;
pub mod features;
pub mod nearby;
pub mod ranking;
pub mod signal;
pub mod summary;

pub use batch::{BatchFailure, BatchOutcome, BatchScorer, ScoredRegion};
pub use classify::{DatasetClass, EvidenceCategory, classify_dataset};
pub use engine::{RegionReport, ScoringEngine};
pub use evidence::{HitsStatus, RegionHits, find_overlaps};
pub use features::{EvidenceSet, Features};
pub use nearby::{ScoredSnp, nearby_snps, scored_snps};
pub use ranking::{LogisticModel, ProbabilityModel, RankLookup, Ranking, Score};
pub use signal::{SignalTrackPaths, SignalTracks};
pub use summary::{SummaryResult, summarize_regions};
