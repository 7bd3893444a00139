//! Scoring many query terms at once.
//!
//! Terms are split into fixed-size chunks and scored on a rayon pool. Every worker
//! thread opens its own signal track readers once; the index, resolver and model are
//! shared.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;

use regulome_core::errors::{RegulomeError, Result};
use regulome_core::models::Region;
use regulome_coords::CoordinateResolver;

use crate::engine::{RegionReport, ScoringEngine};
use crate::evidence::PeakDetail;
use crate::features::Features;
use crate::ranking::Score;
use crate::signal::{SignalTrackPaths, SignalTracks};

pub const TSV_HEADER: &str = "chrom\tstart\tend\tquery\tChIP\tDNase\tPWM\tFootprint\tQTL\tIC_max\tPWM_matched\tFootprint_matched\tIC_matched_max\tranking\tprobability";

///
/// Extract the query term from an input line. BED-like lines with four or more
/// tab-separated columns carry the term in the fourth column.
///
pub fn query_term(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.split('\t').nth(3) {
        Some(term) => term.trim(),
        None => line.trim(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRegion {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub query: String,
    pub features: Features,
    pub score: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peaks: Option<Vec<PeakDetail>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_pwm_peaks: Vec<PeakDetail>,
}

impl ScoredRegion {
    pub fn from_report(term: &str, report: &RegionReport, include_peaks: bool) -> Self {
        ScoredRegion {
            chrom: report.region.chr.clone(),
            start: report.region.start,
            end: report.region.end,
            query: term.to_string(),
            features: report.features,
            score: report.score.clone(),
            peaks: include_peaks.then(|| report.hits.peak_details()),
            matched_pwm_peaks: report.matched_pwm_peaks(),
        }
    }

    pub fn to_tsv_row(&self) -> String {
        let f = &self.features;
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.start,
            self.end,
            self.query,
            f.chip,
            f.dnase,
            f.pwm,
            f.footprint,
            f.qtl,
            f.ic_max,
            f.pwm_matched,
            f.footprint_matched,
            f.ic_matched_max,
            self.score.ranking,
            self.score.probability
        )
    }
}

/// What went wrong with a failed term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    ExternalService,
    SearchBackend,
    MalformedDocument,
    Internal,
}

impl From<&RegulomeError> for FailureKind {
    fn from(error: &RegulomeError) -> Self {
        match error {
            RegulomeError::InvalidRegion(_) | RegulomeError::UnknownAssembly(_) => {
                FailureKind::InvalidInput
            }
            RegulomeError::ExternalService(_) => FailureKind::ExternalService,
            RegulomeError::SearchBackend(_) => FailureKind::SearchBackend,
            RegulomeError::MalformedDocument(_) => FailureKind::MalformedDocument,
            RegulomeError::SignalTrack(_) | RegulomeError::Config(_) | RegulomeError::Io(_) => {
                FailureKind::Internal
            }
        }
    }
}

///
/// A term that could not be scored, and why.
///
/// `transient` marks failures of a collaborator (search cluster, variant service) that
/// may succeed when the term is retried.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub query: String,
    pub reason: String,
    pub kind: FailureKind,
    pub transient: bool,
}

impl BatchFailure {
    pub fn invalid_input(term: &str) -> Self {
        BatchFailure {
            query: term.to_string(),
            reason: format!("Invalid input: {}", term),
            kind: FailureKind::InvalidInput,
            transient: false,
        }
    }

    /// The term could not be resolved to a region.
    pub fn unresolved(term: &str, error: &RegulomeError) -> Self {
        BatchFailure {
            kind: FailureKind::from(error),
            transient: error.is_transient(),
            ..BatchFailure::invalid_input(term)
        }
    }

    pub fn search_failed(term: &str, region: &Region, error: &RegulomeError) -> Self {
        BatchFailure {
            query: term.to_string(),
            reason: format!("Regulome search failed on {}: {}", region, error),
            kind: FailureKind::from(error),
            transient: error.is_transient(),
        }
    }
}

pub type BatchOutcome = std::result::Result<ScoredRegion, BatchFailure>;

/// `(succeeded, failed)`
pub fn tally(outcomes: &[BatchOutcome]) -> (usize, usize) {
    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    (succeeded, outcomes.len() - succeeded)
}

///
/// Resolves and scores query terms, one at a time or as a parallel batch.
///
pub struct BatchScorer<'a> {
    resolver: CoordinateResolver<'a>,
    engine: ScoringEngine<'a>,
    tracks: SignalTrackPaths,
    processes: usize,
    chunk_size: Option<usize>,
    include_peaks: bool,
}

impl<'a> BatchScorer<'a> {
    pub fn new(resolver: CoordinateResolver<'a>, engine: ScoringEngine<'a>) -> Self {
        BatchScorer {
            resolver,
            engine,
            tracks: SignalTrackPaths::default(),
            processes: 1,
            chunk_size: None,
            include_peaks: false,
        }
    }

    pub fn with_tracks(mut self, tracks: SignalTrackPaths) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size.filter(|&c| c > 0);
        self
    }

    pub fn with_peaks(mut self, include_peaks: bool) -> Self {
        self.include_peaks = include_peaks;
        self
    }

    pub fn engine(&self) -> &ScoringEngine<'a> {
        &self.engine
    }

    /// Chunk size used for `n` terms.
    pub fn chunk_size_for(&self, n: usize) -> usize {
        self.chunk_size
            .unwrap_or_else(|| n.div_ceil(self.processes))
            .max(1)
    }

    /// Readers for one worker. A track that cannot be opened is left out.
    pub fn open_tracks(&self) -> SignalTracks {
        match self.tracks.open() {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Scoring without information content: {}", e);
                SignalTracks::default()
            }
        }
    }

    /// Resolve and score a single term.
    ///
    /// Peaks are always fetched so matched PWM peaks can be reported; they are only kept
    /// in the result when the scorer was built `with_peaks`.
    pub fn score_region(&self, term: &str, tracks: &mut SignalTracks) -> BatchOutcome {
        let region = self
            .resolver
            .resolve(term, self.engine.assembly())
            .map_err(|e| {
                debug!("Cannot resolve {}: {}", term, e);
                BatchFailure::unresolved(term, &e)
            })?;

        let report = self.engine.evaluate(&region, tracks, true).map_err(|e| {
            warn!("Scoring {} ({}) failed: {}", term, region, e);
            BatchFailure::search_failed(term, &region, &e)
        })?;

        Ok(ScoredRegion::from_report(term, &report, self.include_peaks))
    }

    ///
    /// Score every term on `processes` workers. Outcomes come back in input order.
    ///
    /// `progress` is called with the size of each finished chunk.
    ///
    pub fn run<F>(&self, terms: &[String], progress: F) -> Result<Vec<BatchOutcome>>
    where
        F: Fn(usize) + Sync,
    {
        self.run_on_workers(terms, progress).map(|(outcomes, _)| outcomes)
    }

    /// [`BatchScorer::run`], also reporting how many track readers were opened.
    fn run_on_workers<F>(&self, terms: &[String], progress: F) -> Result<(Vec<BatchOutcome>, usize)>
    where
        F: Fn(usize) + Sync,
    {
        if terms.is_empty() {
            return Ok((Vec::new(), 0));
        }
        let chunk_size = self.chunk_size_for(terms.len());
        info!(
            "Scoring {} terms on {} workers, {} per chunk",
            terms.len(),
            self.processes,
            chunk_size
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.processes)
            .build()
            .map_err(|e| RegulomeError::Config(format!("cannot start worker pool: {}", e)))?;

        // one reader slot per pool thread, opened on the thread's first chunk
        let slots: Vec<Mutex<Option<SignalTracks>>> =
            (0..self.processes).map(|_| Mutex::new(None)).collect();
        let opened = AtomicUsize::new(0);

        let chunks: Vec<Vec<BatchOutcome>> = pool.install(|| {
            terms
                .par_chunks(chunk_size)
                .map(|chunk| {
                    let worker = rayon::current_thread_index().unwrap_or(0) % slots.len();
                    let mut slot = slots[worker].lock().unwrap_or_else(PoisonError::into_inner);
                    let tracks = slot.get_or_insert_with(|| {
                        opened.fetch_add(1, Ordering::Relaxed);
                        self.open_tracks()
                    });
                    let outcomes: Vec<BatchOutcome> = chunk
                        .iter()
                        .map(|term| self.score_region(term, tracks))
                        .collect();
                    progress(chunk.len());
                    outcomes
                })
                .collect()
        });
        let opened = opened.load(Ordering::Relaxed);
        debug!("Opened signal tracks on {} workers", opened);
        Ok((chunks.into_iter().flatten().collect(), opened))
    }
}
