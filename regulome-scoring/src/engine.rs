use log::debug;
use serde::Serialize;

use regulome_core::errors::Result;
use regulome_core::models::{Assembly, Region};
use regulome_core::traits::PeakIndex;

use crate::classify::{EvidenceCategory, classify_dataset};
use crate::evidence::{DEFAULT_MAX_DATASETS, PeakDetail, RegionHits, find_overlaps};
use crate::features::{EvidenceSet, Features, classify_evidence};
use crate::ranking::{ProbabilityModel, Score, score};
use crate::signal::SignalTracks;

///
/// Everything computed for one region: the raw hits, the evidence breakdown and the score.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReport {
    pub region: Region,
    pub hits: RegionHits,
    pub evidence: EvidenceSet,
    pub features: Features,
    pub score: Score,
}

impl RegionReport {
    ///
    /// Peaks of PWM datasets whose target is confirmed by a QTL at this locus.
    /// Empty unless the report was built with peaks.
    ///
    pub fn matched_pwm_peaks(&self) -> Vec<PeakDetail> {
        self.hits
            .peaks
            .iter()
            .flatten()
            .filter(|peak| {
                peak.dataset().is_some_and(|d| {
                    classify_dataset(d).category() == Some(EvidenceCategory::PWM)
                        && d.target.iter().any(|t| self.evidence.pwm_matched.contains(t))
                })
            })
            .filter_map(PeakDetail::from_peak)
            .collect()
    }
}

///
/// Region → score, for one assembly.
///
/// Holds only shared, read-only collaborators, so one engine serves any number of
/// workers. Signal tracks are passed in per call since each worker owns its own.
///
pub struct ScoringEngine<'a> {
    index: &'a dyn PeakIndex,
    model: &'a dyn ProbabilityModel,
    assembly: Assembly,
    max_datasets: usize,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(index: &'a dyn PeakIndex, model: &'a dyn ProbabilityModel, assembly: Assembly) -> Self {
        ScoringEngine {
            index,
            model,
            assembly,
            max_datasets: DEFAULT_MAX_DATASETS,
        }
    }

    pub fn with_max_datasets(mut self, max_datasets: usize) -> Self {
        self.max_datasets = max_datasets;
        self
    }

    pub fn assembly(&self) -> Assembly {
        self.assembly
    }

    pub fn index(&self) -> &'a dyn PeakIndex {
        self.index
    }

    pub fn max_datasets(&self) -> usize {
        self.max_datasets
    }

    pub fn find_overlaps(&self, region: &Region, include_peaks: bool) -> Result<RegionHits> {
        find_overlaps(
            self.index,
            self.assembly,
            region,
            include_peaks,
            self.max_datasets,
        )
    }

    pub fn score(&self, features: &Features) -> Score {
        score(features, self.model)
    }

    /// Query the index for `region` and score what it holds.
    pub fn evaluate(
        &self,
        region: &Region,
        tracks: &mut SignalTracks,
        include_peaks: bool,
    ) -> Result<RegionReport> {
        let hits = self.find_overlaps(region, include_peaks)?;
        Ok(self.report(region, hits, tracks))
    }

    /// Score hits that were already fetched.
    pub fn report(&self, region: &Region, hits: RegionHits, tracks: &mut SignalTracks) -> RegionReport {
        let evidence = classify_evidence(&hits.datasets, region, tracks);
        let features = evidence.features();
        let score = self.score(&features);
        debug!("{} scored {} ({})", region, score.ranking, hits.message);
        RegionReport {
            region: region.clone(),
            hits,
            evidence,
            features,
            score,
        }
    }
}
