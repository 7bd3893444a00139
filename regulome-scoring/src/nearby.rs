//! SNPs around a position, ordered by distance, optionally scored.
use log::{debug, warn};
use rust_lapper::{Interval, Lapper};
use serde::Serialize;

use regulome_core::errors::Result;
use regulome_core::models::{Assembly, Region, Snp};
use regulome_core::traits::PeakIndex;

use crate::engine::ScoringEngine;
use crate::evidence::RegionHits;
use crate::features::{EvidenceSet, Features};
use crate::ranking::Score;
use crate::signal::SignalTracks;

pub const DEFAULT_WINDOW: u32 = 1600;
pub const DEFAULT_MAX_SNPS: usize = 10;

///
/// The window `[pos - window/2, pos + window/2)` around a position.
///
/// Near the chromosome start the window keeps its width and slides right.
///
pub fn nearby_window(chrom: &str, pos: u32, window: u32) -> Region {
    let half = window / 2;
    let start = pos.saturating_sub(half);
    let shift = half - (pos - start);
    Region::new(
        chrom,
        start,
        pos.saturating_add(half).saturating_add(shift),
    )
}

///
/// Order SNPs by distance to `pos` (ties by coordinate) and keep the `max` closest.
///
pub fn snp_window(mut snps: Vec<Snp>, max: usize, pos: u32) -> Vec<Snp> {
    snps.sort_by(|a, b| {
        a.position()
            .abs_diff(pos)
            .cmp(&b.position().abs_diff(pos))
            .then_with(|| a.position().cmp(&b.position()))
            .then_with(|| a.rsid.cmp(&b.rsid))
    });
    snps.truncate(max);
    snps
}

///
/// The `max` SNPs closest to `pos` within `window`.
///
/// ```rust
/// use regulome_core::models::{Assembly, Snp};
/// use regulome_index::MemoryIndex;
/// use regulome_scoring::nearby::nearby_snps;
///
/// let index = MemoryIndex::builder()
///     .with_snp(Assembly::GRCh37, Snp::new("rs1", "chr1", 990, 991))
///     .with_snp(Assembly::GRCh37, Snp::new("rs2", "chr1", 1003, 1004))
///     .with_snp(Assembly::GRCh37, Snp::new("rs3", "chr1", 5000, 5001))
///     .finish();
/// let snps = nearby_snps(&index, Assembly::GRCh37, "chr1", 1000, 100, 10).unwrap();
/// let rsids: Vec<&str> = snps.iter().map(|s| s.rsid.as_str()).collect();
/// assert_eq!(rsids, vec!["rs2", "rs1"]);
/// ```
pub fn nearby_snps(
    index: &dyn PeakIndex,
    assembly: Assembly,
    chrom: &str,
    pos: u32,
    window: u32,
    max: usize,
) -> Result<Vec<Snp>> {
    let region = nearby_window(chrom, pos, window);
    let snps = index.find_snps(assembly, &region)?;
    debug!("{} SNPs in {} around {}", snps.len(), region, pos);
    Ok(snp_window(snps, max, pos))
}

/// rsIDs of the SNPs inside `region`, in coordinate order.
pub fn rsids_in_region(
    index: &dyn PeakIndex,
    assembly: Assembly,
    region: &Region,
) -> Result<Vec<String>> {
    Ok(index
        .find_snps(assembly, region)?
        .into_iter()
        .map(|snp| snp.rsid)
        .collect())
}

///
/// A nearby SNP with its own evidence and score.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSnp {
    #[serde(flatten)]
    pub snp: Snp,
    pub evidence: EvidenceSet,
    pub features: Features,
    pub score: Score,
}

///
/// Like [`nearby_snps`], with every SNP scored for its own position.
///
/// Peaks are fetched once for the window, widened to cover every SNP span, and assigned
/// to SNPs in memory. Consecutive SNPs hit by the same peaks share one dataset breakdown;
/// the information-content signal is read for every SNP. When the window search is cut at
/// the index hit limit, every SNP is queried on its own instead.
///
pub fn scored_snps(
    engine: &ScoringEngine,
    tracks: &mut SignalTracks,
    chrom: &str,
    pos: u32,
    window: u32,
    max: usize,
) -> Result<Vec<ScoredSnp>> {
    let snps = nearby_snps(engine.index(), engine.assembly(), chrom, pos, window, max)?;
    if snps.is_empty() {
        return Ok(Vec::new());
    }

    let window = nearby_window(chrom, pos, window);
    let (start, end) = snps.iter().fold(window.query_span(), |(start, end), snp| {
        let (snp_start, snp_end) = snp.region.query_span();
        (start.min(snp_start), end.max(snp_end))
    });
    let region = Region::new(&window.chr, start, end);
    let search = engine.index().search_peaks(engine.assembly(), &region)?;
    if search.truncated {
        warn!(
            "Peak search in {} hit the index limit; scoring {} SNPs one by one",
            region,
            snps.len()
        );
        return snps
            .into_iter()
            .map(|snp| {
                let report = engine.evaluate(&snp.region, tracks, false)?;
                Ok(ScoredSnp {
                    snp,
                    evidence: report.evidence,
                    features: report.features,
                    score: report.score,
                })
            })
            .collect();
    }

    let peaks = search.peaks;
    let tree: Lapper<u32, usize> = Lapper::new(
        peaks
            .iter()
            .enumerate()
            .map(|(i, peak)| {
                let (start, stop) = peak.region.query_span();
                Interval { start, stop, val: i }
            })
            .collect(),
    );

    let mut previous: Option<(Vec<&str>, EvidenceSet)> = None;
    let mut scored = Vec::with_capacity(snps.len());
    for snp in snps {
        let (start, stop) = snp.region.query_span();
        let mut hit: Vec<usize> = tree.find(start, stop).map(|iv| iv.val).collect();
        hit.sort_unstable();
        let ids: Vec<&str> = hit.iter().map(|&i| peaks[i].id.as_str()).collect();

        let mut evidence = match previous.take() {
            Some((prev_ids, evidence)) if prev_ids == ids => {
                previous = Some((prev_ids, evidence.clone()));
                evidence
            }
            _ => {
                let subset = hit.iter().map(|&i| peaks[i].clone()).collect();
                let hits = RegionHits::from_peaks(subset, false, engine.max_datasets());
                let evidence = EvidenceSet::from_datasets(hits.datasets.values());
                previous = Some((ids, evidence.clone()));
                evidence
            }
        };

        evidence.read_signal(&snp.region, tracks);
        let features = evidence.features();
        let score = engine.score(&features);
        scored.push(ScoredSnp {
            snp,
            evidence,
            features,
            score,
        });
    }
    Ok(scored)
}
