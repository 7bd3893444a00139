//! Region → evidence: overlapping peaks, deduplicated to files and datasets.
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, error, warn};
use serde::Serialize;

use regulome_core::errors::Result;
use regulome_core::models::{Assembly, Dataset, FileDetail, Peak, Region};
use regulome_core::traits::PeakIndex;

/// Maximum number of datasets a single region query may carry forward.
pub const DEFAULT_MAX_DATASETS: usize = 8192;

pub const NO_HITS_MESSAGE: &str = "No hits found in this location";
pub const NO_SOURCES_MESSAGE: &str = "No regulome sources found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HitsStatus {
    /// At least one peak joined to a dataset.
    Found,
    /// The index returned no peaks at all.
    NoHits,
    /// Peaks were found but none resolved to a file and dataset.
    NoSources,
}

///
/// Display row for one peak, for callers that asked for peak details.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakDetail {
    pub method: String,
    pub targets: Vec<String>,
    pub biosample_term_name: Option<String>,
    pub chrom: String,
    pub start: u32,
    pub end: u32,
}

impl PeakDetail {
    /// `None` when the peak never joined to a dataset.
    pub fn from_peak(peak: &Peak) -> Option<Self> {
        let dataset = peak.dataset()?;
        Some(PeakDetail {
            method: dataset.method().to_string(),
            targets: dataset.target.clone(),
            biosample_term_name: dataset.biosample_term_name.clone(),
            chrom: peak.region.chr.clone(),
            start: peak.region.start,
            end: peak.region.end,
        })
    }

    /// `chrom start end targets biosample method`, with `.` for missing fields.
    pub fn to_bed_row(&self) -> String {
        let targets = if self.targets.is_empty() {
            ".".to_string()
        } else {
            self.targets.join(",")
        };
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.start,
            self.end,
            targets,
            self.biosample_term_name.as_deref().unwrap_or("."),
            self.method
        )
    }
}

///
/// Everything the index knows about one queried region.
///
/// `peak_count` counts raw peaks, including those dropped for lacking a dataset, so
/// `dataset_count <= file_count <= peak_count` always holds.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionHits {
    pub status: HitsStatus,
    pub message: String,
    pub peak_count: usize,
    pub file_count: usize,
    pub dataset_count: usize,
    /// keyed by dataset `@id`
    pub datasets: BTreeMap<String, Dataset>,
    /// keyed by file `@id`
    pub files: BTreeMap<String, FileDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peaks: Option<Vec<Peak>>,
    /// Datasets were cut at the ceiling or the index stopped at its hit limit; treat
    /// them as provisional.
    pub truncated: bool,
}

impl RegionHits {
    pub fn no_hits() -> Self {
        RegionHits {
            status: HitsStatus::NoHits,
            message: NO_HITS_MESSAGE.to_string(),
            peak_count: 0,
            file_count: 0,
            dataset_count: 0,
            datasets: BTreeMap::new(),
            files: BTreeMap::new(),
            peaks: None,
            truncated: false,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == HitsStatus::Found
    }

    pub fn peak_details(&self) -> Vec<PeakDetail> {
        self.peaks
            .iter()
            .flatten()
            .filter_map(PeakDetail::from_peak)
            .collect()
    }

    ///
    /// Aggregate a set of overlapping peaks.
    ///
    /// # Arguments
    /// - peaks: peaks overlapping the region, joined or not
    /// - include_peaks: keep the joined peaks in the result
    /// - max_datasets: ceiling on distinct datasets
    ///
    pub fn from_peaks(peaks: Vec<Peak>, include_peaks: bool, max_datasets: usize) -> Self {
        if peaks.is_empty() {
            return RegionHits::no_hits();
        }
        let peak_count = peaks.len();

        let mut datasets: BTreeMap<String, Dataset> = BTreeMap::new();
        let mut files: BTreeMap<String, (FileDetail, String)> = BTreeMap::new();
        let mut joined = Vec::with_capacity(peaks.len());
        for peak in peaks {
            let Some(detail) = peak.resident_detail.as_ref() else {
                debug!("Dropping peak {} without resident detail", peak.id);
                continue;
            };
            datasets
                .entry(detail.dataset.id.clone())
                .or_insert_with(|| detail.dataset.clone());
            files
                .entry(detail.file.id.clone())
                .or_insert_with(|| (detail.file.clone(), detail.dataset.id.clone()));
            joined.push(peak);
        }

        if datasets.is_empty() {
            return RegionHits {
                status: HitsStatus::NoSources,
                message: NO_SOURCES_MESSAGE.to_string(),
                peak_count,
                peaks: include_peaks.then(Vec::new),
                ..RegionHits::no_hits()
            };
        }

        let truncated = datasets.len() > max_datasets;
        if truncated {
            error!(
                "Region has {} datasets, more than the {} the index can query at once; truncating",
                datasets.len(),
                max_datasets
            );
            let kept: BTreeSet<String> = datasets.keys().take(max_datasets).cloned().collect();
            datasets.retain(|id, _| kept.contains(id));
            files.retain(|_, (_, dataset_id)| kept.contains(dataset_id));
            joined.retain(|p| p.dataset().is_some_and(|d| kept.contains(&d.id)));
        }

        let files: BTreeMap<String, FileDetail> =
            files.into_iter().map(|(id, (file, _))| (id, file)).collect();
        let message = format!(
            "{} peaks in {} files belonging to {} datasets in this region",
            peak_count,
            files.len(),
            datasets.len()
        );

        RegionHits {
            status: HitsStatus::Found,
            message,
            peak_count,
            file_count: files.len(),
            dataset_count: datasets.len(),
            datasets,
            files,
            peaks: include_peaks.then_some(joined),
            truncated,
        }
    }
}

///
/// Find the peaks overlapping `region` and reduce them to distinct files and datasets.
///
/// A region with no peaks is a valid, empty result. Backend failures propagate. A search
/// cut at the index hit limit marks the result as truncated.
///
/// ```rust
/// use regulome_core::models::{Assembly, Region};
/// use regulome_index::MemoryIndex;
/// use regulome_scoring::evidence::{find_overlaps, HitsStatus, DEFAULT_MAX_DATASETS};
///
/// let index = MemoryIndex::builder().finish();
/// let hits = find_overlaps(
///     &index,
///     Assembly::GRCh37,
///     &Region::new("chr1", 100, 101),
///     false,
///     DEFAULT_MAX_DATASETS,
/// ).unwrap();
/// assert_eq!(hits.status, HitsStatus::NoHits);
/// assert_eq!(hits.message, "No hits found in this location");
/// ```
pub fn find_overlaps(
    index: &dyn PeakIndex,
    assembly: Assembly,
    region: &Region,
    include_peaks: bool,
    max_datasets: usize,
) -> Result<RegionHits> {
    let search = index.search_peaks(assembly, region)?;
    debug!("{} peaks overlap {} on {}", search.peaks.len(), region, assembly);
    if search.truncated {
        warn!("Peaks overlapping {} were cut at the index hit limit", region);
    }
    let mut hits = RegionHits::from_peaks(search.peaks, include_peaks, max_datasets);
    hits.truncated |= search.truncated;
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use regulome_core::models::ResidentDetail;
    use regulome_index::MemoryIndex;
    use rstest::*;

    fn peak(id: &str, dataset: &str, file: &str) -> Peak {
        Peak {
            id: id.to_string(),
            region: Region::new("chr1", 100, 200),
            file_uuid: file.to_string(),
            strand: None,
            value: None,
            resident_detail: Some(ResidentDetail {
                file: FileDetail::new(&format!("/files/{file}/"), file, "hg19"),
                dataset: Dataset::new(dataset, "ChIP-seq").with_targets(&["ELK4"]),
            }),
        }
    }

    #[rstest]
    fn test_dedup_by_dataset() {
        let peaks = vec![
            peak("a-1", "/experiments/A/", "fa"),
            peak("a-2", "/experiments/A/", "fa"),
            peak("a-3", "/experiments/A/", "fa2"),
            peak("b-1", "/experiments/B/", "fb"),
        ];
        let hits = RegionHits::from_peaks(peaks, false, DEFAULT_MAX_DATASETS);
        assert_eq!(hits.status, HitsStatus::Found);
        assert_eq!(hits.peak_count, 4);
        assert_eq!(hits.file_count, 3);
        assert_eq!(hits.dataset_count, 2);
        assert_eq!(
            hits.message,
            "4 peaks in 3 files belonging to 2 datasets in this region"
        );
        assert!(hits.peaks.is_none());
    }

    #[rstest]
    fn test_unjoined_peaks_are_dropped() {
        let mut orphan = peak("o-1", "/experiments/A/", "fo");
        orphan.resident_detail = None;
        let hits = RegionHits::from_peaks(
            vec![orphan.clone(), peak("a-1", "/experiments/A/", "fa")],
            true,
            DEFAULT_MAX_DATASETS,
        );
        assert_eq!(hits.peak_count, 2);
        assert_eq!(hits.dataset_count, 1);
        assert_eq!(hits.peaks.as_ref().map(|p| p.len()), Some(1));

        let hits = RegionHits::from_peaks(vec![orphan], false, DEFAULT_MAX_DATASETS);
        assert_eq!(hits.status, HitsStatus::NoSources);
        assert_eq!(hits.message, "No regulome sources found");
        assert_eq!(hits.dataset_count, 0);
    }

    #[rstest]
    fn test_truncation_keeps_lowest_ids() {
        let peaks = vec![
            peak("c-1", "/experiments/C/", "fc"),
            peak("a-1", "/experiments/A/", "fa"),
            peak("b-1", "/experiments/B/", "fb"),
        ];
        let hits = RegionHits::from_peaks(peaks, true, 2);
        assert!(hits.truncated);
        assert_eq!(hits.dataset_count, 2);
        assert_eq!(
            hits.datasets.keys().cloned().collect::<Vec<_>>(),
            vec!["/experiments/A/".to_string(), "/experiments/B/".to_string()]
        );
        assert_eq!(hits.file_count, 2);
        assert_eq!(hits.peaks.map(|p| p.len()), Some(2));
    }

    #[rstest]
    fn test_peak_details() {
        let hits = RegionHits::from_peaks(
            vec![peak("a-1", "/experiments/A/", "fa")],
            true,
            DEFAULT_MAX_DATASETS,
        );
        let details = hits.peak_details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].targets, vec!["ELK4".to_string()]);
        assert_eq!((details[0].start, details[0].end), (100, 200));
        assert_eq!(details[0].to_bed_row(), "chr1\t100\t200\tELK4\t.\tChIP-seq");
    }

    #[rstest]
    fn test_find_overlaps_flags_index_hit_limit() {
        let index = MemoryIndex::builder()
            .with_peak(Assembly::GRCh37, peak("a-1", "/experiments/A/", "fa"))
            .with_peak(Assembly::GRCh37, peak("b-1", "/experiments/B/", "fb"))
            .with_max_hits(1)
            .finish();
        let region = Region::new("chr1", 150, 151);

        let hits = find_overlaps(&index, Assembly::GRCh37, &region, false, DEFAULT_MAX_DATASETS)
            .unwrap();
        assert_eq!(hits.status, HitsStatus::Found);
        assert_eq!(hits.dataset_count, 1);
        assert!(hits.truncated);

        let index = MemoryIndex::builder()
            .with_peak(Assembly::GRCh37, peak("a-1", "/experiments/A/", "fa"))
            .finish();
        let hits = find_overlaps(&index, Assembly::GRCh37, &region, false, DEFAULT_MAX_DATASETS)
            .unwrap();
        assert!(!hits.truncated);
    }
}
