//! An in-process peak and SNP store backed by per-chromosome interval trees.
//!
//! Used for tests and for small local deployments where the full search cluster is not
//! available. Content is loaded from a JSON fixture (optionally gzipped) of the form:
//!
//! ```json
//! {
//!   "datasets": [{"@id": "/experiments/ENCSR000EVI/", "assay_term_name": "ChIP-seq", "target": ["ELK4"]}],
//!   "files": [{"@id": "/files/ENCFF001EVI/", "uuid": "...", "assembly": "hg19", "dataset": "/experiments/ENCSR000EVI/"}],
//!   "peaks": {"hg19": [{"_id": "...", "_index": "chr1", "_source": {"coordinates": {"gte": 1, "lt": 2}, "uuid": "..."}}]},
//!   "snps": {"hg19": [{"rsid": "rs3768324", "chrom": "chr1", "coordinates": {"gte": 39492461, "lte": 39492461}}]}
//! }
//! ```
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use fxhash::FxHashMap;
use log::{debug, info};
use rust_lapper::{Interval, Lapper};
use serde::Deserialize;

use regulome_core::errors::{RegulomeError, Result};
use regulome_core::models::{
    Assembly, Dataset, FileDetail, Peak, PeakDocument, PeakSearch, Region, ResidentDetail, Snp,
    SnpDocument,
};
use regulome_core::traits::PeakIndex;
use regulome_core::utils::open_input;

type Tree = Lapper<u32, usize>;
type TreeKey = (Assembly, String);

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(flatten)]
    detail: FileDetail,
    dataset: String,
}

#[derive(Debug, Default, Deserialize)]
struct IndexFixture {
    #[serde(default)]
    datasets: Vec<Dataset>,
    #[serde(default)]
    files: Vec<FixtureFile>,
    #[serde(default)]
    peaks: BTreeMap<String, Vec<PeakDocument>>,
    #[serde(default)]
    snps: BTreeMap<String, Vec<SnpDocument>>,
}

/// Builder for a [`MemoryIndex`].
///
/// Peaks added without a resident detail are joined to their file and dataset in
/// [`MemoryIndexBuilder::finish`]. Peaks whose file is unknown stay unjoined.
///
/// ```rust
/// use regulome_core::models::{Assembly, Dataset, FileDetail, Peak, Region};
/// use regulome_core::traits::PeakIndex;
/// use regulome_index::MemoryIndex;
///
/// let index = MemoryIndex::builder()
///     .with_dataset(Dataset::new("/experiments/ENCSR000EVI/", "ChIP-seq"))
///     .with_file(FileDetail::new("/files/ENCFF001/", "f-1", "hg19"), "/experiments/ENCSR000EVI/")
///     .with_peak(Assembly::GRCh37, Peak {
///         id: "f-1-0".to_string(),
///         region: Region::new("chr1", 100, 200),
///         file_uuid: "f-1".to_string(),
///         strand: None,
///         value: None,
///         resident_detail: None,
///     })
///     .finish();
///
/// let hits = index.find_peaks(Assembly::GRCh37, &Region::new("chr1", 150, 151)).unwrap();
/// assert_eq!(hits.len(), 1);
/// assert!(hits[0].dataset().is_some());
/// ```
#[derive(Default)]
pub struct MemoryIndexBuilder {
    datasets: FxHashMap<String, Dataset>,
    files: FxHashMap<String, (FileDetail, String)>,
    peaks: Vec<(Assembly, Peak)>,
    snps: Vec<(Assembly, Snp)>,
    max_hits: Option<usize>,
}

impl MemoryIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.datasets.insert(dataset.id.clone(), dataset);
        self
    }

    /// Register a file as belonging to the dataset with `@id` `dataset_id`.
    pub fn with_file(mut self, file: FileDetail, dataset_id: &str) -> Self {
        let key = file.uuid.clone().unwrap_or_else(|| file.id.clone());
        self.files.insert(key, (file, dataset_id.to_string()));
        self
    }

    pub fn with_peak(mut self, assembly: Assembly, peak: Peak) -> Self {
        self.peaks.push((assembly, peak));
        self
    }

    pub fn with_snp(mut self, assembly: Assembly, snp: Snp) -> Self {
        self.snps.push((assembly, snp));
        self
    }

    /// Cap the peaks returned by one search, the way the search cluster caps a page.
    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = Some(max_hits);
        self
    }

    /// Consumes the builder, joins peaks to their files and datasets and builds the trees.
    pub fn finish(self) -> MemoryIndex {
        let mut peaks = Vec::with_capacity(self.peaks.len());
        let mut peak_ivs: FxHashMap<TreeKey, Vec<Interval<u32, usize>>> = FxHashMap::default();
        let mut unjoined = 0usize;

        for (assembly, mut peak) in self.peaks {
            if peak.resident_detail.is_none() {
                peak.resident_detail = self.files.get(&peak.file_uuid).and_then(|(file, ds)| {
                    self.datasets.get(ds).map(|dataset| ResidentDetail {
                        file: file.clone(),
                        dataset: dataset.clone(),
                    })
                });
                if peak.resident_detail.is_none() {
                    unjoined += 1;
                }
            }
            let (start, stop) = peak.region.query_span();
            peak_ivs
                .entry((assembly, peak.region.chr.clone()))
                .or_default()
                .push(Interval {
                    start,
                    stop,
                    val: peaks.len(),
                });
            peaks.push(peak);
        }

        if unjoined > 0 {
            debug!("{} peaks reference unknown files or datasets", unjoined);
        }

        let mut snps = Vec::with_capacity(self.snps.len());
        let mut snp_ivs: FxHashMap<TreeKey, Vec<Interval<u32, usize>>> = FxHashMap::default();
        let mut rsids = FxHashMap::default();
        for (assembly, snp) in self.snps {
            let (start, stop) = snp.region.query_span();
            snp_ivs
                .entry((assembly, snp.region.chr.clone()))
                .or_default()
                .push(Interval {
                    start,
                    stop,
                    val: snps.len(),
                });
            rsids.insert((assembly, snp.rsid.clone()), snps.len());
            snps.push(snp);
        }

        MemoryIndex {
            peak_trees: build_trees(peak_ivs),
            peaks,
            snp_trees: build_trees(snp_ivs),
            snps,
            rsids,
            max_hits: self.max_hits,
        }
    }
}

fn build_trees(ivs: FxHashMap<TreeKey, Vec<Interval<u32, usize>>>) -> FxHashMap<TreeKey, Tree> {
    ivs.into_iter()
        .map(|(key, intervals)| (key, Lapper::new(intervals)))
        .collect()
}

///
/// A read-only peak index held entirely in memory.
///
/// Queries are answered from one interval tree per (assembly, chromosome), so results
/// follow the same half-open overlap semantics as the search cluster.
///
pub struct MemoryIndex {
    peaks: Vec<Peak>,
    peak_trees: FxHashMap<TreeKey, Tree>,
    snps: Vec<Snp>,
    snp_trees: FxHashMap<TreeKey, Tree>,
    rsids: FxHashMap<(Assembly, String), usize>,
    max_hits: Option<usize>,
}

impl MemoryIndex {
    pub fn builder() -> MemoryIndexBuilder {
        MemoryIndexBuilder::new()
    }

    ///
    /// Load an index from a JSON fixture file, plain or gzipped.
    ///
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_input(path).map_err(|e| {
            RegulomeError::SearchBackend(format!("cannot open index fixture: {e:#}"))
        })?;
        let index = Self::from_reader(reader)?;
        info!(
            "Loaded {} peaks and {} SNPs from {}",
            index.peaks.len(),
            index.snps.len(),
            path.display()
        );
        Ok(index)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let fixture: IndexFixture = serde_json::from_reader(reader)
            .map_err(|e| RegulomeError::MalformedDocument(e.to_string()))?;
        Self::from_fixture(fixture)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Self::from_reader(raw.as_bytes())
    }

    fn from_fixture(fixture: IndexFixture) -> Result<Self> {
        let mut builder = MemoryIndexBuilder::new();
        for dataset in fixture.datasets {
            builder = builder.with_dataset(dataset);
        }
        for file in fixture.files {
            builder = builder.with_file(file.detail, &file.dataset);
        }
        for (alias, docs) in fixture.peaks {
            let assembly: Assembly = alias.parse()?;
            for doc in docs {
                builder = builder.with_peak(assembly, Peak::try_from(doc)?);
            }
        }
        for (alias, docs) in fixture.snps {
            let assembly: Assembly = alias.parse()?;
            for doc in docs {
                builder = builder.with_snp(assembly, Snp::try_from(doc)?);
            }
        }
        Ok(builder.finish())
    }

    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }

    pub fn snp_count(&self) -> usize {
        self.snps.len()
    }

    fn overlapping<'a>(
        trees: &'a FxHashMap<TreeKey, Tree>,
        assembly: Assembly,
        region: &Region,
    ) -> impl Iterator<Item = usize> + 'a {
        let (start, end) = region.query_span();
        trees
            .get(&(assembly, region.chr.clone()))
            .into_iter()
            .flat_map(move |tree| tree.find(start, end).map(|iv| iv.val))
    }
}

impl PeakIndex for MemoryIndex {
    fn search_peaks(&self, assembly: Assembly, region: &Region) -> Result<PeakSearch> {
        let mut hits: Vec<Peak> = Self::overlapping(&self.peak_trees, assembly, region)
            .map(|i| self.peaks[i].clone())
            .collect();
        hits.sort_by(|a, b| a.region.cmp(&b.region).then_with(|| a.id.cmp(&b.id)));
        Ok(match self.max_hits {
            Some(limit) => PeakSearch::limited(hits, limit),
            None => PeakSearch::complete(hits),
        })
    }

    fn snp(&self, assembly: Assembly, rsid: &str) -> Result<Option<Snp>> {
        Ok(self
            .rsids
            .get(&(assembly, rsid.to_string()))
            .map(|&i| self.snps[i].clone()))
    }

    fn find_snps(&self, assembly: Assembly, region: &Region) -> Result<Vec<Snp>> {
        let mut hits: Vec<Snp> = Self::overlapping(&self.snp_trees, assembly, region)
            .map(|i| self.snps[i].clone())
            .collect();
        hits.sort_by(|a, b| a.region.cmp(&b.region).then_with(|| a.rsid.cmp(&b.rsid)));
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn index() -> MemoryIndex {
        let raw = r#"{
            "datasets": [
                {"@id": "/experiments/ENCSR000EVI/", "assay_term_name": "ChIP-seq", "target": ["ELK4"]},
                {"@id": "/annotations/ENCSR061TST/", "annotation_type": "dsQTLs"}
            ],
            "files": [
                {"@id": "/files/ENCFF001EVI/", "uuid": "f-evi", "assembly": "hg19", "dataset": "/experiments/ENCSR000EVI/"},
                {"@id": "/files/ENCFF061TST/", "uuid": "f-qtl", "assembly": "hg19", "dataset": "/annotations/ENCSR061TST/"}
            ],
            "peaks": {
                "hg19": [
                    {"_id": "f-evi-1", "_index": "chr1", "_source": {"coordinates": {"gte": 39492400, "lt": 39492500}, "uuid": "f-evi"}},
                    {"_id": "f-qtl-1", "_index": "chr1", "_source": {"coordinates": {"gte": 39492461, "lte": 39492461}, "uuid": "f-qtl"}},
                    {"_id": "orphan-1", "_index": "chr1", "_source": {"coordinates": {"gte": 39492450, "lt": 39492470}, "uuid": "missing"}}
                ],
                "GRCh38": [
                    {"_id": "f-evi-38", "_index": "chr1", "_source": {"coordinates": {"gte": 39026700, "lt": 39026800}, "uuid": "f-evi"}}
                ]
            },
            "snps": {
                "hg19": [
                    {"rsid": "rs3768324", "chrom": "chr1", "coordinates": {"gte": 39492461, "lte": 39492461}},
                    {"rsid": "rs0000001", "chrom": "chr1", "coordinates": {"gte": 39492600, "lt": 39492601}}
                ]
            }
        }"#;
        MemoryIndex::from_json_str(raw).unwrap()
    }

    #[rstest]
    fn test_load_counts(index: MemoryIndex) {
        assert_eq!(index.peak_count(), 4);
        assert_eq!(index.snp_count(), 2);
    }

    #[rstest]
    fn test_find_peaks_joins_resident_detail(index: MemoryIndex) {
        let hits = index
            .find_peaks(Assembly::GRCh37, &Region::new("chr1", 39492461, 39492462))
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["f-evi-1", "orphan-1", "f-qtl-1"]);

        let chip = &hits[0];
        assert_eq!(chip.dataset().unwrap().id, "/experiments/ENCSR000EVI/");
        assert_eq!(chip.file().unwrap().id, "/files/ENCFF001EVI/");
        assert!(hits[1].resident_detail.is_none());
    }

    #[rstest]
    fn test_find_peaks_is_assembly_scoped(index: MemoryIndex) {
        let region = Region::new("chr1", 39026750, 39026751);
        assert_eq!(index.find_peaks(Assembly::GRCh37, &region).unwrap().len(), 0);
        assert_eq!(index.find_peaks(Assembly::GRCh38, &region).unwrap().len(), 1);
    }

    #[rstest]
    #[case(Region::new("chr1", 39492500, 39492501), 0)]
    #[case(Region::new("chr1", 39492499, 39492500), 1)]
    #[case(Region::new("chr2", 39492461, 39492462), 0)]
    fn test_find_peaks_half_open(index: MemoryIndex, #[case] region: Region, #[case] expected: usize) {
        let hits = index.find_peaks(Assembly::GRCh37, &region).unwrap();
        assert_eq!(hits.len(), expected);
    }

    #[rstest]
    fn test_search_peaks_flags_hit_limit() {
        let peak = |id: &str, start: u32| Peak {
            id: id.to_string(),
            region: Region::new("chr1", start, start + 50),
            file_uuid: "f".to_string(),
            strand: None,
            value: None,
            resident_detail: None,
        };
        let index = MemoryIndex::builder()
            .with_peak(Assembly::GRCh37, peak("a", 100))
            .with_peak(Assembly::GRCh37, peak("b", 110))
            .with_peak(Assembly::GRCh37, peak("c", 120))
            .with_max_hits(2)
            .finish();

        let search = index
            .search_peaks(Assembly::GRCh37, &Region::new("chr1", 100, 200))
            .unwrap();
        assert!(search.truncated);
        assert_eq!(search.peaks.len(), 2);

        let search = index
            .search_peaks(Assembly::GRCh37, &Region::new("chr1", 165, 200))
            .unwrap();
        assert!(!search.truncated);
        assert_eq!(search.peaks.len(), 1);
    }

    #[rstest]
    fn test_snp_lookup(index: MemoryIndex) {
        let snp = index.snp(Assembly::GRCh37, "rs3768324").unwrap().unwrap();
        assert_eq!(snp.region, Region::new("chr1", 39492461, 39492462));
        assert!(index.snp(Assembly::GRCh38, "rs3768324").unwrap().is_none());
    }

    #[rstest]
    fn test_find_snps(index: MemoryIndex) {
        let snps = index
            .find_snps(Assembly::GRCh37, &Region::new("chr1", 39492000, 39493000))
            .unwrap();
        let rsids: Vec<&str> = snps.iter().map(|s| s.rsid.as_str()).collect();
        assert_eq!(rsids, vec!["rs3768324", "rs0000001"]);
    }

    #[rstest]
    fn test_malformed_fixture() {
        let raw = r#"{"peaks": {"hg19": [{"_id": "x", "_index": "chr1", "_source": {"coordinates": {"gte": 1}, "uuid": "u"}}]}}"#;
        let err = MemoryIndex::from_json_str(raw).err().unwrap();
        assert!(matches!(err, RegulomeError::MalformedDocument(_)));
    }

    #[rstest]
    fn test_unknown_assembly_alias() {
        let raw = r#"{"snps": {"hg17": []}}"#;
        let err = MemoryIndex::from_json_str(raw).err().unwrap();
        assert!(matches!(err, RegulomeError::UnknownAssembly(_)));
    }
}
