//! Peak index backed by an Elasticsearch cluster.
//!
//! Layout of the cluster:
//! - peaks live in one index per chromosome (`chr1`, `chrx`, ...), one mapping type per
//!   assembly alias (`hg19`, `GRCh38`, ...)
//! - `resident_regionsets` holds one document per peak file, keyed by the file uuid, with
//!   the file and dataset metadata
//! - SNPs live in `snp_<alias>` indices
use std::time::Duration;

use fxhash::FxHashMap;
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use regulome_core::errors::{RegulomeError, Result};
use regulome_core::models::{
    Assembly, Peak, PeakDocument, PeakSearch, Region, ResidentDetail, Snp, SnpDocument,
};
use regulome_core::traits::PeakIndex;

pub const DEFAULT_ELASTIC_URL: &str = "http://localhost:9200";
pub const RESIDENT_REGIONSETS_INDEX: &str = "resident_regionsets";
pub const DEFAULT_MAX_HITS: usize = 10_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    hits: Hits<T>,
}

#[derive(Debug, Deserialize)]
struct Hits<T> {
    hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
struct Hit<T> {
    #[serde(flatten)]
    doc: T,
}

#[derive(Debug, Deserialize)]
struct SnpHit {
    #[serde(rename = "_source")]
    source: SnpDocument,
}

#[derive(Debug, Deserialize)]
struct MgetResponse {
    docs: Vec<MgetDoc>,
}

#[derive(Debug, Deserialize)]
struct MgetDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

/// Decode each `_mget` document on its own. Missing or malformed documents leave their
/// peaks unjoined instead of failing the search.
fn decode_resident_details(response: MgetResponse) -> FxHashMap<String, ResidentDetail> {
    let mut details = FxHashMap::default();
    for doc in response.docs {
        let Some(source) = doc.source.filter(|_| doc.found) else {
            continue;
        };
        match serde_json::from_value::<ResidentDetail>(source) {
            Ok(detail) => {
                details.insert(doc.id, detail);
            }
            Err(e) => debug!("Skipping resident detail {}: {}", doc.id, e),
        }
    }
    details
}

/// Builder for constructing an [`ElasticIndex`].
///
/// ```rust,no_run
/// use regulome_index::ElasticIndex;
///
/// # fn main() -> regulome_core::Result<()> {
/// let index = ElasticIndex::builder()
///     .with_url("http://search.example.org:9200".to_string())
///     .with_timeout_secs(10)
///     .finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ElasticIndexBuilder {
    url: Option<String>,
    timeout_secs: Option<u64>,
    max_hits: Option<usize>,
}

impl ElasticIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Upper bound on documents returned by a single search.
    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = Some(max_hits);
        self
    }

    pub fn finish(self) -> Result<ElasticIndex> {
        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegulomeError::SearchBackend(e.to_string()))?;

        let url = self.url.unwrap_or_else(|| DEFAULT_ELASTIC_URL.to_string());
        Ok(ElasticIndex {
            base: url.trim_end_matches('/').to_string(),
            client,
            max_hits: self.max_hits.unwrap_or(DEFAULT_MAX_HITS),
        })
    }
}

///
/// Client for the regulome search cluster.
///
pub struct ElasticIndex {
    base: String,
    client: Client,
    max_hits: usize,
}

impl ElasticIndex {
    pub fn builder() -> ElasticIndexBuilder {
        ElasticIndexBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.base
    }

    /// POST a JSON body and decode the response. `Ok(None)` when the index does not exist.
    fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<Option<T>> {
        let url = format!("{}/{}", self.base, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| RegulomeError::SearchBackend(format!("{url}: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<T>()
                .map(Some)
                .map_err(|e| RegulomeError::SearchBackend(format!("{url}: {e}"))),
            status => Err(RegulomeError::SearchBackend(format!("{url}: HTTP {status}"))),
        }
    }

    ///
    /// Fetch file and dataset metadata for a set of file uuids.
    ///
    fn resident_details(&self, uuids: &[&str]) -> Result<FxHashMap<String, ResidentDetail>> {
        if uuids.is_empty() {
            return Ok(FxHashMap::default());
        }
        let path = format!("{RESIDENT_REGIONSETS_INDEX}/_mget");
        let response: Option<MgetResponse> = self.post(&path, &json!({ "ids": uuids }))?;
        Ok(response.map(decode_resident_details).unwrap_or_default())
    }
}

/// Range-overlap query on the `coordinates` field.
pub fn range_query(region: &Region) -> Value {
    let (start, end) = region.query_span();
    json!({
        "range": {
            "coordinates": {
                "gte": start,
                "lt": end,
                "relation": "intersects"
            }
        }
    })
}

pub fn peak_search_body(region: &Region, size: usize) -> Value {
    json!({
        "size": size,
        "query": { "bool": { "filter": [range_query(region)] } },
        "_source": ["coordinates", "uuid", "strand", "value"]
    })
}

pub fn snp_region_body(region: &Region, size: usize) -> Value {
    json!({
        "size": size,
        "query": {
            "bool": {
                "filter": [
                    { "term": { "chrom": region.chr } },
                    range_query(region)
                ]
            }
        }
    })
}

pub fn snp_rsid_body(rsid: &str) -> Value {
    json!({
        "size": 1,
        "query": { "term": { "rsid": rsid } }
    })
}

fn snp_index(assembly: Assembly) -> String {
    format!("snp_{}", assembly.index_alias().to_lowercase())
}

impl PeakIndex for ElasticIndex {
    fn search_peaks(&self, assembly: Assembly, region: &Region) -> Result<PeakSearch> {
        let path = format!(
            "{}/{}/_search",
            region.chr.to_lowercase(),
            assembly.index_alias()
        );
        // one extra document tells a full page apart from a cut one
        let response: Option<SearchResponse<PeakDocument>> =
            self.post(&path, &peak_search_body(region, self.max_hits + 1))?;
        let Some(response) = response else {
            debug!("No peak index for {}", region.chr);
            return Ok(PeakSearch::default());
        };

        let peaks = response
            .hits
            .hits
            .into_iter()
            .map(|hit| Peak::try_from(hit.doc))
            .collect::<Result<Vec<Peak>>>()?;
        let PeakSearch {
            mut peaks,
            truncated,
        } = PeakSearch::limited(peaks, self.max_hits);
        if truncated {
            warn!(
                "Peak search in {} hit the limit of {} documents",
                region, self.max_hits
            );
        }

        let mut uuids: Vec<&str> = peaks.iter().map(|p| p.file_uuid.as_str()).collect();
        uuids.sort_unstable();
        uuids.dedup();
        let details = self.resident_details(&uuids)?;

        for peak in peaks.iter_mut() {
            peak.resident_detail = details.get(&peak.file_uuid).cloned();
        }
        Ok(PeakSearch { peaks, truncated })
    }

    fn snp(&self, assembly: Assembly, rsid: &str) -> Result<Option<Snp>> {
        let path = format!("{}/_search", snp_index(assembly));
        let response: Option<SearchResponse<SnpHit>> = self.post(&path, &snp_rsid_body(rsid))?;
        response
            .and_then(|r| r.hits.hits.into_iter().next())
            .map(|hit| Snp::try_from(hit.doc.source))
            .transpose()
    }

    fn find_snps(&self, assembly: Assembly, region: &Region) -> Result<Vec<Snp>> {
        let path = format!("{}/_search", snp_index(assembly));
        let response: Option<SearchResponse<SnpHit>> =
            self.post(&path, &snp_region_body(region, self.max_hits))?;
        response
            .map(|r| r.hits.hits)
            .unwrap_or_default()
            .into_iter()
            .map(|hit| Snp::try_from(hit.doc.source))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_range_query_widens_point() {
        let query = range_query(&Region::new("chr10", 5894499, 5894499));
        assert_eq!(
            query,
            json!({"range": {"coordinates": {"gte": 5894499, "lt": 5894500, "relation": "intersects"}}})
        );
    }

    #[rstest]
    fn test_snp_region_body_filters_chromosome() {
        let body = snp_region_body(&Region::new("chr10", 104528867, 104530467), 50);
        assert_eq!(body["size"], json!(50));
        assert_eq!(body["query"]["bool"]["filter"][0], json!({"term": {"chrom": "chr10"}}));
    }

    #[rstest]
    #[case(Assembly::GRCh37, "snp_hg19")]
    #[case(Assembly::GRCh38, "snp_grch38")]
    fn test_snp_index(#[case] assembly: Assembly, #[case] expected: &str) {
        assert_eq!(snp_index(assembly), expected);
    }

    #[rstest]
    fn test_decode_search_response() {
        let raw = r#"{"hits": {"total": 1, "hits": [
            {"_id": "p1", "_index": "chr10", "_score": 0.0,
             "_source": {"coordinates": {"gte": 5894432, "lt": 5894748}, "uuid": "f1"}}
        ]}}"#;
        let response: SearchResponse<PeakDocument> = serde_json::from_str(raw).unwrap();
        let peak = Peak::try_from(response.hits.hits.into_iter().next().unwrap().doc).unwrap();
        assert_eq!(peak.region, Region::new("chr10", 5894432, 5894748));
    }

    #[rstest]
    fn test_resident_details_skip_bad_documents() {
        let raw = r#"{"docs": [
            {"_id": "f-good", "found": true, "_source": {
                "file": {"@id": "/files/ENCFF001EVI/", "uuid": "f-good", "assembly": "hg19"},
                "dataset": {"@id": "/experiments/ENCSR000EVI/", "assay_term_name": "ChIP-seq", "target": ["ELK4"]}
            }},
            {"_id": "f-bad", "found": true, "_source": {"file": {"uuid": "f-bad"}}},
            {"_id": "f-gone", "found": false}
        ]}"#;
        let response: MgetResponse = serde_json::from_str(raw).unwrap();
        let details = decode_resident_details(response);

        assert_eq!(details.len(), 1);
        assert_eq!(details["f-good"].dataset.id, "/experiments/ENCSR000EVI/");
        assert!(!details.contains_key("f-bad"));
    }

    #[rstest]
    fn test_builder_trims_url() {
        let index = ElasticIndex::builder()
            .with_url("http://localhost:9200/".to_string())
            .finish()
            .unwrap();
        assert_eq!(index.url(), "http://localhost:9200");
    }
}
