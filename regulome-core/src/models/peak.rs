use serde::{Deserialize, Serialize};

use crate::errors::{RegulomeError, Result};
use crate::models::dataset::{Dataset, FileDetail};
use crate::models::region::{RawCoordinates, Region};

///
/// The file and dataset a peak belongs to, as joined by the index.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentDetail {
    pub file: FileDetail,
    pub dataset: Dataset,
}

///
/// An indexed interval asserting some regulatory evidence.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Peak {
    /// Index document id. Unique per peak, not per file.
    pub id: String,
    pub region: Region,
    /// uuid of the owning file
    pub file_uuid: String,
    pub strand: Option<String>,
    pub value: Option<String>,
    pub resident_detail: Option<ResidentDetail>,
}

impl Peak {
    pub fn dataset(&self) -> Option<&Dataset> {
        self.resident_detail.as_ref().map(|d| &d.dataset)
    }

    pub fn file(&self) -> Option<&FileDetail> {
        self.resident_detail.as_ref().map(|d| &d.file)
    }
}

///
/// The peaks an index returned for one region.
///
/// `truncated` is set when the index stopped at its result limit, so more peaks overlap
/// the region than `peaks` holds.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeakSearch {
    pub peaks: Vec<Peak>,
    pub truncated: bool,
}

impl PeakSearch {
    pub fn complete(peaks: Vec<Peak>) -> Self {
        PeakSearch {
            peaks,
            truncated: false,
        }
    }

    /// Keep at most `limit` peaks, flagging the search as truncated when any were cut.
    pub fn limited(mut peaks: Vec<Peak>, limit: usize) -> Self {
        let truncated = peaks.len() > limit;
        peaks.truncate(limit);
        PeakSearch { peaks, truncated }
    }
}

///
/// The `_source` of a peak document.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSource {
    pub coordinates: RawCoordinates,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

///
/// A raw peak hit as returned by the search backend. The chromosome is the index
/// the document lives in.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_source")]
    pub source: PeakSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_detail: Option<ResidentDetail>,
}

impl TryFrom<PeakDocument> for Peak {
    type Error = RegulomeError;

    fn try_from(doc: PeakDocument) -> Result<Self> {
        let region = doc.source.coordinates.into_region(&doc.index)?;
        Ok(Peak {
            id: doc.id,
            region,
            file_uuid: doc.source.uuid,
            strand: doc.source.strand,
            value: doc.source.value,
            resident_detail: doc.resident_detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_peak_from_document() {
        let raw = r#"{
            "_id": "956cba28-ccff-4cbd-b1c8-39db4e3de572-10",
            "_index": "chr10",
            "_source": {
                "coordinates": {"gte": 5894432, "lt": 5894748},
                "uuid": "956cba28-ccff-4cbd-b1c8-39db4e3de572",
                "strand": ".",
                "value": "135.942930657532"
            }
        }"#;
        let doc: PeakDocument = serde_json::from_str(raw).unwrap();
        let peak = Peak::try_from(doc).unwrap();
        assert_eq!(peak.region, Region::new("chr10", 5894432, 5894748));
        assert_eq!(peak.file_uuid, "956cba28-ccff-4cbd-b1c8-39db4e3de572");
        assert_eq!(peak.strand.as_deref(), Some("."));
        assert!(peak.dataset().is_none());
    }

    #[rstest]
    #[case(3, 3, false)]
    #[case(2, 2, true)]
    #[case(5, 3, false)]
    fn test_limited_search(#[case] limit: usize, #[case] kept: usize, #[case] truncated: bool) {
        let peaks: Vec<Peak> = (0..3)
            .map(|i| Peak {
                id: format!("p-{i}"),
                region: Region::new("chr1", i * 10, i * 10 + 5),
                file_uuid: "f".to_string(),
                strand: None,
                value: None,
                resident_detail: None,
            })
            .collect();
        let search = PeakSearch::limited(peaks, limit);
        assert_eq!(search.peaks.len(), kept);
        assert_eq!(search.truncated, truncated);
    }
}
