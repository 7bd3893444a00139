use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RegulomeError, Result};
use crate::models::region::{RawCoordinates, Region};

///
/// A dbSNP variant as stored in the index. Read-only for the engine.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snp {
    pub rsid: String,
    pub region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_allele_freq: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_allele_freq: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maf: Option<f64>,
}

impl Snp {
    pub fn new(rsid: &str, chr: &str, start: u32, end: u32) -> Self {
        Snp {
            rsid: rsid.to_string(),
            region: Region::new(chr, start, end),
            ref_allele_freq: None,
            alt_allele_freq: None,
            maf: None,
        }
    }

    /// Position used for distance calculations.
    pub fn position(&self) -> u32 {
        self.region.start
    }
}

///
/// A SNP document as the index stores it.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnpDocument {
    pub rsid: String,
    pub chrom: String,
    pub coordinates: RawCoordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_allele_freq: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_allele_freq: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maf: Option<f64>,
}

impl TryFrom<SnpDocument> for Snp {
    type Error = RegulomeError;

    fn try_from(doc: SnpDocument) -> Result<Self> {
        Ok(Snp {
            region: doc.coordinates.into_region(&doc.chrom)?,
            rsid: doc.rsid,
            ref_allele_freq: doc.ref_allele_freq,
            alt_allele_freq: doc.alt_allele_freq,
            maf: doc.maf,
        })
    }
}
