use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use regulome_core::models::Dataset;

///
/// The evidence categories that take part in ranking.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvidenceCategory {
    ChIP,
    DNase,
    PWM,
    Footprint,
    QTL,
}

impl EvidenceCategory {
    pub const ALL: [EvidenceCategory; 5] = [
        EvidenceCategory::ChIP,
        EvidenceCategory::DNase,
        EvidenceCategory::PWM,
        EvidenceCategory::Footprint,
        EvidenceCategory::QTL,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EvidenceCategory::ChIP => "ChIP",
            EvidenceCategory::DNase => "DNase",
            EvidenceCategory::PWM => "PWM",
            EvidenceCategory::Footprint => "Footprint",
            EvidenceCategory::QTL => "QTL",
        }
    }

    pub fn is_motif(&self) -> bool {
        matches!(self, EvidenceCategory::PWM | EvidenceCategory::Footprint)
    }
}

impl Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

///
/// What a dataset contributes to a region's evidence.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetClass {
    /// Counts toward ranking.
    Evidence(EvidenceCategory),
    /// Shown to users but never scored (chromatin state, FAIRE-seq, binding sites, curated SNVs).
    Informational,
    /// No known collection type.
    Unclassified,
}

impl DatasetClass {
    pub fn category(&self) -> Option<EvidenceCategory> {
        match self {
            DatasetClass::Evidence(category) => Some(*category),
            _ => None,
        }
    }
}

/// Map a collection type label to its class. Matching ignores case.
pub fn classify_collection(collection: &str) -> DatasetClass {
    match collection.trim().to_lowercase().as_str() {
        "chip-seq" => DatasetClass::Evidence(EvidenceCategory::ChIP),
        "dnase-seq" => DatasetClass::Evidence(EvidenceCategory::DNase),
        "footprints" => DatasetClass::Evidence(EvidenceCategory::Footprint),
        "pwms" => DatasetClass::Evidence(EvidenceCategory::PWM),
        "dsqtls" | "eqtls" => DatasetClass::Evidence(EvidenceCategory::QTL),
        "chromatin state" | "faire-seq" | "binding sites" | "curated snvs" => {
            DatasetClass::Informational
        }
        _ => DatasetClass::Unclassified,
    }
}

pub fn classify_dataset(dataset: &Dataset) -> DatasetClass {
    dataset
        .collection()
        .map(classify_collection)
        .unwrap_or(DatasetClass::Unclassified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("ChIP-seq", DatasetClass::Evidence(EvidenceCategory::ChIP))]
    #[case("DNase-seq", DatasetClass::Evidence(EvidenceCategory::DNase))]
    #[case("Footprints", DatasetClass::Evidence(EvidenceCategory::Footprint))]
    #[case("PWMs", DatasetClass::Evidence(EvidenceCategory::PWM))]
    #[case("dsQTLs", DatasetClass::Evidence(EvidenceCategory::QTL))]
    #[case("eQTLs", DatasetClass::Evidence(EvidenceCategory::QTL))]
    #[case("chromatin state", DatasetClass::Informational)]
    #[case("FAIRE-seq", DatasetClass::Informational)]
    #[case("binding sites", DatasetClass::Informational)]
    #[case("curated SNVs", DatasetClass::Informational)]
    #[case("RNA-seq", DatasetClass::Unclassified)]
    fn test_classify_collection(#[case] collection: &str, #[case] expected: DatasetClass) {
        assert_eq!(classify_collection(collection), expected);
    }

    #[rstest]
    fn test_classify_dataset_falls_back_to_assay() {
        let mut dataset = Dataset::new("/experiments/ENCSR000ENO/", "DNase-seq");
        dataset.collection_type = None;
        dataset.assay_term_name = Some("DNase-seq".to_string());
        assert_eq!(
            classify_dataset(&dataset).category(),
            Some(EvidenceCategory::DNase)
        );
    }
}
