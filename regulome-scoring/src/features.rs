use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use regulome_core::models::{Dataset, Region};

use crate::classify::{EvidenceCategory, classify_dataset};
use crate::signal::SignalTracks;

///
/// The evidence found at one locus: contributing datasets per category, the motif targets
/// confirmed by a QTL, and the information-content signal.
///
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EvidenceSet {
    #[serde(flatten)]
    pub categories: BTreeMap<EvidenceCategory, Vec<Dataset>>,
    /// PWM targets shared with a QTL dataset.
    #[serde(rename = "PWM_matched", skip_serializing_if = "Vec::is_empty")]
    pub pwm_matched: Vec<String>,
    /// Footprint targets shared with a QTL dataset.
    #[serde(rename = "Footprint_matched", skip_serializing_if = "Vec::is_empty")]
    pub footprint_matched: Vec<String>,
    #[serde(rename = "IC_max", skip_serializing_if = "Option::is_none")]
    pub ic_max: Option<f64>,
    #[serde(rename = "IC_matched_max", skip_serializing_if = "Option::is_none")]
    pub ic_matched_max: Option<f64>,
}

impl EvidenceSet {
    ///
    /// Bucket datasets by category and derive the matched-motif signals.
    /// Informational and unknown datasets are left out.
    ///
    pub fn from_datasets<'a, I>(datasets: I) -> Self
    where
        I: IntoIterator<Item = &'a Dataset>,
    {
        let mut categories: BTreeMap<EvidenceCategory, Vec<Dataset>> = BTreeMap::new();
        for dataset in datasets {
            if let Some(category) = classify_dataset(dataset).category() {
                categories.entry(category).or_default().push(dataset.clone());
            }
        }

        let qtl_targets: BTreeSet<String> = categories
            .get(&EvidenceCategory::QTL)
            .into_iter()
            .flatten()
            .flat_map(|d| d.target.iter().map(|t| t.to_uppercase()))
            .collect();
        let matched = |category: EvidenceCategory| -> Vec<String> {
            let targets: BTreeSet<&String> = categories
                .get(&category)
                .into_iter()
                .flatten()
                .flat_map(|d| d.target.iter())
                .filter(|t| qtl_targets.contains(&t.to_uppercase()))
                .collect();
            targets.into_iter().cloned().collect()
        };
        let pwm_matched = matched(EvidenceCategory::PWM);
        let footprint_matched = matched(EvidenceCategory::Footprint);

        EvidenceSet {
            categories,
            pwm_matched,
            footprint_matched,
            ic_max: None,
            ic_matched_max: None,
        }
    }

    ///
    /// Fill the information-content signal for `region`. `IC_matched_max` is only read
    /// when a motif target is confirmed by a QTL; otherwise it stays empty.
    ///
    pub fn read_signal(&mut self, region: &Region, tracks: &mut SignalTracks) {
        self.ic_max = tracks.read_ic_max(region);
        self.ic_matched_max = if self.pwm_matched.is_empty() && self.footprint_matched.is_empty() {
            None
        } else {
            tracks.read_ic_matched_max(region)
        };
    }

    pub fn has(&self, category: EvidenceCategory) -> bool {
        self.categories
            .get(&category)
            .is_some_and(|datasets| !datasets.is_empty())
    }

    pub fn datasets(&self, category: EvidenceCategory) -> &[Dataset] {
        self.categories
            .get(&category)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    pub fn features(&self) -> Features {
        Features {
            chip: self.has(EvidenceCategory::ChIP),
            dnase: self.has(EvidenceCategory::DNase),
            pwm: self.has(EvidenceCategory::PWM),
            footprint: self.has(EvidenceCategory::Footprint),
            qtl: self.has(EvidenceCategory::QTL),
            pwm_matched: !self.pwm_matched.is_empty(),
            footprint_matched: !self.footprint_matched.is_empty(),
            ic_max: self.ic_max.unwrap_or(0.0),
            ic_matched_max: self.ic_matched_max.unwrap_or(0.0),
        }
    }
}

///
/// Classify the datasets found at `region` and read its information-content signal.
///
/// ```rust
/// use std::collections::BTreeMap;
/// use regulome_core::models::{Dataset, Region};
/// use regulome_scoring::features::classify_evidence;
/// use regulome_scoring::signal::SignalTracks;
///
/// let mut datasets = BTreeMap::new();
/// for dataset in [
///     Dataset::new("/annotations/PWM/", "PWMs").with_targets(&["ELK4"]),
///     Dataset::new("/annotations/QTL/", "eQTLs").with_targets(&["ELK4"]),
/// ] {
///     datasets.insert(dataset.id.clone(), dataset);
/// }
///
/// let evidence = classify_evidence(&datasets, &Region::new("chr1", 10, 11), &mut SignalTracks::default());
/// assert_eq!(evidence.pwm_matched, vec!["ELK4".to_string()]);
/// assert!(evidence.features().qtl);
/// ```
pub fn classify_evidence(
    datasets: &BTreeMap<String, Dataset>,
    region: &Region,
    tracks: &mut SignalTracks,
) -> EvidenceSet {
    let mut evidence = EvidenceSet::from_datasets(datasets.values());
    evidence.read_signal(region, tracks);
    evidence
}

///
/// The flat feature vector a score is computed from.
///
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Features {
    #[serde(rename = "ChIP")]
    pub chip: bool,
    #[serde(rename = "DNase")]
    pub dnase: bool,
    #[serde(rename = "PWM")]
    pub pwm: bool,
    #[serde(rename = "Footprint")]
    pub footprint: bool,
    #[serde(rename = "QTL")]
    pub qtl: bool,
    #[serde(rename = "PWM_matched")]
    pub pwm_matched: bool,
    #[serde(rename = "Footprint_matched")]
    pub footprint_matched: bool,
    #[serde(rename = "IC_max")]
    pub ic_max: f64,
    #[serde(rename = "IC_matched_max")]
    pub ic_matched_max: f64,
}

impl Features {
    /// Feature names, in [`Features::values`] order.
    pub const NAMES: [&'static str; 9] = [
        "ChIP",
        "DNase",
        "PWM",
        "Footprint",
        "QTL",
        "PWM_matched",
        "Footprint_matched",
        "IC_max",
        "IC_matched_max",
    ];

    pub fn any_motif(&self) -> bool {
        self.pwm || self.footprint
    }

    pub fn values(&self) -> [f64; 9] {
        let b = |flag: bool| if flag { 1.0 } else { 0.0 };
        [
            b(self.chip),
            b(self.dnase),
            b(self.pwm),
            b(self.footprint),
            b(self.qtl),
            b(self.pwm_matched),
            b(self.footprint_matched),
            self.ic_max,
            self.ic_matched_max,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use regulome_core::errors::Result;
    use regulome_core::traits::SignalTrack;
    use rstest::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports the same value everywhere and counts its reads.
    struct Flat {
        value: f64,
        reads: Arc<AtomicUsize>,
    }

    impl SignalTrack for Flat {
        fn max_value(&mut self, _chrom: &str, _start: u32, _end: u32) -> Result<Option<f64>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.value))
        }
    }

    fn flat_tracks() -> (SignalTracks, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let tracks = SignalTracks::new(
            Some(Box::new(Flat {
                value: 0.5,
                reads: reads.clone(),
            })),
            Some(Box::new(Flat {
                value: 0.9,
                reads: reads.clone(),
            })),
        );
        (tracks, reads)
    }

    #[fixture]
    fn datasets() -> Vec<Dataset> {
        vec![
            Dataset::new("/experiments/ENCSR000EVI/", "ChIP-seq").with_targets(&["ELK4"]),
            Dataset::new("/experiments/ENCSR000ENO/", "DNase-seq"),
            Dataset::new("/annotations/ENCSR228TST/", "Footprints").with_targets(&["ELK4"]),
            Dataset::new("/annotations/ENCSR333TST/", "PWMs").with_targets(&["ELK4", "GABPA"]),
            Dataset::new("/annotations/ENCSR061TST/", "dsQTLs"),
            Dataset::new("/annotations/ENCSR899TST/", "eQTLs").with_targets(&["elk4"]),
            Dataset::new("/annotations/ENCSR497SKR/", "chromatin state"),
        ]
    }

    #[rstest]
    fn test_all_categories(datasets: Vec<Dataset>) {
        let evidence = EvidenceSet::from_datasets(&datasets);
        for category in EvidenceCategory::ALL {
            assert!(evidence.has(category), "missing {}", category);
        }
        assert_eq!(evidence.datasets(EvidenceCategory::QTL).len(), 2);
        assert_eq!(evidence.pwm_matched, vec!["ELK4".to_string()]);
        assert_eq!(evidence.footprint_matched, vec!["ELK4".to_string()]);
    }

    #[rstest]
    fn test_no_match_without_shared_target(datasets: Vec<Dataset>) {
        // the ChIP target alone never confirms a motif
        let without_eqtl: Vec<Dataset> = datasets
            .into_iter()
            .filter(|d| d.id != "/annotations/ENCSR899TST/")
            .collect();
        let features = EvidenceSet::from_datasets(&without_eqtl).features();
        assert!(features.qtl);
        assert!(features.pwm);
        assert!(!features.pwm_matched);
        assert!(!features.footprint_matched);
    }

    #[rstest]
    fn test_empty_evidence() {
        let features = EvidenceSet::from_datasets(&Vec::<Dataset>::new()).features();
        assert_eq!(features, Features::default());
    }

    #[rstest]
    fn test_features_serialize_with_category_names(datasets: Vec<Dataset>) {
        let features = EvidenceSet::from_datasets(&datasets).features();
        let json = serde_json::to_value(features).unwrap();
        assert_eq!(json["PWM_matched"], serde_json::json!(true));
        assert_eq!(json["IC_max"], serde_json::json!(0.0));
    }

    #[rstest]
    fn test_matched_signal_needs_matched_target(datasets: Vec<Dataset>) {
        let region = Region::new("chr1", 10, 11);
        let without_eqtl: BTreeMap<String, Dataset> = datasets
            .iter()
            .filter(|d| d.id != "/annotations/ENCSR899TST/")
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        let (mut tracks, reads) = flat_tracks();
        let evidence = classify_evidence(&without_eqtl, &region, &mut tracks);
        assert_eq!(evidence.ic_max, Some(0.5));
        assert_eq!(evidence.ic_matched_max, None);
        assert_eq!(reads.load(Ordering::SeqCst), 1);

        let all: BTreeMap<String, Dataset> =
            datasets.into_iter().map(|d| (d.id.clone(), d)).collect();
        let (mut tracks, reads) = flat_tracks();
        let evidence = classify_evidence(&all, &region, &mut tracks);
        assert_eq!(evidence.ic_matched_max, Some(0.9));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }
}
