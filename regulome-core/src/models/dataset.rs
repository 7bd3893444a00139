use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

///
/// Metadata of a dataset (one experiment or annotation) owning peak files.
///
/// Only the fields the engine reasons about are typed; everything else in the
/// document is kept in `extra` and passed through untouched.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assay_term_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_seq",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub target: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biosample_term_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Dataset {
    pub fn new(id: &str, collection_type: &str) -> Self {
        Dataset {
            id: id.to_string(),
            uuid: None,
            collection_type: Some(collection_type.to_string()),
            assay_term_name: None,
            annotation_type: None,
            target: vec![],
            biosample_term_name: None,
            extra: Map::new(),
        }
    }

    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.target = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_biosample(mut self, biosample: &str) -> Self {
        self.biosample_term_name = Some(biosample.to_string());
        self
    }

    ///
    /// The kind of data this dataset holds. Older documents only carry the
    /// assay or annotation type, so fall back to those.
    ///
    pub fn collection(&self) -> Option<&str> {
        self.collection_type
            .as_deref()
            .or(self.assay_term_name.as_deref())
            .or(self.annotation_type.as_deref())
    }

    /// Assay or annotation type, for display.
    pub fn method(&self) -> &str {
        self.assay_term_name
            .as_deref()
            .or(self.annotation_type.as_deref())
            .or(self.collection_type.as_deref())
            .unwrap_or("")
    }
}

///
/// Metadata of a peak file. Every file belongs to exactly one dataset.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetail {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileDetail {
    pub fn new(id: &str, uuid: &str, assembly: &str) -> Self {
        FileDetail {
            id: id.to_string(),
            uuid: Some(uuid.to_string()),
            assembly: Some(assembly.to_string()),
            extra: Map::new(),
        }
    }
}

/// `target` is a list in current documents and a bare label in some older ones.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(Option<()>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(_) => vec![],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_deserialize_dataset_keeps_extra_fields() {
        let raw = r#"{
            "@id": "/annotations/ENCSR333TST/",
            "collection_type": "PWMs",
            "target": ["ELK4"],
            "documents": []
        }"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.id, "/annotations/ENCSR333TST/");
        assert_eq!(dataset.collection(), Some("PWMs"));
        assert_eq!(dataset.target, vec!["ELK4".to_string()]);
        assert!(dataset.extra.contains_key("documents"));
    }

    #[rstest]
    fn test_single_target_label() {
        let raw = r#"{"@id": "/experiments/ENCSR000EVI/", "assay_term_name": "ChIP-seq", "target": "ELK4"}"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.target, vec!["ELK4".to_string()]);
        assert_eq!(dataset.collection(), Some("ChIP-seq"));
        assert_eq!(dataset.method(), "ChIP-seq");
    }

    #[rstest]
    fn test_missing_target() {
        let raw = r#"{"@id": "/annotations/ENCSR061TST/", "annotation_type": "dsQTLs", "target": null}"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        assert!(dataset.target.is_empty());
    }
}
