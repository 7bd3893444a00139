use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use regulome_coords::service::{DEFAULT_ENSEMBL_GRCH37_URL, DEFAULT_ENSEMBL_URL};
use regulome_scoring::evidence::DEFAULT_MAX_DATASETS;
use regulome_scoring::signal::SignalTrackPaths;

pub const INDEX_URL_ENV: &str = "REGULOME_INDEX_URL";
pub const ENSEMBL_URL_ENV: &str = "REGULOME_ENSEMBL_URL";

///
/// Settings for every subcommand, read from a TOML file. Every field is optional.
///
/// ```toml
/// assembly = "GRCh37"
///
/// [index]
/// fixture = "tests/data/regulome_fixture.json"
///
/// [signal]
/// ic_max = "IC_max.bw"
/// ic_matched_max = "IC_matched_max.bw"
///
/// [batch]
/// processes = 4
/// ```
///
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegulomeConfig {
    pub assembly: String,
    pub index: IndexConfig,
    pub ensembl: EnsemblConfig,
    pub signal: SignalTrackPaths,
    pub scoring: ScoringConfig,
    pub batch: BatchConfig,
}

impl Default for RegulomeConfig {
    fn default() -> Self {
        RegulomeConfig {
            assembly: "GRCh37".to_string(),
            index: IndexConfig::default(),
            ensembl: EnsemblConfig::default(),
            signal: SignalTrackPaths::default(),
            scoring: ScoringConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// JSON (or JSON.gz) fixture loaded into memory. Takes precedence over `url`.
    pub fixture: Option<PathBuf>,
    pub url: Option<String>,
    pub max_datasets: usize,
    pub timeout_secs: Option<u64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            fixture: None,
            url: None,
            max_datasets: DEFAULT_MAX_DATASETS,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnsemblConfig {
    pub url: String,
    pub grch37_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for EnsemblConfig {
    fn default() -> Self {
        EnsemblConfig {
            url: DEFAULT_ENSEMBL_URL.to_string(),
            grch37_url: DEFAULT_ENSEMBL_GRCH37_URL.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Lookup,
    Logistic,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub model: ModelKind,
    /// rank → probability, replacing entries of the default table
    pub probabilities: BTreeMap<String, f64>,
    /// feature name → logistic weight
    pub weights: BTreeMap<String, f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub processes: usize,
    pub chunk_size: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            processes: 1,
            chunk_size: None,
        }
    }
}

impl RegulomeConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid configuration")
    }

    ///
    /// Read the config file, if any, then apply environment overrides.
    ///
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Cannot read config file {}", path.display()))?;
                Self::from_toml_str(&raw)
                    .with_context(|| format!("In config file {}", path.display()))?
            }
            None => RegulomeConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(INDEX_URL_ENV).filter(|u| !u.is_empty()) {
            self.index.url = Some(url);
        }
        if let Some(url) = var(ENSEMBL_URL_ENV).filter(|u| !u.is_empty()) {
            self.ensembl.url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[rstest]
    fn test_defaults() {
        let config = RegulomeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RegulomeConfig::default());
        assert_eq!(config.batch.processes, 1);
        assert_eq!(config.index.max_datasets, 8192);
        assert_eq!(config.scoring.model, ModelKind::Lookup);
    }

    #[rstest]
    fn test_full_config() {
        let raw = r#"
            assembly = "GRCh38"

            [index]
            url = "http://search:9200"
            max_datasets = 100

            [signal]
            ic_max = "/data/IC_max.bw"

            [scoring]
            model = "logistic"
            intercept = -1.5
            weights = { QTL = 2.0, IC_max = 0.5 }

            [batch]
            processes = 8
            chunk_size = 500
        "#;
        let config = RegulomeConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.assembly, "GRCh38");
        assert_eq!(config.index.url.as_deref(), Some("http://search:9200"));
        assert_eq!(config.index.max_datasets, 100);
        assert_eq!(config.signal.ic_max, Some(PathBuf::from("/data/IC_max.bw")));
        assert_eq!(config.signal.ic_matched_max, None);
        assert_eq!(config.scoring.model, ModelKind::Logistic);
        assert_eq!(config.scoring.weights["QTL"], 2.0);
        assert_eq!(config.batch.chunk_size, Some(500));
    }

    #[rstest]
    fn test_unknown_field_is_rejected() {
        assert!(RegulomeConfig::from_toml_str("[index]\nhost = \"x\"").is_err());
    }

    #[rstest]
    fn test_env_overrides() {
        let mut config = RegulomeConfig::default();
        config.apply_env(|key| match key {
            INDEX_URL_ENV => Some("http://es:9200".to_string()),
            ENSEMBL_URL_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.index.url.as_deref(), Some("http://es:9200"));
        assert_eq!(config.ensembl.url, DEFAULT_ENSEMBL_URL);
    }

    #[rstest]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[batch]\nprocesses = 3").unwrap();
        let config = RegulomeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.batch.processes, 3);
        assert!(RegulomeConfig::load(Some(Path::new("/no/such/config.toml"))).is_err());
    }
}
