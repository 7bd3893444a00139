use anyhow::{Context, Result};
use tracing::{info, warn};

use regulome_core::models::Assembly;
use regulome_core::traits::PeakIndex;
use regulome_coords::{CoordinateResolver, EnsemblClient};
use regulome_index::{ElasticIndex, MemoryIndex};
use regulome_scoring::ranking::{LogisticModel, ProbabilityModel, RankLookup};
use regulome_scoring::signal::SignalTracks;
use regulome_scoring::summary::request_assembly;
use regulome_scoring::{BatchScorer, ScoringEngine};

use crate::config::{ModelKind, RegulomeConfig};

///
/// The long-lived collaborators every subcommand needs, built once from the config.
///
pub struct Runtime {
    pub config: RegulomeConfig,
    pub assembly: Assembly,
    index: Box<dyn PeakIndex>,
    service: EnsemblClient,
    model: Box<dyn ProbabilityModel>,
}

impl Runtime {
    pub fn from_config(config: RegulomeConfig, assembly: Option<&str>) -> Result<Self> {
        let assembly = request_assembly(assembly.unwrap_or(&config.assembly));
        let index = build_index(&config)?;
        let service = build_service(&config)?;
        let model = build_model(&config)?;
        Ok(Runtime {
            config,
            assembly,
            index,
            service,
            model,
        })
    }

    pub fn resolver(&self) -> CoordinateResolver<'_> {
        CoordinateResolver::new(&self.service).with_index(self.index.as_ref())
    }

    pub fn engine(&self) -> ScoringEngine<'_> {
        ScoringEngine::new(self.index.as_ref(), self.model.as_ref(), self.assembly)
            .with_max_datasets(self.config.index.max_datasets)
    }

    pub fn batch_scorer(&self) -> BatchScorer<'_> {
        BatchScorer::new(self.resolver(), self.engine())
            .with_tracks(self.config.signal.clone())
            .with_processes(self.config.batch.processes)
            .with_chunk_size(self.config.batch.chunk_size)
    }

    /// Signal readers for the calling thread. Unreadable tracks are skipped with a warning.
    pub fn open_tracks(&self) -> SignalTracks {
        match self.config.signal.open() {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Scoring without information content: {}", e);
                SignalTracks::default()
            }
        }
    }
}

fn build_index(config: &RegulomeConfig) -> Result<Box<dyn PeakIndex>> {
    if let Some(fixture) = &config.index.fixture {
        let index = MemoryIndex::from_path(fixture)
            .with_context(|| format!("Cannot load index fixture {}", fixture.display()))?;
        return Ok(Box::new(index));
    }

    let mut builder = ElasticIndex::builder();
    if let Some(url) = &config.index.url {
        builder = builder.with_url(url.clone());
    }
    if let Some(secs) = config.index.timeout_secs {
        builder = builder.with_timeout_secs(secs);
    }
    let index = builder.finish().context("Cannot create search backend client")?;
    info!("Using search backend at {}", index.url());
    Ok(Box::new(index))
}

fn build_service(config: &RegulomeConfig) -> Result<EnsemblClient> {
    let mut builder = EnsemblClient::builder()
        .with_url(config.ensembl.url.clone())
        .with_grch37_url(config.ensembl.grch37_url.clone());
    if let Some(secs) = config.ensembl.timeout_secs {
        builder = builder.with_timeout_secs(secs);
    }
    builder.finish().context("Cannot create variant service client")
}

fn build_model(config: &RegulomeConfig) -> Result<Box<dyn ProbabilityModel>> {
    let scoring = &config.scoring;
    Ok(match scoring.model {
        ModelKind::Lookup => Box::new(
            RankLookup::with_overrides(&scoring.probabilities)
                .context("Invalid [scoring] probabilities")?,
        ),
        ModelKind::Logistic => Box::new(
            LogisticModel::from_named(&scoring.weights, scoring.intercept)
                .context("Invalid [scoring] weights")?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use regulome_core::models::Region;
    use regulome_scoring::ranking::Ranking;

    fn fixture_config() -> RegulomeConfig {
        let mut config = RegulomeConfig::default();
        config.index.fixture = Some(
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("../tests/data/regulome_fixture.json"),
        );
        config
    }

    #[rstest]
    fn test_runtime_from_fixture() {
        let runtime = Runtime::from_config(fixture_config(), Some("hg19")).unwrap();
        assert_eq!(runtime.assembly, Assembly::GRCh37);

        let region = runtime.resolver().resolve("rs3768324", runtime.assembly).unwrap();
        assert_eq!(region, Region::new("chr1", 39492461, 39492462));
        let report = runtime
            .engine()
            .evaluate(&region, &mut runtime.open_tracks(), false)
            .unwrap();
        assert_eq!(report.score.ranking, Ranking::R1a);
    }

    #[rstest]
    fn test_unknown_assembly_falls_back() {
        let runtime = Runtime::from_config(fixture_config(), Some("hg42")).unwrap();
        assert_eq!(runtime.assembly, Assembly::GRCh37);
    }

    #[rstest]
    fn test_bad_model_config() {
        let mut config = fixture_config();
        config.scoring.probabilities.insert("9z".to_string(), 0.5);
        assert!(Runtime::from_config(config, None).is_err());
    }
}
