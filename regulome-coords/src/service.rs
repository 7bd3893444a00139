//! The variant coordinate web service (Ensembl REST) and its abstraction.
use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use regulome_core::errors::{RegulomeError, Result};
use regulome_core::models::{Assembly, Region};

pub const DEFAULT_ENSEMBL_URL: &str = "https://rest.ensembl.org/";
pub const DEFAULT_ENSEMBL_GRCH37_URL: &str = "https://grch37.rest.ensembl.org/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// One placement of a variant on an assembly, e.g. `10:5894500-5894500` on `GRCh38`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantMapping {
    pub location: String,
    pub assembly_name: String,
}

impl VariantMapping {
    pub fn new(location: &str, assembly_name: &str) -> Self {
        VariantMapping {
            location: location.to_string(),
            assembly_name: assembly_name.to_string(),
        }
    }

    /// Mappings onto patch sequences never count.
    pub fn is_patch(&self) -> bool {
        self.location.contains("PATCH")
    }
}

///
/// A location as the service reports it: 1-based, inclusive, chromosome without prefix.
///
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceLocation {
    pub seq_region_name: String,
    pub start: u32,
    pub end: u32,
    #[serde(default)]
    pub assembly_name: Option<String>,
}

impl ServiceLocation {
    pub fn new(seq_region_name: &str, start: u32, end: u32, assembly_name: Option<&str>) -> Self {
        ServiceLocation {
            seq_region_name: seq_region_name.to_string(),
            start,
            end,
            assembly_name: assembly_name.map(|a| a.to_string()),
        }
    }

    /// The location in the service's own `chr:start-end` notation.
    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.seq_region_name, self.start, self.end)
    }

    /// Convert to a 0-based half-open region.
    pub fn to_region(&self) -> Region {
        Region::new(&self.seq_region_name, self.start.saturating_sub(1), self.end)
    }
}

///
/// Remote lookups the resolver falls back to.
///
/// Every call is a single blocking attempt. Implementations report failures as
/// [`RegulomeError::ExternalService`]; the resolver decides how to degrade.
///
pub trait VariantService: Send + Sync {
    /// All known placements of a variant.
    fn variant_mappings(&self, rsid: &str, assembly: Assembly) -> Result<Vec<VariantMapping>>;

    /// The location of an Ensembl stable id, on the service's primary assembly.
    fn lookup_id(&self, id: &str) -> Result<ServiceLocation>;

    /// Lift a `chr:start-end` location between two assemblies. `None` when it does not map.
    fn map_location(
        &self,
        species: &str,
        location: &str,
        from: &str,
        to: &str,
    ) -> Result<Option<ServiceLocation>>;
}

#[derive(Debug, Deserialize)]
struct VariationResponse {
    #[serde(default)]
    mappings: Vec<VariantMapping>,
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    #[serde(default)]
    mappings: Vec<MappedPair>,
}

#[derive(Debug, Deserialize)]
struct MappedPair {
    mapped: ServiceLocation,
}

/// Builder for constructing an [`EnsemblClient`].
#[derive(Default)]
pub struct EnsemblClientBuilder {
    url: Option<String>,
    grch37_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl EnsemblClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_grch37_url(mut self, url: String) -> Self {
        self.grch37_url = Some(url);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn finish(self) -> Result<EnsemblClient> {
        let client = Client::builder()
            .timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| RegulomeError::ExternalService(e.to_string()))?;

        Ok(EnsemblClient {
            url: with_trailing_slash(self.url.unwrap_or_else(|| DEFAULT_ENSEMBL_URL.to_string())),
            grch37_url: with_trailing_slash(
                self.grch37_url
                    .unwrap_or_else(|| DEFAULT_ENSEMBL_GRCH37_URL.to_string()),
            ),
            client,
        })
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

///
/// Blocking client for the Ensembl REST API.
///
/// ```rust,no_run
/// use regulome_coords::service::{EnsemblClient, VariantService};
/// use regulome_core::models::Assembly;
///
/// # fn main() -> regulome_core::Result<()> {
/// let client = EnsemblClient::builder().with_timeout_secs(5).finish()?;
/// let mappings = client.variant_mappings("rs10905307", Assembly::GRCh37)?;
/// # Ok(())
/// # }
/// ```
pub struct EnsemblClient {
    url: String,
    grch37_url: String,
    client: Client,
}

impl EnsemblClient {
    pub fn builder() -> EnsemblClientBuilder {
        EnsemblClientBuilder::new()
    }

    /// Variant lookups for GRCh37 go to the dedicated GRCh37 mirror.
    pub fn variation_url(&self, rsid: &str, assembly: Assembly) -> String {
        let base = match assembly {
            Assembly::GRCh37 => &self.grch37_url,
            _ => &self.url,
        };
        format!(
            "{}variation/{}/{}?content-type=application/json",
            base,
            assembly.species(),
            rsid
        )
    }

    pub fn lookup_url(&self, id: &str) -> String {
        format!("{}lookup/id/{}?content-type=application/json", self.url, id)
    }

    pub fn map_url(&self, species: &str, location: &str, from: &str, to: &str) -> String {
        format!(
            "{}map/{}/{}/{}/{}/?content-type=application/json",
            self.url, species, from, location, to
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RegulomeError::ExternalService(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(RegulomeError::ExternalService(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        response
            .json::<T>()
            .map_err(|e| RegulomeError::ExternalService(format!("{url}: {e}")))
    }
}

impl VariantService for EnsemblClient {
    fn variant_mappings(&self, rsid: &str, assembly: Assembly) -> Result<Vec<VariantMapping>> {
        let response: VariationResponse = self.get_json(&self.variation_url(rsid, assembly))?;
        Ok(response.mappings)
    }

    fn lookup_id(&self, id: &str) -> Result<ServiceLocation> {
        self.get_json(&self.lookup_url(id))
    }

    fn map_location(
        &self,
        species: &str,
        location: &str,
        from: &str,
        to: &str,
    ) -> Result<Option<ServiceLocation>> {
        let response: MapResponse = self.get_json(&self.map_url(species, location, from, to))?;
        Ok(response.mappings.into_iter().next().map(|pair| pair.mapped))
    }
}
