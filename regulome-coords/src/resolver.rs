use log::{debug, warn};

use regulome_core::errors::{RegulomeError, Result};
use regulome_core::models::{Assembly, Region};
use regulome_core::traits::PeakIndex;

use crate::query::{QueryTerm, parse_query, parse_service_location};
use crate::service::{ServiceLocation, VariantMapping, VariantService};

///
/// Turns query terms (explicit ranges, rsIDs, Ensembl IDs) into canonical regions.
///
/// rsIDs are looked up in the peak index first when one is attached, then through the
/// variant service. Service failures degrade to "not found" and are logged; only the
/// final outcome is reported, as [`RegulomeError::InvalidRegion`].
///
pub struct CoordinateResolver<'a> {
    service: &'a dyn VariantService,
    index: Option<&'a dyn PeakIndex>,
}

impl<'a> CoordinateResolver<'a> {
    pub fn new(service: &'a dyn VariantService) -> Self {
        CoordinateResolver {
            service,
            index: None,
        }
    }

    pub fn with_index(mut self, index: &'a dyn PeakIndex) -> Self {
        self.index = Some(index);
        self
    }

    ///
    /// Resolve a query term to a 0-based half-open region on `assembly`.
    ///
    /// # Arguments
    /// - term: operator-entered query; trailing text after a recognized prefix is ignored
    /// - assembly: the assembly the result must be expressed in
    ///
    pub fn resolve(&self, term: &str, assembly: Assembly) -> Result<Region> {
        let resolved = match parse_query(term) {
            Some(QueryTerm::Range(region)) => Some(region),
            Some(QueryTerm::RsId(rsid)) => self.resolve_rsid(&rsid, assembly),
            Some(QueryTerm::EnsemblId(id)) => self.resolve_ensembl_id(&id, assembly),
            None => None,
        };
        resolved.ok_or_else(|| RegulomeError::InvalidRegion(term.to_string()))
    }

    fn resolve_rsid(&self, rsid: &str, assembly: Assembly) -> Option<Region> {
        if let Some(index) = self.index {
            match index.snp(assembly, rsid) {
                Ok(Some(snp)) => return Some(snp.region),
                Ok(None) => debug!("{} not in the {} index, asking the variant service", rsid, assembly),
                Err(e) => debug!("Index lookup of {} failed ({}), asking the variant service", rsid, e),
            }
        }

        let mappings = match self.service.variant_mappings(rsid, assembly) {
            Ok(mappings) => mappings,
            Err(e) => {
                warn!("Could not look up {}: {}", rsid, e);
                return None;
            }
        };
        self.select_mapping(&mappings, assembly)
    }

    ///
    /// Pick the placement on `assembly`, lifting a placement from the service's primary
    /// assembly when there is no direct one.
    ///
    fn select_mapping(&self, mappings: &[VariantMapping], assembly: Assembly) -> Option<Region> {
        let candidates: Vec<&VariantMapping> = mappings.iter().filter(|m| !m.is_patch()).collect();

        if let Some(direct) = candidates
            .iter()
            .find(|m| m.assembly_name == assembly.name())
        {
            return parse_service_location(&direct.location);
        }

        let (from, _) = assembly.liftover_source()?;
        let source = candidates.iter().find(|m| m.assembly_name == from)?;
        self.lift(&source.location, assembly)
    }

    fn resolve_ensembl_id(&self, id: &str, assembly: Assembly) -> Option<Region> {
        let found: ServiceLocation = match self.service.lookup_id(id) {
            Ok(found) => found,
            Err(e) => {
                warn!("Could not look up {}: {}", id, e);
                return None;
            }
        };
        if found.assembly_name.as_deref() == Some(assembly.name()) {
            return Some(found.to_region());
        }
        self.lift(&found.location(), assembly)
    }

    /// Lift a service location onto `assembly`, if that assembly supports liftover.
    fn lift(&self, location: &str, assembly: Assembly) -> Option<Region> {
        let (from, to) = assembly.liftover_source()?;
        match self
            .service
            .map_location(assembly.species(), location, from, to)
        {
            Ok(Some(mapped)) => Some(mapped.to_region()),
            Ok(None) => {
                warn!("{} does not map from {} to {}", location, from, to);
                None
            }
            Err(e) => {
                warn!("Liftover of {} failed: {}", location, e);
                None
            }
        }
    }
}
