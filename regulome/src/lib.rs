//! Regulatory evidence annotation and RegulomeDB scoring.
//!
//! Each component lives in its own crate and is re-exported here behind a feature:
//! - `core`: coordinates, assemblies, index documents, collaborator traits
//! - `index`: in-memory and search-backend peak indexes
//! - `coords`: query parsing and rsID / Ensembl ID resolution
//! - `scoring`: evidence aggregation, ranking, nearby SNPs, batch scoring
#[cfg(feature = "core")]
#[doc(inline)]
pub use regulome_core as core;

#[cfg(feature = "index")]
#[doc(inline)]
pub use regulome_index as index;

#[cfg(feature = "coords")]
#[doc(inline)]
pub use regulome_coords as coords;

#[cfg(feature = "scoring")]
#[doc(inline)]
pub use regulome_scoring as scoring;
