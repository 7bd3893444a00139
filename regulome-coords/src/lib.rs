//! Coordinate resolution for regulome queries.
//!
//! A query term is one of:
//! - an explicit range (`chr10:5894499-5894500`, `chrX 100 200`, `chr1:39,492,461`)
//! - a dbSNP identifier (`rs10905307`)
//! - an Ensembl stable id (`ENSG00000139618`)
//!
//! [`CoordinateResolver`] turns any of them into a [`Region`](regulome_core::models::Region)
//! on the requested assembly, going through the peak index and the
//! [`VariantService`](service::VariantService) as needed.
pub mod query;
pub mod resolver;
pub mod service;

pub use query::{QueryTerm, parse_query, sanitize_rsid};
pub use resolver::CoordinateResolver;
pub use service::{EnsemblClient, EnsemblClientBuilder, VariantService};
