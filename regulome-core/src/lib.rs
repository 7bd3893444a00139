//! Core models and collaborator traits shared by the regulome crates.
//!
//! Coordinates are 0-based and half-open everywhere in this workspace. Index documents
//! and web services that report other conventions are converted once, where they are read
//! (see [`models::RawCoordinates`]).
//!
//! ```
//! use regulome_core::models::{Assembly, Region};
//!
//! let region = Region::new("chrx", 5894500, 5894499);
//! assert_eq!(region.to_string(), "chrX:5894499-5894500");
//! assert_eq!(Assembly::GRCh37.index_alias(), "hg19");
//! ```
pub mod errors;
pub mod models;
pub mod traits;
pub mod utils;

pub use errors::{RegulomeError, Result};
pub use traits::{PeakIndex, SignalTrack};
