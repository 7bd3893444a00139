//! Backends for the [`PeakIndex`](regulome_core::traits::PeakIndex) trait.
//!
//! - [`MemoryIndex`]: interval trees over a JSON fixture, used for tests and local runs
//! - [`ElasticIndex`]: the production search cluster
pub mod elastic;
pub mod memory;

pub use elastic::{ElasticIndex, ElasticIndexBuilder};
pub use memory::{MemoryIndex, MemoryIndexBuilder};
