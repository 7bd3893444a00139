pub mod assembly;
pub mod dataset;
pub mod peak;
pub mod region;
pub mod snp;

// re-export for cleaner imports
pub use self::assembly::Assembly;
pub use self::dataset::{Dataset, FileDetail};
pub use self::peak::{Peak, PeakDocument, PeakSearch, PeakSource, ResidentDetail};
pub use self::region::{RawCoordinates, Region, normalize_chromosome};
pub use self::snp::{Snp, SnpDocument};
