use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RegulomeError;

///
/// Genome assembly a coordinate is expressed in.
///
/// Cross-assembly comparison never happens implicitly: moving a coordinate from one
/// assembly to another always goes through an explicit liftover.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Assembly {
    #[default]
    GRCh37,
    GRCh38,
    GRCm37,
    GRCm38,
}

impl Assembly {
    pub const ALL: [Assembly; 4] = [
        Assembly::GRCh37,
        Assembly::GRCh38,
        Assembly::GRCm37,
        Assembly::GRCm38,
    ];

    /// Assembly name as used by the variant web service.
    pub fn name(&self) -> &'static str {
        match self {
            Assembly::GRCh37 => "GRCh37",
            Assembly::GRCh38 => "GRCh38",
            Assembly::GRCm37 => "GRCm37",
            Assembly::GRCm38 => "GRCm38",
        }
    }

    /// Alias under which the peak index stores documents for this assembly.
    pub fn index_alias(&self) -> &'static str {
        match self {
            Assembly::GRCh37 => "hg19",
            Assembly::GRCh38 => "GRCh38",
            Assembly::GRCm37 => "mm9",
            Assembly::GRCm38 => "mm10",
        }
    }

    pub fn species(&self) -> &'static str {
        match self {
            Assembly::GRCh37 | Assembly::GRCh38 => "homo_sapiens",
            Assembly::GRCm37 | Assembly::GRCm38 => "mus_musculus",
        }
    }

    ///
    /// Where a location reported on the service's primary assembly has to be lifted
    /// from and to, in the service's own naming, to land on this assembly.
    ///
    /// `None` means the service answers directly on this assembly (or cannot lift to it).
    ///
    pub fn liftover_source(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Assembly::GRCh37 => Some(("GRCh38", "GRCh37")),
            Assembly::GRCm37 => Some(("GRCm38", "NCBIM37")),
            _ => None,
        }
    }
}

impl Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Assembly {
    type Err = RegulomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grch37" | "hg19" => Ok(Assembly::GRCh37),
            "grch38" | "hg38" => Ok(Assembly::GRCh38),
            "grcm37" | "mm9" | "ncbim37" => Ok(Assembly::GRCm37),
            "grcm38" | "mm10" => Ok(Assembly::GRCm38),
            _ => Err(RegulomeError::UnknownAssembly(s.to_string())),
        }
    }
}
