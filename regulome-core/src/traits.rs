use crate::errors::Result;
use crate::models::{Assembly, Peak, PeakSearch, Region, Snp};

///
/// The document store holding peaks and SNPs.
///
/// Implementations answer range-overlap queries for one assembly at a time and perform
/// the peak -> file -> dataset join themselves: returned peaks carry their
/// `resident_detail` when the join succeeded and `None` when it did not.
///
pub trait PeakIndex: Send + Sync {
    /// Peaks on `region.chr` overlapping the half-open `region` span, flagged when the
    /// index cut the result at its hit limit.
    fn search_peaks(&self, assembly: Assembly, region: &Region) -> Result<PeakSearch>;

    /// The peaks of [`PeakIndex::search_peaks`], ignoring truncation.
    fn find_peaks(&self, assembly: Assembly, region: &Region) -> Result<Vec<Peak>> {
        Ok(self.search_peaks(assembly, region)?.peaks)
    }

    /// Look up a single SNP by rsID.
    fn snp(&self, assembly: Assembly, rsid: &str) -> Result<Option<Snp>>;

    /// All SNPs inside `region`, in no particular order.
    fn find_snps(&self, assembly: Assembly, region: &Region) -> Result<Vec<Snp>>;
}

///
/// A per-base numeric signal track (information content of motif matches).
///
/// Readers hold file handles and are not shared: every worker owns its own instance.
///
pub trait SignalTrack: Send {
    /// Maximum value over `[start, end)`, `None` when the track has no data there.
    fn max_value(&mut self, chrom: &str, start: u32, end: u32) -> Result<Option<f64>>;
}
