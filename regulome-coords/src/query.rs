//! Recognizing the shape of an operator-entered query term.
use once_cell::sync::Lazy;
use regex::Regex;

use regulome_core::models::Region;

// Only the prefix is anchored: anything after the last position is ignored.
static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(chr(?:[1-9]|1[0-9]|2[0-2]|x|y))(?:\s+|:)([\d,]+)(?:(?:\s+|-)([\d,]+))?")
        .unwrap()
});
static RSID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^rs\d+").unwrap());
static ENSEMBL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ens[a-z]*\d+").unwrap());
static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:chr)?([0-9A-Za-z_.]+):(\d+)-(\d+)").unwrap());

///
/// A query term after recognition, before any lookup happened.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    /// An explicit range, already normalized.
    Range(Region),
    /// A dbSNP identifier, lower-case.
    RsId(String),
    /// An Ensembl stable id, upper-case as the lookup service expects it.
    EnsemblId(String),
}

///
/// Recognize a query term. Shapes are tried in order: explicit range, rsID, Ensembl ID.
///
/// Returns `None` when the term matches none of them, or when a position does not fit the
/// coordinate type.
///
/// ```
/// use regulome_coords::query::{parse_query, QueryTerm};
/// use regulome_core::models::Region;
///
/// assert_eq!(
///     parse_query("chrx:5894499-5894500"),
///     Some(QueryTerm::Range(Region::new("chrX", 5894499, 5894500)))
/// );
/// assert_eq!(parse_query("rs10905307\textra"), Some(QueryTerm::RsId("rs10905307".to_string())));
/// ```
pub fn parse_query(term: &str) -> Option<QueryTerm> {
    let lowered = term.trim().to_lowercase();

    if let Some(caps) = RANGE_RE.captures(&lowered) {
        let start = parse_position(caps.get(2)?.as_str())?;
        let end = match caps.get(3) {
            Some(end) => parse_position(end.as_str())?,
            None => start,
        };
        return Some(QueryTerm::Range(Region::new(&caps[1], start, end)));
    }
    if let Some(m) = RSID_RE.find(&lowered) {
        return Some(QueryTerm::RsId(m.as_str().to_string()));
    }
    ENSEMBL_RE
        .find(&lowered)
        .map(|m| QueryTerm::EnsemblId(m.as_str().to_uppercase()))
}

fn parse_position(raw: &str) -> Option<u32> {
    raw.replace(',', "").parse().ok()
}

/// `rs` followed by every digit found in the term.
pub fn sanitize_rsid(term: &str) -> String {
    let digits: String = term.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("rs{}", digits)
}

///
/// Parse a location as reported by the variant service (`10:5894500-5894500`,
/// 1-based inclusive) into a half-open Region.
///
pub fn parse_service_location(location: &str) -> Option<Region> {
    let caps = LOCATION_RE.captures(location.trim())?;
    let start: u32 = caps[2].parse().ok()?;
    let end: u32 = caps[3].parse().ok()?;
    Some(Region::new(&caps[1], start.saturating_sub(1), end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("chrx:5894499-5894500", Region::new("chrX", 5894499, 5894500))]
    #[case("chr10:5894499-5894500extra string ", Region::new("chr10", 5894499, 5894500))]
    #[case("chr10:5894500-5894499", Region::new("chr10", 5894499, 5894500))]
    #[case("CHR1 39492461 39492462", Region::new("chr1", 39492461, 39492462))]
    #[case("chr1:39,492,461-39,492,462", Region::new("chr1", 39492461, 39492462))]
    #[case("chr22:100", Region::new("chr22", 100, 100))]
    #[case("chrY:10\t20", Region::new("chrY", 10, 20))]
    fn test_parse_range(#[case] term: &str, #[case] expected: Region) {
        assert_eq!(parse_query(term), Some(QueryTerm::Range(expected)));
    }

    #[rstest]
    #[case("rs3768324")]
    #[case("RS3768324 extra")]
    #[case("rs3768324\tfoo")]
    fn test_parse_rsid(#[case] term: &str) {
        assert_eq!(parse_query(term), Some(QueryTerm::RsId("rs3768324".to_string())));
    }

    #[rstest]
    fn test_parse_ensembl_id() {
        assert_eq!(
            parse_query("ensg00000139618"),
            Some(QueryTerm::EnsemblId("ENSG00000139618".to_string()))
        );
    }

    #[rstest]
    #[case("chr23:1-2")]
    #[case("chr1-100-200")]
    #[case("ELK4")]
    #[case("")]
    #[case("chr1:99999999999")]
    fn test_unrecognized(#[case] term: &str) {
        assert_eq!(parse_query(term), None);
    }

    #[rstest]
    fn test_sanitize_rsid() {
        assert_eq!(sanitize_rsid("rs 10,905,307"), "rs10905307");
    }

    #[rstest]
    #[case("10:5894500-5894500", Region::new("chr10", 5894499, 5894500))]
    #[case("X:100-200", Region::new("chrX", 99, 200))]
    fn test_parse_service_location(#[case] location: &str, #[case] expected: Region) {
        assert_eq!(parse_service_location(location), Some(expected));
    }

    #[rstest]
    fn test_parse_service_location_garbage() {
        assert_eq!(parse_service_location("not a location"), None);
    }
}
