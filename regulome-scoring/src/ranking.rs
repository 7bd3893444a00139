//! RegulomeDB ranking and probability.
//!
//! The rank is a strict precedence over the evidence categories present at a locus.
//! The probability is computed independently by a replaceable [`ProbabilityModel`].
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use regulome_core::errors::RegulomeError;

use crate::features::Features;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ranking {
    #[serde(rename = "1a")]
    R1a,
    #[serde(rename = "1b")]
    R1b,
    #[serde(rename = "1c")]
    R1c,
    #[serde(rename = "1d")]
    R1d,
    #[serde(rename = "1e")]
    R1e,
    #[serde(rename = "1f")]
    R1f,
    #[serde(rename = "2a")]
    R2a,
    #[serde(rename = "2b")]
    R2b,
    #[serde(rename = "2c")]
    R2c,
    #[serde(rename = "3a")]
    R3a,
    #[serde(rename = "3b")]
    R3b,
    #[serde(rename = "4")]
    R4,
    #[serde(rename = "5")]
    R5,
    #[serde(rename = "6")]
    R6,
    #[serde(rename = "7")]
    R7,
}

impl Ranking {
    /// Strongest first.
    pub const ALL: [Ranking; 15] = [
        Ranking::R1a,
        Ranking::R1b,
        Ranking::R1c,
        Ranking::R1d,
        Ranking::R1e,
        Ranking::R1f,
        Ranking::R2a,
        Ranking::R2b,
        Ranking::R2c,
        Ranking::R3a,
        Ranking::R3b,
        Ranking::R4,
        Ranking::R5,
        Ranking::R6,
        Ranking::R7,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ranking::R1a => "1a",
            Ranking::R1b => "1b",
            Ranking::R1c => "1c",
            Ranking::R1d => "1d",
            Ranking::R1e => "1e",
            Ranking::R1f => "1f",
            Ranking::R2a => "2a",
            Ranking::R2b => "2b",
            Ranking::R2c => "2c",
            Ranking::R3a => "3a",
            Ranking::R3b => "3b",
            Ranking::R4 => "4",
            Ranking::R5 => "5",
            Ranking::R6 => "6",
            Ranking::R7 => "7",
        }
    }
}

impl Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Ranking {
    type Err = RegulomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Ranking::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| RegulomeError::Config(format!("unknown ranking '{}'", s)))
    }
}

///
/// Rank a feature set. The first matching row of the precedence table wins;
/// no evidence at all ranks 7.
///
pub fn rank(f: &Features) -> Ranking {
    let motif = f.any_motif();
    let chip_dnase = f.chip && f.dnase;
    let both_matched = f.pwm_matched && f.footprint_matched;

    if f.qtl {
        if chip_dnase && both_matched {
            return Ranking::R1a;
        }
        if chip_dnase && motif && f.footprint {
            return Ranking::R1b;
        }
        if chip_dnase && f.pwm_matched {
            return Ranking::R1c;
        }
        if chip_dnase && motif {
            return Ranking::R1d;
        }
        if f.chip && f.pwm_matched {
            return Ranking::R1e;
        }
        if f.chip || f.dnase {
            return Ranking::R1f;
        }
    }
    if chip_dnase && both_matched {
        Ranking::R2a
    } else if chip_dnase && motif && f.footprint {
        Ranking::R2b
    } else if chip_dnase && f.pwm_matched {
        Ranking::R2c
    } else if chip_dnase && motif {
        Ranking::R3a
    } else if f.chip && f.pwm_matched {
        Ranking::R3b
    } else if chip_dnase {
        Ranking::R4
    } else if f.chip || f.dnase {
        Ranking::R5
    } else if motif {
        Ranking::R6
    } else {
        Ranking::R7
    }
}

///
/// Turns a feature set into a probability of regulatory function.
///
pub trait ProbabilityModel: Send + Sync {
    fn probability(&self, features: &Features, ranking: Ranking) -> f64;
}

///
/// One probability per rank.
///
#[derive(Debug, Clone, PartialEq)]
pub struct RankLookup {
    table: BTreeMap<Ranking, f64>,
}

impl Default for RankLookup {
    fn default() -> Self {
        let values = [
            0.99267, 0.96575, 0.94017, 0.91204, 0.88318, 0.81604, 0.78963, 0.75211, 0.71886,
            0.66129, 0.61003, 0.55936, 0.51372, 0.47065, 0.44299,
        ];
        RankLookup {
            table: Ranking::ALL.into_iter().zip(values).collect(),
        }
    }
}

impl RankLookup {
    /// Start from the default table and replace the given entries.
    pub fn with_overrides(overrides: &BTreeMap<String, f64>) -> Result<Self, RegulomeError> {
        let mut lookup = RankLookup::default();
        for (rank, p) in overrides {
            if !(0.0..=1.0).contains(p) {
                return Err(RegulomeError::Config(format!(
                    "probability for rank {} out of range: {}",
                    rank, p
                )));
            }
            lookup.table.insert(rank.parse()?, *p);
        }
        Ok(lookup)
    }
}

impl ProbabilityModel for RankLookup {
    fn probability(&self, _features: &Features, ranking: Ranking) -> f64 {
        self.table.get(&ranking).copied().unwrap_or(0.0)
    }
}

///
/// A logistic model over [`Features::values`].
///
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub weights: [f64; 9],
    pub intercept: f64,
}

impl LogisticModel {
    pub fn new(weights: [f64; 9], intercept: f64) -> Self {
        LogisticModel { weights, intercept }
    }

    /// Build from a name → weight map. Unnamed features weigh 0.
    pub fn from_named(weights: &BTreeMap<String, f64>, intercept: f64) -> Result<Self, RegulomeError> {
        let mut ordered = [0.0; 9];
        for (name, w) in weights {
            let i = Features::NAMES
                .iter()
                .position(|n| *n == name.as_str())
                .ok_or_else(|| RegulomeError::Config(format!("unknown feature '{}'", name)))?;
            ordered[i] = *w;
        }
        Ok(LogisticModel::new(ordered, intercept))
    }
}

impl ProbabilityModel for LogisticModel {
    fn probability(&self, features: &Features, _ranking: Ranking) -> f64 {
        let z: f64 = self.intercept
            + features
                .values()
                .iter()
                .zip(self.weights.iter())
                .map(|(x, w)| x * w)
                .sum::<f64>();
        1.0 / (1.0 + (-z).exp())
    }
}

///
/// A rank with its probability, rendered with five decimals.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub ranking: Ranking,
    pub probability: String,
}

impl Score {
    pub fn new(ranking: Ranking, probability: f64) -> Self {
        Score {
            ranking,
            probability: format!("{:.5}", probability),
        }
    }

    /// The single-string form older clients expect.
    pub fn legacy_summary(&self) -> String {
        format!("{} (probability); {} (ranking v2)", self.probability, self.ranking)
    }
}

/// Rank a feature set and attach the model's probability.
pub fn score(features: &Features, model: &dyn ProbabilityModel) -> Score {
    let ranking = rank(features);
    Score::new(ranking, model.probability(features, ranking))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn features(flags: &str) -> Features {
        let mut f = Features::default();
        for flag in flags.split_whitespace() {
            match flag {
                "ChIP" => f.chip = true,
                "DNase" => f.dnase = true,
                "PWM" => f.pwm = true,
                "Footprint" => f.footprint = true,
                "QTL" => f.qtl = true,
                "PWM_matched" => f.pwm_matched = true,
                "Footprint_matched" => f.footprint_matched = true,
                other => panic!("unknown flag {other}"),
            }
        }
        f
    }

    #[rstest]
    #[case("QTL ChIP DNase PWM Footprint PWM_matched Footprint_matched", Ranking::R1a)]
    #[case("QTL ChIP DNase PWM Footprint", Ranking::R1b)]
    #[case("QTL ChIP DNase Footprint", Ranking::R1b)]
    #[case("QTL ChIP DNase PWM PWM_matched", Ranking::R1c)]
    #[case("QTL ChIP DNase PWM", Ranking::R1d)]
    #[case("QTL ChIP PWM PWM_matched", Ranking::R1e)]
    #[case("QTL ChIP", Ranking::R1f)]
    #[case("QTL DNase PWM", Ranking::R1f)]
    #[case("ChIP DNase PWM Footprint PWM_matched Footprint_matched", Ranking::R2a)]
    #[case("ChIP DNase PWM Footprint", Ranking::R2b)]
    #[case("ChIP DNase PWM PWM_matched", Ranking::R2c)]
    #[case("ChIP DNase PWM", Ranking::R3a)]
    #[case("ChIP PWM PWM_matched", Ranking::R3b)]
    #[case("ChIP DNase", Ranking::R4)]
    #[case("ChIP", Ranking::R5)]
    #[case("DNase PWM", Ranking::R5)]
    #[case("Footprint", Ranking::R6)]
    #[case("QTL", Ranking::R7)]
    #[case("", Ranking::R7)]
    fn test_rank_precedence(#[case] flags: &str, #[case] expected: Ranking) {
        assert_eq!(rank(&features(flags)), expected);
    }

    #[rstest]
    fn test_lookup_is_monotone() {
        let lookup = RankLookup::default();
        let f = Features::default();
        let probs: Vec<f64> = Ranking::ALL
            .iter()
            .map(|r| lookup.probability(&f, *r))
            .collect();
        assert!(probs.windows(2).all(|w| w[0] > w[1]));
    }

    #[rstest]
    fn test_lookup_overrides() {
        let overrides = BTreeMap::from([("7".to_string(), 0.1)]);
        let lookup = RankLookup::with_overrides(&overrides).unwrap();
        assert_eq!(lookup.probability(&Features::default(), Ranking::R7), 0.1);

        let bad = BTreeMap::from([("8".to_string(), 0.1)]);
        assert!(RankLookup::with_overrides(&bad).is_err());
    }

    #[rstest]
    fn test_logistic_model() {
        let model = LogisticModel::from_named(
            &BTreeMap::from([("QTL".to_string(), 2.0), ("IC_max".to_string(), 1.0)]),
            -2.0,
        )
        .unwrap();
        let mut f = features("QTL");
        assert!((model.probability(&f, Ranking::R7) - 0.5).abs() < 1e-12);
        f.ic_max = 2.0;
        assert!(model.probability(&f, Ranking::R7) > 0.8);
        assert!(LogisticModel::from_named(&BTreeMap::from([("GC".to_string(), 1.0)]), 0.0).is_err());
    }

    #[rstest]
    fn test_score_rendering() {
        let result = score(&features("ChIP DNase"), &RankLookup::default());
        assert_eq!(result.ranking, Ranking::R4);
        assert_eq!(result.probability, "0.55936");
        assert_eq!(result.legacy_summary(), "0.55936 (probability); 4 (ranking v2)");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"ranking": "4", "probability": "0.55936"}));
    }

    #[rstest]
    #[case("1a", Ranking::R1a)]
    #[case("3B", Ranking::R3b)]
    #[case(" 7 ", Ranking::R7)]
    fn test_parse_ranking(#[case] raw: &str, #[case] expected: Ranking) {
        assert_eq!(raw.parse::<Ranking>().unwrap(), expected);
    }
}
