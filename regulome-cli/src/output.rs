use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Tsv,
    Bed,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "tsv" => Ok(OutputFormat::Tsv),
            "bed" => Ok(OutputFormat::Bed),
            _ => anyhow::bail!("Unknown output format: {}. Valid options are json, tsv or bed", s),
        }
    }
}

/// Buffered writer to a file, or to stdout for `None` and `-`.
pub fn open_output(path: Option<&String>) -> Result<Box<dyn Write>> {
    match path.map(|p| p.as_str()) {
        None | Some("-") => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Cannot create {}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("json", OutputFormat::Json)]
    #[case("TSV", OutputFormat::Tsv)]
    #[case("bed", OutputFormat::Bed)]
    fn test_parse_format(#[case] raw: &str, #[case] expected: OutputFormat) {
        assert_eq!(raw.parse::<OutputFormat>().unwrap(), expected);
    }

    #[rstest]
    fn test_unknown_format() {
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
