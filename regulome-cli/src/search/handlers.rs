use std::io::Write;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde_json::json;

use regulome_scoring::ScoredRegion;
use regulome_scoring::batch::TSV_HEADER;

use crate::context::Runtime;
use crate::output::{OutputFormat, open_output};

pub fn run_search(matches: &ArgMatches, runtime: &Runtime) -> Result<()> {
    let query = matches
        .get_one::<String>("query")
        .context("A query is required.")?;
    let format = match matches.get_one::<String>("format") {
        Some(format) => format.parse()?,
        None => OutputFormat::Json,
    };
    let include_peaks = matches.get_flag("peaks") || format == OutputFormat::Bed;

    let region = runtime.resolver().resolve(query, runtime.assembly)?;
    let mut tracks = runtime.open_tracks();
    let report = runtime.engine().evaluate(&region, &mut tracks, include_peaks)?;

    let mut out = open_output(None)?;
    match format {
        OutputFormat::Json => {
            let body = json!({
                "query": query,
                "assembly": runtime.assembly,
                "coordinates": region.to_coordinate_string(),
                "score": report.score,
                "features": report.features,
                "evidence": report.evidence,
                "message": report.hits.message,
                "peak_count": report.hits.peak_count,
                "file_count": report.hits.file_count,
                "dataset_count": report.hits.dataset_count,
                "datasets": report.hits.datasets,
                "peaks": include_peaks.then(|| report.hits.peak_details()),
            });
            serde_json::to_writer_pretty(&mut out, &body)?;
            writeln!(out)?;
        }
        OutputFormat::Tsv => {
            writeln!(out, "{}", TSV_HEADER)?;
            writeln!(out, "{}", ScoredRegion::from_report(query, &report, false).to_tsv_row())?;
        }
        OutputFormat::Bed => {
            for peak in report.hits.peak_details() {
                writeln!(out, "{}", peak.to_bed_row())?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
