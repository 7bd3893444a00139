use std::io::Write;

use anyhow::{Context, Result};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use regulome_core::utils::read_query_lines;
use regulome_scoring::batch::{BatchOutcome, TSV_HEADER, query_term, tally};

use crate::context::Runtime;
use crate::output::{OutputFormat, open_output};

pub fn run_score(matches: &ArgMatches, runtime: &Runtime) -> Result<()> {
    let input = matches
        .get_one::<String>("input")
        .context("A query file is required.")?;
    let format = match matches.get_one::<String>("format") {
        Some(format) => format.parse()?,
        None => OutputFormat::Tsv,
    };
    let matched_only = matches.get_flag("matched-pwm-peak-only");
    let include_peaks = matches.get_flag("peaks") && format == OutputFormat::Json;

    let mut scorer = runtime.batch_scorer().with_peaks(include_peaks);
    if let Some(processes) = matches.get_one::<usize>("processes") {
        scorer = scorer.with_processes(*processes);
    }
    if let Some(chunk_size) = matches.get_one::<usize>("chunk-size") {
        scorer = scorer.with_chunk_size(Some(*chunk_size));
    }

    let terms: Vec<String> = read_query_lines(input)?
        .iter()
        .map(|line| query_term(line))
        .filter(|term| !term.is_empty() && !term.starts_with('#'))
        .map(String::from)
        .collect();
    info!("Read {} queries from {}", terms.len(), input);

    let pb = if matches.get_flag("quiet") {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(terms.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
    );
    pb.set_message("Scoring");
    let outcomes = scorer.run(&terms, |n| pb.inc(n as u64))?;
    pb.finish_and_clear();

    let mut out = open_output(matches.get_one::<String>("output"))?;
    let format = if matched_only { OutputFormat::Bed } else { format };
    write_outcomes(&mut out, &outcomes, format)?;
    out.flush()?;

    for failure in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        eprintln!("{}", failure.reason);
    }
    let (succeeded, failed) = tally(&outcomes);
    eprintln!("Succeeded {}; Failed: {}", succeeded, failed);
    Ok(())
}

fn write_outcomes<W: Write>(out: &mut W, outcomes: &[BatchOutcome], format: OutputFormat) -> Result<()> {
    let scored = outcomes.iter().filter_map(|o| o.as_ref().ok());
    match format {
        OutputFormat::Tsv => {
            writeln!(out, "{}", TSV_HEADER)?;
            for region in scored {
                writeln!(out, "{}", region.to_tsv_row())?;
            }
        }
        OutputFormat::Json => {
            for region in scored {
                serde_json::to_writer(&mut *out, region)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Bed => {
            for region in scored {
                for peak in &region.matched_pwm_peaks {
                    writeln!(out, "{}", peak.to_bed_row())?;
                }
            }
        }
    }
    Ok(())
}
