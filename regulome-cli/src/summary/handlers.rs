use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::ArgMatches;

use regulome_core::utils::open_query_source;
use regulome_scoring::summary::{DEFAULT_LIMIT, summarize_regions};

use crate::context::Runtime;
use crate::output::open_output;

pub fn run_summary(matches: &ArgMatches, runtime: &Runtime) -> Result<()> {
    let input = matches
        .get_one::<String>("input")
        .context("A query file is required.")?;
    let limit = matches
        .get_one::<usize>("limit")
        .copied()
        .unwrap_or(DEFAULT_LIMIT);

    let mut blob = String::new();
    open_query_source(input)?
        .read_to_string(&mut blob)
        .with_context(|| format!("Failed reading {}", input))?;

    let result = summarize_regions(
        &blob,
        limit,
        &runtime.resolver(),
        &runtime.engine(),
        &mut runtime.open_tracks(),
    );

    let mut out = open_output(matches.get_one::<String>("output"))?;
    serde_json::to_writer_pretty(&mut out, &result)?;
    writeln!(out)?;
    out.flush()?;

    eprintln!("Succeeded {}; Failed: {}", result.successes(), result.failures());
    Ok(())
}
