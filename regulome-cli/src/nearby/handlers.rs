use std::io::Write;

use anyhow::{Context, Result};
use clap::ArgMatches;

use regulome_core::models::normalize_chromosome;
use regulome_scoring::nearby::{DEFAULT_MAX_SNPS, DEFAULT_WINDOW, nearby_snps, scored_snps};

use crate::context::Runtime;
use crate::output::open_output;

pub fn run_nearby(matches: &ArgMatches, runtime: &Runtime) -> Result<()> {
    let chrom = matches
        .get_one::<String>("chrom")
        .map(|c| normalize_chromosome(c))
        .context("A chromosome is required.")?;
    let position = *matches
        .get_one::<u32>("position")
        .context("A position is required.")?;
    let window = matches
        .get_one::<u32>("window")
        .copied()
        .unwrap_or(DEFAULT_WINDOW);
    let max = matches
        .get_one::<usize>("max")
        .copied()
        .unwrap_or(DEFAULT_MAX_SNPS);

    let mut out = open_output(None)?;
    if matches.get_flag("scores") {
        let engine = runtime.engine();
        let scored = scored_snps(&engine, &mut runtime.open_tracks(), &chrom, position, window, max)?;
        serde_json::to_writer_pretty(&mut out, &scored)?;
    } else {
        let snps = nearby_snps(
            runtime.engine().index(),
            runtime.assembly,
            &chrom,
            position,
            window,
            max,
        )?;
        serde_json::to_writer_pretty(&mut out, &snps)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
