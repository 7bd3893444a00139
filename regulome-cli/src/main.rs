mod config;
mod context;
mod nearby;
mod output;
mod score;
mod search;
mod summary;

use std::path::Path;

use anyhow::Result;
use clap::{ArgAction, Command, arg};
use tracing_subscriber::EnvFilter;

use crate::config::RegulomeConfig;
use crate::context::Runtime;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "regulome";
    pub const BIN_NAME: &str = "regulome";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Annotate genomic regions and variants with regulatory evidence and score them with the RegulomeDB ranking.")
        .subcommand_required(true)
        .arg(arg!(-c --config <config> "TOML configuration file").global(true))
        .arg(arg!(-a --assembly <assembly> "GRCh37 (default), GRCh38, GRCm37 or GRCm38").global(true))
        .arg(
            arg!(-v --verbose "More logging (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(search::cli::create_search_cli())
        .subcommand(score::cli::create_score_cli())
        .subcommand(summary::cli::create_summary_cli())
        .subcommand(nearby::cli::create_nearby_cli())
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    init_logging(matches.get_count("verbose"));

    let config = RegulomeConfig::load(matches.get_one::<String>("config").map(Path::new))?;
    let runtime = Runtime::from_config(
        config,
        matches.get_one::<String>("assembly").map(|a| a.as_str()),
    )?;
    tracing::info!("{} v{} on {}", consts::PKG_NAME, consts::VERSION, runtime.assembly);

    match matches.subcommand() {
        Some((search::cli::SEARCH_CMD, matches)) => {
            search::handlers::run_search(matches, &runtime)?;
        }
        Some((score::cli::SCORE_CMD, matches)) => {
            score::handlers::run_score(matches, &runtime)?;
        }
        Some((summary::cli::SUMMARY_CMD, matches)) => {
            summary::handlers::run_summary(matches, &runtime)?;
        }
        Some((nearby::cli::NEARBY_CMD, matches)) => {
            nearby::handlers::run_nearby(matches, &runtime)?;
        }
        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parser_is_valid() {
        build_parser().debug_assert();
    }

    #[rstest]
    fn test_global_args_after_subcommand() {
        let matches = build_parser()
            .try_get_matches_from(["regulome", "score", "queries.txt", "-vv", "--assembly", "hg19", "-p", "4"])
            .unwrap();
        assert_eq!(matches.get_count("verbose"), 2);
        assert_eq!(matches.get_one::<String>("assembly").map(|s| s.as_str()), Some("hg19"));
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, score::cli::SCORE_CMD);
        assert_eq!(sub.get_one::<usize>("processes"), Some(&4));
    }

    #[rstest]
    fn test_nearby_args() {
        let matches = build_parser()
            .try_get_matches_from(["regulome", "nearby", "chr10", "104530000", "--scores"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(sub.get_one::<u32>("position"), Some(&104530000));
        assert!(sub.get_flag("scores"));
        assert_eq!(sub.get_one::<u32>("window"), None);
    }
}
