use clap::{Arg, Command, arg, value_parser};

pub const SUMMARY_CMD: &str = "summary";

pub fn create_summary_cli() -> Command {
    Command::new(SUMMARY_CMD)
        .about("Resolve, deduplicate and score a block of queries, one per line. Lines starting with # are skipped.")
        .arg_required_else_help(true)
        .arg(
            Arg::new("input")
                .required(true)
                .help("Query file (plain or gzipped), or - for stdin"),
        )
        .arg(
            arg!(-l --limit <limit> "Maximum number of distinct regions to score")
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(-o --output <output> "Output file (default: stdout)"))
}
