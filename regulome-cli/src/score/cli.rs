use clap::{Arg, ArgAction, Command, arg, value_parser};

pub const SCORE_CMD: &str = "score";

pub fn create_score_cli() -> Command {
    Command::new(SCORE_CMD)
        .about("Score every query in a file. Lines with four or more tab-separated columns use the fourth as the query.")
        .arg_required_else_help(true)
        .arg(
            Arg::new("input")
                .required(true)
                .help("Query file (plain or gzipped), or - for stdin"),
        )
        .arg(arg!(-o --output <output> "Output file (default: stdout)"))
        .arg(arg!(-f --format <format> "Output format: tsv (default) or json (one object per line)"))
        .arg(
            arg!(-p --processes <processes> "Number of worker threads")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"chunk-size" <chunk_size> "Queries per chunk (default: evenly split across workers)")
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(--peaks "Include the overlapping peaks (json only)"))
        .arg(
            arg!(--"matched-pwm-peak-only" "Only write PWM peaks whose target is matched by a QTL, as BED")
                .action(ArgAction::SetTrue),
        )
        .arg(arg!(--quiet "Hide the progress bar"))
}
