use clap::{Arg, Command, arg};

pub const SEARCH_CMD: &str = "search";

pub fn create_search_cli() -> Command {
    Command::new(SEARCH_CMD)
        .about("Annotate and score one region, rsID or Ensembl ID.")
        .arg_required_else_help(true)
        .arg(
            Arg::new("query")
                .required(true)
                .help("chr:start-end, rsID or Ensembl ID"),
        )
        .arg(arg!(--peaks "Include the overlapping peaks"))
        .arg(arg!(-f --format <format> "Output format: json (default), tsv or bed (peaks)"))
}
