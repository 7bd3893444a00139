use clap::{Arg, Command, arg, value_parser};

use regulome_scoring::nearby::{DEFAULT_MAX_SNPS, DEFAULT_WINDOW};

pub const NEARBY_CMD: &str = "nearby";

pub fn create_nearby_cli() -> Command {
    Command::new(NEARBY_CMD)
        .about("List the SNPs closest to a position, optionally with their scores.")
        .arg_required_else_help(true)
        .arg(Arg::new("chrom").required(true).help("Chromosome, e.g. chr10"))
        .arg(
            Arg::new("position")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("0-based position"),
        )
        .arg(
            arg!(-w --window <window>)
                .value_parser(value_parser!(u32))
                .help(format!("Window width in bp (default: {})", DEFAULT_WINDOW)),
        )
        .arg(
            arg!(-m --max <max>)
                .value_parser(value_parser!(usize))
                .help(format!("Maximum number of SNPs (default: {})", DEFAULT_MAX_SNPS)),
        )
        .arg(arg!(--scores "Score every SNP"))
}
