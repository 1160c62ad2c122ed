use clap::Parser;
use sgmet::cli::{init_logging, run, Cli};
use sgmet::SgMetError;

fn main() -> Result<(), SgMetError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
