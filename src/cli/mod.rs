pub mod args;

pub use args::Cli;

use crate::aggregator::MonthAggregator;
use crate::config::ApiKey;
use crate::error::SgMetError;
use crate::fetcher::transport::HttpTransport;
use crate::fetcher::{Fetcher, RetryPolicy};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::time::Duration;

/// Installs `env_logger`; `RUST_LOG` takes precedence over `--verbose`.
pub fn init_logging(verbose: bool) {
    logger_builder(verbose).init();
}

/// Status lines, retries included, go to stdout alongside the summaries.
fn logger_builder(verbose: bool) -> Builder {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .target(Target::Stdout)
        .parse_default_env();
    builder
}

/// Downloads every requested variable for the requested month, one after another.
pub fn run(cli: Cli) -> Result<(), SgMetError> {
    let api_key = ApiKey::load(cli.api_key.clone())?;
    let month = cli.month_or_default();

    let transport = HttpTransport::builder()
        .api_key(api_key)
        .maybe_base_url(cli.base_url.clone())
        .build()?;
    let policy = RetryPolicy::builder()
        .attempts(cli.attempts)
        .backoff(Duration::from_secs(cli.backoff_secs))
        .build();
    let aggregator = MonthAggregator::builder()
        .fetcher(Fetcher::new(transport, policy))
        .output_dir(cli.output_dir.clone())
        .show_progress(!cli.quiet)
        .build();

    for variable in cli.variables() {
        println!("variable = {}, month = {}", variable, month);
        let summary = aggregator.aggregate(variable, month)?;
        println!("    {} records", summary.fetched_rows);
        println!(
            "    {} records after removing duplicates",
            summary.unique_rows
        );
        println!("    Written {}", summary.path.display());
    }
    Ok(())
}
