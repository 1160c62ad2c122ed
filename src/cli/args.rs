use crate::config::API_KEY_ENV;
use crate::fetcher::{DEFAULT_ATTEMPTS, DEFAULT_BACKOFF};
use crate::types::month::Month;
use crate::types::variable::Variable;
use crate::utils::DEFAULT_OUTPUT_DIR_NAME;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sgmet")]
#[command(about = "Download a month of data.gov.sg meteorological readings to gzipped CSV")]
#[command(version)]
pub struct Cli {
    #[arg(
        value_name = "YEAR_MONTH",
        help = "Month to download, e.g. 2017_02 [default: last month]"
    )]
    pub month: Option<Month>,

    #[arg(
        value_name = "VARIABLE",
        help = "rainfall, wind-speed, wind-direction, air-temperature, relative-humidity or pm25 [default: all]"
    )]
    pub variable: Option<Variable>,

    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR_NAME)]
    pub output_dir: PathBuf,

    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, help = "Override the environment API base URL")]
    pub base_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_ATTEMPTS, help = "Requests per timestamp before giving up")]
    pub attempts: u32,

    #[arg(long, default_value_t = DEFAULT_BACKOFF.as_secs(), help = "Seconds to wait between retries")]
    pub backoff_secs: u64,

    #[arg(short, long, help = "Hide the progress bar")]
    pub quiet: bool,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,
}

impl Cli {
    pub fn month_or_default(&self) -> Month {
        self.month.unwrap_or_else(Month::last_month)
    }

    pub fn variables(&self) -> Vec<Variable> {
        match self.variable {
            Some(variable) => vec![variable],
            None => Variable::ALL.to_vec(),
        }
    }
}
