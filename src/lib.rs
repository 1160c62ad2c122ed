mod aggregator;
pub mod cli;
mod config;
mod error;
mod fetcher;
mod types;
mod utils;

pub use error::SgMetError;

pub use aggregator::error::AggregateError;
pub use aggregator::writer::{integral_floats_as_int, write_gzip_csv, CSV_DATETIME_FORMAT};
pub use aggregator::{AggregateSummary, Collected, MonthAggregator};

pub use config::{default_key_file, ApiKey, ConfigError, API_KEY_ENV};

pub use fetcher::error::{FailureKind, FetchError};
pub use fetcher::transport::{
    HttpReply, HttpTransport, Transport, DATE_TIME_FORMAT, DEFAULT_BASE_URL, REQUEST_TIMEOUT,
};
pub use fetcher::{Fetcher, RetryPolicy, Sleeper, ThreadSleeper, DEFAULT_ATTEMPTS, DEFAULT_BACKOFF};

pub use types::grid::TimestampGrid;
pub use types::month::{Month, MonthParseError};
pub use types::reading_set::{deduplicate, ReadingSet, ResultSet, TIMESTAMP_COLUMN, VALUE_COLUMN};
pub use types::variable::{PayloadShape, Variable, VariableParseError};

pub use utils::{ensure_output_dir_exists, output_file_name, DEFAULT_OUTPUT_DIR_NAME};
