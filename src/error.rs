use crate::aggregator::error::AggregateError;
use crate::config::ConfigError;
use crate::fetcher::error::FetchError;
use crate::types::month::MonthParseError;
use crate::types::variable::VariableParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SgMetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    MonthParse(#[from] MonthParseError),

    #[error(transparent)]
    VariableParse(#[from] VariableParseError),
}
