use crate::types::month::Month;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Month {0} is not a valid calendar month")]
    InvalidMonth(Month),

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing output file '{0}'")]
    OutputWrite(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing output file '{0}'")]
    OutputEncode(PathBuf, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    Polars(#[from] PolarsError),
}
