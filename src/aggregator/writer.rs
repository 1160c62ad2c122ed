use crate::aggregator::error::AggregateError;
use flate2::write::GzEncoder;
use flate2::Compression;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Datetime layout used for the timestamp column in the CSV output.
pub const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes `frame` as a gzip-compressed CSV file with a header row.
pub fn write_gzip_csv(frame: &mut DataFrame, path: &Path) -> Result<(), AggregateError> {
    let file =
        File::create(path).map_err(|e| AggregateError::OutputWrite(path.to_path_buf(), e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    CsvWriter::new(&mut encoder)
        .include_header(true)
        .with_datetime_format(Some(CSV_DATETIME_FORMAT.to_string()))
        .finish(frame)
        .map_err(|e| AggregateError::OutputEncode(path.to_path_buf(), e))?;
    encoder
        .finish()
        .and_then(|mut inner| inner.flush())
        .map_err(|e| AggregateError::OutputWrite(path.to_path_buf(), e))?;
    Ok(())
}

/// Recasts `Float64` columns holding only whole numbers to `Int64` so that
/// values such as `12` are not written as `12.0`. A column with any null or
/// fractional value stays `Float64`.
pub fn integral_floats_as_int(mut frame: DataFrame) -> PolarsResult<DataFrame> {
    let candidates: Vec<PlSmallStr> = frame
        .get_columns()
        .iter()
        .filter(|column| column.dtype() == &DataType::Float64 && !column.is_empty())
        .map(|column| column.name().clone())
        .collect();
    for name in candidates {
        let column = frame.column(&name)?;
        let values = column.f64()?;
        let integral = values.null_count() == 0
            && values
                .into_iter()
                .flatten()
                .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64);
        if integral {
            let cast = column.cast(&DataType::Int64)?;
            frame.with_column(cast)?;
        }
    }
    Ok(frame)
}

#[cfg(test)]
pub(crate) fn read_gzip_csv(path: &Path) -> Result<DataFrame, Box<dyn std::error::Error>> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decompressed = Vec::new();
    GzDecoder::new(File::open(path)?).read_to_end(&mut decompressed)?;
    Ok(CsvReader::new(std::io::Cursor::new(decompressed)).finish()?)
}
