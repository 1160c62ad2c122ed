//! Tables of readings: one [`ReadingSet`] per API response, and the
//! [`ResultSet`] that accumulates them over a month.

use crate::types::variable::{PayloadShape, Variable};
use chrono::NaiveDateTime;
use polars::prelude::*;

/// Column holding the reported observation time, in Singapore local time.
pub const TIMESTAMP_COLUMN: &str = "timestamp_sgt";
/// Measured value column for station-list variables.
pub const VALUE_COLUMN: &str = "value";

pub(crate) fn timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

/// The readings returned for one timestamp query.
///
/// Every row carries the same `observed_at`, the timestamp the API reported
/// for the observation, which may differ from the instant that was queried.
#[derive(Debug, Clone)]
pub struct ReadingSet {
    frame: DataFrame,
    observed_at: NaiveDateTime,
}

impl ReadingSet {
    pub fn new(frame: DataFrame, observed_at: NaiveDateTime) -> Self {
        Self { frame, observed_at }
    }

    pub fn observed_at(&self) -> NaiveDateTime {
        self.observed_at
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Builds the timestamp column for `rows` readings sharing one observation time.
pub(crate) fn timestamp_column(observed_at: NaiveDateTime, rows: usize) -> Column {
    DatetimeChunked::from_naive_datetime(
        TIMESTAMP_COLUMN.into(),
        std::iter::repeat(observed_at).take(rows),
        TimeUnit::Milliseconds,
    )
    .into_series()
    .into()
}

/// Accumulates readings for one (variable, month) pair.
///
/// Starts out as an empty table with the variable's location and timestamp
/// columns so that a month without any usable readings still has a schema.
pub struct ResultSet {
    variable: Variable,
    frame: DataFrame,
}

impl ResultSet {
    pub fn empty(variable: Variable) -> PolarsResult<Self> {
        Ok(Self {
            variable,
            frame: empty_frame(variable)?,
        })
    }

    /// Appends in fetch order. Readings that bring new value columns widen
    /// the table, earlier rows get nulls there.
    pub fn append(&mut self, readings: ReadingSet) -> PolarsResult<()> {
        let incoming = readings.into_frame();
        if self.frame.schema() == incoming.schema() {
            self.frame.vstack_mut(&incoming)?;
            return Ok(());
        }
        let widened = concat_lf_diagonal(
            [self.frame.clone().lazy(), incoming.lazy()],
            UnionArgs::default(),
        )?
        .collect()?;
        self.frame = order_columns(&widened, self.variable)?;
        Ok(())
    }

    /// Rows appended so far, duplicates included.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Merges the chunks left behind by one `vstack_mut` per appended reading.
    pub(crate) fn rechunk(&mut self) {
        self.frame.rechunk_mut();
    }

    /// Drops rows that are identical across all columns, keeping the first occurrence.
    pub fn into_deduplicated(mut self) -> PolarsResult<DataFrame> {
        self.rechunk();
        deduplicate(&self.frame)
    }
}

/// Removes exact duplicate rows, keeping the first occurrence and the original order.
pub fn deduplicate(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()
}

fn empty_frame(variable: Variable) -> PolarsResult<DataFrame> {
    let mut columns = vec![Column::new_empty(
        variable.location_column().into(),
        &DataType::String,
    )];
    if variable.payload_shape() == PayloadShape::StationList {
        columns.push(Column::new_empty(VALUE_COLUMN.into(), &DataType::Float64));
    }
    columns.push(Column::new_empty(
        TIMESTAMP_COLUMN.into(),
        &timestamp_dtype(),
    ));
    DataFrame::new(columns)
}

/// Location first, timestamp last, measured values in between.
fn order_columns(frame: &DataFrame, variable: Variable) -> PolarsResult<DataFrame> {
    let location = variable.location_column();
    let mut names: Vec<PlSmallStr> = vec![location.into()];
    names.extend(
        frame
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != location && name.as_str() != TIMESTAMP_COLUMN)
            .cloned(),
    );
    names.push(TIMESTAMP_COLUMN.into());
    frame.select(names)
}
