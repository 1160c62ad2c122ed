//! Decodes environment API responses and normalizes both payload shapes into
//! the same row layout: location, measured value(s), observation timestamp.

use crate::fetcher::error::FetchError;
use crate::types::reading_set::{timestamp_column, ReadingSet, VALUE_COLUMN};
use crate::types::variable::{PayloadShape, Variable};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Deserialize)]
struct ApiResponse {
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    timestamp: Option<String>,
    readings: Value,
}

#[derive(Debug, Deserialize)]
struct StationReading {
    station_id: String,
    value: Option<f64>,
}

/// reading type -> region -> value
type RegionReadings = BTreeMap<String, BTreeMap<String, Option<f64>>>;

/// Readings decoded from an item, before the observation time is attached.
enum Decoded {
    Stations(Vec<StationReading>),
    Regions(Vec<String>, RegionReadings),
}

/// Parses a 200 response body. `Ok(None)` means the API had no readings for
/// the requested instant; the item timestamp is not looked at in that case.
pub(crate) fn parse_readings(
    variable: Variable,
    body: &str,
) -> Result<Option<ReadingSet>, FetchError> {
    let response: ApiResponse = serde_json::from_str(body)?;
    let Some(item) = response.items.into_iter().next() else {
        return Ok(None);
    };
    let Some(decoded) = decode_readings(variable, item.readings)? else {
        return Ok(None);
    };

    let raw = item
        .timestamp
        .ok_or_else(|| FetchError::MalformedPayload {
            variable,
            reason: "item has readings but no timestamp".to_string(),
        })?;
    let observed_at = parse_local_timestamp(&raw)?;

    let frame = match decoded {
        Decoded::Stations(readings) => station_list_frame(variable, readings, observed_at)?,
        Decoded::Regions(regions, readings) => {
            region_map_frame(variable, regions, &readings, observed_at)?
        }
    };
    Ok(Some(ReadingSet::new(frame, observed_at)))
}

/// Drops the UTC offset and keeps the wall-clock time the API reported.
pub(crate) fn parse_local_timestamp(raw: &str) -> Result<NaiveDateTime, FetchError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.naive_local()),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| FetchError::TimestampParse(raw.to_string(), e)),
    }
}

fn decode_readings(variable: Variable, readings: Value) -> Result<Option<Decoded>, FetchError> {
    let empty = match &readings {
        Value::Array(list) => list.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(None);
    }

    match variable.payload_shape() {
        PayloadShape::StationList => {
            let readings: Vec<StationReading> =
                serde_json::from_value(readings).map_err(|e| FetchError::MalformedPayload {
                    variable,
                    reason: format!("readings is not a station list: {e}"),
                })?;
            Ok(Some(Decoded::Stations(readings)))
        }
        PayloadShape::RegionMap => {
            let readings: RegionReadings =
                serde_json::from_value(readings).map_err(|e| FetchError::MalformedPayload {
                    variable,
                    reason: format!("readings is not a region map: {e}"),
                })?;
            let regions: Vec<String> = readings
                .values()
                .flat_map(|by_region| by_region.keys().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if regions.is_empty() {
                return Ok(None);
            }
            Ok(Some(Decoded::Regions(regions, readings)))
        }
    }
}

fn station_list_frame(
    variable: Variable,
    readings: Vec<StationReading>,
    observed_at: NaiveDateTime,
) -> PolarsResult<DataFrame> {
    let rows = readings.len();
    let (stations, values): (Vec<String>, Vec<Option<f64>>) = readings
        .into_iter()
        .map(|r| (r.station_id, r.value))
        .unzip();
    DataFrame::new(vec![
        Column::new(variable.location_column().into(), stations),
        Column::new(VALUE_COLUMN.into(), values),
        timestamp_column(observed_at, rows),
    ])
}

fn region_map_frame(
    variable: Variable,
    regions: Vec<String>,
    readings: &RegionReadings,
    observed_at: NaiveDateTime,
) -> PolarsResult<DataFrame> {
    let mut columns = Vec::with_capacity(readings.len() + 2);
    for (reading_type, by_region) in readings {
        let values: Vec<Option<f64>> = regions
            .iter()
            .map(|region| by_region.get(region).copied().flatten())
            .collect();
        columns.push(Column::new(reading_type.as_str().into(), values));
    }
    let rows = regions.len();
    columns.insert(0, Column::new(variable.location_column().into(), regions));
    columns.push(timestamp_column(observed_at, rows));
    DataFrame::new(columns)
}
