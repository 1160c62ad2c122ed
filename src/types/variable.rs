//! Defines the measured variables exposed by the data.gov.sg environment API
//! and the per-variable properties the fetcher and aggregator rely on.

use chrono::Duration;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One measured phenomenon, served by its own API resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Rainfall in mm, reported every 5 minutes.
    Rainfall,
    /// Wind speed in knots, reported every minute.
    WindSpeed,
    /// Wind direction in degrees, reported every minute.
    WindDirection,
    /// Air temperature in degrees Celsius, reported every minute.
    AirTemperature,
    /// Relative humidity in percent, reported every minute.
    RelativeHumidity,
    /// Hourly PM2.5 concentration per region.
    Pm25,
}

/// The structural layout of the `readings` field of an API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// A list of `{station_id, value}` objects.
    StationList,
    /// A mapping of reading type to a `{region: value}` mapping.
    RegionMap,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown variable '{0}', expected one of: rainfall, wind-speed, wind-direction, air-temperature, relative-humidity, pm25")]
pub struct VariableParseError(pub String);

impl Variable {
    /// Every variable, in the order the driver processes them by default.
    pub const ALL: [Variable; 6] = [
        Variable::Rainfall,
        Variable::WindSpeed,
        Variable::WindDirection,
        Variable::AirTemperature,
        Variable::RelativeHumidity,
        Variable::Pm25,
    ];

    pub fn path_segment(&self) -> &'static str {
        match self {
            Variable::Rainfall => "rainfall",
            Variable::WindSpeed => "wind-speed",
            Variable::WindDirection => "wind-direction",
            Variable::AirTemperature => "air-temperature",
            Variable::RelativeHumidity => "relative-humidity",
            Variable::Pm25 => "pm25",
        }
    }

    /// Spacing of the timestamp grid used when downloading a month.
    pub fn sampling_interval(&self) -> Duration {
        match self {
            Variable::Rainfall => Duration::minutes(5),
            Variable::Pm25 => Duration::minutes(60),
            _ => Duration::minutes(1),
        }
    }

    pub fn payload_shape(&self) -> PayloadShape {
        match self {
            Variable::Pm25 => PayloadShape::RegionMap,
            _ => PayloadShape::StationList,
        }
    }

    /// Name of the column identifying where a reading was taken.
    pub(crate) fn location_column(&self) -> &'static str {
        match self.payload_shape() {
            PayloadShape::StationList => "station_id",
            PayloadShape::RegionMap => "region",
        }
    }
}

/// Formats a `Variable` using its API path segment.
///
/// # Examples
///
/// ```
/// use sgmet::Variable;
///
/// assert_eq!(Variable::WindSpeed.to_string(), "wind-speed");
/// assert_eq!("pm25".parse::<Variable>().unwrap(), Variable::Pm25);
/// ```
impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

impl FromStr for Variable {
    type Err = VariableParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.path_segment() == s.trim())
            .ok_or_else(|| VariableParseError(s.to_string()))
    }
}
