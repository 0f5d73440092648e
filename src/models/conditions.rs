//! Current weather conditions model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observation format used in summaries, e.g. `2024-01-01T12:00Z`
const OBSERVED_AT_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Current conditions at a location as reported by the forecast service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// Wind speed in km/h
    pub wind_speed_kmh: f64,
    /// WMO weather interpretation code
    pub condition_code: i32,
    /// Time of the observation
    pub observed_at: DateTime<Utc>,
}

impl CurrentConditions {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature_c)
    }

    /// Format wind speed with unit
    #[must_use]
    pub fn format_wind(&self) -> String {
        format!("{:.1} km/h", self.wind_speed_kmh)
    }

    #[must_use]
    pub fn format_observed_at(&self) -> String {
        self.observed_at.format(OBSERVED_AT_FORMAT).to_string()
    }
}
