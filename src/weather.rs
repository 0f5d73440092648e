//! Current weather lookups against the Open-Meteo forecast API

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::lookup::{LookupClient, LookupError};
use crate::models::{CurrentConditions, Location};

/// Phrase used for condition codes missing from the table
pub const FALLBACK_CONDITION: &str = "Current conditions";

static STANDARD_CONDITION_CODES: LazyLock<ConditionCodeTable> = LazyLock::new(|| {
    ConditionCodeTable::from_entries(&[
        (0, "Clear sky"),
        (1, "Mainly clear"),
        (2, "Partly cloudy"),
        (3, "Overcast"),
        (45, "Foggy"),
        (48, "Depositing rime fog"),
        (51, "Light drizzle"),
        (53, "Moderate drizzle"),
        (55, "Dense drizzle"),
        (56, "Light freezing drizzle"),
        (57, "Dense freezing drizzle"),
        (61, "Slight rain"),
        (63, "Moderate rain"),
        (65, "Heavy rain"),
        (66, "Light freezing rain"),
        (67, "Heavy freezing rain"),
        (71, "Slight snow fall"),
        (73, "Moderate snow fall"),
        (75, "Heavy snow fall"),
        (77, "Snow grains"),
        (80, "Slight rain showers"),
        (81, "Moderate rain showers"),
        (82, "Violent rain showers"),
        (85, "Slight snow showers"),
        (86, "Heavy snow showers"),
        (95, "Thunderstorm"),
        (96, "Thunderstorm with slight hail"),
        (99, "Thunderstorm with heavy hail"),
    ])
});

/// Read-only mapping from WMO weather codes to readable phrases
#[derive(Debug)]
pub struct ConditionCodeTable {
    phrases: HashMap<i32, &'static str>,
}

impl ConditionCodeTable {
    fn from_entries(entries: &[(i32, &'static str)]) -> Self {
        Self {
            phrases: entries.iter().copied().collect(),
        }
    }

    /// The process-wide table of codes used by Open-Meteo
    #[must_use]
    pub fn standard() -> &'static ConditionCodeTable {
        &STANDARD_CONDITION_CODES
    }

    /// Phrase for `code`, or [`FALLBACK_CONDITION`] when the code is unmapped
    #[must_use]
    pub fn describe(&self, code: i32) -> &'static str {
        self.phrases.get(&code).copied().unwrap_or(FALLBACK_CONDITION)
    }
}

/// Forecast response from `OpenMeteo`, current-weather section only
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
    time: String,
}

impl TryFrom<CurrentWeather> for CurrentConditions {
    type Error = LookupError;

    fn try_from(current: CurrentWeather) -> Result<Self, Self::Error> {
        // Open-Meteo reports GMT unless a timezone is requested.
        let observed_at = NaiveDateTime::parse_from_str(&current.time, "%Y-%m-%dT%H:%M")
            .map_err(|e| {
                LookupError::MalformedResponse(format!("invalid time '{}': {e}", current.time))
            })?
            .and_utc();

        Ok(CurrentConditions {
            temperature_c: current.temperature,
            wind_speed_kmh: current.windspeed,
            condition_code: current.weathercode,
            observed_at,
        })
    }
}

/// Fetches current conditions for resolved locations
#[derive(Debug, Clone)]
pub struct WeatherResolver {
    client: LookupClient,
    base_url: String,
    codes: &'static ConditionCodeTable,
}

impl WeatherResolver {
    /// Create a resolver talking to `base_url`, e.g. `https://api.open-meteo.com/v1`
    pub fn new(
        client: LookupClient,
        base_url: impl Into<String>,
        codes: &'static ConditionCodeTable,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            codes,
        }
    }

    fn forecast_url(&self, location: &Location) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&current_weather=true",
            self.base_url.trim_end_matches('/'),
            location.latitude,
            location.longitude
        )
    }

    /// Fetch current conditions at the exact coordinates of `location`.
    ///
    /// Any lookup failure, a missing `current_weather` section or an
    /// unreadable timestamp yields `None`.
    #[instrument(skip(self, location, deadline), fields(location = %location.name))]
    pub async fn current_conditions_for(
        &self,
        location: &Location,
        deadline: Duration,
    ) -> Option<CurrentConditions> {
        let url = self.forecast_url(location);
        debug!("OpenMeteo API request URL: {}", url);

        let conditions = self
            .client
            .fetch_json::<ForecastResponse>(&url, deadline)
            .await
            .and_then(|response| {
                response
                    .current_weather
                    .ok_or_else(|| {
                        LookupError::MalformedResponse("missing current_weather".to_string())
                    })
                    .and_then(CurrentConditions::try_from)
            });

        match conditions {
            Ok(conditions) => Some(conditions),
            Err(e) => {
                warn!("No current weather for {}: {}", location.name, e);
                None
            }
        }
    }

    /// Readable phrase for the observed condition code
    #[must_use]
    pub fn describe(&self, conditions: &CurrentConditions) -> &'static str {
        self.codes.describe(conditions.condition_code)
    }

    /// Build the one-line summary handed back to the user.
    ///
    /// Consumes the conditions: each observation is summarized once.
    #[must_use]
    pub fn summarize(&self, location: &Location, conditions: CurrentConditions) -> String {
        format!(
            "{} in {} ({}): {}, wind {} at {}.",
            self.describe(&conditions),
            location.name,
            location.format_coordinates(),
            conditions.format_temperature(),
            conditions.format_wind(),
            conditions.format_observed_at()
        )
    }
}
