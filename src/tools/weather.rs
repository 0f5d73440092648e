//! Current weather tool
//!
//! Two dependent lookups: the city name is geocoded first, then the
//! forecast service is asked for current conditions at those coordinates.
//! Either stage may come back empty; the tool answers with a readable
//! sentence in every case instead of failing.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument};

use super::{ToolArguments, ToolHandler, ToolParameter, ToolSpec};
use crate::geocoder::Geocoder;
use crate::weather::WeatherResolver;

pub const WEATHER_TOOL_NAME: &str = "current_weather";
pub const CITY_ARGUMENT: &str = "city";

#[derive(Debug, Clone)]
pub struct WeatherTool {
    geocoder: Geocoder,
    resolver: WeatherResolver,
    deadline: Duration,
}

impl WeatherTool {
    /// `deadline` bounds each of the two lookups separately
    pub fn new(geocoder: Geocoder, resolver: WeatherResolver, deadline: Duration) -> Self {
        Self {
            geocoder,
            resolver,
            deadline,
        }
    }

    #[must_use]
    pub fn into_spec(self) -> ToolSpec {
        ToolSpec::new(
            WEATHER_TOOL_NAME,
            "Get the current weather for a city name using the Open-Meteo API.",
            self,
        )
        .with_parameter(ToolParameter::required_string(
            CITY_ARGUMENT,
            "City to look up, e.g. London or Seattle.",
        ))
    }

    /// Describe the current weather in `city`
    #[instrument(skip(self))]
    pub async fn current_weather(&self, city: &str) -> String {
        if city.trim().is_empty() {
            return "Please provide a city name.".to_string();
        }

        let Some(location) = self.geocoder.resolve(city, self.deadline).await else {
            return format!("I could not find a location for '{city}'.");
        };

        let Some(conditions) = self
            .resolver
            .current_conditions_for(&location, self.deadline)
            .await
        else {
            return format!("I couldn't fetch weather data for {}.", location.name);
        };

        let summary = self.resolver.summarize(&location, conditions);
        info!("Weather summary: {}", summary);
        summary
    }
}

#[async_trait]
impl ToolHandler for WeatherTool {
    async fn invoke(&self, arguments: &ToolArguments) -> Result<String> {
        let city = arguments.get(CITY_ARGUMENT).map(String::as_str).unwrap_or_default();
        Ok(self.current_weather(city).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{DEFAULT_USER_AGENT, LookupClient};
    use crate::weather::ConditionCodeTable;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(server: &MockServer, deadline: Duration) -> WeatherTool {
        let client = LookupClient::new(DEFAULT_USER_AGENT).unwrap();
        WeatherTool::new(
            Geocoder::new(client.clone(), format!("{}/geo", server.uri())),
            WeatherResolver::new(
                client,
                format!("{}/wx", server.uri()),
                ConditionCodeTable::standard(),
            ),
            deadline,
        )
    }

    async fn mount_london_geocoding(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/geo/search"))
            .and(query_param("name", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"name": "London", "latitude": 51.51, "longitude": -0.13}]
            })))
            .mount(server)
            .await;
    }

    async fn mount_london_forecast(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/wx/forecast"))
            .and(query_param("latitude", "51.51"))
            .and(query_param("longitude", "-0.13"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current_weather": {
                    "temperature": 15.2,
                    "windspeed": 10.4,
                    "weathercode": 2,
                    "time": "2024-01-01T12:00"
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_london_summary() {
        let server = MockServer::start().await;
        mount_london_geocoding(&server).await;
        mount_london_forecast(&server).await;

        let answer = tool(&server, Duration::from_secs(5))
            .current_weather("London")
            .await;
        assert_eq!(
            answer,
            "Partly cloudy in London (51.51, -0.13): 15.2°C, wind 10.4 km/h at 2024-01-01T12:00Z."
        );
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let server = MockServer::start().await;
        mount_london_geocoding(&server).await;
        mount_london_forecast(&server).await;

        let tool = tool(&server, Duration::from_secs(5));
        let first = tool.current_weather("London").await;
        let second = tool.current_weather("London").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_city_skips_forecast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wx/forecast"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let answer = tool(&server, Duration::from_secs(5))
            .current_weather("Zzzznotacity")
            .await;
        assert_eq!(answer, "I could not find a location for 'Zzzznotacity'.");
    }

    #[tokio::test]
    async fn test_forecast_timeout_names_resolved_location() {
        let server = MockServer::start().await;
        mount_london_geocoding(&server).await;
        Mock::given(method("GET"))
            .and(path("/wx/forecast"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let answer = tool(&server, Duration::from_millis(200))
            .current_weather("London")
            .await;
        assert_eq!(answer, "I couldn't fetch weather data for London.");
    }

    #[tokio::test]
    async fn test_blank_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = tool(&server, Duration::from_secs(5));
        assert_eq!(tool.current_weather("  ").await, "Please provide a city name.");
        assert_eq!(
            tool.invoke(&ToolArguments::new()).await.unwrap(),
            "Please provide a city name."
        );
    }

    #[tokio::test]
    async fn test_spec_schema() {
        let server = MockServer::start().await;
        let spec = tool(&server, Duration::from_secs(5)).into_spec();
        assert_eq!(spec.name, WEATHER_TOOL_NAME);
        assert_eq!(spec.parameters.len(), 1);
        assert_eq!(spec.parameters[0].name, CITY_ARGUMENT);
        assert!(spec.parameters[0].required);
    }
}
