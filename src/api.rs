use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::AssistantConfig,
    decision::ModelDecider,
    dispatch::Orchestrator,
    error::AssistantError,
    geocoder::Geocoder,
    lookup::LookupClient,
    tools::{
        self, ToolArguments, ToolSpec, WeatherTool, time::TIME_TOOL_NAME,
        weather::{CITY_ARGUMENT, WEATHER_TOOL_NAME},
    },
    weather::{ConditionCodeTable, WeatherResolver},
};

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wire lookups, tools and the decider together from configuration
    pub fn from_config(config: &AssistantConfig, decider: Arc<dyn ModelDecider>) -> Result<Self> {
        let client = LookupClient::new(&config.lookup.user_agent)?;
        let weather = WeatherTool::new(
            Geocoder::new(client.clone(), &config.lookup.geocoding_base_url),
            WeatherResolver::new(
                client,
                &config.lookup.forecast_base_url,
                ConditionCodeTable::standard(),
            ),
            config.lookup.deadline(),
        );
        let registry = tools::default_registry(weather)?;
        Ok(Self::new(Orchestrator::new(registry, decider)))
    }
}

/// RFC 7807 problem document
#[derive(Debug, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let problem = Problem {
            problem_type: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: self.user_message(),
        };
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(problem),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    pub city: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ask", get(ask))
        .route("/time", get(time))
        .route("/weather", get(weather))
        .route("/tools", get(list_tools))
        .route("/health", get(health))
        .with_state(state)
}

impl From<QueryRejection> for AssistantError {
    fn from(rejection: QueryRejection) -> Self {
        AssistantError::validation(rejection.body_text())
    }
}

async fn ask(
    State(state): State<AppState>,
    params: Result<Query<AskParams>, QueryRejection>,
) -> Result<String, AssistantError> {
    let Query(params) = params?;
    let question = params.q.unwrap_or_default();
    state.orchestrator.ask(&question).await
}

async fn time(State(state): State<AppState>) -> Result<String, AssistantError> {
    state
        .orchestrator
        .invoke(TIME_TOOL_NAME, &ToolArguments::new())
        .await
}

async fn weather(
    State(state): State<AppState>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> Result<String, AssistantError> {
    let Query(params) = params?;
    let city = params
        .city
        .filter(|city| !city.trim().is_empty())
        .ok_or_else(|| AssistantError::validation("Parameter 'city' is required."))?;

    let arguments = ToolArguments::from([(CITY_ARGUMENT.to_string(), city)]);
    state
        .orchestrator
        .invoke(WEATHER_TOOL_NAME, &arguments)
        .await
}

async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolSpec>> {
    Json(state.orchestrator.tools().to_vec())
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
