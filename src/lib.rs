//! Weather assistant
//!
//! A small HTTP front end that either answers a free-text question with a
//! model-generated reply or dispatches it to a registered tool (current
//! time, current weather for a city).

pub mod api;
pub mod config;
pub mod decision;
pub mod dispatch;
pub mod error;
pub mod geocoder;
pub mod lookup;
pub mod models;
pub mod openai;
pub mod telemetry;
pub mod tools;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use config::AssistantConfig;
pub use decision::{DecisionError, DispatchDecision, ModelDecider};
pub use dispatch::Orchestrator;
pub use error::AssistantError;
pub use geocoder::Geocoder;
pub use lookup::{LookupClient, LookupError};
pub use models::{CurrentConditions, Location};
pub use openai::OpenAiDecider;
pub use tools::{ToolRegistry, ToolSpec};
pub use weather::{ConditionCodeTable, WeatherResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
