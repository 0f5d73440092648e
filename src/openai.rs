//! OpenAI chat-completions implementation of [`ModelDecider`]
//!
//! Sends the question together with every registered tool and lets the
//! model choose (`tool_choice: auto`). Also works with OpenAI-compatible
//! endpoints through `base_url`.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use crate::config::ModelConfig;
use crate::decision::{DecisionError, DispatchDecision, ModelDecider};
use crate::tools::{ToolArguments, ToolSpec};

/// OpenAI API client used for dispatch decisions
pub struct OpenAiDecider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    system_prompt: String,
}

impl OpenAiDecider {
    /// Create a decider from model settings and an API key
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn build_request<'a>(&'a self, question: &'a str, tools: &[ToolSpec]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            temperature: self.temperature,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools: tools.iter().map(OpenAiTool::from).collect(),
        }
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAiToolFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolSpec> for OpenAiTool {
    fn from(spec: &ToolSpec) -> Self {
        let properties: Map<String, Value> = spec
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({"type": p.param_type, "description": p.description}),
                )
            })
            .collect();
        let required: Vec<&str> = spec
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        Self {
            tool_type: "function",
            function: OpenAiToolFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

/// Flatten a tool-call argument object into string values.
///
/// Strings are kept verbatim, anything else is rendered as JSON text.
fn parse_arguments(tool: &str, raw: &str) -> Result<ToolArguments, DecisionError> {
    if raw.trim().is_empty() {
        return Ok(ToolArguments::new());
    }
    let object: Map<String, Value> = serde_json::from_str(raw).map_err(|e| {
        warn!("Unreadable arguments for tool '{}': {}", tool, e);
        debug!("Raw tool arguments: {}", raw);
        DecisionError::MalformedArguments {
            tool: tool.to_string(),
        }
    })?;

    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

impl TryFrom<ChatResponse> for DispatchDecision {
    type Error = anyhow::Error;

    fn try_from(response: ChatResponse) -> Result<Self> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenAI response contained no choices"))?
            .message;

        if let Some(call) = message.tool_calls.into_iter().next() {
            return Ok(DispatchDecision::Invoke {
                arguments: parse_arguments(&call.function.name, &call.function.arguments)?,
                tool: call.function.name,
            });
        }

        Ok(DispatchDecision::Direct(message.content.unwrap_or_default()))
    }
}

#[async_trait]
impl ModelDecider for OpenAiDecider {
    #[instrument(skip(self, tools), fields(model = %self.model, tools = tools.len()))]
    async fn decide(&self, question: &str, tools: &[ToolSpec]) -> Result<DispatchDecision> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(question, tools);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("OpenAI API error {}: {}", status, error_text);
            // Status and body are kept verbatim; quota detection reads them.
            return Err(anyhow!("OpenAI API error {}: {}", status, error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;
        let decision = DispatchDecision::try_from(chat)?;
        debug!("Model decision: {:?}", decision);
        Ok(decision)
    }
}
