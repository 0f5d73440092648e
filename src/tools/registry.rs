//! Tool registry
//!
//! Tools are registered once at startup. After that the registry is only
//! read, so it can be shared between requests without locking.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::AssistantError;

/// Arguments passed to a tool, keyed by parameter name
pub type ToolArguments = HashMap<String, String>;

/// Something a registered tool runs when it is invoked
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. The orchestrator has already checked required arguments.
    async fn invoke(&self, arguments: &ToolArguments) -> Result<String>;
}

/// Declared type of a tool parameter, as exposed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
}

/// One parameter in a tool's schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub description: String,
    pub required: bool,
}

impl ToolParameter {
    /// A required string parameter
    pub fn required_string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::String,
            description: description.into(),
            required: true,
        }
    }
}

/// A named, schema-described callable
#[derive(Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    #[serde(skip)]
    handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Append a parameter; order is preserved in the exposed schema
    #[must_use]
    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Names of required parameters missing from `arguments`.
    ///
    /// Undeclared extra arguments are tolerated and only logged.
    #[must_use]
    pub fn missing_arguments(&self, arguments: &ToolArguments) -> Vec<&str> {
        let declared: BTreeSet<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        let extras: Vec<&String> = arguments
            .keys()
            .filter(|key| !declared.contains(key.as_str()))
            .collect();
        if !extras.is_empty() {
            debug!("Ignoring undeclared arguments for {}: {:?}", self.name, extras);
        }

        self.parameters
            .iter()
            .filter(|p| p.required && !arguments.contains_key(&p.name))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Run the tool's handler
    pub async fn invoke(&self, arguments: &ToolArguments) -> Result<String> {
        self.handler.invoke(arguments).await
    }
}

/// Registry of tools the dispatch layer may invoke
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a tool with the same name exists.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), AssistantError> {
        if self.index.contains_key(&spec.name) {
            return Err(AssistantError::config(format!(
                "Tool '{}' is already registered",
                spec.name
            )));
        }
        debug!("Registering tool {}", spec.name);
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(spec);
        Ok(())
    }

    /// Look up a tool by name
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in registration order
    #[must_use]
    pub fn list(&self) -> &[ToolSpec] {
        &self.tools
    }
}
