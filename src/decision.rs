//! Model-decision boundary
//!
//! The only place natural-language understanding happens. Given a question
//! and the available tools, a decider either answers directly or names one
//! tool to invoke with its arguments.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::tools::{ToolArguments, ToolSpec};

/// Outcome of asking the model what to do with a question
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchDecision {
    /// Answer the user with this text
    Direct(String),
    /// Invoke a registered tool
    Invoke {
        tool: String,
        arguments: ToolArguments,
    },
}

/// A decision the model produced but that cannot be acted on.
///
/// Carries no model output, so nothing the model wrote can be mistaken for a
/// provider failure further up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    #[error("Model returned unreadable arguments for tool '{tool}'")]
    MalformedArguments { tool: String },
}

/// Strategy that turns a question into a [`DispatchDecision`]
#[async_trait]
pub trait ModelDecider: Send + Sync {
    /// Provider failures come back as plain `anyhow` errors; a reply that
    /// cannot be turned into a decision comes back as a [`DecisionError`].
    async fn decide(&self, question: &str, tools: &[ToolSpec]) -> Result<DispatchDecision>;
}
