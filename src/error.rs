//! Error types and handling for the weather assistant

use axum::http::StatusCode;
use thiserror::Error;

/// Remediation shown to callers when the model provider reports quota exhaustion
pub const QUOTA_REMEDIATION: &str = "Your OpenAI account has exceeded its quota or has insufficient credits. Please check your billing details at https://platform.openai.com/account/billing";

/// Substrings that identify a quota or rate-limit failure from the model provider
const QUOTA_SIGNATURES: [&str; 3] = ["429", "insufficient_quota", "quota"];

/// Main error type for the weather assistant
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Bad or missing user input
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Startup configuration errors (bad settings, duplicate tool names)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The decision collaborator asked for a tool call the registry cannot honor
    #[error("Dispatch error: {message}")]
    Dispatch { message: String },

    /// The model provider reported that the account quota is exhausted
    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    /// Anything else raised by a collaborator
    #[error("{message}")]
    Unhandled { message: String },
}

impl AssistantError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new dispatch error
    pub fn dispatch<S: Into<String>>(message: S) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Classify a failure raised by the decision collaborator or a tool handler.
    ///
    /// Quota signatures become [`AssistantError::QuotaExceeded`], everything
    /// else is passed through as [`AssistantError::Unhandled`].
    pub fn from_upstream(error: &anyhow::Error) -> Self {
        // Alternate formatting includes the whole context chain.
        let message = format!("{error:#}");
        if is_quota_exhausted(&message) {
            Self::QuotaExceeded { message }
        } else {
            Self::Unhandled { message }
        }
    }

    /// HTTP status used when this error reaches the boundary layer
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AssistantError::Validation { .. } => StatusCode::BAD_REQUEST,
            AssistantError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AssistantError::Configuration { .. }
            | AssistantError::Dispatch { .. }
            | AssistantError::Unhandled { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short problem title
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            AssistantError::Validation { .. } => "Invalid request",
            AssistantError::QuotaExceeded { .. } => "Quota Exceeded",
            AssistantError::Configuration { .. } => "Configuration error",
            AssistantError::Dispatch { .. } | AssistantError::Unhandled { .. } => {
                "Error processing request"
            }
        }
    }

    /// Get a user-facing detail message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AssistantError::QuotaExceeded { .. } => QUOTA_REMEDIATION.to_string(),
            AssistantError::Validation { message }
            | AssistantError::Configuration { message }
            | AssistantError::Dispatch { message }
            | AssistantError::Unhandled { message } => message.clone(),
        }
    }
}

/// Returns true when an upstream error message carries a quota signature.
///
/// The provider does not expose a structured quota flag, so this is the one
/// place that knows its error wording.
#[must_use]
pub fn is_quota_exhausted(message: &str) -> bool {
    QUOTA_SIGNATURES
        .iter()
        .any(|signature| message.contains(signature))
}
