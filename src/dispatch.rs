//! Dispatch orchestrator
//!
//! Per request: validate the question, ask the decider what to do, then
//! either return its direct answer or invoke the chosen tool. Tool output is
//! already written for end users, so it is returned verbatim without a
//! second model pass.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::decision::{DecisionError, DispatchDecision, ModelDecider};
use crate::error::AssistantError;
use crate::tools::{ToolArguments, ToolRegistry, ToolSpec};

/// Routes questions to the model or to registered tools
pub struct Orchestrator {
    registry: ToolRegistry,
    decider: Arc<dyn ModelDecider>,
}

impl Orchestrator {
    /// The registry is frozen from here on
    pub fn new(registry: ToolRegistry, decider: Arc<dyn ModelDecider>) -> Self {
        Self { registry, decider }
    }

    /// Tools exposed to the decider
    #[must_use]
    pub fn tools(&self) -> &[ToolSpec] {
        self.registry.list()
    }

    /// Answer a free-text question.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank question, before the decider is consulted
    /// - `Dispatch` when the decider names an unknown tool, omits a
    ///   required argument or returns unreadable arguments
    /// - `QuotaExceeded` / `Unhandled` for collaborator failures
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<String, AssistantError> {
        if question.trim().is_empty() {
            return Err(AssistantError::validation("Parameter 'q' is required."));
        }

        debug!(stage = "deciding", "Asking model for a dispatch decision");
        let decision = self
            .decider
            .decide(question, self.registry.list())
            .await
            .map_err(|e| {
                error!("Model decision failed: {:#}", e);
                // Unusable decisions are dispatch failures, never quota ones.
                match e.downcast_ref::<DecisionError>() {
                    Some(decision_error) => AssistantError::dispatch(decision_error.to_string()),
                    None => AssistantError::from_upstream(&e),
                }
            })?;

        match decision {
            DispatchDecision::Direct(text) => {
                debug!(stage = "answering", "Model answered directly");
                Ok(text.trim().to_string())
            }
            DispatchDecision::Invoke { tool, arguments } => self.invoke(&tool, &arguments).await,
        }
    }

    /// Invoke a registered tool by name, bypassing the decider.
    ///
    /// # Errors
    ///
    /// `Dispatch` for an unknown tool or missing required argument;
    /// handler failures are classified like decider failures.
    #[instrument(skip(self, arguments))]
    pub async fn invoke(
        &self,
        tool: &str,
        arguments: &ToolArguments,
    ) -> Result<String, AssistantError> {
        let Some(spec) = self.registry.lookup(tool) else {
            warn!("Model requested unknown tool '{}'", tool);
            return Err(AssistantError::dispatch(format!(
                "Model requested unknown tool '{tool}'"
            )));
        };

        let missing = spec.missing_arguments(arguments);
        if !missing.is_empty() {
            warn!("Tool '{}' called without {:?}", tool, missing);
            return Err(AssistantError::dispatch(format!(
                "Tool '{}' is missing required argument(s): {}",
                tool,
                missing.join(", ")
            )));
        }

        info!(stage = "invoking", "Invoking tool {}", tool);
        spec.invoke(arguments).await.map_err(|e| {
            error!("Tool '{}' failed: {:#}", tool, e);
            AssistantError::from_upstream(&e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolHandler, ToolParameter};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted decisions and records every question it sees
    struct ScriptedDecider {
        script: Mutex<Vec<Result<DispatchDecision, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedDecider {
        fn new(script: Vec<Result<DispatchDecision, String>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelDecider for ScriptedDecider {
        async fn decide(&self, _question: &str, tools: &[ToolSpec]) -> Result<DispatchDecision> {
            assert!(!tools.is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().remove(0).map_err(|e| anyhow!(e))
        }
    }

    struct Greeter;

    #[async_trait]
    impl ToolHandler for Greeter {
        async fn invoke(&self, arguments: &ToolArguments) -> Result<String> {
            Ok(format!("Hello, {}!", arguments["name"]))
        }
    }

    struct Failing;

    #[async_trait]
    impl ToolHandler for Failing {
        async fn invoke(&self, _arguments: &ToolArguments) -> Result<String> {
            Err(anyhow!("disk on fire"))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("greet", "Greet someone", Greeter)
                    .with_parameter(ToolParameter::required_string("name", "Who to greet")),
            )
            .unwrap();
        registry
            .register(ToolSpec::new("explode", "Always fails", Failing))
            .unwrap();
        registry
    }

    fn invoke(tool: &str, arguments: &[(&str, &str)]) -> Result<DispatchDecision, String> {
        Ok(DispatchDecision::Invoke {
            tool: tool.to_string(),
            arguments: arguments
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        })
    }

    #[tokio::test]
    async fn test_blank_question_never_reaches_model() {
        let decider = ScriptedDecider::new(vec![]);
        let orchestrator = Orchestrator::new(registry(), decider.clone());

        for question in ["", "   ", "\n\t"] {
            let err = orchestrator.ask(question).await.unwrap_err();
            assert!(matches!(err, AssistantError::Validation { .. }));
        }
        assert_eq!(decider.calls(), 0);
    }

    #[tokio::test]
    async fn test_direct_answer_is_trimmed() {
        let decider =
            ScriptedDecider::new(vec![Ok(DispatchDecision::Direct("  Paris.\n".to_string()))]);
        let orchestrator = Orchestrator::new(registry(), decider.clone());

        let answer = orchestrator.ask("Capital of France?").await.unwrap();
        assert_eq!(answer, "Paris.");
        assert_eq!(decider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_direct_answer_is_success() {
        let decider = ScriptedDecider::new(vec![Ok(DispatchDecision::Direct("   ".to_string()))]);
        let orchestrator = Orchestrator::new(registry(), decider);

        assert_eq!(orchestrator.ask("Say nothing").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_tool_result_is_returned_verbatim() {
        let decider = ScriptedDecider::new(vec![invoke("greet", &[("name", "Ada")])]);
        let orchestrator = Orchestrator::new(registry(), decider);

        assert_eq!(orchestrator.ask("Greet Ada").await.unwrap(), "Hello, Ada!");
    }

    #[tokio::test]
    async fn test_extra_arguments_are_ignored() {
        let decider =
            ScriptedDecider::new(vec![invoke("greet", &[("name", "Ada"), ("tone", "warm")])]);
        let orchestrator = Orchestrator::new(registry(), decider);

        assert_eq!(orchestrator.ask("Greet Ada").await.unwrap(), "Hello, Ada!");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_dispatch_error() {
        let decider = ScriptedDecider::new(vec![invoke("teleport", &[])]);
        let orchestrator = Orchestrator::new(registry(), decider);

        let err = orchestrator.ask("Beam me up").await.unwrap_err();
        assert!(matches!(err, AssistantError::Dispatch { .. }));
        assert!(err.to_string().contains("teleport"));
    }

    #[tokio::test]
    async fn test_missing_required_argument_is_dispatch_error() {
        let decider = ScriptedDecider::new(vec![invoke("greet", &[("nickname", "Ada")])]);
        let orchestrator = Orchestrator::new(registry(), decider);

        let err = orchestrator.ask("Greet someone").await.unwrap_err();
        assert!(matches!(err, AssistantError::Dispatch { .. }));
        assert!(err.to_string().contains("name"));
    }

    #[tokio::test]
    async fn test_quota_failure_from_decider() {
        let decider = ScriptedDecider::new(vec![Err(
            "OpenAI API error: insufficient_quota".to_string()
        )]);
        let orchestrator = Orchestrator::new(registry(), decider);

        let err = orchestrator.ask("Anything").await.unwrap_err();
        assert!(matches!(err, AssistantError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn test_other_decider_failure_is_unhandled() {
        let decider = ScriptedDecider::new(vec![Err("connection reset".to_string())]);
        let orchestrator = Orchestrator::new(registry(), decider);

        let err = orchestrator.ask("Anything").await.unwrap_err();
        assert!(matches!(err, AssistantError::Unhandled { .. }));
        assert_eq!(err.user_message(), "connection reset");
    }

    struct UnreadableDecider;

    #[async_trait]
    impl ModelDecider for UnreadableDecider {
        async fn decide(&self, _question: &str, _tools: &[ToolSpec]) -> Result<DispatchDecision> {
            Err(DecisionError::MalformedArguments {
                tool: "quota_429".to_string(),
            }
            .into())
        }
    }

    #[tokio::test]
    async fn test_unreadable_decision_is_dispatch_error() {
        let orchestrator = Orchestrator::new(registry(), Arc::new(UnreadableDecider));

        let err = orchestrator.ask("Anything").await.unwrap_err();
        assert!(matches!(err, AssistantError::Dispatch { .. }));
        assert!(err.user_message().contains("quota_429"));
    }

    #[tokio::test]
    async fn test_handler_failure_is_caught() {
        let decider = ScriptedDecider::new(vec![invoke("explode", &[])]);
        let orchestrator = Orchestrator::new(registry(), decider);

        let err = orchestrator.ask("Blow up").await.unwrap_err();
        assert!(matches!(err, AssistantError::Unhandled { .. }));
        assert!(err.user_message().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_direct_invoke_bypasses_decider() {
        let decider = ScriptedDecider::new(vec![]);
        let orchestrator = Orchestrator::new(registry(), decider.clone());

        let arguments = ToolArguments::from([("name".to_string(), "Grace".to_string())]);
        assert_eq!(
            orchestrator.invoke("greet", &arguments).await.unwrap(),
            "Hello, Grace!"
        );
        assert_eq!(decider.calls(), 0);
    }
}
