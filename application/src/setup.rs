//! Adapter setup
//!
//! Turns parsed model slots into a ready [`SessionManager`]. Slots whose
//! sessions cannot be created are reported, not fatal: as long as one slot
//! comes up, the run proceeds with whatever is available.

use crate::ports::llm_gateway::LlmGateway;
use crate::sessions::SessionManager;
use llmux_domain::{DomainError, ModelSpec, ToolDefinition};
use std::sync::Arc;
use tracing::{error, info};

/// What came up and what did not
#[derive(Debug, Default)]
pub struct SetupReport {
    /// Internal ids of slots with a live session
    pub ready_models: Vec<String>,
    /// (display name, error) per slot that failed to come up
    pub failed_models: Vec<(String, String)>,
    /// Tools offered to every session
    pub tool_count: usize,
}

impl SetupReport {
    pub fn all_ready(&self) -> bool {
        self.failed_models.is_empty()
    }
}

/// Builds sessions for every configured model slot
pub struct AdapterSetup {
    gateway: Arc<dyn LlmGateway>,
    tools: Vec<ToolDefinition>,
}

impl AdapterSetup {
    pub fn new(gateway: Arc<dyn LlmGateway>, tools: Vec<ToolDefinition>) -> Self {
        Self { gateway, tools }
    }

    /// Create one isolated session per slot.
    ///
    /// Fails only when no slot at all could be brought up.
    pub async fn initialize(
        self,
        specs: Vec<ModelSpec>,
    ) -> Result<(SessionManager, SetupReport), DomainError> {
        if specs.is_empty() {
            return Err(DomainError::NoModels);
        }

        let mut report = SetupReport {
            tool_count: self.tools.len(),
            ..SetupReport::default()
        };
        let mut manager = SessionManager::new(self.gateway, self.tools);

        for spec in specs {
            let id = spec.internal_id();
            let name = spec.display_name();
            match manager.create(spec).await {
                Ok(()) => report.ready_models.push(id),
                Err(e) => {
                    error!(model = %id, error = %e, "Session setup failed");
                    report.failed_models.push((name, e.to_string()));
                }
            }
        }

        if report.ready_models.is_empty() {
            return Err(DomainError::NoModels);
        }

        info!(
            ready = report.ready_models.len(),
            failed = report.failed_models.len(),
            tools = report.tool_count,
            "Adapter setup complete"
        );
        Ok((manager, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::{LlmSession, SessionError};
    use async_trait::async_trait;
    use llmux_domain::{ConfiguredModel, Message, ModelReply};
    use std::sync::Mutex;

    struct NullSession {
        spec: ModelSpec,
        messages: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl LlmSession for NullSession {
        fn spec(&self) -> &ModelSpec {
            &self.spec
        }

        async fn send(&self, _content: &str) -> Result<ModelReply, SessionError> {
            Ok(ModelReply::new("ok"))
        }

        fn messages(&self) -> Vec<Message> {
            self.messages.lock().unwrap().clone()
        }

        fn push_message(&self, message: Message) {
            self.messages.lock().unwrap().push(message);
        }

        fn reset(&self) -> Result<(), SessionError> {
            self.messages.lock().unwrap().clear();
            Ok(())
        }

        fn clear_log(&self) {
            self.messages.lock().unwrap().clear();
        }
    }

    struct PickyGateway {
        rejects: Vec<String>,
    }

    #[async_trait]
    impl LlmGateway for PickyGateway {
        async fn validate_model(&self, spec: &ModelSpec) -> Result<(), SessionError> {
            if self.rejects.contains(&spec.name().to_string()) {
                return Err(SessionError::ModelNotAvailable(spec.name().to_string()));
            }
            Ok(())
        }

        async fn create_session(
            &self,
            spec: &ModelSpec,
            _tools: &[ToolDefinition],
        ) -> Result<Box<dyn LlmSession>, SessionError> {
            if self.rejects.contains(&spec.name().to_string()) {
                return Err(SessionError::ModelNotAvailable(spec.name().to_string()));
            }
            Ok(Box::new(NullSession {
                spec: spec.clone(),
                messages: Mutex::new(Vec::new()),
            }))
        }
    }

    #[tokio::test]
    async fn partial_failure_still_comes_up() {
        let gateway = Arc::new(PickyGateway {
            rejects: vec!["missing".into()],
        });
        let specs = ModelSpec::parse_all(&[
            ConfiguredModel::new("gpt-x"),
            ConfiguredModel::new("missing"),
        ]);

        let (manager, report) = AdapterSetup::new(gateway, Vec::new())
            .initialize(specs)
            .await
            .unwrap();

        assert_eq!(report.ready_models, vec!["gpt-x"]);
        assert_eq!(report.failed_models.len(), 1);
        assert!(report.failed_models[0].1.contains("missing"));
        assert_eq!(manager.specs().len(), 1);
    }

    #[tokio::test]
    async fn no_slots_at_all_is_an_error() {
        let gateway = Arc::new(PickyGateway { rejects: vec![] });
        let result = AdapterSetup::new(gateway, Vec::new())
            .initialize(Vec::new())
            .await;
        assert!(matches!(result, Err(DomainError::NoModels)));
    }

    #[tokio::test]
    async fn all_slots_failing_is_an_error() {
        let gateway = Arc::new(PickyGateway {
            rejects: vec!["a".into(), "b".into()],
        });
        let specs =
            ModelSpec::parse_all(&[ConfiguredModel::new("a"), ConfiguredModel::new("b")]);
        let result = AdapterSetup::new(gateway, Vec::new()).initialize(specs).await;
        assert!(matches!(result, Err(DomainError::NoModels)));
    }
}
