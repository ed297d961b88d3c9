//! Session manager
//!
//! Arena-style storage of isolated sessions keyed by the ModelSpec's
//! internal identifier, never by bare model name, so two slots configured
//! with the same model never alias each other's conversation state.

use crate::ports::llm_gateway::{LlmGateway, LlmSession, SessionError};
use crate::router::ModalityRouter;
use llmux_domain::{DomainError, ModelReply, ModelSpec, Prompt, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Owns one isolated session per configured model slot
pub struct SessionManager {
    gateway: Arc<dyn LlmGateway>,
    tools: Vec<ToolDefinition>,
    specs: Vec<ModelSpec>,
    sessions: RwLock<HashMap<String, Arc<dyn LlmSession>>>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn LlmGateway>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            gateway,
            tools,
            specs: Vec::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Build an isolated session for one model slot and record it under the
    /// slot's internal identifier. Local providers are validated first.
    pub async fn create(&mut self, spec: ModelSpec) -> Result<(), SessionError> {
        if spec.provider().is_local() {
            self.gateway.validate_model(&spec).await?;
        }
        let session = self.gateway.create_session(&spec, &self.tools).await?;
        info!(
            model = %spec.internal_id(),
            provider = %spec.provider(),
            "Session created"
        );
        self.sessions
            .write()
            .await
            .insert(spec.internal_id(), Arc::from(session));
        self.specs.push(spec);
        Ok(())
    }

    /// Model slots with a live session, in configuration order
    pub fn specs(&self) -> &[ModelSpec] {
        &self.specs
    }

    pub fn spec(&self, internal_id: &str) -> Option<&ModelSpec> {
        self.specs.iter().find(|s| s.internal_id() == internal_id)
    }

    pub async fn session(&self, internal_id: &str) -> Option<Arc<dyn LlmSession>> {
        self.sessions.read().await.get(internal_id).cloned()
    }

    /// Forward one turn to the named session via the modality router.
    ///
    /// `Err` carries the normalized user-facing error string.
    pub async fn ask(&self, internal_id: &str, prompt: &Prompt) -> Result<ModelReply, String> {
        let Some(spec) = self.spec(internal_id) else {
            return Err(DomainError::UnknownModel(internal_id.to_string()).to_string());
        };
        let Some(session) = self.session(internal_id).await else {
            return Err(format!("No session for model: {}", internal_id));
        };
        ModalityRouter::route(spec, session.as_ref(), prompt).await
    }

    /// Discard the named session's conversation history.
    ///
    /// Tries an in-place reset first; on failure recreates the session from
    /// scratch preserving the model/provider binding; if recreation itself
    /// fails, clears only the message log of the existing session. Never
    /// fails - worst case it logs and leaves the old log cleared.
    pub async fn clear(&self, internal_id: &str) -> String {
        let Some(session) = self.session(internal_id).await else {
            return format!("No session for model: {}", internal_id);
        };

        match session.reset() {
            Ok(()) => return format!("Conversation for {} cleared", internal_id),
            Err(e) => {
                warn!(
                    model = %internal_id,
                    error = %e,
                    "In-place reset failed, recreating session"
                );
            }
        }

        let Some(spec) = self.spec(internal_id) else {
            session.clear_log();
            return format!("Conversation log for {} cleared", internal_id);
        };

        match self.gateway.create_session(spec, &self.tools).await {
            Ok(fresh) => {
                self.sessions
                    .write()
                    .await
                    .insert(internal_id.to_string(), Arc::from(fresh));
                format!("Conversation for {} cleared (session recreated)", internal_id)
            }
            Err(e) => {
                warn!(
                    model = %internal_id,
                    error = %e,
                    "Session recreation failed, clearing message log only"
                );
                session.clear_log();
                format!("Conversation log for {} cleared", internal_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::SessionError;
    use async_trait::async_trait;
    use llmux_domain::{ConfiguredModel, Message};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockSession {
        spec: ModelSpec,
        messages: Mutex<Vec<Message>>,
        reset_fails: bool,
    }

    #[async_trait]
    impl LlmSession for MockSession {
        fn spec(&self) -> &ModelSpec {
            &self.spec
        }

        async fn send(&self, content: &str) -> Result<ModelReply, SessionError> {
            let mut log = self.messages.lock().unwrap();
            log.push(Message::user(content));
            let context: Vec<String> = log.iter().map(|m| m.content.clone()).collect();
            log.push(Message::assistant("ok"));
            Ok(ModelReply::new(context.join("|")))
        }

        fn messages(&self) -> Vec<Message> {
            self.messages.lock().unwrap().clone()
        }

        fn push_message(&self, message: Message) {
            self.messages.lock().unwrap().push(message);
        }

        fn reset(&self) -> Result<(), SessionError> {
            if self.reset_fails {
                return Err(SessionError::Other("cannot reset".into()));
            }
            self.messages.lock().unwrap().clear();
            Ok(())
        }

        fn clear_log(&self) {
            self.messages.lock().unwrap().clear();
        }
    }

    struct MockGateway {
        reset_fails: bool,
        create_fails: AtomicBool,
        created: AtomicUsize,
    }

    impl MockGateway {
        fn new() -> Self {
            Self {
                reset_fails: false,
                create_fails: AtomicBool::new(false),
                created: AtomicUsize::new(0),
            }
        }

        fn with_failing_reset() -> Self {
            Self {
                reset_fails: true,
                create_fails: AtomicBool::new(false),
                created: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmGateway for MockGateway {
        async fn validate_model(&self, _spec: &ModelSpec) -> Result<(), SessionError> {
            Ok(())
        }

        async fn create_session(
            &self,
            spec: &ModelSpec,
            _tools: &[ToolDefinition],
        ) -> Result<Box<dyn LlmSession>, SessionError> {
            if self.create_fails.load(Ordering::SeqCst) {
                return Err(SessionError::ConnectionError("gateway down".into()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockSession {
                spec: spec.clone(),
                messages: Mutex::new(Vec::new()),
                reset_fails: self.reset_fails,
            }))
        }
    }

    async fn manager_with(gateway: MockGateway, identifiers: &[&str]) -> SessionManager {
        let configured: Vec<ConfiguredModel> =
            identifiers.iter().map(|s| ConfiguredModel::new(*s)).collect();
        let mut manager = SessionManager::new(Arc::new(gateway), Vec::new());
        for spec in ModelSpec::parse_all(&configured) {
            manager.create(spec).await.unwrap();
        }
        manager
    }

    #[tokio::test]
    async fn duplicate_models_get_isolated_sessions() {
        let manager = manager_with(MockGateway::new(), &["gpt-x", "gpt-x"]).await;

        manager.ask("gpt-x", &Prompt::text("first")).await.unwrap();
        let other = manager.ask("gpt-x#2", &Prompt::text("second")).await.unwrap();

        // The second slot's context never saw the first slot's turn
        assert_eq!(other.content, "second");
    }

    #[tokio::test]
    async fn clear_then_ask_drops_prior_context() {
        let manager = manager_with(MockGateway::new(), &["gpt-x"]).await;

        manager.ask("gpt-x", &Prompt::text("before")).await.unwrap();
        let confirmation = manager.clear("gpt-x").await;
        assert!(confirmation.contains("cleared"));

        let reply = manager.ask("gpt-x", &Prompt::text("hello")).await.unwrap();
        assert!(!reply.content.contains("before"));
        assert_eq!(reply.content, "hello");
    }

    #[tokio::test]
    async fn clear_recreates_session_when_reset_fails() {
        let manager = manager_with(MockGateway::with_failing_reset(), &["gpt-x"]).await;

        manager.ask("gpt-x", &Prompt::text("before")).await.unwrap();
        let confirmation = manager.clear("gpt-x").await;
        assert!(confirmation.contains("recreated"));

        let reply = manager.ask("gpt-x", &Prompt::text("after")).await.unwrap();
        assert!(!reply.content.contains("before"));
    }

    #[tokio::test]
    async fn clear_falls_back_to_log_clear_when_recreation_fails() {
        let gateway = Arc::new(MockGateway::with_failing_reset());
        let mut manager = SessionManager::new(gateway.clone(), Vec::new());
        for spec in ModelSpec::parse_all(&[ConfiguredModel::new("gpt-x")]) {
            manager.create(spec).await.unwrap();
        }

        manager.ask("gpt-x", &Prompt::text("before")).await.unwrap();
        let session = manager.session("gpt-x").await.unwrap();

        // Break recreation after initial setup
        gateway.create_fails.store(true, Ordering::SeqCst);

        let confirmation = manager.clear("gpt-x").await;
        assert!(confirmation.contains("log"));
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn ask_unknown_model_is_an_error_string() {
        let manager = manager_with(MockGateway::new(), &["gpt-x"]).await;
        let err = manager.ask("missing", &Prompt::text("hi")).await.unwrap_err();
        assert_eq!(err, "Unknown model spec: missing");
    }
}
