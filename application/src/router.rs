//! Modality router
//!
//! Inspects a model's declared modality set and the prompt's shape, selects
//! exactly one chat operation, and invokes the session accordingly. Provider
//! failures are intercepted by the crash handler (which repairs the message
//! log) and normalized into a `Tool error: ...` string; "no matching
//! modality" is an error result, never a panic or propagated error.

use crate::ports::llm_gateway::LlmSession;
use crate::repair::handle_tool_crash;
use llmux_domain::{ChatOperation, DomainError, ModelReply, ModelSpec, Prompt};
use tracing::debug;

pub struct ModalityRouter;

impl ModalityRouter {
    /// Route one turn to the right session operation.
    ///
    /// `Err` carries the normalized user-facing error string for the turn.
    pub async fn route(
        spec: &ModelSpec,
        session: &dyn LlmSession,
        prompt: &Prompt,
    ) -> Result<ModelReply, String> {
        let Some(operation) = ChatOperation::select(spec.modalities(), prompt) else {
            return Err(DomainError::NoMatchingModality {
                model: spec.internal_id(),
                supported: spec.modalities().describe(),
            }
            .to_string());
        };

        debug!(
            model = %spec.internal_id(),
            operation = %operation,
            "Routing turn"
        );

        let result = match operation {
            ChatOperation::TextToText => session.send(prompt.text_payload()).await,
            ChatOperation::ImageToText => {
                // select() only picks this when an image path is present
                let image = prompt.image_path().unwrap_or_default();
                session.send_image(&image, prompt.text_payload()).await
            }
            ChatOperation::TextToImage => session.generate_image(prompt.text_payload()).await,
            ChatOperation::TextToAudio => session.generate_audio(prompt.text_payload()).await,
            ChatOperation::AudioToText => {
                let audio = prompt.audio_path().unwrap_or_default();
                session.transcribe(&audio).await
            }
        };

        result.map_err(|e| handle_tool_crash(session, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::SessionError;
    use async_trait::async_trait;
    use llmux_domain::{ConfiguredModel, Message, Modality, ModalitySet};
    use std::sync::Mutex;

    struct RecordingSession {
        spec: ModelSpec,
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSession {
        fn new(modalities: ModalitySet) -> Self {
            let spec = ModelSpec::parse_all(&[ConfiguredModel::new("gpt-x")])
                .pop()
                .unwrap()
                .with_modalities(modalities);
            Self {
                spec,
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing(modalities: ModalitySet) -> Self {
            let mut s = Self::new(modalities);
            s.fail = true;
            s
        }

        fn record(&self, op: &str) -> Result<ModelReply, SessionError> {
            self.calls.lock().unwrap().push(op.to_string());
            if self.fail {
                Err(SessionError::RequestFailed("backend down".into()))
            } else {
                Ok(ModelReply::new(op))
            }
        }
    }

    #[async_trait]
    impl LlmSession for RecordingSession {
        fn spec(&self) -> &ModelSpec {
            &self.spec
        }

        async fn send(&self, _content: &str) -> Result<ModelReply, SessionError> {
            self.record("send")
        }

        async fn generate_image(&self, _content: &str) -> Result<ModelReply, SessionError> {
            self.record("generate_image")
        }

        fn messages(&self) -> Vec<Message> {
            Vec::new()
        }

        fn push_message(&self, _message: Message) {}

        fn reset(&self) -> Result<(), SessionError> {
            Ok(())
        }

        fn clear_log(&self) {}
    }

    #[tokio::test]
    async fn text_prompt_routes_to_send() {
        let session = RecordingSession::new(ModalitySet::text_only());
        let reply = ModalityRouter::route(session.spec(), &session, &Prompt::text("hi"))
            .await
            .unwrap();
        assert_eq!(reply.content, "send");
    }

    #[tokio::test]
    async fn image_output_model_routes_to_generate_image() {
        let session = RecordingSession::new(ModalitySet::new(
            vec![Modality::Text],
            vec![Modality::Image],
        ));
        let reply = ModalityRouter::route(session.spec(), &session, &Prompt::text("a cat"))
            .await
            .unwrap();
        assert_eq!(reply.content, "generate_image");
    }

    #[tokio::test]
    async fn no_matching_modality_is_an_error_result() {
        let session = RecordingSession::new(ModalitySet::new(
            vec![Modality::Audio],
            vec![Modality::Text],
        ));
        let err = ModalityRouter::route(session.spec(), &session, &Prompt::text("hi"))
            .await
            .unwrap_err();
        assert!(err.contains("No modality"));
        assert!(err.contains("gpt-x"));
        assert!(session.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_normalized() {
        let session = RecordingSession::failing(ModalitySet::text_only());
        let err = ModalityRouter::route(session.spec(), &session, &Prompt::text("hi"))
            .await
            .unwrap_err();
        assert!(err.starts_with("Tool error: RequestFailed:"));
        assert!(err.contains("backend down"));
    }

    #[tokio::test]
    async fn unsupported_default_operation_is_normalized_too() {
        // Session declares audio output but has no generate_audio override
        let session = RecordingSession::new(ModalitySet::new(
            vec![Modality::Text],
            vec![Modality::Audio],
        ));
        let err = ModalityRouter::route(session.spec(), &session, &Prompt::text("say hi"))
            .await
            .unwrap_err();
        assert!(err.starts_with("Tool error: UnsupportedOperation:"));
    }
}
