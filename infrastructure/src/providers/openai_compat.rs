//! OpenAI-compatible provider adapter
//!
//! Every configured provider, hosted or local, speaks the chat-completions
//! JSON dialect, so one gateway covers them all. The wire handling stays
//! deliberately thin; the adapter's job is session isolation, the tool loop,
//! and mapping provider errors into session errors, not protocol coverage.
//!
//! Each session owns its message log behind a `std::sync::Mutex`. The lock
//! is only held to snapshot or append, never across an await.

use super::validation;
use async_trait::async_trait;
use base64::Engine;
use llmux_application::{
    ports::llm_gateway::{LlmGateway, LlmSession, SessionError},
    ToolRouter,
};
use llmux_domain::{
    Message, ModelReply, ModelSpec, ProviderEnv, Role, TokenUsage, ToolCallRef, ToolDefinition,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

/// Upper bound on tool rounds within one user turn
const MAX_TOOL_ROUNDS: usize = 8;

/// Gateway over any chat-completions-shaped HTTP API
pub struct HttpLlmGateway {
    client: reqwest::Client,
    env: ProviderEnv,
    tool_router: Arc<ToolRouter>,
}

impl HttpLlmGateway {
    pub fn new(env: ProviderEnv, tool_router: Arc<ToolRouter>) -> Self {
        Self {
            client: reqwest::Client::new(),
            env,
            tool_router,
        }
    }
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    async fn validate_model(&self, spec: &ModelSpec) -> Result<(), SessionError> {
        if !spec.provider().is_local() {
            return Ok(());
        }
        validation::validate_local_model(&self.client, &self.env, spec).await
    }

    async fn create_session(
        &self,
        spec: &ModelSpec,
        tools: &[ToolDefinition],
    ) -> Result<Box<dyn LlmSession>, SessionError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            spec: spec.clone(),
            api_base: self.env.api_base(spec.provider()),
            api_key: self.env.api_key(spec.provider()).map(String::from),
            tools: tools.to_vec(),
            tool_router: Arc::clone(&self.tool_router),
            messages: Mutex::new(Vec::new()),
        }))
    }
}

/// One isolated conversation against one provider/model binding
pub struct HttpSession {
    client: reqwest::Client,
    spec: ModelSpec,
    api_base: String,
    api_key: Option<String>,
    tools: Vec<ToolDefinition>,
    tool_router: Arc<ToolRouter>,
    messages: Mutex<Vec<Message>>,
}

impl HttpSession {
    /// Endpoint under the provider's `/v1` API surface.
    ///
    /// Local bases may or may not carry the `/v1` segment (Ollama's does
    /// not, its OpenAI-compatible surface lives under it).
    fn endpoint(&self, path: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}{}", base, path)
        } else {
            format!("{}/v1{}", base, path)
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn wire_tools(&self) -> Option<Vec<Value>> {
        if self.tools.is_empty() {
            return None;
        }
        Some(
            self.tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        )
    }

    /// Serialize the message log into chat-completions wire messages.
    ///
    /// `final_override` replaces the wire form of the last message, used to
    /// attach an image part while the log keeps plain text.
    fn wire_messages(&self, final_override: Option<Value>) -> Vec<Value> {
        let log = self.messages.lock().unwrap_or_else(|p| p.into_inner());
        let mut wire: Vec<Value> = log.iter().map(wire_message).collect();
        if let (Some(replacement), Some(last)) = (final_override, wire.last_mut()) {
            *last = replacement;
        }
        wire
    }

    fn push(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(message);
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, SessionError> {
        let url = self.endpoint(path);
        debug!(model = %self.spec.internal_id(), url = %url, "Provider request");

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let payload = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, &payload, self.spec.name()));
        }
        serde_json::from_str(&payload)
            .map_err(|e| SessionError::RequestFailed(format!("Malformed provider response: {}", e)))
    }

    /// One chat-completions round trip over the current log.
    async fn complete(&self, image_override: Option<Value>) -> Result<ChatChoice, SessionError> {
        let mut body = json!({
            "model": self.spec.name(),
            "messages": self.wire_messages(image_override),
        });
        if let Some(tools) = self.wire_tools() {
            body["tools"] = Value::Array(tools);
        }

        let payload = self.post_json("/chat/completions", body).await?;
        let parsed: ChatCompletionResponse = serde_json::from_value(payload).map_err(|e| {
            SessionError::RequestFailed(format!("Malformed chat completion: {}", e))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::RequestFailed("Empty choices in response".into()))?;

        Ok(ChatChoice {
            message: choice.message,
            usage: parsed.usage,
        })
    }

    /// Drive the turn to completion, executing tool calls between rounds.
    ///
    /// A failed tool invocation aborts the turn with `ToolFailed`, leaving
    /// the emitted tool-call ids unanswered in the log; the repair pass
    /// appends their error results before the next turn.
    async fn run_turn(&self, image_override: Option<Value>) -> Result<ModelReply, SessionError> {
        let started = Instant::now();
        let mut override_slot = image_override;
        let mut usage: Option<TokenUsage> = None;

        for _ in 0..MAX_TOOL_ROUNDS {
            let choice = self.complete(override_slot.take()).await?;
            if let Some(u) = choice.usage.as_ref() {
                let round = TokenUsage::new(u.prompt_tokens, u.completion_tokens);
                usage = Some(match usage {
                    Some(acc) => TokenUsage::new(
                        acc.input_tokens + round.input_tokens,
                        acc.output_tokens + round.output_tokens,
                    ),
                    None => round,
                });
            }

            let content = choice.message.content.clone().unwrap_or_default();
            let calls = choice.message.tool_calls.unwrap_or_default();
            if calls.is_empty() {
                self.push(Message::assistant(content.clone()));
                let mut reply = ModelReply::new(content)
                    .with_latency_ms(started.elapsed().as_millis() as u64);
                if let Some(u) = usage {
                    reply = reply.with_usage(u);
                }
                return Ok(reply);
            }

            let refs: Vec<ToolCallRef> = calls
                .iter()
                .map(|c| {
                    ToolCallRef::new(c.id.clone(), c.function.name.clone())
                        .with_arguments(c.function.arguments.clone())
                })
                .collect();
            self.push(Message::assistant_with_tool_calls(content, refs));

            for call in &calls {
                let arguments: Value = if call.function.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        SessionError::ToolFailed {
                            tool: call.function.name.clone(),
                            message: format!("Invalid arguments: {}", e),
                        }
                    })?
                };

                debug!(
                    model = %self.spec.internal_id(),
                    tool = %call.function.name,
                    "Executing tool call"
                );
                let result = self
                    .tool_router
                    .invoke(&call.function.name, arguments)
                    .await
                    .map_err(|e| SessionError::ToolFailed {
                        tool: call.function.name.clone(),
                        message: e.to_string(),
                    })?;
                self.push(Message::tool(result, call.id.clone()));
            }
        }

        warn!(model = %self.spec.internal_id(), "Tool round limit reached");
        Err(SessionError::RequestFailed(
            "Tool call loop exceeded the round limit".into(),
        ))
    }

    /// Write generated bytes next to the system temp dir and return the path.
    async fn save_artifact(&self, extension: &str, bytes: &[u8]) -> Result<String, SessionError> {
        let name = format!(
            "llmux-{}-{}.{}",
            self.spec.name().replace('/', "-"),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            extension
        );
        let path = std::env::temp_dir().join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SessionError::Other(format!("Failed to save output: {}", e)))?;
        Ok(path.display().to_string())
    }
}

#[async_trait]
impl LlmSession for HttpSession {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    async fn send(&self, content: &str) -> Result<ModelReply, SessionError> {
        self.push(Message::user(content));
        self.run_turn(None).await
    }

    async fn send_image(&self, image_path: &str, content: &str) -> Result<ModelReply, SessionError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| SessionError::Other(format!("Cannot read {}: {}", image_path, e)))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let data_url = format!("data:{};base64,{}", guess_image_mime(image_path), encoded);

        // The log keeps the plain text; only the wire form carries the image.
        self.push(Message::user(content));
        let override_message = json!({
            "role": "user",
            "content": [
                { "type": "text", "text": content },
                { "type": "image_url", "image_url": { "url": data_url } }
            ]
        });
        self.run_turn(Some(override_message)).await
    }

    async fn generate_image(&self, content: &str) -> Result<ModelReply, SessionError> {
        let started = Instant::now();
        let payload = self
            .post_json(
                "/images/generations",
                json!({
                    "model": self.spec.name(),
                    "prompt": content,
                    "n": 1,
                }),
            )
            .await?;

        let first = payload
            .get("data")
            .and_then(Value::as_array)
            .and_then(|d| d.first())
            .ok_or_else(|| SessionError::RequestFailed("Empty image response".into()))?;

        let content = if let Some(url) = first.get("url").and_then(Value::as_str) {
            url.to_string()
        } else if let Some(b64) = first.get("b64_json").and_then(Value::as_str) {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| SessionError::RequestFailed(format!("Bad image payload: {}", e)))?;
            self.save_artifact("png", &bytes).await?
        } else {
            return Err(SessionError::RequestFailed(
                "Image response carried neither url nor data".into(),
            ));
        };

        Ok(ModelReply::new(content).with_latency_ms(started.elapsed().as_millis() as u64))
    }

    async fn generate_audio(&self, content: &str) -> Result<ModelReply, SessionError> {
        let started = Instant::now();
        let url = self.endpoint("/audio/speech");
        let response = self
            .authorized(self.client.post(&url))
            .json(&json!({
                "model": self.spec.name(),
                "input": content,
                "voice": "alloy",
            }))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body, self.spec.name()));
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let path = self.save_artifact("mp3", &bytes).await?;
        Ok(ModelReply::new(path).with_latency_ms(started.elapsed().as_millis() as u64))
    }

    async fn transcribe(&self, audio_path: &str) -> Result<ModelReply, SessionError> {
        let started = Instant::now();
        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| SessionError::Other(format!("Cannot read {}: {}", audio_path, e)))?;

        let file_name = std::path::Path::new(audio_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let form = reqwest::multipart::Form::new()
            .text("model", self.spec.name().to_string())
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let url = self.endpoint("/audio/transcriptions");
        let response = self
            .authorized(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let payload = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, &payload, self.spec.name()));
        }

        let parsed: Value = serde_json::from_str(&payload).map_err(|e| {
            SessionError::RequestFailed(format!("Malformed transcription response: {}", e))
        })?;
        let text = parsed
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(ModelReply::new(text).with_latency_ms(started.elapsed().as_millis() as u64))
    }

    fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn push_message(&self, message: Message) {
        self.push(message);
    }

    fn reset(&self) -> Result<(), SessionError> {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
        Ok(())
    }

    fn clear_log(&self) {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

fn guess_image_mime(path: &str) -> &'static str {
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

fn wire_message(message: &Message) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    let mut wire = json!({ "role": role, "content": message.content });
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "type": "function",
                    "function": { "name": c.name, "arguments": c.arguments }
                })
            })
            .collect();
    }
    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = Value::String(id.clone());
    }
    wire
}

fn map_transport_error(error: reqwest::Error) -> SessionError {
    if error.is_timeout() {
        SessionError::Timeout
    } else if error.is_connect() {
        SessionError::ConnectionError(error.to_string())
    } else {
        SessionError::RequestFailed(error.to_string())
    }
}

fn map_status_error(status: reqwest::StatusCode, body: &str, model: &str) -> SessionError {
    let snippet: String = body.chars().take(300).collect();
    match status.as_u16() {
        404 => SessionError::ModelNotAvailable(format!("{}: {}", model, snippet)),
        401 | 403 => SessionError::ConnectionError(format!("Unauthorized ({}): {}", status, snippet)),
        _ => SessionError::RequestFailed(format!("HTTP {}: {}", status, snippet)),
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

struct ChatChoice {
    message: WireMessage,
    usage: Option<WireUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_handles_v1_bases() {
        let session = HttpSession {
            client: reqwest::Client::new(),
            spec: ModelSpec::parse_all(&[llmux_domain::ConfiguredModel::new("gpt-x")])
                .remove(0),
            api_base: "https://api.openai.com/v1".into(),
            api_key: None,
            tools: Vec::new(),
            tool_router: Arc::new(ToolRouter::empty()),
            messages: Mutex::new(Vec::new()),
        };
        assert_eq!(
            session.endpoint("/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_endpoint_inserts_v1_for_bare_bases() {
        let session = HttpSession {
            client: reqwest::Client::new(),
            spec: ModelSpec::parse_all(&[llmux_domain::ConfiguredModel::new("ollama/llama3.2")])
                .remove(0),
            api_base: "http://localhost:11434".into(),
            api_key: None,
            tools: Vec::new(),
            tool_router: Arc::new(ToolRouter::empty()),
            messages: Mutex::new(Vec::new()),
        };
        assert_eq!(
            session.endpoint("/chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_wire_message_shapes() {
        let assistant = Message::assistant_with_tool_calls(
            "",
            vec![ToolCallRef::new("c1", "read_file").with_arguments(r#"{"path":"x"}"#)],
        );
        let wire = wire_message(&assistant);
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "read_file");

        let tool = Message::tool("contents", "c1");
        let wire = wire_message(&tool);
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "c1");
    }

    #[test]
    fn test_usage_parses_with_missing_fields() {
        let parsed: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [ { "message": { "content": "hi" } } ],
            "usage": { "prompt_tokens": 10 }
        }))
        .unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 0);
        assert!(parsed.choices[0].message.tool_calls.is_none());
    }

    #[test]
    fn test_status_mapping() {
        let err = map_status_error(reqwest::StatusCode::NOT_FOUND, "no such model", "gpt-x");
        assert!(matches!(err, SessionError::ModelNotAvailable(_)));

        let err = map_status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom", "gpt-x");
        assert!(matches!(err, SessionError::RequestFailed(_)));
    }
}
