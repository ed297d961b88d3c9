//! File-defined local tools
//!
//! A tool file is a JSON object (or array of objects) carrying `name`,
//! `description`, a `parameters` schema, and the `command` to execute. The
//! call arguments are piped to the command as a JSON document on stdin and
//! its stdout becomes the tool result. Bad files warn and are skipped.

use async_trait::async_trait;
use llmux_application::ports::tool_source::{ToolSource, ToolSourceError};
use llmux_domain::ToolDefinition;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
struct LocalToolFile {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "empty_schema")]
    parameters: Value,
    command: Vec<String>,
}

fn empty_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Tool source backed by JSON definition files on disk
pub struct LocalToolSource {
    definitions: Vec<ToolDefinition>,
    commands: HashMap<String, Vec<String>>,
}

impl LocalToolSource {
    /// Load every definition from the given paths.
    pub fn load(paths: &[String]) -> Self {
        let mut definitions = Vec::new();
        let mut commands = HashMap::new();

        for path in paths {
            for tool in read_tool_file(Path::new(path)) {
                if tool.command.is_empty() {
                    warn!(tool = %tool.name, path = %path, "Tool has an empty command, skipping");
                    continue;
                }
                debug!(tool = %tool.name, path = %path, "Loaded local tool");
                definitions.push(ToolDefinition::local(
                    &tool.name,
                    &tool.description,
                    tool.parameters.clone(),
                    path,
                ));
                commands.insert(tool.name, tool.command);
            }
        }

        Self {
            definitions,
            commands,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Parse one file; accepts a single object or an array of objects.
fn read_tool_file(path: &Path) -> Vec<LocalToolFile> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read tool file");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(tool) => Some(tool),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed tool entry");
                    None
                }
            })
            .collect(),
        Ok(value) => match serde_json::from_value(value) {
            Ok(tool) => vec![tool],
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed tool file");
                Vec::new()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed tool file");
            Vec::new()
        }
    }
}

#[async_trait]
impl ToolSource for LocalToolSource {
    fn id(&self) -> &str {
        "local"
    }

    async fn discover(&self) -> Result<Vec<ToolDefinition>, ToolSourceError> {
        Ok(self.definitions.clone())
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<String, ToolSourceError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| ToolSourceError::NotFound(name.to_string()))?;

        let mut child = tokio::process::Command::new(&command[0])
            .args(&command[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolSourceError::InvocationFailed {
                tool: name.to_string(),
                message: format!("cannot start {}: {}", command[0], e),
            })?;

        let payload = arguments.to_string();
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.as_bytes()).await.map_err(|e| {
                ToolSourceError::InvocationFailed {
                    tool: name.to_string(),
                    message: format!("cannot write arguments: {}", e),
                }
            })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ToolSourceError::InvocationFailed {
                tool: name.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolSourceError::InvocationFailed {
                tool: name.to_string(),
                message: format!("exit {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
