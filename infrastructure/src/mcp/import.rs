//! MCP config file import
//!
//! Two on-disk JSON shapes are accepted: a single-object
//! `{"type": "stdio", "command": ["cmd", "arg", ...]}` form (the file name
//! becomes the server name) and the conventional
//! `{"mcpServers": {"name": {"command": "cmd", "args": [...]}}}` form.
//! Malformed entries are warned about and skipped; they never abort the
//! rest of the file.

use llmux_domain::McpServerDescriptor;
use serde_json::Value;
use std::path::Path;
use tracing::warn;

/// Import server descriptors from one config file.
pub fn import_file(path: &Path) -> Vec<McpServerDescriptor> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read MCP config");
            return Vec::new();
        }
    };
    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed MCP config");
            return Vec::new();
        }
    };

    let default_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mcp".to_string());
    import_value(&default_name, &value)
}

/// Convert a parsed config document into descriptors.
pub fn import_value(default_name: &str, value: &Value) -> Vec<McpServerDescriptor> {
    if let Some(servers) = value.get("mcpServers").and_then(Value::as_object) {
        return servers
            .iter()
            .filter_map(|(name, entry)| match named_entry(name, entry) {
                Some(descriptor) => Some(descriptor),
                None => {
                    warn!(server = %name, "Skipping malformed MCP server entry");
                    None
                }
            })
            .collect();
    }

    match single_object(default_name, value) {
        Some(descriptor) => vec![descriptor],
        None => {
            warn!(server = %default_name, "Skipping malformed MCP config object");
            Vec::new()
        }
    }
}

/// The `{type, command: [...]}` shape: the command array carries the program
/// and its arguments together.
fn single_object(name: &str, value: &Value) -> Option<McpServerDescriptor> {
    let command = value.get("command")?.as_array()?;
    let program = command.first()?.as_str()?;
    let args: Vec<String> = command
        .iter()
        .skip(1)
        .filter_map(Value::as_str)
        .map(String::from)
        .collect();

    let mut descriptor = McpServerDescriptor::new(name, program).with_args(args);
    apply_env(&mut descriptor, value);
    apply_timeout(&mut descriptor, value);
    Some(descriptor)
}

/// One entry of the `mcpServers` map: command string plus an args array.
fn named_entry(name: &str, entry: &Value) -> Option<McpServerDescriptor> {
    let program = entry.get("command")?.as_str()?;
    let args: Vec<String> = entry
        .get("args")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let mut descriptor = McpServerDescriptor::new(name, program).with_args(args);
    apply_env(&mut descriptor, entry);
    apply_timeout(&mut descriptor, entry);
    Some(descriptor)
}

fn apply_env(descriptor: &mut McpServerDescriptor, value: &Value) {
    if let Some(env) = value.get("env").and_then(Value::as_object) {
        for (key, val) in env {
            if let Some(val) = val.as_str() {
                descriptor.env.insert(key.clone(), val.to_string());
            }
        }
    }
}

fn apply_timeout(descriptor: &mut McpServerDescriptor, value: &Value) {
    if let Some(ms) = value.get("timeout_ms").and_then(Value::as_u64) {
        descriptor.timeout_ms = ms;
    }
}
