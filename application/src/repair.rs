//! Crash handling and tool-call repair
//!
//! When a tool-augmented turn fails mid-flight, the last assistant message
//! may have emitted tool calls that never received tool-result messages.
//! Providers reject the next turn in that state, so the log is patched with
//! synthetic tool results carrying the error text. The repair pass itself
//! never fails - a second crash while handling the first would cascade.

use crate::ports::llm_gateway::{LlmSession, SessionError};
use llmux_domain::{Message, Role};
use std::collections::HashSet;
use std::error::Error as _;
use tracing::{debug, error, warn};

/// Maximum error-source entries logged per crash.
const MAX_SOURCE_LINES: usize = 5;

/// Log a tool-turn failure, repair the session's message log, and return the
/// user-facing error string for that turn.
pub fn handle_tool_crash(session: &dyn LlmSession, err: &SessionError) -> String {
    error!(
        model = %session.spec().internal_id(),
        kind = err.kind(),
        "Tool-augmented turn failed: {}",
        err
    );
    let mut source = err.source();
    let mut depth = 0;
    while let (Some(s), true) = (source, depth < MAX_SOURCE_LINES) {
        error!("  caused by: {}", s);
        source = s.source();
        depth += 1;
    }

    let message = format!("Tool error: {}: {}", err.kind(), err);
    repair_incomplete_tool_calls(session, &message);
    message
}

/// Append a synthetic tool-result message for every tool call emitted by the
/// most recent assistant message that has no matching tool-role message.
///
/// No-op when the session has an empty log or the last assistant message
/// emitted no tool calls. Never fails.
pub fn repair_incomplete_tool_calls(session: &dyn LlmSession, error_text: &str) {
    let messages = session.messages();
    if messages.is_empty() {
        return;
    }

    let Some(last_assistant_idx) = messages.iter().rposition(|m| m.is_assistant()) else {
        return;
    };
    let emitted = &messages[last_assistant_idx].tool_calls;
    if emitted.is_empty() {
        return;
    }

    let answered: HashSet<&str> = messages[last_assistant_idx + 1..]
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();

    for call in emitted {
        if answered.contains(call.id.as_str()) {
            continue;
        }
        warn!(
            model = %session.spec().internal_id(),
            tool_call = %call.id,
            tool = %call.name,
            "Repairing dangling tool call with synthetic result"
        );
        session.push_message(Message::tool(format!("Error: {}", error_text), &call.id));
    }
    debug!(
        model = %session.spec().internal_id(),
        "Tool-call repair pass complete"
    );
}
