//! Allow/reject filters and duplicate collapsing
//!
//! Patterns are case-sensitive exact substrings, not globs or regexes.

use super::entities::ToolDefinition;
use std::collections::HashMap;
use tracing::warn;

/// Keep a tool if any allow pattern is a substring of its name.
///
/// An empty or absent allow-list keeps everything unchanged.
pub fn filter_allowed(tools: Vec<ToolDefinition>, allow_patterns: &[String]) -> Vec<ToolDefinition> {
    if allow_patterns.is_empty() {
        return tools;
    }
    tools
        .into_iter()
        .filter(|t| allow_patterns.iter().any(|p| t.name.contains(p.as_str())))
        .collect()
}

/// Drop a tool if any reject pattern is a substring of its name.
pub fn filter_rejected(
    tools: Vec<ToolDefinition>,
    reject_patterns: &[String],
) -> Vec<ToolDefinition> {
    if reject_patterns.is_empty() {
        return tools;
    }
    tools
        .into_iter()
        .filter(|t| !reject_patterns.iter().any(|p| t.name.contains(p.as_str())))
        .collect()
}

/// Collapse duplicate names, first-seen wins, preserving encounter order.
///
/// One warning is recorded per later duplicate, naming both origins.
pub fn drop_duplicates(tools: Vec<ToolDefinition>) -> Vec<ToolDefinition> {
    let mut kept: Vec<ToolDefinition> = Vec::with_capacity(tools.len());
    let mut first_origin: HashMap<String, String> = HashMap::new();

    for tool in tools {
        match first_origin.get(&tool.name) {
            Some(origin) => {
                warn!(
                    tool = %tool.name,
                    kept = %origin,
                    dropped = %tool.origin,
                    "Duplicate tool name, keeping first-seen definition"
                );
            }
            None => {
                first_origin.insert(tool.name.clone(), tool.origin.to_string());
                kept.push(tool);
            }
        }
    }
    kept
}
