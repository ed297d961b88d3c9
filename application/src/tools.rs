//! Tool registry and call routing
//!
//! The [`ToolRouter`] gathers candidate tools from every source, runs the
//! filter pipeline (allow -> reject -> dedup, in that order so an allow-list
//! can reference either copy of a later-deduplicated tool), and routes
//! executions back to the source that contributed the surviving definition.

use crate::ports::tool_source::{ToolSource, ToolSourceError};
use llmux_domain::{drop_duplicates, filter_allowed, filter_rejected, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The active tool set plus the name -> source execution map
pub struct ToolRouter {
    tools: Vec<ToolDefinition>,
    sources: HashMap<String, Arc<dyn ToolSource>>,
}

impl ToolRouter {
    /// An empty router (no tools attached to any session).
    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            sources: HashMap::new(),
        }
    }

    /// Gather, filter, and deduplicate tools from the given sources.
    ///
    /// A source whose discovery fails is reported and skipped; it never
    /// aborts the others.
    pub async fn build(
        sources: &[Arc<dyn ToolSource>],
        allow_patterns: &[String],
        reject_patterns: &[String],
    ) -> Self {
        let mut gathered: Vec<(ToolDefinition, Arc<dyn ToolSource>)> = Vec::new();

        for source in sources {
            match source.discover().await {
                Ok(tools) => {
                    debug!(source = source.id(), count = tools.len(), "Discovered tools");
                    for tool in tools {
                        gathered.push((tool, Arc::clone(source)));
                    }
                }
                Err(e) => {
                    warn!(source = source.id(), error = %e, "Skipping tool source");
                }
            }
        }

        let candidates: Vec<ToolDefinition> = gathered.iter().map(|(t, _)| t.clone()).collect();
        let filtered = drop_duplicates(filter_rejected(
            filter_allowed(candidates, allow_patterns),
            reject_patterns,
        ));

        let mut routing = HashMap::new();
        for tool in &filtered {
            if let Some((_, source)) = gathered
                .iter()
                .find(|(t, _)| t.name == tool.name && t.origin == tool.origin)
            {
                routing.insert(tool.name.clone(), Arc::clone(source));
            }
        }

        Self {
            tools: filtered,
            sources: routing,
        }
    }

    /// The filtered tool set attached to every session
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Execute one tool call via the source that owns it
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ToolSourceError> {
        match self.sources.get(name) {
            Some(source) => source.invoke(name, arguments).await,
            None => Err(ToolSourceError::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticSource {
        id: String,
        tools: Vec<ToolDefinition>,
        fail_discovery: bool,
    }

    impl StaticSource {
        fn new(id: &str, tools: Vec<ToolDefinition>) -> Arc<dyn ToolSource> {
            Arc::new(Self {
                id: id.to_string(),
                tools,
                fail_discovery: false,
            })
        }

        fn broken(id: &str) -> Arc<dyn ToolSource> {
            Arc::new(Self {
                id: id.to_string(),
                tools: vec![],
                fail_discovery: true,
            })
        }
    }

    #[async_trait]
    impl ToolSource for StaticSource {
        fn id(&self) -> &str {
            &self.id
        }

        async fn discover(&self) -> Result<Vec<ToolDefinition>, ToolSourceError> {
            if self.fail_discovery {
                return Err(ToolSourceError::DiscoveryFailed("down".into()));
            }
            Ok(self.tools.clone())
        }

        async fn invoke(
            &self,
            name: &str,
            _arguments: serde_json::Value,
        ) -> Result<String, ToolSourceError> {
            Ok(format!("{}:{}", self.id, name))
        }
    }

    fn local(name: &str) -> ToolDefinition {
        ToolDefinition::local(name, "d", json!({}), "tools/t.json")
    }

    fn mcp(name: &str, server: &str) -> ToolDefinition {
        ToolDefinition::mcp(name, "d", json!({}), server)
    }

    #[tokio::test]
    async fn build_gathers_and_dedups_across_sources() {
        let sources = vec![
            StaticSource::new("local", vec![local("read_file"), local("fetch_url")]),
            StaticSource::new("web", vec![mcp("fetch_url", "web"), mcp("search", "web")]),
        ];
        let router = ToolRouter::build(&sources, &[], &[]).await;

        let names: Vec<&str> = router.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["read_file", "fetch_url", "search"]);

        // The surviving fetch_url is the local (first-seen) one
        let result = router.invoke("fetch_url", json!({})).await.unwrap();
        assert_eq!(result, "local:fetch_url");
    }

    #[tokio::test]
    async fn failed_source_is_skipped_not_fatal() {
        let sources = vec![
            StaticSource::broken("dead"),
            StaticSource::new("live", vec![local("read_file")]),
        ];
        let router = ToolRouter::build(&sources, &[], &[]).await;
        assert_eq!(router.tools().len(), 1);
        assert_eq!(router.tools()[0].name, "read_file");
        let result = router.invoke("read_file", json!({})).await.unwrap();
        assert_eq!(result, "live:read_file");
    }

    #[tokio::test]
    async fn filters_run_before_dedup() {
        let sources = vec![StaticSource::new(
            "s",
            vec![mcp("web_fetch", "web"), local("read_file"), local("web_fetch")],
        )];
        let router = ToolRouter::build(&sources, &["web_".to_string()], &[]).await;
        assert_eq!(router.tools().len(), 1);
        assert_eq!(router.tools()[0].name, "web_fetch");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let router = ToolRouter::empty();
        let err = router.invoke("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::NotFound(_)));
    }
}
