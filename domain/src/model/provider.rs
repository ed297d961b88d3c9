//! Provider value object and identifier-prefix resolution
//!
//! A model identifier may be prefixed with `provider/` to pin it to a
//! backend. Three local-runtime prefixes are recognized (`ollama/`, `lms/`,
//! `llamacpp/`); each maps to a concrete provider with a conventional
//! default API base URL that can be overridden through the environment.
//! Unprefixed identifiers default to the hosted OpenAI-compatible provider.

use serde::{Deserialize, Serialize};

/// The backend serving a configured model (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Hosted OpenAI-compatible API
    OpenAi,
    /// Local Ollama daemon
    Ollama,
    /// Local LM Studio server
    LmStudio,
    /// Local llama.cpp server
    LlamaCpp,
    /// Unrecognized explicit prefix, passed through as-is
    Other(String),
}

impl Provider {
    /// Split `provider/name` into a provider and the bare model name.
    ///
    /// Identifiers without a `/` resolve to [`Provider::OpenAi`].
    pub fn split_identifier(identifier: &str) -> (Provider, String) {
        match identifier.split_once('/') {
            Some(("ollama", name)) => (Provider::Ollama, name.to_string()),
            Some(("lms", name)) => (Provider::LmStudio, name.to_string()),
            Some(("llamacpp", name)) => (Provider::LlamaCpp, name.to_string()),
            Some(("openai", name)) => (Provider::OpenAi, name.to_string()),
            Some((prefix, name)) => (Provider::Other(prefix.to_string()), name.to_string()),
            None => (Provider::OpenAi, identifier.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
            Provider::LmStudio => "lms",
            Provider::LlamaCpp => "llamacpp",
            Provider::Other(s) => s,
        }
    }

    /// Whether this provider is a local runtime with no hosted registry.
    ///
    /// Local providers must be validated against their model-listing
    /// endpoint before a session is created for them.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Provider::Ollama | Provider::LmStudio | Provider::LlamaCpp
        )
    }

    /// Conventional API base URL for this provider.
    fn default_api_base(&self) -> &str {
        match self {
            Provider::OpenAi | Provider::Other(_) => "https://api.openai.com/v1",
            Provider::Ollama => "http://localhost:11434",
            Provider::LmStudio => "http://localhost:1234/v1",
            Provider::LlamaCpp => "http://localhost:8080/v1",
        }
    }

    /// Environment variable carrying the base-URL override.
    pub fn api_base_var(&self) -> String {
        format!("{}_API_BASE", self.as_str().to_uppercase())
    }

    /// Environment variable carrying the API key.
    pub fn api_key_var(&self) -> String {
        format!("{}_API_KEY", self.as_str().to_uppercase())
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of provider configuration read from the environment.
///
/// Captured once at startup and passed into the gateway and resolver, so
/// tests can inject configuration without mutating the process environment.
#[derive(Debug, Clone, Default)]
pub struct ProviderEnv {
    /// `<PROVIDER>_API_BASE` overrides, keyed by provider prefix
    pub api_bases: std::collections::HashMap<String, String>,
    /// `<PROVIDER>_API_KEY` values, keyed by provider prefix
    pub api_keys: std::collections::HashMap<String, String>,
}

impl ProviderEnv {
    /// Resolve the API base URL for a provider, honoring any override.
    pub fn api_base(&self, provider: &Provider) -> String {
        self.api_bases
            .get(provider.as_str())
            .cloned()
            .unwrap_or_else(|| provider.default_api_base().to_string())
    }

    /// API key for a provider, if one was configured.
    pub fn api_key(&self, provider: &Provider) -> Option<&str> {
        self.api_keys.get(provider.as_str()).map(|s| s.as_str())
    }

    pub fn with_api_base(mut self, provider: &Provider, base: impl Into<String>) -> Self {
        self.api_bases
            .insert(provider.as_str().to_string(), base.into());
        self
    }

    pub fn with_api_key(mut self, provider: &Provider, key: impl Into<String>) -> Self {
        self.api_keys
            .insert(provider.as_str().to_string(), key.into());
        self
    }
}
