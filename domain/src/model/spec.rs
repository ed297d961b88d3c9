//! ModelSpec value object: one configured model slot
//!
//! The same model name may appear more than once in a configuration, each
//! slot with a different role (e.g. `gpt-x` as "optimist" and again as
//! "pessimist"). Every slot gets a 1-based instance number and a unique
//! internal identifier so downstream session storage never aliases two
//! slots, even when they share the underlying model.

use super::modality::ModalitySet;
use super::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A model slot as it appears in the resolved configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguredModel {
    /// Model identifier, optionally `provider/`-prefixed
    pub identifier: String,
    /// Optional role label attached to this slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ConfiguredModel {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// One configured model instance (Value Object)
///
/// Immutable once parsed from configuration; one exists per configured slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Identifier as configured, prefix included (duplicate-counting key)
    identifier: String,
    /// Bare model name with the provider prefix stripped
    name: String,
    /// Resolved provider
    provider: Provider,
    /// Optional role label
    role: Option<String>,
    /// 1-based instance number among slots sharing this identifier
    instance: u32,
    /// Declared input/output modalities of the bound model
    modalities: ModalitySet,
}

impl ModelSpec {
    /// Parse every configured slot, assigning instance numbers to duplicate
    /// identifiers in encounter order.
    pub fn parse_all(configured: &[ConfiguredModel]) -> Vec<ModelSpec> {
        let mut seen: HashMap<&str, u32> = HashMap::new();
        configured
            .iter()
            .map(|c| {
                let instance = seen
                    .entry(c.identifier.as_str())
                    .and_modify(|n| *n += 1)
                    .or_insert(1);
                let (provider, name) = Provider::split_identifier(&c.identifier);
                ModelSpec {
                    identifier: c.identifier.clone(),
                    name,
                    provider,
                    role: c.role.clone(),
                    instance: *instance,
                    modalities: ModalitySet::text_only(),
                }
            })
            .collect()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn modalities(&self) -> &ModalitySet {
        &self.modalities
    }

    /// Replace the declared modality set (enriched from the model registry).
    pub fn with_modalities(mut self, modalities: ModalitySet) -> Self {
        self.modalities = modalities;
        self
    }

    /// Unique internal identifier: `name` for instance 1, `name#N` for N >= 2.
    pub fn internal_id(&self) -> String {
        if self.instance == 1 {
            self.identifier.clone()
        } else {
            format!("{}#{}", self.identifier, self.instance)
        }
    }

    /// Human-facing label: `name[ #N][ (role)]`.
    pub fn display_name(&self) -> String {
        let mut label = self.identifier.clone();
        if self.instance > 1 {
            label.push_str(&format!(" #{}", self.instance));
        }
        if let Some(role) = &self.role {
            label.push_str(&format!(" ({})", role));
        }
        label
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_ids_for_duplicates() {
        let configured = vec![
            ConfiguredModel::new("gpt-x"),
            ConfiguredModel::new("gpt-x"),
            ConfiguredModel::new("gpt-x"),
        ];
        let specs = ModelSpec::parse_all(&configured);
        let ids: Vec<String> = specs.iter().map(|s| s.internal_id()).collect();
        assert_eq!(ids, vec!["gpt-x", "gpt-x#2", "gpt-x#3"]);

        // Pairwise distinct
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_duplicate_counting_is_per_identifier() {
        let configured = vec![
            ConfiguredModel::new("gpt-x"),
            ConfiguredModel::new("ollama/llama3.2"),
            ConfiguredModel::new("gpt-x"),
        ];
        let specs = ModelSpec::parse_all(&configured);
        assert_eq!(specs[0].internal_id(), "gpt-x");
        assert_eq!(specs[1].internal_id(), "ollama/llama3.2");
        assert_eq!(specs[2].internal_id(), "gpt-x#2");
    }

    #[test]
    fn test_provider_resolution() {
        let specs = ModelSpec::parse_all(&[ConfiguredModel::new("ollama/llama3.2")]);
        assert_eq!(specs[0].provider(), &Provider::Ollama);
        assert_eq!(specs[0].name(), "llama3.2");
        assert_eq!(specs[0].identifier(), "ollama/llama3.2");
    }

    #[test]
    fn test_display_name_variants() {
        let configured = vec![
            ConfiguredModel::new("gpt-x").with_role("optimist"),
            ConfiguredModel::new("gpt-x").with_role("pessimist"),
        ];
        let specs = ModelSpec::parse_all(&configured);
        assert_eq!(specs[0].display_name(), "gpt-x (optimist)");
        assert_eq!(specs[1].display_name(), "gpt-x #2 (pessimist)");

        let plain = ModelSpec::parse_all(&[ConfiguredModel::new("gpt-x")]);
        assert_eq!(plain[0].display_name(), "gpt-x");
    }

    #[test]
    fn test_default_modalities_are_text_only() {
        let specs = ModelSpec::parse_all(&[ConfiguredModel::new("gpt-x")]);
        assert!(specs[0].modalities().supports_text_in_text_out());
    }
}
