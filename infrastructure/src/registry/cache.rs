//! Model registry cache
//!
//! Modality metadata per known model id, cached as a JSON array at
//! `<state_dir>/llmux/models.json`. An absent cache is seeded from a bundled
//! snapshot (or a live listing if the snapshot is unusable). A cache older
//! than the configured refresh interval (0 days means every run) triggers a
//! live re-query of the provider's model listing; new ids are folded into
//! the cached set, and a failed query keeps the cached set untouched so the
//! next run retries. Models missing from the registry fall back to
//! text-in/text-out.

use llmux_domain::{ModalitySet, ModelSpec, Provider, ProviderEnv};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

const BUNDLED_REGISTRY: &str = include_str!("../../assets/models.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    #[serde(default)]
    pub modalities: ModalitySet,
}

/// In-memory view of the cached registry
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<RegistryEntry>,
}

impl ModelRegistry {
    /// Load from the default cache location, seeding or refreshing as needed.
    ///
    /// A stale cache is refreshed from the hosted provider's model-listing
    /// endpoint via `client`.
    pub async fn load(client: &reqwest::Client, env: &ProviderEnv, refresh_days: u64) -> Self {
        match default_cache_path() {
            Some(path) => Self::load_from(&path, refresh_days, || fetch_live(client, env)).await,
            None => {
                warn!("No state directory available; using bundled registry");
                Self::bundled()
            }
        }
    }

    /// Load from an explicit cache path, with `fetch` supplying the live
    /// model listing when one is needed.
    ///
    /// Never fails: a stale cache whose live query errors is served as-is,
    /// an unreadable cache is reseeded from the bundled snapshot, and a
    /// cache that cannot even be written is served from memory.
    pub async fn load_from<F, Fut>(path: &Path, refresh_days: u64, fetch: F) -> Self
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RegistryEntry>, String>>,
    {
        let cached = read_cache(path);

        if let Some(entries) = &cached {
            if is_fresh(path, refresh_days) {
                debug!(path = %path.display(), models = entries.len(), "Registry cache hit");
                return Self {
                    entries: entries.clone(),
                };
            }
        }

        match cached {
            // Present but stale: fold live ids into the cached set. The
            // cached entries survive either way so accumulated metadata is
            // not lost to a flaky query.
            Some(entries) => match fetch().await {
                Ok(live) => {
                    let merged = merge_entries(entries, live);
                    write_cache(path, &merged);
                    Self { entries: merged }
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Live registry query failed; keeping cached entries"
                    );
                    Self { entries }
                }
            },
            // Absent or unreadable: seed from the bundled snapshot, falling
            // back to a live query if the snapshot is unusable.
            None => {
                let mut registry = Self::bundled();
                if registry.is_empty() {
                    match fetch().await {
                        Ok(live) => registry = Self { entries: live },
                        Err(e) => warn!(error = %e, "Live registry query failed during seed"),
                    }
                }
                write_cache(path, &registry.entries);
                registry
            }
        }
    }

    pub fn bundled() -> Self {
        let entries = serde_json::from_str(BUNDLED_REGISTRY).unwrap_or_else(|_| Vec::new());
        Self { entries }
    }

    /// Declared modalities for a model name, if the registry knows it.
    ///
    /// Ollama-style `name:tag` ids match on the bare name.
    pub fn modalities(&self, name: &str) -> Option<ModalitySet> {
        let bare = name.split(':').next().unwrap_or(name);
        self.entries
            .iter()
            .find(|e| e.id == name || e.id == bare)
            .map(|e| e.modalities.clone())
    }

    /// Attach registry modalities to each spec; unknown models keep the
    /// text-only default.
    pub fn enrich(&self, specs: Vec<ModelSpec>) -> Vec<ModelSpec> {
        specs
            .into_iter()
            .map(|spec| match self.modalities(spec.name()) {
                Some(modalities) => spec.with_modalities(modalities),
                None => spec,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// GET the hosted provider's `/models` listing and map each id to an entry.
///
/// The listing carries no modality metadata, so new ids come back with the
/// text-only default; `merge_entries` upgrades the ones the bundled
/// snapshot knows about.
async fn fetch_live(client: &reqwest::Client, env: &ProviderEnv) -> Result<Vec<RegistryEntry>, String> {
    let base = env.api_base(&Provider::OpenAi);
    let url = if base.ends_with("/v1") {
        format!("{}/models", base)
    } else {
        format!("{}/v1/models", base)
    };

    let mut request = client.get(&url);
    if let Some(key) = env.api_key(&Provider::OpenAi) {
        request = request.bearer_auth(key);
    }
    let response = request
        .send()
        .await
        .map_err(|e| format!("{} unreachable: {}", url, e))?;
    if !response.status().is_success() {
        return Err(format!("{} returned {}", url, response.status()));
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| format!("{} returned malformed JSON: {}", url, e))?;

    let listed = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("{} returned no model list", url))?;
    Ok(listed
        .iter()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .map(|id| RegistryEntry {
            id: id.to_string(),
            modalities: ModalitySet::default(),
        })
        .collect())
}

/// Cached entries win on id collision; live-only ids are appended, with
/// modalities taken from the bundled snapshot when it knows the id.
fn merge_entries(cached: Vec<RegistryEntry>, live: Vec<RegistryEntry>) -> Vec<RegistryEntry> {
    let bundled = ModelRegistry::bundled();
    let mut merged = cached;
    for mut entry in live {
        if merged.iter().any(|e| e.id == entry.id) {
            continue;
        }
        if let Some(known) = bundled.modalities(&entry.id) {
            entry.modalities = known;
        }
        merged.push(entry);
    }
    merged
}

fn read_cache(path: &Path) -> Option<Vec<RegistryEntry>> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(entries) => Some(entries),
        Err(_) => {
            warn!(path = %path.display(), "Unreadable registry cache, reseeding");
            None
        }
    }
}

fn write_cache(path: &Path, entries: &[RegistryEntry]) {
    let Some(parent) = path.parent() else {
        return;
    };
    let raw = match serde_json::to_string_pretty(entries) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Cannot serialize registry cache");
            return;
        }
    };
    let written =
        std::fs::create_dir_all(parent).and_then(|_| std::fs::write(path, raw));
    match written {
        Ok(()) => debug!(path = %path.display(), "Registry cache written"),
        Err(e) => warn!(path = %path.display(), error = %e, "Cannot write registry cache"),
    }
}

fn default_cache_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("llmux").join("models.json"))
}

/// A cache file is fresh when it exists and its mtime is within the window.
/// `refresh_days == 0` means always refresh.
fn is_fresh(path: &Path, refresh_days: u64) -> bool {
    if refresh_days == 0 {
        return false;
    }
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default();
    age < Duration::from_secs(refresh_days * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmux_domain::{ConfiguredModel, Modality};
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn offline() -> Result<Vec<RegistryEntry>, String> {
        Err("offline".to_string())
    }

    fn live_entry(id: &str) -> RegistryEntry {
        RegistryEntry {
            id: id.to_string(),
            modalities: ModalitySet::default(),
        }
    }

    #[test]
    fn test_bundled_registry_parses() {
        let registry = ModelRegistry::bundled();
        assert!(!registry.is_empty());
        assert!(registry.modalities("gpt-4o").is_some());
    }

    #[test]
    fn test_tagged_names_match_bare_ids() {
        let registry = ModelRegistry::bundled();
        let modalities = registry.modalities("llava:13b").unwrap();
        assert!(modalities.accepts(Modality::Image));
    }

    #[test]
    fn test_unknown_model_stays_text_only() {
        let registry = ModelRegistry::bundled();
        assert!(registry.modalities("made-up-model").is_none());

        let specs = registry.enrich(ModelSpec::parse_all(&[ConfiguredModel::new(
            "made-up-model",
        )]));
        assert!(specs[0].modalities().supports_text_in_text_out());
        assert!(!specs[0].modalities().produces(Modality::Image));
    }

    #[test]
    fn test_enrich_attaches_image_output() {
        let registry = ModelRegistry::bundled();
        let specs =
            registry.enrich(ModelSpec::parse_all(&[ConfiguredModel::new("dall-e-3")]));
        assert!(specs[0].modalities().produces(Modality::Image));
    }

    #[tokio::test]
    async fn test_seed_then_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llmux").join("models.json");

        let seeded = ModelRegistry::load_from(&path, 7, offline).await;
        assert!(!seeded.is_empty());
        assert!(path.exists());

        // Second load within the window reads the file just written
        let cached = ModelRegistry::load_from(&path, 7, offline).await;
        assert_eq!(cached.len(), seeded.len());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_live_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        ModelRegistry::load_from(&path, 7, offline).await;

        let queried = AtomicBool::new(false);
        let registry = ModelRegistry::load_from(&path, 7, || async {
            queried.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        })
        .await;

        assert!(!queried.load(Ordering::SeqCst));
        assert!(!registry.is_empty());
    }

    #[tokio::test]
    async fn test_stale_cache_folds_in_live_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(
            &path,
            r#"[{"id":"brand-new-audio-model","modalities":{"input":["audio"],"output":["text"]}}]"#,
        )
        .unwrap();

        // refresh_days 0 treats the file as expired on every run
        let registry = ModelRegistry::load_from(&path, 0, || async {
            Ok(vec![live_entry("brand-new-audio-model"), live_entry("fresh-model")])
        })
        .await;

        assert_eq!(registry.len(), 2);
        // The cached entry keeps its richer metadata over the bare live id
        assert!(registry
            .modalities("brand-new-audio-model")
            .unwrap()
            .accepts(Modality::Audio));
        assert!(registry.modalities("fresh-model").is_some());

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("fresh-model"));
        assert!(rewritten.contains("brand-new-audio-model"));
    }

    #[tokio::test]
    async fn test_stale_cache_survives_failed_live_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        let seeded =
            r#"[{"id":"brand-new-audio-model","modalities":{"input":["audio"],"output":["text"]}}]"#;
        std::fs::write(&path, seeded).unwrap();

        let registry = ModelRegistry::load_from(&path, 0, offline).await;

        // Nothing replaced the cached set with the bundled snapshot
        assert_eq!(registry.len(), 1);
        assert!(registry
            .modalities("brand-new-audio-model")
            .unwrap()
            .accepts(Modality::Audio));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), seeded);
    }

    #[tokio::test]
    async fn test_live_ids_pick_up_bundled_modalities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, "[]").unwrap();

        let registry = ModelRegistry::load_from(&path, 0, || async {
            Ok(vec![live_entry("dall-e-3")])
        })
        .await;

        assert!(registry.modalities("dall-e-3").unwrap().produces(Modality::Image));
    }

    #[tokio::test]
    async fn test_corrupt_cache_falls_back_to_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        std::fs::write(&path, "not json").unwrap();

        let registry = ModelRegistry::load_from(&path, 7, offline).await;
        assert!(!registry.is_empty());
        // Reseeded on disk as well
        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("gpt-4o"));
    }
}
