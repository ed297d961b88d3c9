//! Environment capture
//!
//! Provider configuration is read from the process environment exactly once
//! at startup and carried around as a [`ProviderEnv`] value. Nothing below
//! this boundary reads `std::env` again, which keeps provider resolution
//! deterministic and lets tests inject configuration directly.

use llmux_domain::ProviderEnv;
use tracing::debug;

const API_BASE_SUFFIX: &str = "_API_BASE";
const API_KEY_SUFFIX: &str = "_API_KEY";

/// Snapshot `<PROVIDER>_API_BASE` / `<PROVIDER>_API_KEY` variables.
///
/// The prefix before the suffix becomes the provider key, lowercased, so
/// `OLLAMA_API_BASE` configures the `ollama` provider and an unrecognized
/// `ACME_API_KEY` still reaches an `acme/` prefixed model.
pub fn capture() -> ProviderEnv {
    capture_from(std::env::vars())
}

fn capture_from(vars: impl Iterator<Item = (String, String)>) -> ProviderEnv {
    let mut env = ProviderEnv::default();
    for (key, value) in vars {
        if value.is_empty() {
            continue;
        }
        if let Some(prefix) = key.strip_suffix(API_BASE_SUFFIX) {
            debug!(var = %key, "Captured API base override");
            env.api_bases.insert(prefix.to_lowercase(), value);
        } else if let Some(prefix) = key.strip_suffix(API_KEY_SUFFIX) {
            debug!(var = %key, "Captured API key");
            env.api_keys.insert(prefix.to_lowercase(), value);
        }
    }
    env
}
