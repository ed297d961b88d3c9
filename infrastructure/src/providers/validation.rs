//! Local model validation
//!
//! Local runtimes have no hosted registry, so before a session is bound to
//! one the model is checked against the runtime's own listing endpoint:
//! `/api/tags` for Ollama, `/v1/models` for everything else. The three
//! failure shapes stay distinct so the user can tell "daemon is down" from
//! "daemon is up but the model is not pulled".

use llmux_application::ports::llm_gateway::SessionError;
use llmux_domain::{ModelSpec, Provider, ProviderEnv};
use serde_json::Value;
use tracing::debug;

/// Check that `spec`'s model is actually served by its local provider.
pub async fn validate_local_model(
    client: &reqwest::Client,
    env: &ProviderEnv,
    spec: &ModelSpec,
) -> Result<(), SessionError> {
    let base = env.api_base(spec.provider());
    let url = listing_url(spec.provider(), &base);
    debug!(model = %spec.internal_id(), url = %url, "Validating local model");

    let mut request = client.get(&url);
    if let Some(key) = env.api_key(spec.provider()) {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| {
        SessionError::ConnectionError(format!(
            "{} is not reachable at {}: {}",
            spec.provider(),
            base,
            e
        ))
    })?;

    let payload: Value = response.json().await.map_err(|e| {
        SessionError::ConnectionError(format!(
            "{} returned an unreadable model list: {}",
            spec.provider(),
            e
        ))
    })?;

    let available = listed_models(spec.provider(), &payload);
    if available.is_empty() {
        return Err(SessionError::ModelNotAvailable(format!(
            "{} reports no loaded models; pull or load {} first",
            spec.provider(),
            spec.name()
        )));
    }

    if available.iter().any(|m| model_matches(m, spec.name())) {
        return Ok(());
    }

    Err(SessionError::ModelNotAvailable(format!(
        "{} does not serve {}; available: {}",
        spec.provider(),
        spec.name(),
        available.join(", ")
    )))
}

fn listing_url(provider: &Provider, base: &str) -> String {
    let base = base.trim_end_matches('/');
    match provider {
        Provider::Ollama => format!("{}/api/tags", base),
        _ if base.ends_with("/v1") => format!("{}/models", base),
        _ => format!("{}/v1/models", base),
    }
}

/// Pull model names out of either listing shape.
fn listed_models(provider: &Provider, payload: &Value) -> Vec<String> {
    let (key, name_field) = match provider {
        Provider::Ollama => ("models", "name"),
        _ => ("data", "id"),
    };
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get(name_field).and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Ollama tags carry a `:latest` (or other tag) suffix the user usually
/// omits, so an untagged request matches any tag of the same model.
fn model_matches(listed: &str, requested: &str) -> bool {
    if listed == requested {
        return true;
    }
    match listed.split_once(':') {
        Some((bare, _)) => bare == requested && !requested.contains(':'),
        None => false,
    }
}
