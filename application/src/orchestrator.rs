//! Multi-model orchestrator
//!
//! Fans one prompt out across every configured model's session, collects
//! results keyed by model identity, and either returns them individually
//! (with per-model metrics) or synthesizes a consensus prompt and asks a
//! designated session to reduce them. A failure on one model never aborts
//! the others.

use crate::sessions::SessionManager;
use llmux_domain::{
    DomainError, ModelOutcome, ModelReply, ModelSpec, MultiModelResponse, Prompt,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Result of one user turn
#[derive(Debug, Clone)]
pub enum ChatResult {
    /// Single-model turn, or the reduced consensus answer
    Single(ModelReply),
    /// Individual per-model responses with parallel metrics
    Multi(MultiModelResponse),
}

impl ChatResult {
    /// The primary text content of this turn
    pub fn content(&self) -> String {
        match self {
            ChatResult::Single(reply) => reply.content.clone(),
            ChatResult::Multi(response) => response.combined_text(),
        }
    }
}

/// Role text as inserted into a slot's first user turn.
pub fn role_text(role: &str) -> String {
    format!("As {}: ", role)
}

/// Build the synthesis prompt for the consensus reducer.
///
/// Only successful model responses participate; errored models are omitted.
pub fn build_consensus_prompt(user_prompt: &str, outcomes: &[ModelOutcome]) -> String {
    let blocks = outcomes
        .iter()
        .filter(|o| o.is_success())
        .map(|o| {
            format!(
                "from: {}\n{}",
                o.display_name,
                o.reply.as_ref().map(|r| r.content.as_str()).unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Several assistants answered the same request independently. \
         Reconcile their responses into a single, coherent answer. \
         Resolve disagreements, drop redundancy, and do not mention that \
         multiple assistants were involved.\n\n\
         Original request:\n{}\n\n\
         Responses:\n\n{}",
        user_prompt, blocks
    )
}

/// Drives one turn across all configured sessions
pub struct MultiModelOrchestrator {
    manager: Arc<SessionManager>,
    consensus: bool,
}

impl MultiModelOrchestrator {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            consensus: false,
        }
    }

    pub fn with_consensus(mut self, consensus: bool) -> Self {
        self.consensus = consensus;
        self
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Dispatch one user turn.
    ///
    /// Never returns an error: turn-time failures become the turn's content.
    pub async fn chat(&self, prompt: &Prompt) -> ChatResult {
        let specs: Vec<ModelSpec> = self.manager.specs().to_vec();

        match specs.len() {
            0 => ChatResult::Single(ModelReply::new(DomainError::NoModels.to_string())),
            1 => {
                let reply = self.dispatch_one(&specs[0], prompt).await;
                ChatResult::Single(reply.unwrap_or_else(ModelReply::new))
            }
            _ => self.dispatch_many(&specs, prompt).await,
        }
    }

    /// Route one slot's turn, applying its role text on the first user turn.
    async fn dispatch_one(&self, spec: &ModelSpec, prompt: &Prompt) -> Result<ModelReply, String> {
        let prompt = self.with_role_prefix(spec, prompt).await;
        self.manager.ask(&spec.internal_id(), &prompt).await
    }

    async fn with_role_prefix(&self, spec: &ModelSpec, prompt: &Prompt) -> Prompt {
        let Some(role) = spec.role() else {
            return prompt.clone();
        };
        let seen_user_turn = match self.manager.session(&spec.internal_id()).await {
            Some(session) => session.messages().iter().any(|m| m.is_user()),
            None => false,
        };
        if seen_user_turn {
            prompt.clone()
        } else {
            prompt.prefixed(&role_text(role))
        }
    }

    async fn dispatch_many(&self, specs: &[ModelSpec], prompt: &Prompt) -> ChatResult {
        info!(models = specs.len(), "Fanning prompt out");

        let mut join_set = JoinSet::new();
        for (index, spec) in specs.iter().enumerate() {
            let manager = Arc::clone(&self.manager);
            let spec = spec.clone();
            let prompt = prompt.clone();
            join_set.spawn(async move {
                let orchestrator = MultiModelOrchestrator::new(manager);
                let result = orchestrator.dispatch_one(&spec, &prompt).await;
                (index, spec, result)
            });
        }

        // Results are keyed by model identity, so completion order is
        // irrelevant; entries go back into configuration order.
        let mut outcomes: Vec<Option<ModelOutcome>> = vec![None; specs.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, spec, Ok(reply))) => {
                    debug!(model = %spec.internal_id(), "Model responded");
                    outcomes[index] = Some(ModelOutcome::success(
                        spec.internal_id(),
                        spec.display_name(),
                        reply,
                    ));
                }
                Ok((index, spec, Err(error))) => {
                    warn!(model = %spec.internal_id(), error = %error, "Model failed");
                    outcomes[index] = Some(ModelOutcome::failure(
                        spec.internal_id(),
                        spec.display_name(),
                        error,
                    ));
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }

        let outcomes: Vec<ModelOutcome> = outcomes.into_iter().flatten().collect();
        let response = MultiModelResponse::new(outcomes);

        if self.consensus {
            self.reduce(specs, prompt, &response).await
        } else {
            ChatResult::Multi(response)
        }
    }

    /// Ask the designated reducer (the first configured slot) to reconcile
    /// the successful responses into one answer.
    async fn reduce(
        &self,
        specs: &[ModelSpec],
        prompt: &Prompt,
        response: &MultiModelResponse,
    ) -> ChatResult {
        if response.successes().next().is_none() {
            return ChatResult::Multi(response.clone());
        }

        let synthesis = build_consensus_prompt(prompt.text_payload(), &response.outcomes);
        let reducer = &specs[0];
        info!(model = %reducer.internal_id(), "Reducing to consensus");

        match self
            .manager
            .ask(&reducer.internal_id(), &Prompt::text(synthesis))
            .await
        {
            Ok(reply) => ChatResult::Single(reply),
            Err(error) => {
                warn!(model = %reducer.internal_id(), error = %error, "Consensus reduction failed");
                ChatResult::Single(ModelReply::new(error))
            }
        }
    }
}
