//! Async access to the blocking language-model backend

use crate::error::PipelineError;
use dossier_domain::traits::LlmProvider;
use dossier_domain::{ChatMessage, ResponseConstraint};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::trace;

/// Shared handle on the backend with a hard per-call timeout
pub struct ModelClient<L> {
    provider: Arc<L>,
    call_timeout: Duration,
}

impl<L> Clone for ModelClient<L> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            call_timeout: self.call_timeout,
        }
    }
}

impl<L> ModelClient<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    /// Create a client for `provider`
    pub fn new(provider: Arc<L>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// The underlying provider
    pub fn provider(&self) -> &Arc<L> {
        &self.provider
    }

    /// Send one user prompt and wait for the completion.
    ///
    /// The call runs on a blocking thread. If it does not finish within the
    /// configured timeout the caller gets [`PipelineError::Timeout`]; the
    /// blocking thread is left to finish on its own.
    pub async fn complete(
        &self,
        prompt: String,
        constraint: ResponseConstraint,
    ) -> Result<String, PipelineError> {
        trace!(prompt = %prompt, "model request");

        let llm = Arc::clone(&self.provider);
        // Call in a blocking context since LlmProvider is not async
        let call = tokio::task::spawn_blocking(move || {
            llm.generate_structured(&[ChatMessage::user(prompt)], &constraint)
                .map_err(|e| PipelineError::Llm(e.to_string()))
        });

        let response = timeout(self.call_timeout, call)
            .await
            .map_err(|_| PipelineError::Timeout(self.call_timeout.as_secs()))?
            .map_err(|e| PipelineError::Llm(format!("Task join error: {}", e)))??;

        trace!(response = %response, "model response");
        Ok(response)
    }
}
