//! Dossier LLM Provider Layer
//!
//! Pluggable language-model backends behind the `LlmProvider` trait from
//! `dossier-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic scripted provider for testing
//! - `OpenAiProvider`: Chat-completions HTTP API (text, vision, structured output)
//!
//! # Examples
//!
//! ```
//! use dossier_llm::MockProvider;
//! use dossier_domain::traits::LlmProvider;
//! use dossier_domain::ChatMessage;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate(&[ChatMessage::user("test prompt")]).unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod openai;

use dossier_domain::traits::LlmProvider as LlmProviderTrait;
use dossier_domain::{ChatMessage, ResponseConstraint};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use openai::{OpenAiConfig, OpenAiProvider};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Request exceeded its time budget
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// No credential configured for the backend
    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// A request observed by [`MockProvider`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Concatenated text of all messages
    pub text: String,
    /// Constraint passed with the request
    pub constraint: ResponseConstraint,
    /// Whether any message carried an image part
    pub had_image: bool,
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error,
}

#[derive(Debug, Clone)]
struct MockRule {
    needles: Vec<String>,
    reply: MockReply,
}

/// Mock LLM provider for deterministic testing
///
/// Responses are scripted with substring rules: the first rule whose needles
/// all occur in the request text wins, otherwise the default response is
/// returned. No network calls are made.
///
/// # Examples
///
/// ```
/// use dossier_llm::MockProvider;
/// use dossier_domain::traits::LlmProvider;
/// use dossier_domain::ChatMessage;
///
/// let mut provider = MockProvider::default();
/// provider.add_response("weather", "sunny");
/// provider.add_response_all(&["invoice", "total"], "42");
///
/// assert_eq!(provider.generate(&[ChatMessage::user("the weather today")]).unwrap(), "sunny");
/// assert_eq!(provider.generate(&[ChatMessage::user("invoice total due")]).unwrap(), "42");
/// assert_eq!(provider.call_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    rules: Arc<Mutex<Vec<MockRule>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            rules: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Respond with `response` whenever the request text contains `needle`
    pub fn add_response(&mut self, needle: impl Into<String>, response: impl Into<String>) {
        lock(&self.rules).push(MockRule {
            needles: vec![needle.into()],
            reply: MockReply::Text(response.into()),
        });
    }

    /// Respond with `response` whenever the request text contains every needle
    pub fn add_response_all(&mut self, needles: &[&str], response: impl Into<String>) {
        lock(&self.rules).push(MockRule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply: MockReply::Text(response.into()),
        });
    }

    /// Fail whenever the request text contains `needle`
    pub fn add_error(&mut self, needle: impl Into<String>) {
        lock(&self.rules).push(MockRule {
            needles: vec![needle.into()],
            reply: MockReply::Error,
        });
    }

    /// Get the number of times the provider was called
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Reset the call count and recorded requests
    pub fn reset_call_count(&self) {
        lock(&self.requests).clear();
    }

    /// Snapshot of every request seen so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    fn respond(
        &self,
        messages: &[ChatMessage],
        constraint: &ResponseConstraint,
    ) -> Result<String, LlmError> {
        let text = messages
            .iter()
            .map(ChatMessage::text)
            .collect::<Vec<_>>()
            .join("\n");
        let had_image = messages.iter().any(ChatMessage::has_image);

        let reply = lock(&self.rules)
            .iter()
            .find(|rule| rule.needles.iter().all(|needle| text.contains(needle.as_str())))
            .map(|rule| rule.reply.clone());

        lock(&self.requests).push(RecordedRequest {
            text,
            constraint: constraint.clone(),
            had_image,
        });

        match reply {
            Some(MockReply::Text(response)) => Ok(response),
            Some(MockReply::Error) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        self.respond(messages, &ResponseConstraint::None)
    }

    fn generate_structured(
        &self,
        messages: &[ChatMessage],
        constraint: &ResponseConstraint,
    ) -> Result<String, Self::Error> {
        self.respond(messages, constraint)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
