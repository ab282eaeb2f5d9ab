//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{ChatMessage, ResponseConstraint};

/// Trait for language-model backend operations
///
/// Implemented by the infrastructure layer (dossier-llm). Calls are blocking;
/// async callers are expected to move them onto a blocking thread.
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a single completion for a list of messages
    fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error>;

    /// Generate with a structured-output constraint (if supported)
    ///
    /// Backends without structured output may ignore the constraint; callers
    /// must still parse defensively.
    fn generate_structured(
        &self,
        messages: &[ChatMessage],
        constraint: &ResponseConstraint,
    ) -> Result<String, Self::Error>;

    /// Name of the model serving requests
    fn model_name(&self) -> &str;
}

impl<T: LlmProvider + ?Sized> LlmProvider for std::sync::Arc<T> {
    type Error = T::Error;

    fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        (**self).generate(messages)
    }

    fn generate_structured(
        &self,
        messages: &[ChatMessage],
        constraint: &ResponseConstraint,
    ) -> Result<String, Self::Error> {
        (**self).generate_structured(messages, constraint)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
