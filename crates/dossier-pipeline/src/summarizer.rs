//! Schema-guided extraction of structured records

use crate::error::PipelineError;
use crate::model::ModelClient;
use crate::parser::parse_record;
use crate::prompt::extraction_prompt;
use crate::record::ExtractedRecord;
use crate::schema::SchemaRegistry;
use dossier_domain::traits::LlmProvider;
use dossier_domain::{ResponseConstraint, Section};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fills a category's schema from a section's text
pub struct Summarizer<L> {
    model: ModelClient<L>,
    registry: Arc<SchemaRegistry>,
}

impl<L> Summarizer<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    /// Create a summarizer over `registry`
    pub fn new(model: ModelClient<L>, registry: Arc<SchemaRegistry>) -> Self {
        Self { model, registry }
    }

    /// Extract a record for a categorized section.
    ///
    /// An unparsable answer yields the parse-failure sentinel rather than an
    /// error. Schema conformance is checked but not enforced: non-conforming
    /// records are returned with `validated() == false`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidCategory`] if the section has no category or
    ///   one without a schema
    /// - backend errors and timeouts from the model call
    pub async fn summarize(&self, section: &Section) -> Result<ExtractedRecord, PipelineError> {
        let category = section
            .category()
            .ok_or_else(|| PipelineError::InvalidCategory("<unassigned>".to_string()))?;
        let schema = self
            .registry
            .get(category.as_str())
            .ok_or_else(|| PipelineError::InvalidCategory(category.to_string()))?;

        let prompt = extraction_prompt(section.content(), schema);
        debug!("Extraction prompt for '{}': {} chars", category, prompt.len());

        let constraint = ResponseConstraint::JsonSchema {
            name: category.to_string(),
            schema: schema.document().to_string(),
        };
        let response = self.model.complete(prompt, constraint).await?;

        match parse_record(&response) {
            Ok(value) => {
                let violations = schema.violations(&value);
                if !violations.is_empty() {
                    warn!(
                        "Record for '{}' (lines {}-{}) does not match its schema: {}",
                        category,
                        section.start_line(),
                        section.end_line(),
                        violations.join("; ")
                    );
                }
                Ok(ExtractedRecord::structured(category.clone(), value, violations))
            }
            Err(e) => {
                warn!(
                    "Extraction response for '{}' (lines {}-{}) unparsable: {}",
                    category,
                    section.start_line(),
                    section.end_line(),
                    e
                );
                Ok(ExtractedRecord::parse_failed(category.clone(), e))
            }
        }
    }
}
