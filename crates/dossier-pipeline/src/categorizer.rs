//! Assign each section exactly one category from the registry

use crate::error::PipelineError;
use crate::model::ModelClient;
use crate::parser::parse_category;
use crate::prompt::categorization_prompt;
use crate::schema::SchemaRegistry;
use dossier_domain::category::{
    BUSINESS_ACTIVITIES, COMPANY_FORMATION, COMPLIANCE_CHECKS, FINANCIAL_DOCUMENTS,
};
use dossier_domain::traits::LlmProvider;
use dossier_domain::{CategoryId, ResponseConstraint, Section};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keyword groups checked in priority order when the model is no help
const KEYWORD_CASCADE: &[(&[&str], &str)] = &[
    (&["license", "certificate", "registration"], COMPANY_FORMATION),
    (&["invoice", "contract", "agreement"], BUSINESS_ACTIVITIES),
    (&["compliance", "check", "verification"], COMPLIANCE_CHECKS),
    (&["financial", "statement", "balance"], FINANCIAL_DOCUMENTS),
];

/// First cascade category whose keywords occur in `content`.
///
/// Targets missing from `registry` are skipped so the result is always a
/// registry member.
pub fn keyword_category(content: &str, registry: &SchemaRegistry) -> Option<CategoryId> {
    let lowered = content.to_lowercase();
    KEYWORD_CASCADE
        .iter()
        .filter(|(_, target)| registry.contains(target))
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, target)| CategoryId::new(target))
}

/// Model-backed classifier with a deterministic fallback
pub struct Categorizer<L> {
    model: ModelClient<L>,
    registry: Arc<SchemaRegistry>,
    default_category: CategoryId,
}

impl<L> Categorizer<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    /// Create a categorizer over `registry`.
    ///
    /// `default_category` is used when neither the model nor the keyword
    /// cascade settles on a member. If it is not itself a member, the
    /// lexicographically first category takes its place.
    ///
    /// # Errors
    ///
    /// An empty registry is a [`PipelineError::Configuration`] error.
    pub fn new(
        model: ModelClient<L>,
        registry: Arc<SchemaRegistry>,
        default_category: &str,
    ) -> Result<Self, PipelineError> {
        let requested = CategoryId::new(default_category);
        let default_category = if registry.contains(requested.as_str()) {
            requested
        } else {
            let first = registry.categories().next().cloned().ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "no category schemas found in {:?}",
                    registry.dir()
                ))
            })?;
            warn!(
                "Default category '{}' has no schema, falling back to '{}'",
                requested, first
            );
            first
        };

        Ok(Self {
            model,
            registry,
            default_category,
        })
    }

    /// Category used when nothing else matches
    pub fn default_category(&self) -> &CategoryId {
        &self.default_category
    }

    /// Pick a category for `section`. Always returns a registry member.
    pub async fn categorize(&self, section: &Section) -> CategoryId {
        let values = self.registry.category_names();
        let prompt = categorization_prompt(section.content(), &values);
        let constraint = ResponseConstraint::Enum {
            field: "category".to_string(),
            values,
        };

        match self.model.complete(prompt, constraint).await {
            Ok(response) => match parse_category(&response).map(CategoryId::new) {
                Some(category) if self.registry.contains(category.as_str()) => {
                    debug!(
                        "Categorized lines {}-{} as '{}'",
                        section.start_line(),
                        section.end_line(),
                        category
                    );
                    return category;
                }
                Some(category) => {
                    warn!("Model returned unknown category '{}', using keyword fallback", category)
                }
                None => warn!("Unparsable categorization response, using keyword fallback"),
            },
            Err(e) => warn!("Categorization failed ({}), using keyword fallback", e),
        }

        self.fallback(section.content())
    }

    /// Keyword cascade, then the default category
    pub fn fallback(&self, content: &str) -> CategoryId {
        keyword_category(content, &self.registry).unwrap_or_else(|| self.default_category.clone())
    }
}
