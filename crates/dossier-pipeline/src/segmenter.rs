//! Split raw text into line-range sections

use crate::error::PipelineError;
use crate::model::ModelClient;
use crate::parser::{parse_sections, SectionBounds};
use crate::prompt::{segmentation_prompt, SEGMENTATION_SCHEMA};
use dossier_domain::traits::LlmProvider;
use dossier_domain::{ResponseConstraint, Section};
use std::fmt::Display;
use tracing::{debug, warn};

/// Asks the model where the embedded documents of a text blob begin and end
pub struct Segmenter<L> {
    model: ModelClient<L>,
}

impl<L> Segmenter<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    /// Create a segmenter
    pub fn new(model: ModelClient<L>) -> Self {
        Self { model }
    }

    /// Split `text` into ordered, uncategorized sections.
    ///
    /// Content is always sliced from `text` itself. An unparsable response,
    /// or one with no usable range, yields a single section spanning every
    /// line. Backend failures are returned to the caller.
    pub async fn identify_sections(&self, text: &str) -> Result<Vec<Section>, PipelineError> {
        let prompt = segmentation_prompt(text);
        debug!("Segmentation prompt length: {} chars", prompt.len());

        let constraint = ResponseConstraint::JsonSchema {
            name: "document_sections".to_string(),
            schema: SEGMENTATION_SCHEMA.to_string(),
        };
        let response = self.model.complete(prompt, constraint).await?;

        let sections = match parse_sections(&response) {
            Ok(bounds) => build_sections(text, &bounds),
            Err(e) => {
                warn!("Segmentation response unparsable, using whole text: {}", e);
                Vec::new()
            }
        };

        if sections.is_empty() {
            return Ok(vec![whole_text_section(text)]);
        }
        debug!("Identified {} sections", sections.len());
        Ok(sections)
    }
}

/// Turn model-reported bounds into sections, dropping unusable ranges
pub fn build_sections(text: &str, bounds: &[SectionBounds]) -> Vec<Section> {
    let lines: Vec<&str> = text.split('\n').collect();
    let total = lines.len();

    bounds
        .iter()
        .filter_map(|b| {
            let (Ok(start), Ok(end)) =
                (usize::try_from(b.start_line), usize::try_from(b.end_line))
            else {
                warn!("Dropping section with range {}..{}", b.start_line, b.end_line);
                return None;
            };
            if start == 0 || end < start {
                warn!("Dropping section with range {}..{}", start, end);
                return None;
            }
            if start > total {
                warn!("Dropping section starting at line {} past the end ({} lines)", start, total);
                return None;
            }

            let content = lines[start - 1..end.min(total)].join("\n");
            let section = Section::new(content, start, end).ok()?;
            if b.description.is_empty() {
                Some(section)
            } else {
                Some(section.with_description(b.description.clone()))
            }
        })
        .collect()
}

/// Single section covering lines `1..=N` of `text`
pub fn whole_text_section(text: &str) -> Section {
    let total = text.split('\n').count();
    Section::spanning(text, total)
}
