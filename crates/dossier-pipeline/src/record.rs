//! Records produced by schema-guided extraction

use dossier_domain::CategoryId;
use serde_json::{json, Value};

/// Structured payload of an extracted record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordContent {
    /// JSON returned by the model for the category's schema
    Structured(Value),
    /// The model's answer could not be parsed
    ParseFailed,
}

impl RecordContent {
    /// Persisted form; parse failures become `{"error": "parse_failed"}`
    pub fn to_value(&self) -> Value {
        match self {
            RecordContent::Structured(value) => value.clone(),
            RecordContent::ParseFailed => json!({"error": "parse_failed"}),
        }
    }

    /// Whether this is the parse-failure sentinel
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, RecordContent::ParseFailed)
    }
}

/// Result of extracting one categorized section
///
/// The category is bound at construction and never reassigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    category: CategoryId,
    content: RecordContent,
    violations: Vec<String>,
}

impl ExtractedRecord {
    /// Record for a parsed response, with the schema check's findings
    pub fn structured(category: CategoryId, value: Value, violations: Vec<String>) -> Self {
        Self {
            category,
            content: RecordContent::Structured(value),
            violations,
        }
    }

    /// Sentinel record for an unparsable response
    pub fn parse_failed(category: CategoryId, reason: impl Into<String>) -> Self {
        Self {
            category,
            content: RecordContent::ParseFailed,
            violations: vec![reason.into()],
        }
    }

    /// Category the record was extracted for
    pub fn category(&self) -> &CategoryId {
        &self.category
    }

    /// Extracted payload
    pub fn content(&self) -> &RecordContent {
        &self.content
    }

    /// True when the payload parsed and passed the schema check
    pub fn validated(&self) -> bool {
        !self.content.is_parse_failure() && self.violations.is_empty()
    }

    /// Schema check findings (or the parse error for the sentinel)
    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_value() {
        let record =
            ExtractedRecord::parse_failed(CategoryId::new("company_formation"), "expected value");
        assert_eq!(record.content().to_value(), json!({"error": "parse_failed"}));
        assert!(!record.validated());
    }

    #[test]
    fn test_validated_flag() {
        let ok = ExtractedRecord::structured(CategoryId::new("a"), json!({"x": 1}), vec![]);
        assert!(ok.validated());

        let loose = ExtractedRecord::structured(
            CategoryId::new("a"),
            json!({}),
            vec!["missing required field 'x'".to_string()],
        );
        assert!(!loose.validated());
        assert_eq!(loose.content().to_value(), json!({}));
    }
}
