//! Persisted per-file artifacts and the cross-file aggregate

use crate::record::ExtractedRecord;
use dossier_domain::Section;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Line-range and validation details for one artifact section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMetadata {
    /// First line (1-based, inclusive)
    pub start_line: usize,
    /// Last line (1-based, inclusive)
    pub end_line: usize,
    /// Segmentation description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the content passed the schema check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated: Option<bool>,
    /// Schema check findings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

/// One categorized, extracted section of a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSection {
    /// Category name
    pub category: String,
    /// Extracted record (an object, or the parse-failure sentinel)
    pub content: Value,
    /// Raw section text
    pub text: String,
    /// Line range and validation details
    pub metadata: SectionMetadata,
}

impl ArtifactSection {
    /// Combine a section with the record extracted from it
    pub fn from_record(section: &Section, record: &ExtractedRecord) -> Self {
        Self {
            category: record.category().to_string(),
            content: record.content().to_value(),
            text: section.content().to_string(),
            metadata: SectionMetadata {
                start_line: section.start_line(),
                end_line: section.end_line(),
                description: section.description().map(str::to_string),
                validated: Some(record.validated()),
                violations: record.violations().to_vec(),
            },
        }
    }
}

/// Everything extracted from one source file; the cache value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFileArtifact {
    /// Path of the source document
    pub source_file: String,
    /// Sections in segmentation order
    pub sections: Vec<ArtifactSection>,
}

impl ProcessedFileArtifact {
    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a persisted artifact
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One record in the aggregate, with enough provenance for a footnote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEntry {
    /// Path of the source document
    pub source_file: String,
    /// Extracted record
    pub content: Value,
    /// First line (1-based, inclusive)
    pub start_line: usize,
    /// Last line (1-based, inclusive)
    pub end_line: usize,
}

/// Category → records, folded from every artifact of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedResultSet {
    categories: BTreeMap<String, Vec<AggregatedEntry>>,
}

impl AggregatedResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every section of `artifact` under its category
    pub fn add_artifact(&mut self, artifact: &ProcessedFileArtifact) {
        for section in &artifact.sections {
            self.categories
                .entry(section.category.clone())
                .or_default()
                .push(AggregatedEntry {
                    source_file: artifact.source_file.clone(),
                    content: section.content.clone(),
                    start_line: section.metadata.start_line,
                    end_line: section.metadata.end_line,
                });
        }
    }

    /// Records filed under `category`
    pub fn get(&self, category: &str) -> &[AggregatedEntry] {
        self.categories.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories with at least one record, in lexicographic order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Whether no record has been added
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a result set written by [`Self::to_json`]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl<'a> FromIterator<&'a ProcessedFileArtifact> for AggregatedResultSet {
    fn from_iter<I: IntoIterator<Item = &'a ProcessedFileArtifact>>(artifacts: I) -> Self {
        let mut results = Self::new();
        for artifact in artifacts {
            results.add_artifact(artifact);
        }
        results
    }
}
