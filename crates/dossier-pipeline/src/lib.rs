//! Dossier Pipeline
//!
//! Turns a folder of scanned and typed evidence into structured, per-category
//! records.
//!
//! # Overview
//!
//! Each input file is driven through a fixed sequence of stages. Text is
//! extracted, split into the documents it contains, each section is assigned
//! one category from the schema-defined taxonomy, and the category's schema
//! guides a structured extraction. Results are persisted per file and reused
//! on later runs without any model call.
//!
//! # Architecture
//!
//! ```text
//! file → ExtractorGateway → Segmenter → Categorizer → Summarizer → ArtifactStore
//!                                                                      ↓
//!                                                           AggregatedResultSet
//!                                                                      ↓
//!                                                     render_report (footnoted markdown)
//! ```
//!
//! # Key Features
//!
//! - **Closed taxonomy**: categories come only from the schema directory; a
//!   keyword cascade and a default keep classification inside it
//! - **Graceful degradation**: unparsable segmentations fall back to the whole
//!   text, unparsable extractions become `{"error": "parse_failed"}` records
//! - **Per-file isolation**: a failing file is reported and the batch goes on
//! - **Idempotent runs**: a text sidecar plus a parsable JSON artifact is a
//!   cache hit
//!
//! # Example Usage
//!
//! ```no_run
//! use dossier_llm::MockProvider;
//! use dossier_pipeline::{Pipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(MockProvider::default()))?;
//! let report = pipeline.process_directory().await?;
//!
//! println!("Processed: {}", report.processed());
//! println!("Cached: {}", report.cached());
//! println!("Failed: {}", report.failed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod artifact;
mod categorizer;
mod config;
mod error;
mod model;
mod parser;
mod processor;
mod prompt;
mod record;
mod references;
mod report;
mod schema;
mod segmenter;
mod store;
mod summarizer;

pub use artifact::{
    AggregatedEntry, AggregatedResultSet, ArtifactSection, ProcessedFileArtifact, SectionMetadata,
};
pub use categorizer::{keyword_category, Categorizer};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use model::ModelClient;
pub use processor::{BatchReport, FileOutcome, FileReport, FileState, Pipeline};
pub use record::{ExtractedRecord, RecordContent};
pub use references::{reference_marker, ReferenceIndex};
pub use report::{render_report, tidy_markdown};
pub use schema::{CategorySchema, SchemaRegistry};
pub use segmenter::Segmenter;
pub use store::ArtifactStore;
pub use summarizer::Summarizer;
