//! Per-file state machine, cache short-circuit and directory driver

use crate::artifact::{AggregatedResultSet, ArtifactSection, ProcessedFileArtifact};
use crate::categorizer::Categorizer;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::model::ModelClient;
use crate::schema::SchemaRegistry;
use crate::segmenter::Segmenter;
use crate::store::ArtifactStore;
use crate::summarizer::Summarizer;
use dossier_domain::traits::LlmProvider;
use dossier_extract::{
    extension_of, system_renderer, ExtractorGateway, PageRenderer, PdfiumRenderer,
};
use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Extension of data-interchange files that share the input directory
const DATA_INTERCHANGE_EXTENSION: &str = "json";

/// Where a file is in its trip through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Nothing done yet
    Unseen,
    /// A valid cached artifact was found
    CacheHit,
    /// Raw text is available
    TextExtracted,
    /// Text split into sections
    Segmented,
    /// Every section has a category
    Categorized,
    /// Every section has a record
    Extracted,
    /// Sidecar and artifact written (or reused)
    Persisted,
    /// Abandoned; nothing persisted
    Failed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileState::Unseen => "unseen",
            FileState::CacheHit => "cache-hit",
            FileState::TextExtracted => "text-extracted",
            FileState::Segmented => "segmented",
            FileState::Categorized => "categorized",
            FileState::Extracted => "extracted",
            FileState::Persisted => "persisted",
            FileState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn transition(path: &Path, from: FileState, to: FileState) -> FileState {
    debug!("{:?}: {} -> {}", path, from, to);
    to
}

/// What happened to one input file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Driven through every stage and persisted
    Processed(ProcessedFileArtifact),
    /// Served from the cache without any model call
    Cached(ProcessedFileArtifact),
    /// Deliberately not processed
    Skipped(String),
    /// Abandoned after an error
    Failed(String),
}

impl FileOutcome {
    /// The artifact, for processed and cached files
    pub fn artifact(&self) -> Option<&ProcessedFileArtifact> {
        match self {
            FileOutcome::Processed(artifact) | FileOutcome::Cached(artifact) => Some(artifact),
            FileOutcome::Skipped(_) | FileOutcome::Failed(_) => None,
        }
    }
}

/// Outcome for one file of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    /// Input file
    pub path: PathBuf,
    /// What happened to it
    pub outcome: FileOutcome,
}

/// Result of a directory run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Per-file outcomes, in enumeration order
    pub files: Vec<FileReport>,
    /// Sections of every successful artifact, folded by category
    pub results: AggregatedResultSet,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    /// Files driven through the pipeline this run
    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Processed(_)))
    }

    /// Files served from the cache
    pub fn cached(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Cached(_)))
    }

    /// Files deliberately skipped
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    /// Files abandoned after an error
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    /// Artifacts of processed and cached files
    pub fn artifacts(&self) -> impl Iterator<Item = &ProcessedFileArtifact> {
        self.files.iter().filter_map(|f| f.outcome.artifact())
    }

    /// Write the aggregated result set as JSON
    pub fn write_results(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.results.to_json()?)?;
        Ok(())
    }
}

/// Drives files through extraction, segmentation, categorization and
/// schema-guided extraction, persisting the results.
///
/// Files are processed one at a time, each to completion before the next.
pub struct Pipeline<L> {
    config: PipelineConfig,
    registry: Arc<SchemaRegistry>,
    gateway: Arc<ExtractorGateway>,
    segmenter: Segmenter<L>,
    categorizer: Categorizer<L>,
    summarizer: Summarizer<L>,
    store: ArtifactStore,
}

impl<L> Pipeline<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    /// Build a pipeline from configuration.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] for an invalid configuration, a
    /// missing schema directory or one without schemas, or a `pdfium_dir`
    /// that holds no loadable pdfium library.
    pub fn new(config: PipelineConfig, provider: Arc<L>) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Configuration)?;
        let registry = Arc::new(SchemaRegistry::load(&config.schema_dir)?);
        let renderer = match &config.pdfium_dir {
            Some(dir) => {
                let renderer = PdfiumRenderer::from_directory(dir)
                    .map_err(|e| PipelineError::Configuration(e.to_string()))?;
                Some(Arc::new(renderer) as Arc<dyn PageRenderer>)
            }
            None => system_renderer(),
        };
        let gateway =
            ExtractorGateway::with_renderer(Arc::clone(&provider), config.ocr_min_chars, renderer);
        Self::with_parts(config, registry, gateway, provider)
    }

    /// Build a pipeline around an existing registry and gateway
    pub fn with_parts(
        config: PipelineConfig,
        registry: Arc<SchemaRegistry>,
        gateway: ExtractorGateway,
        provider: Arc<L>,
    ) -> Result<Self, PipelineError> {
        if registry.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "no category schemas found in {:?}",
                config.schema_dir
            )));
        }

        let model = ModelClient::new(provider, config.call_timeout());
        let categorizer =
            Categorizer::new(model.clone(), Arc::clone(&registry), &config.default_category)?;
        let store = ArtifactStore::new(&config.text_output_dir, &config.json_output_dir);

        Ok(Self {
            segmenter: Segmenter::new(model.clone()),
            summarizer: Summarizer::new(model, Arc::clone(&registry)),
            categorizer,
            gateway: Arc::new(gateway),
            registry,
            store,
            config,
        })
    }

    /// The loaded taxonomy
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The artifact store
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drive one file through the state machine.
    ///
    /// Returns [`FileOutcome::Cached`] without any model call when a valid
    /// sidecar and artifact already exist, and [`FileOutcome::Skipped`] for
    /// data-interchange files.
    pub async fn process_file(&self, path: &Path) -> Result<FileOutcome, PipelineError> {
        let state = FileState::Unseen;

        if extension_of(path).as_deref() == Some(DATA_INTERCHANGE_EXTENSION) {
            debug!("Skipping data file {:?}", path);
            return Ok(FileOutcome::Skipped("data-interchange file".to_string()));
        }

        if let Some(artifact) = self.store.load_cached(path)? {
            let state = transition(path, state, FileState::CacheHit);
            transition(path, state, FileState::Persisted);
            info!("Using cached artifact for {:?}", path);
            return Ok(FileOutcome::Cached(artifact));
        }

        info!("Processing {:?}", path);
        let text = self.extract_text(path).await?;
        let state = transition(path, state, FileState::TextExtracted);

        let mut sections = self.segmenter.identify_sections(&text).await?;
        let state = transition(path, state, FileState::Segmented);

        for section in &mut sections {
            let category = self.categorizer.categorize(section).await;
            section
                .assign_category(category)
                .map_err(|e| PipelineError::FileProcessing {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }
        let state = transition(path, state, FileState::Categorized);

        let mut artifact_sections = Vec::with_capacity(sections.len());
        for section in &sections {
            match self.summarizer.summarize(section).await {
                Ok(record) => {
                    artifact_sections.push(ArtifactSection::from_record(section, &record))
                }
                Err(PipelineError::InvalidCategory(category)) => warn!(
                    "Skipping lines {}-{} of {:?}: invalid category '{}'",
                    section.start_line(),
                    section.end_line(),
                    path,
                    category
                ),
                Err(e) => return Err(e),
            }
        }
        let artifact = ProcessedFileArtifact {
            source_file: path.display().to_string(),
            sections: artifact_sections,
        };
        let state = transition(path, state, FileState::Extracted);

        self.store.save(path, &text, &artifact)?;
        transition(path, state, FileState::Persisted);

        info!("Processed {:?}: {} sections", path, artifact.sections.len());
        Ok(FileOutcome::Processed(artifact))
    }

    /// Process the configured input directory
    pub async fn process_directory(&self) -> Result<BatchReport, PipelineError> {
        self.process_dir(&self.config.input_dir).await
    }

    /// Process every recognized file in `dir`, in enumeration order.
    ///
    /// A failing file is logged and reported; it never aborts the batch.
    ///
    /// # Errors
    ///
    /// Only if `dir` itself cannot be read.
    pub async fn process_dir(&self, dir: &Path) -> Result<BatchReport, PipelineError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PipelineError::Configuration(format!("input directory {:?} unavailable: {}", dir, e))
        })?;

        let mut report = BatchReport::default();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("Unreadable entry in {:?}: {}", dir, e);
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let is_data_file = extension_of(&path).as_deref() == Some(DATA_INTERCHANGE_EXTENSION);
            if !is_data_file && !self.gateway.supports(&path) {
                debug!("Ignoring unrecognized file {:?}", path);
                continue;
            }

            let outcome = match self.process_file(&path).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    transition(&path, FileState::Unseen, FileState::Failed);
                    error!("Failed to process {:?}: {}", path, e);
                    FileOutcome::Failed(e.to_string())
                }
            };
            if let Some(artifact) = outcome.artifact() {
                report.results.add_artifact(artifact);
            }
            report.files.push(FileReport { path, outcome });
        }

        info!(
            "Batch complete: {} processed, {} cached, {} skipped, {} failed",
            report.processed(),
            report.cached(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Run the extractor gateway off the async runtime
    async fn extract_text(&self, path: &Path) -> Result<String, PipelineError> {
        let gateway = Arc::clone(&self.gateway);
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || gateway.extract(&owned))
            .await
            .map_err(|e| PipelineError::FileProcessing {
                path: path.to_path_buf(),
                reason: format!("extraction task failed: {}", e),
            })??;
        debug!("Extracted {} chars", text.len());
        Ok(text)
    }
}
