//! Report command implementation.

use crate::error::{CliError, Result};
use crate::output::Formatter;
use dossier_pipeline::{render_report, AggregatedResultSet, ArtifactStore, PipelineConfig};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Records to report on: the aggregate file when present, else every
/// artifact in the JSON output directory.
pub fn load_results(config: &PipelineConfig) -> Result<AggregatedResultSet> {
    if let Some(path) = config.aggregate_output.as_deref().filter(|p| p.is_file()) {
        debug!("Reading aggregated results from {:?}", path);
        return Ok(AggregatedResultSet::from_json(&fs::read_to_string(path)?)?);
    }

    if !config.json_output_dir.is_dir() {
        return Err(CliError::Config(format!(
            "no aggregate file and no artifact directory at {:?}; run `dossier process` first",
            config.json_output_dir
        )));
    }

    debug!("Folding artifacts from {:?}", config.json_output_dir);
    let store = ArtifactStore::new(&config.text_output_dir, &config.json_output_dir);
    let artifacts = store.load_all()?;
    Ok(artifacts.iter().collect())
}

/// Execute the report command.
///
/// Prints the markdown to stdout, or writes it to `output` and prints a
/// confirmation.
pub fn execute_report(
    config: &PipelineConfig,
    title: &str,
    output: Option<&Path>,
    formatter: &Formatter,
) -> Result<String> {
    let results = load_results(config)?;
    let markdown = render_report(&results, title);

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &markdown)?;
            info!("Wrote report for {} records to {:?}", results.len(), path);
            println!("{}", formatter.format_report_written(path, results.len())?);
        }
        None => print!("{}", markdown),
    }

    Ok(markdown)
}
