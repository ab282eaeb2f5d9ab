//! Process command implementation.

use crate::error::{CliError, Result};
use crate::output::Formatter;
use dossier_domain::traits::LlmProvider;
use dossier_llm::{LlmError, OpenAiConfig, OpenAiProvider};
use dossier_pipeline::{BatchReport, Pipeline, PipelineConfig};
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;

/// Build the HTTP backend, reading the API key from the configured variable.
pub fn provider_from_config(llm: &OpenAiConfig) -> Result<OpenAiProvider> {
    OpenAiProvider::from_env(llm.clone()).map_err(|e| match e {
        LlmError::MissingCredential(var) => CliError::Config(format!(
            "no API key found; set the {} environment variable",
            var
        )),
        other => CliError::Llm(other),
    })
}

/// Execute the process command.
///
/// Runs the whole input directory, writes the aggregated result set when
/// `aggregate_output` is configured and prints the per-file summary.
pub async fn execute_process<L>(
    config: &PipelineConfig,
    provider: Arc<L>,
    formatter: &Formatter,
) -> Result<BatchReport>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    let pipeline = Pipeline::new(config.clone(), provider)?;
    info!(
        "Processing {:?} against {} categories",
        config.input_dir,
        pipeline.registry().len()
    );

    let report = pipeline.process_directory().await?;

    if let Some(path) = &config.aggregate_output {
        report.write_results(path)?;
        info!("Wrote aggregated results to {:?}", path);
    }

    println!("{}", formatter.format_report(&report)?);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    #[test]
    fn test_missing_key_is_configuration_error() {
        let llm = OpenAiConfig {
            api_key_env: "DOSSIER_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..OpenAiConfig::default()
        };

        match provider_from_config(&llm) {
            Err(CliError::Config(msg)) => {
                assert!(msg.contains("DOSSIER_TEST_KEY_THAT_IS_NEVER_SET"))
            }
            Err(other) => panic!("Expected config error, got {:?}", other),
            Ok(_) => panic!("Expected config error, got a provider"),
        }
    }

    #[tokio::test]
    async fn test_missing_schema_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            schema_dir: dir.path().join("no_such_dir"),
            input_dir: dir.path().join("input"),
            ..PipelineConfig::default()
        };
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let provider = Arc::new(dossier_llm::MockProvider::default());
        let result = execute_process(&config, provider, &formatter).await;
        assert!(matches!(
            result,
            Err(CliError::Pipeline(dossier_pipeline::PipelineError::Configuration(_)))
        ));
    }
}
