//! Dossier CLI - Command-line entry point for the document pipeline.

use clap::Parser;
use dossier_cli::commands;
use dossier_cli::{Cli, Command, Config, Formatter};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; RUST_LOG wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn run(cli: Cli) -> dossier_cli::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Report(args) => {
            config.apply_report_args(&args);
            let output = args.output.as_deref();
            commands::execute_report(&config.pipeline, &args.title, output, &formatter)?;
        }
        Command::Schemas(args) => {
            config.apply_schemas_args(&args);
            commands::execute_schemas(&config.pipeline.schema_dir, &formatter)?;
        }
        Command::Process(args) => {
            config.apply_process_args(&args);
            config.validate()?;

            // The blocking HTTP client is created and dropped outside the runtime
            let provider = Arc::new(commands::provider_from_config(&config.llm)?);
            let runtime = tokio::runtime::Runtime::new()?;
            let report = runtime.block_on(commands::execute_process(
                &config.pipeline,
                Arc::clone(&provider),
                &formatter,
            ))?;
            drop(runtime);

            if report.failed() > 0 {
                return Err(dossier_cli::CliError::FilesFailed(report.failed()));
            }
        }
    }

    Ok(())
}
