//! Schemas command implementation.

use crate::error::Result;
use crate::output::Formatter;
use dossier_pipeline::{PipelineError, SchemaRegistry};
use std::path::Path;

/// Execute the schemas command.
pub fn execute_schemas(schema_dir: &Path, formatter: &Formatter) -> Result<()> {
    let registry = SchemaRegistry::load(schema_dir)?;
    if registry.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "no category schemas found in {:?}",
            schema_dir
        ))
        .into());
    }

    println!("{}", formatter.format_schemas(&registry)?);
    Ok(())
}
