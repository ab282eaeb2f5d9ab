//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use dossier_pipeline::{BatchReport, CategorySchema, FileOutcome, SchemaRegistry};
use serde_json::{json, Value};
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

fn status_label(outcome: &FileOutcome) -> &'static str {
    match outcome {
        FileOutcome::Processed(_) => "processed",
        FileOutcome::Cached(_) => "cached",
        FileOutcome::Skipped(_) => "skipped",
        FileOutcome::Failed(_) => "failed",
    }
}

fn required_fields(schema: &CategorySchema) -> Vec<String> {
    schema
        .document()
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the outcome of a directory run.
    pub fn format_report(&self, report: &BatchReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_report_json(report),
            OutputFormat::Table => Ok(self.format_report_table(report)),
            OutputFormat::Quiet => Ok(format!(
                "processed={} cached={} skipped={} failed={}",
                report.processed(),
                report.cached(),
                report.skipped(),
                report.failed()
            )),
        }
    }

    fn format_report_json(&self, report: &BatchReport) -> Result<String> {
        let files: Vec<Value> = report
            .files
            .iter()
            .map(|f| {
                let detail = match &f.outcome {
                    FileOutcome::Skipped(reason) | FileOutcome::Failed(reason) => {
                        Some(reason.as_str())
                    }
                    _ => None,
                };
                json!({
                    "file": f.path.display().to_string(),
                    "status": status_label(&f.outcome),
                    "sections": f.outcome.artifact().map(|a| a.sections.len()),
                    "detail": detail,
                })
            })
            .collect();

        let summary = json!({
            "processed": report.processed(),
            "cached": report.cached(),
            "skipped": report.skipped(),
            "failed": report.failed(),
            "records": report.results.len(),
            "files": files,
        });
        Ok(serde_json::to_string_pretty(&summary)?)
    }

    fn format_report_table(&self, report: &BatchReport) -> String {
        if report.files.is_empty() {
            return self.warning("No input files found.");
        }

        let mut builder = Builder::default();
        builder.push_record(["File", "Status", "Sections", "Detail"]);

        for file in &report.files {
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.path.display().to_string());
            let sections = file
                .outcome
                .artifact()
                .map(|a| a.sections.len().to_string())
                .unwrap_or_default();
            let detail = match &file.outcome {
                FileOutcome::Skipped(reason) | FileOutcome::Failed(reason) => reason.clone(),
                _ => String::new(),
            };
            builder.push_record([name, self.status(&file.outcome), sections, detail]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let totals = format!(
            "{} processed, {} cached, {} skipped, {} failed ({} records)",
            report.processed(),
            report.cached(),
            report.skipped(),
            report.failed(),
            report.results.len()
        );
        let totals = if report.failed() > 0 {
            self.error(&totals)
        } else {
            self.success(&totals)
        };

        format!("{}\n{}", table, totals)
    }

    /// Format the loaded taxonomy.
    pub fn format_schemas(&self, registry: &SchemaRegistry) -> Result<String> {
        let schemas = registry.categories().filter_map(|c| registry.get(c.as_str()));

        match self.format {
            OutputFormat::Json => {
                let entries: Vec<Value> = schemas
                    .map(|s| json!({"category": s.name().as_str(), "required": required_fields(s)}))
                    .collect();
                Ok(serde_json::to_string_pretty(&entries)?)
            }
            OutputFormat::Quiet => Ok(registry.category_names().join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Category", "Required fields"]);
                for schema in schemas {
                    builder.push_record([
                        schema.name().to_string(),
                        required_fields(schema).join(", "),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));

                let summary =
                    format!("{} categories in {}", registry.len(), registry.dir().display());
                Ok(format!("{}\n{}", table, self.info(&summary)))
            }
        }
    }

    /// Confirm where a rendered report was written.
    pub fn format_report_written(&self, path: &Path, records: usize) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "report": path.display().to_string(),
                "records": records,
            }))?),
            OutputFormat::Quiet => Ok(path.display().to_string()),
            OutputFormat::Table => Ok(self.success(&format!(
                "Report with {} records written to {}",
                records,
                path.display()
            ))),
        }
    }

    fn status(&self, outcome: &FileOutcome) -> String {
        let label = status_label(outcome);
        match outcome {
            FileOutcome::Processed(_) => self.colorize(label, "green"),
            FileOutcome::Cached(_) => self.colorize(label, "cyan"),
            FileOutcome::Skipped(_) => self.colorize(label, "yellow"),
            FileOutcome::Failed(_) => self.colorize(label, "red"),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}
