//! Markdown digest of an aggregated result set.
//!
//! One `##` heading per category and one entry per record, each entry
//! citing where it came from. Citations are written as `[ref:...]` markers
//! and numbered into a `## Footnotes` block by [`ReferenceIndex`].

use crate::artifact::{AggregatedEntry, AggregatedResultSet};
use crate::references::{reference_marker, ReferenceIndex};
use serde_json::Value;

/// Render `results` as a footnoted markdown report titled `title`
pub fn render_report(results: &AggregatedResultSet, title: &str) -> String {
    let mut body = format!("# {}\n\n", title.trim());

    if results.is_empty() {
        body.push_str("_No records were extracted._\n");
        return tidy_markdown(&body);
    }

    for category in results.categories() {
        body.push_str(&format!("## {}\n\n", category_heading(category)));
        for entry in results.get(category) {
            render_entry(&mut body, entry);
        }
    }

    tidy_markdown(&ReferenceIndex::new().process_text(&body))
}

/// `company_formation` -> `Company Formation`
fn category_heading(category: &str) -> String {
    category
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_entry(out: &mut String, entry: &AggregatedEntry) {
    match &entry.content {
        Value::Object(fields) if !fields.is_empty() => {
            for (key, value) in fields {
                out.push_str(&format!("- **{}**: {}\n", key, inline_value(value)));
            }
        }
        Value::Object(_) | Value::Null => out.push_str("- _No fields extracted_\n"),
        other => out.push_str(&format!("- {}\n", inline_value(other))),
    }
    out.push_str(&format!("\nSource: {}\n\n", reference_marker(entry)));
}

/// Single-line rendering of a field value
fn inline_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        Value::Null => "n/a".to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            items.iter().map(inline_value).collect::<Vec<_>>().join(", ")
        }
        other => other.to_string(),
    }
}

/// Normalize `#` headings to one space after the hashes and collapse runs
/// of blank lines to one.
pub fn tidy_markdown(content: &str) -> String {
    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let hashes = trimmed.chars().take_while(|&c| c == '#').count();
            if hashes == 0 {
                return line.to_string();
            }
            let text = trimmed[hashes..].trim();
            format!("{} {}", "#".repeat(hashes), text)
        })
        .collect();

    let mut out = lines.join("\n");
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
