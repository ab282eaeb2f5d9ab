//! Prompts for segmentation, categorization and schema-guided extraction

use crate::schema::CategorySchema;

/// Prefix each line with its 1-based number: `"{n}| {line}"`
pub fn number_lines(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| format!("{}| {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking the model for the line ranges of embedded documents
pub fn segmentation_prompt(text: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str(SEGMENTATION_INSTRUCTIONS);
    prompt.push_str("\n\nText to analyze:\n---\n");
    prompt.push_str(&number_lines(text));
    prompt.push_str("\n---\n\n");
    prompt.push_str(SEGMENTATION_FORMAT);
    prompt
}

/// Prompt asking the model to pick one category for a section
pub fn categorization_prompt(content: &str, categories: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(CATEGORIZATION_INSTRUCTIONS);
    prompt.push_str("\n\nCategories:\n");
    for category in categories {
        prompt.push_str(&format!("- {}\n", category));
    }
    prompt.push_str("\nDocument section:\n---\n");
    prompt.push_str(content);
    prompt.push_str("\n---\n\n");
    prompt.push_str(CATEGORIZATION_FORMAT);
    prompt
}

/// Prompt asking the model to fill a category's schema from a section
pub fn extraction_prompt(content: &str, schema: &CategorySchema) -> String {
    let mut prompt = String::new();
    prompt.push_str(EXTRACTION_INSTRUCTIONS);
    prompt.push_str(&format!("\n\nCategory: {}\nSchema:\n", schema.name()));
    prompt.push_str(&schema.to_pretty());
    prompt.push_str("\n\nDocument content:\n---\n");
    prompt.push_str(content);
    prompt.push_str("\n---\n\n");
    prompt.push_str(EXTRACTION_FORMAT);
    prompt
}

const SEGMENTATION_INSTRUCTIONS: &str = "Identify the distinct documents contained in the \
following text. The text may be several letters, certificates, invoices or statements \
concatenated together. Every line is prefixed with its line number and a '|'.

For each document found, provide:
1. The line number where it starts and the line number where it ends (inclusive)
2. A brief description of what the document is";

const SEGMENTATION_FORMAT: &str = r#"Output format (JSON only, no additional text):
{"sections": [{"start_line": 1, "end_line": 10, "description": "string"}]}"#;

/// JSON schema sent as the structured-output constraint for segmentation
pub const SEGMENTATION_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "sections": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "start_line": {"type": "integer"},
          "end_line": {"type": "integer"},
          "description": {"type": "string"}
        },
        "required": ["start_line", "end_line", "description"],
        "additionalProperties": false
      }
    }
  },
  "required": ["sections"],
  "additionalProperties": false
}"#;

const CATEGORIZATION_INSTRUCTIONS: &str = "Classify the following document section into \
exactly one of the listed categories. Choose the category whose subject matter best fits \
the section as a whole.";

const CATEGORIZATION_FORMAT: &str = r#"Output format (JSON only, no additional text):
{"category": "<one of the categories above>"}"#;

const EXTRACTION_INSTRUCTIONS: &str = "Extract structured information from this document \
according to the following JSON schema. Use only facts stated in the document; use null for \
fields the document does not mention.";

const EXTRACTION_FORMAT: &str = "Return a JSON object that follows the schema exactly, \
with no additional text.";

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_domain::CategoryId;
    use serde_json::json;

    #[test]
    fn test_number_lines() {
        assert_eq!(number_lines("a\nb\n"), "1| a\n2| b\n3| ");
        assert_eq!(number_lines(""), "1| ");
    }

    #[test]
    fn test_segmentation_prompt_contains_numbered_text() {
        let prompt = segmentation_prompt("Dear Sir\nRegards");
        assert!(prompt.starts_with("Identify the distinct documents"));
        assert!(prompt.contains("1| Dear Sir\n2| Regards"));
        assert!(prompt.contains("\"sections\""));
    }

    #[test]
    fn test_segmentation_schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(SEGMENTATION_SCHEMA).unwrap();
        assert_eq!(schema["required"][0], "sections");
    }

    #[test]
    fn test_categorization_prompt_lists_categories() {
        let categories = vec!["business_activities".to_string(), "company_formation".to_string()];
        let prompt = categorization_prompt("Invoice #42", &categories);

        assert!(prompt.contains("- business_activities\n- company_formation\n"));
        assert!(prompt.contains("Invoice #42"));
    }

    #[test]
    fn test_extraction_prompt_embeds_schema() {
        let schema = CategorySchema::new(
            CategoryId::new("company_formation"),
            json!({"properties": {"company_name": {"type": "string"}}}),
        );
        let prompt = extraction_prompt("Acme Ltd was incorporated", &schema);

        assert!(prompt.contains("Category: company_formation"));
        assert!(prompt.contains("\"company_name\""));
        assert!(prompt.contains("Acme Ltd was incorporated"));
    }
}
