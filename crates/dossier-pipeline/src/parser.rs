//! Parse model output into segmentation, category and record values

use serde::Deserialize;
use serde_json::Value;

/// One `{start_line, end_line, description}` tuple as returned by the model
///
/// Bounds are kept signed so that nonsense like `-1` survives parsing and can
/// be rejected by the segmenter with a useful message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectionBounds {
    /// First line, 1-based inclusive
    pub start_line: i64,
    /// Last line, 1-based inclusive
    pub end_line: i64,
    /// Short description of the embedded document
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
struct SegmentationResponse {
    sections: Vec<SectionBounds>,
}

/// Parse a segmentation response: `{"sections": [...]}` or a bare array
pub fn parse_sections(response: &str) -> Result<Vec<SectionBounds>, String> {
    let json_str = extract_json(response)?;
    let value: Value =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {}", e))?;

    let parsed = if value.is_array() {
        serde_json::from_value::<Vec<SectionBounds>>(value)
    } else {
        serde_json::from_value::<SegmentationResponse>(value).map(|r| r.sections)
    };
    parsed.map_err(|e| format!("Unexpected segmentation shape: {}", e))
}

/// Pull a category name out of a classification response.
///
/// Accepts `{"category": "..."}`, a JSON string, or a bare word. The name is
/// returned as given; membership is the caller's concern.
pub fn parse_category(response: &str) -> Option<String> {
    let json_str = extract_json(response).ok()?;

    match serde_json::from_str::<Value>(&json_str) {
        Ok(Value::Object(map)) => map.get("category").and_then(Value::as_str).map(str::to_string),
        Ok(Value::String(name)) => Some(name),
        Ok(_) => None,
        Err(_) => {
            let word = json_str.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.');
            let is_single_token = !word.is_empty() && !word.contains(char::is_whitespace);
            is_single_token.then(|| word.to_string())
        }
    }
}

/// Parse an extraction response into a JSON value
pub fn parse_record(response: &str) -> Result<Value, String> {
    let json_str = extract_json(response)?;
    serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {}", e))
}

/// Extract JSON from response, handling markdown code blocks
pub fn extract_json(response: &str) -> Result<String, String> {
    let trimmed = response.trim();

    if !trimmed.starts_with("```") {
        // Already raw JSON
        return Ok(trimmed.to_string());
    }

    // Skip the opening fence line (```json or ```) and stop at the closing one
    let body: Vec<&str> = trimmed
        .lines()
        .skip(1)
        .take_while(|line| line.trim() != "```")
        .collect();
    if body.is_empty() {
        return Err("Empty code block".to_string());
    }
    Ok(body.join("\n"))
}
