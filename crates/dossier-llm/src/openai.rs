//! OpenAI-compatible Provider Implementation
//!
//! Talks to any chat-completions endpoint (`POST {endpoint}/chat/completions`).
//!
//! # Features
//!
//! - Role-tagged messages with inline base64 images (vision transcription)
//! - Structured output via `response_format` (JSON schema or enum constraint)
//! - Retry logic with exponential backoff for transient failures
//! - Hard timeout per HTTP request
//!
//! # Examples
//!
//! ```no_run
//! use dossier_llm::{OpenAiConfig, OpenAiProvider};
//!
//! // Reads the key from OPENAI_API_KEY
//! let provider = OpenAiProvider::from_env(OpenAiConfig::default()).unwrap();
//! ```

use crate::LlmError;
use dossier_domain::traits::LlmProvider as LlmProviderTrait;
use dossier_domain::{ChatMessage, ContentPart, ResponseConstraint};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default model for text requests
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default timeout for a single HTTP request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Connection settings for [`OpenAiProvider`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL of the API (without `/chat/completions`)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for text-only requests
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used when a request carries images
    #[serde(default = "default_model")]
    pub vision_model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Timeout for a single HTTP request (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum attempts per request, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    #[serde(default = "default_backoff_ms")]
    pub backoff_base_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_backoff_ms() -> u64 {
    1000
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            vision_model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: default_backoff_ms(),
        }
    }
}

impl OpenAiConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint must not be empty".to_string());
        }
        if self.model.trim().is_empty() || self.vision_model.trim().is_empty() {
            return Err("model names must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Chat-completions provider
pub struct OpenAiProvider {
    config: OpenAiConfig,
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider with an explicit API key
    pub fn new(config: OpenAiConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        config.validate().map_err(LlmError::Other)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    /// Create a provider reading the API key from `config.api_key_env`
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingCredential`] when the variable is unset or empty.
    pub fn from_env(config: OpenAiConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::MissingCredential(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    /// Active configuration
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        constraint: &ResponseConstraint,
    ) -> CompletionRequest {
        let model = if messages.iter().any(ChatMessage::has_image) {
            self.config.vision_model.clone()
        } else {
            self.config.model.clone()
        };

        CompletionRequest {
            model,
            messages: messages.iter().map(to_wire_message).collect(),
            response_format: response_format(constraint),
        }
    }

    fn send(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));

        // Retry logic with exponential backoff
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.config.max_retries {
            match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body: CompletionResponse = response.json().map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                        })?;
                        return body
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.message.content)
                            .ok_or_else(|| {
                                let reason = "Response has no message content";
                                LlmError::InvalidResponse(reason.to_string())
                            });
                    } else if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(LlmError::ModelNotAvailable(request.model.clone()));
                    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(LlmError::RateLimitExceeded);
                    } else if status.is_server_error() {
                        last_error = Some(http_error(status, response));
                    } else {
                        // Client errors are not transient
                        return Err(http_error(status, response));
                    }
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(LlmError::Timeout(self.config.timeout_secs));
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.config.max_retries {
                let delay = backoff_delay(self.config.backoff_base_ms, attempts);
                warn!(
                    "LLM request attempt {}/{} failed, retrying in {:?}",
                    attempts, self.config.max_retries, delay
                );
                std::thread::sleep(delay);
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

/// Exponential backoff: base, 2*base, 4*base, ...
/// Error for a non-success response, carrying the body text when readable
fn http_error(status: reqwest::StatusCode, response: reqwest::blocking::Response) -> LlmError {
    let error_text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
    LlmError::Communication(format!("HTTP {}: {}", status, error_text))
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1))))
}

fn to_wire_message(message: &ChatMessage) -> WireMessage {
    let content = match message.parts.as_slice() {
        [ContentPart::Text(text)] => WireContent::Text(text.clone()),
        parts => WireContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text(text) => WirePart::Text { text: text.clone() },
                    ContentPart::Image { mime_type, data } => WirePart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", mime_type, data),
                        },
                    },
                })
                .collect(),
        ),
    };

    WireMessage {
        role: message.role.as_str(),
        content,
    }
}

/// Longest `json_schema.name` the endpoint accepts
const MAX_SCHEMA_NAME_LEN: usize = 64;

/// Endpoint-safe schema name: `[A-Za-z0-9_-]`, at most 64 characters
fn schema_name(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(MAX_SCHEMA_NAME_LEN)
        .collect();
    if name.is_empty() {
        "response".to_string()
    } else {
        name
    }
}

/// Schema usable for strict structured output, whose root must be an object
fn object_root_schema(schema: Value) -> Option<Value> {
    let Value::Object(mut root) = schema else {
        return None;
    };
    match root.get("type").and_then(Value::as_str) {
        Some("object") => {}
        None if root.contains_key("properties") => {
            root.insert("type".to_string(), json!("object"));
        }
        _ => return None,
    }
    Some(Value::Object(root))
}

fn response_format(constraint: &ResponseConstraint) -> Option<Value> {
    match constraint {
        ResponseConstraint::None => None,
        ResponseConstraint::JsonSchema { name, schema } => {
            let parsed = match serde_json::from_str::<Value>(schema) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!(
                        "Schema '{}' is not valid JSON ({}), requesting plain JSON mode",
                        name, e
                    );
                    return Some(json!({ "type": "json_object" }));
                }
            };
            match object_root_schema(parsed) {
                Some(schema) => Some(json!({
                    "type": "json_schema",
                    "json_schema": { "name": schema_name(name), "schema": schema }
                })),
                None => {
                    debug!("Schema '{}' has no object root, requesting plain JSON mode", name);
                    Some(json!({ "type": "json_object" }))
                }
            }
        }
        ResponseConstraint::Enum { field, values } => {
            let mut properties = serde_json::Map::new();
            properties.insert(field.clone(), json!({ "type": "string", "enum": values }));
            Some(json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name(field),
                    "schema": {
                        "type": "object",
                        "properties": properties,
                        "required": [field],
                        "additionalProperties": false
                    }
                }
            }))
        }
    }
}

impl LlmProviderTrait for OpenAiProvider {
    type Error = LlmError;

    fn generate(&self, messages: &[ChatMessage]) -> Result<String, Self::Error> {
        self.generate_structured(messages, &ResponseConstraint::None)
    }

    fn generate_structured(
        &self,
        messages: &[ChatMessage],
        constraint: &ResponseConstraint,
    ) -> Result<String, Self::Error> {
        let request = self.build_request(messages, constraint);
        if let Ok(payload) = serde_json::to_string(&request) {
            trace!(model = %request.model, %payload, "LLM request");
        }

        let content = self.send(&request)?;
        trace!(model = %request.model, response = %content, "LLM response");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(config: OpenAiConfig) -> OpenAiProvider {
        OpenAiProvider::new(config, "test-key").unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = OpenAiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OpenAiConfig {
            timeout_secs: 0,
            ..OpenAiConfig::default()
        };
        assert!(OpenAiProvider::new(config, "key").is_err());
    }

    #[test]
    fn test_missing_credential() {
        let config = OpenAiConfig {
            api_key_env: "DOSSIER_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..OpenAiConfig::default()
        };
        match OpenAiProvider::from_env(config) {
            Err(LlmError::MissingCredential(var)) => {
                assert_eq!(var, "DOSSIER_TEST_KEY_THAT_IS_NEVER_SET")
            }
            _ => panic!("Expected MissingCredential error"),
        }
    }

    #[test]
    fn test_vision_model_selected_for_images() {
        let config = OpenAiConfig {
            model: "text-model".to_string(),
            vision_model: "vision-model".to_string(),
            ..OpenAiConfig::default()
        };
        let provider = provider(config);

        let text_only =
            provider.build_request(&[ChatMessage::user("hi")], &ResponseConstraint::None);
        assert_eq!(text_only.model, "text-model");
        assert!(text_only.response_format.is_none());

        let image = ChatMessage::user("read this").with_image("image/png", "AAAA");
        let vision = provider.build_request(&[image], &ResponseConstraint::None);
        assert_eq!(vision.model, "vision-model");
    }

    #[test]
    fn test_wire_format_for_image_parts() {
        let message = ChatMessage::user("read this").with_image("image/jpeg", "QUJD");
        let wire = serde_json::to_value(to_wire_message(&message)).unwrap();

        assert_eq!(wire["role"], "user");
        assert_eq!(wire["content"][0]["type"], "text");
        assert_eq!(wire["content"][1]["type"], "image_url");
        assert_eq!(wire["content"][1]["image_url"]["url"], "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn test_wire_format_for_plain_text() {
        let wire = serde_json::to_value(to_wire_message(&ChatMessage::system("be brief"))).unwrap();
        assert_eq!(wire["role"], "system");
        assert_eq!(wire["content"], "be brief");
    }

    #[test]
    fn test_enum_constraint_format() {
        let constraint = ResponseConstraint::Enum {
            field: "category".to_string(),
            values: vec!["a".to_string(), "b".to_string()],
        };
        let format = response_format(&constraint).unwrap();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(
            format["json_schema"]["schema"]["properties"]["category"]["enum"],
            json!(["a", "b"])
        );
    }

    #[test]
    fn test_schema_constraint_with_invalid_schema_falls_back_to_json_mode() {
        let constraint = ResponseConstraint::JsonSchema {
            name: "broken".to_string(),
            schema: "{not json".to_string(),
        };
        assert_eq!(response_format(&constraint).unwrap(), json!({ "type": "json_object" }));
    }

    #[test]
    fn test_schema_name_made_endpoint_safe() {
        let constraint = ResponseConstraint::JsonSchema {
            name: "ownership & control (2024)".to_string(),
            schema: r#"{"type": "object", "properties": {}}"#.to_string(),
        };
        let format = response_format(&constraint).unwrap();
        assert_eq!(format["json_schema"]["name"], "ownership___control__2024_");

        assert_eq!(schema_name(&"x".repeat(80)).len(), 64);
        assert_eq!(schema_name(""), "response");
        assert_eq!(schema_name("company-formation_v2"), "company-formation_v2");
    }

    #[test]
    fn test_schema_without_object_root_falls_back_to_json_mode() {
        for schema in [r#"{"type": "array", "items": {}}"#, "{}", "[1, 2]", r#""text""#] {
            let constraint = ResponseConstraint::JsonSchema {
                name: "company_formation".to_string(),
                schema: schema.to_string(),
            };
            assert_eq!(
                response_format(&constraint).unwrap(),
                json!({ "type": "json_object" }),
                "schema {}",
                schema
            );
        }
    }

    #[test]
    fn test_schema_with_properties_gets_object_type() {
        let constraint = ResponseConstraint::JsonSchema {
            name: "company_formation".to_string(),
            schema: r#"{"properties": {"company_name": {"type": "string"}}}"#.to_string(),
        };
        let format = response_format(&constraint).unwrap();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["schema"]["type"], "object");
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(100, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(100, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(100, 3), Duration::from_millis(400));
    }

    #[test]
    fn test_error_handling_unreachable_endpoint() {
        // Use invalid endpoint to trigger error
        let config = OpenAiConfig {
            endpoint: "http://localhost:99999".to_string(),
            max_retries: 1,
            ..OpenAiConfig::default()
        };
        let result = provider(config).generate(&[ChatMessage::user("test")]);

        match result {
            Err(LlmError::Communication(_)) => {} // Expected
            other => panic!("Expected Communication error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    #[ignore] // Only run when an API key is available
    fn test_generate_integration() {
        let provider = OpenAiProvider::from_env(OpenAiConfig::default()).unwrap();
        let result = provider.generate(&[ChatMessage::user("Say 'hello' and nothing else")]);
        assert!(!result.unwrap().is_empty());
    }
}
