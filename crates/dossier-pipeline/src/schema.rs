//! Category schemas and the closed taxonomy they define

use crate::error::PipelineError;
use dossier_domain::CategoryId;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SCHEMA_EXTENSION: &str = "json";

/// Expected shape of the extracted record for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySchema {
    name: CategoryId,
    document: Value,
}

impl CategorySchema {
    /// Wrap a parsed schema document
    pub fn new(name: CategoryId, document: Value) -> Self {
        Self { name, document }
    }

    /// Category this schema describes
    pub fn name(&self) -> &CategoryId {
        &self.name
    }

    /// The raw schema document
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Schema rendered for inclusion in a prompt
    pub fn to_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.document).unwrap_or_else(|_| self.document.to_string())
    }

    /// Check a record against the top-level `required` list and the
    /// declared `properties` types.
    ///
    /// Returns one message per violation; an empty list means the record
    /// conforms as far as this shallow check can tell.
    pub fn violations(&self, record: &Value) -> Vec<String> {
        let Some(object) = record.as_object() else {
            return vec![format!("expected a JSON object, got {}", json_type_name(record))];
        };

        let mut violations = Vec::new();

        if let Some(required) = self.document.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(field) {
                    violations.push(format!("missing required field '{}'", field));
                }
            }
        }

        if let Some(properties) = self.document.get("properties").and_then(Value::as_object) {
            for (field, property) in properties {
                let (Some(value), Some(expected)) = (object.get(field), property.get("type")) else {
                    continue;
                };
                if !type_matches(value, expected) {
                    violations.push(format!(
                        "field '{}' should be {}, got {}",
                        field,
                        expected,
                        json_type_name(value)
                    ));
                }
            }
        }

        violations
    }
}

fn type_matches(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(name) => matches_type_name(value, name),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| matches_type_name(value, name)),
        // Unknown type declarations are not ours to judge
        _ => true,
    }
}

fn matches_type_name(value: &Value, name: &str) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Category → schema mapping, loaded once from a directory
///
/// The set of keys is the closed taxonomy: nothing downstream may produce a
/// category that is not registered here.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    dir: PathBuf,
    schemas: BTreeMap<CategoryId, CategorySchema>,
}

impl SchemaRegistry {
    /// Load every `*.json` file in `dir`; the file stem is the category name.
    ///
    /// An empty directory yields an empty registry. A missing directory or an
    /// unparsable schema file is a configuration error.
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PipelineError::Configuration(format!("schema directory {:?} unavailable: {}", dir, e))
        })?;

        let mut schemas = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            let is_schema = path.is_file()
                && dossier_extract::extension_of(&path).as_deref() == Some(SCHEMA_EXTENSION);
            if !is_schema {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let raw = std::fs::read_to_string(&path)?;
            let document: Value = serde_json::from_str(&raw).map_err(|e| {
                PipelineError::Configuration(format!("invalid schema {:?}: {}", path, e))
            })?;

            let name = CategoryId::new(stem);
            debug!("Loaded schema '{}' from {:?}", name, path);
            schemas.insert(name.clone(), CategorySchema::new(name, document));
        }

        info!("Loaded {} category schemas from {:?}", schemas.len(), dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            schemas,
        })
    }

    /// Build a registry from in-memory schemas
    pub fn from_schemas(schemas: impl IntoIterator<Item = (CategoryId, Value)>) -> Self {
        Self {
            dir: PathBuf::new(),
            schemas: schemas
                .into_iter()
                .map(|(name, document)| (name.clone(), CategorySchema::new(name, document)))
                .collect(),
        }
    }

    /// Directory the registry was loaded from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a category's schema
    pub fn get(&self, category: &str) -> Option<&CategorySchema> {
        self.schemas.get(category)
    }

    /// Whether `category` is a member of the taxonomy
    pub fn contains(&self, category: &str) -> bool {
        self.schemas.contains_key(category)
    }

    /// Registered categories, in lexicographic order
    pub fn categories(&self) -> impl Iterator<Item = &CategoryId> {
        self.schemas.keys()
    }

    /// Category names, in lexicographic order
    pub fn category_names(&self) -> Vec<String> {
        self.schemas.keys().map(|c| c.as_str().to_string()).collect()
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the taxonomy is empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn formation_schema() -> CategorySchema {
        CategorySchema::new(
            CategoryId::new("company_formation"),
            json!({
                "type": "object",
                "required": ["company_name", "registration_number"],
                "properties": {
                    "company_name": {"type": "string"},
                    "registration_number": {"type": "string"},
                    "employees": {"type": "integer"},
                    "directors": {"type": ["array", "null"]}
                }
            }),
        )
    }

    #[test]
    fn test_load_uses_file_stem_as_category() {
        let dir = tempdir().unwrap();
        let object = r#"{"type": "object"}"#;
        std::fs::write(dir.path().join("company_formation.json"), object).unwrap();
        std::fs::write(dir.path().join("business_activities.json"), object).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a schema").unwrap();

        let registry = SchemaRegistry::load(dir.path()).unwrap();
        assert_eq!(
            registry.category_names(),
            vec!["business_activities", "company_formation"]
        );
        assert!(registry.contains("company_formation"));
        assert!(!registry.contains("README"));
    }

    #[test]
    fn test_empty_directory_is_valid() {
        let dir = tempdir().unwrap();
        let registry = SchemaRegistry::load(dir.path()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let result = SchemaRegistry::load(Path::new("/nonexistent/schemas"));
        match result {
            Err(PipelineError::Configuration(msg)) => assert!(msg.contains("/nonexistent/schemas")),
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_schema_file_is_configuration_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        assert!(matches!(
            SchemaRegistry::load(dir.path()),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_conforming_record() {
        let record = json!({
            "company_name": "Acme Ltd",
            "registration_number": "12345",
            "employees": 12,
            "directors": null
        });
        assert!(formation_schema().violations(&record).is_empty());
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let record = json!({"company_name": 7, "employees": 1.5});
        let violations = formation_schema().violations(&record);

        assert_eq!(violations.len(), 3);
        assert!(violations.iter().any(|v| v.contains("registration_number")));
        assert!(violations.iter().any(|v| v.contains("'company_name' should be")));
        assert!(violations.iter().any(|v| v.contains("'employees' should be")));
    }

    #[test]
    fn test_non_object_record() {
        let violations = formation_schema().violations(&json!(["a", "b"]));
        assert_eq!(violations, vec!["expected a JSON object, got array"]);
    }
}
