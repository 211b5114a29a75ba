//! Api-config validation
//!
//! Structural rules live in a JSON Schema checked with `jsonschema`; the
//! uniqueness rules that span entries (`path`, `name`, `displayName`) and
//! operation ids within an entry run as a second pass over the raw list.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

/// Relative path of lowercase segments joined by `/` or `-`
const SERVICE_URL_SUFFIX_PATTERN: &str = "^[a-z0-9]+([/-][a-z0-9]+)*$";

/// Fields that must be unique across the whole config list
const UNIQUE_FIELDS: [&str; 3] = ["path", "displayName", "name"];

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON pointer to the offending value (e.g. "/1/products")
    pub path: String,

    pub reason: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Every violation found in one api-config list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfigValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ApiConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ApiConfigValidationError {}

fn api_config_schema() -> Value {
    let required_text = json!({ "type": "string", "minLength": 1 });
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["displayName", "description", "path", "operations", "name", "products"],
            "additionalProperties": false,
            "properties": {
                "displayName": required_text,
                "description": required_text,
                "path": required_text,
                "name": required_text,
                "operations": {
                    "type": ["array", "null"],
                    "minItems": 1,
                    "uniqueItems": true,
                    "items": {
                        "type": "object",
                        "required": ["id"],
                        "properties": { "id": required_text }
                    }
                },
                "products": {
                    "type": "array",
                    "uniqueItems": true,
                    "items": { "type": "string" }
                },
                "serviceUrlSuffix": {
                    "type": "string",
                    "pattern": SERVICE_URL_SUFFIX_PATTERN
                },
                "dropRoutePrefix": { "type": "string" },
                "parameters": { "type": ["object", "null"] }
            }
        }
    })
}

fn schema_issues(configs: &Value) -> Vec<ValidationIssue> {
    let validator = match jsonschema::validator_for(&api_config_schema()) {
        Ok(validator) => validator,
        Err(e) => {
            return vec![ValidationIssue {
                path: String::new(),
                reason: format!("api-config schema failed to compile: {}", e),
            }]
        }
    };

    validator
        .iter_errors(configs)
        .map(|e| ValidationIssue {
            path: e.instance_path.to_string(),
            reason: e.to_string(),
        })
        .collect()
}

fn duplicate_field_issues(entries: &[Value], field: &str) -> Vec<ValidationIssue> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut issues = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some(value) = entry.get(field).and_then(Value::as_str) else {
            continue;
        };
        match first_seen.get(value) {
            Some(first) => issues.push(ValidationIssue {
                path: format!("/{}/{}", index, field),
                reason: format!(
                    "\"{}\" must be unique, \"{}\" is already used by entry {}",
                    field, value, first
                ),
            }),
            None => {
                first_seen.insert(value, index);
            }
        }
    }

    issues
}

fn duplicate_operation_id_issues(index: usize, entry: &Value) -> Vec<ValidationIssue> {
    let Some(operations) = entry.get("operations").and_then(Value::as_array) else {
        return vec![];
    };

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut issues = Vec::new();
    for (position, operation) in operations.iter().enumerate() {
        let Some(id) = operation.get("id").and_then(Value::as_str) else {
            continue;
        };
        if let Some(first) = seen.insert(id, position) {
            issues.push(ValidationIssue {
                path: format!("/{}/operations/{}/id", index, position),
                reason: format!(
                    "operation id \"{}\" is already listed at position {}",
                    id, first
                ),
            });
        }
    }
    issues
}

/// Validate a raw api-config list
///
/// `Value::Null` stands for a missing list and is rejected; an empty list is
/// valid. All violations are collected rather than stopping at the first.
pub fn validate_api_configs(configs: &Value) -> Result<(), ApiConfigValidationError> {
    let mut issues = schema_issues(configs);

    if let Some(entries) = configs.as_array() {
        for field in UNIQUE_FIELDS {
            issues.extend(duplicate_field_issues(entries, field));
        }
        for (index, entry) in entries.iter().enumerate() {
            issues.extend(duplicate_operation_id_issues(index, entry));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ApiConfigValidationError { issues })
    }
}
