//! OpenAPI v2 type definitions
//!
//! Only the parts the publish pipeline inspects are typed: `host`,
//! `basePath`, `paths` and the `operationId` of the recognized HTTP methods.
//! Everything else is carried along untouched so the published document
//! matches what was fetched.

use ado_cli_common::{AdoError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// OpenAPI v2 document root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSpec {
    /// Host serving the API (e.g. "func-app.azurewebsites.net")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Base path every route is relative to (e.g. "/api")
    #[serde(rename = "basePath")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// API paths keyed by route
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,

    /// Remaining top-level fields (`swagger`, `info`, `definitions`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OpenApiSpec {
    /// Parse a specification from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AdoError::Parse(format!("Failed to parse OpenAPI JSON: {}", e)))
    }

    /// Serialize back to the compact JSON that is uploaded to API Management
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// All route keys in the document
    pub fn path_keys(&self) -> Vec<&str> {
        self.paths.keys().map(String::as_str).collect()
    }
}

/// The HTTP methods the operation filter looks at
///
/// This is a closed set: operations under any other key of a path item are
/// never matched by id and are left out of filtered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Post,
    Get,
    Patch,
    Put,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Every recognized method, in inspection order
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Post,
        HttpMethod::Get,
        HttpMethod::Patch,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "post",
            HttpMethod::Get => "get",
            HttpMethod::Patch => "patch",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path item (operations for a path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,

    /// Path-level parameters, `$ref` and any unrecognized method
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PathItem {
    /// Operation registered for `method`, if any
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
        }
    }

    /// Register `operation` under `method`, replacing what was there
    pub fn set_operation(&mut self, method: HttpMethod, operation: Operation) {
        let slot = match method {
            HttpMethod::Post => &mut self.post,
            HttpMethod::Get => &mut self.get,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Options => &mut self.options,
        };
        *slot = Some(operation);
    }

    /// Present operations of the recognized methods, in inspection order
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |method| self.operation(method).map(|op| (method, op)))
    }

    /// True when none of the recognized methods is defined
    pub fn has_no_operations(&self) -> bool {
        self.operations().next().is_none()
    }
}

/// HTTP operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID (unique identifier)
    #[serde(rename = "operationId")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    /// Tags, parameters, responses and the rest of the operation object
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Operation {
    /// Operation carrying only an id
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            operation_id: Some(id.into()),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_swagger() {
        let json = r#"{
            "swagger": "2.0",
            "info": { "title": "Experimentations", "version": "1.0.0" },
            "host": "func-test.azurewebsites.net",
            "basePath": "/api",
            "paths": {
                "/ping": {
                    "get": { "operationId": "ping", "tags": ["Monitoring"], "responses": {} }
                }
            }
        }"#;

        let spec = OpenApiSpec::from_json(json).unwrap();
        assert_eq!(spec.host.as_deref(), Some("func-test.azurewebsites.net"));
        assert_eq!(spec.base_path.as_deref(), Some("/api"));
        assert_eq!(spec.extra["swagger"], "2.0");

        let ping = spec.paths["/ping"].operation(HttpMethod::Get).unwrap();
        assert_eq!(ping.operation_id.as_deref(), Some("ping"));
        assert!(ping.extra.contains_key("tags"));
    }

    #[test]
    fn test_unrecognized_keys_survive_serialization() {
        let json = r#"{
            "paths": {
                "/ping": {
                    "parameters": [{ "name": "x", "in": "query" }],
                    "trace": { "operationId": "trace-ping" },
                    "get": { "operationId": "ping", "x-custom": true }
                }
            },
            "definitions": {}
        }"#;

        let spec = OpenApiSpec::from_json(json).unwrap();
        let value: Value = serde_json::from_str(&spec.to_json().unwrap()).unwrap();
        assert_eq!(value["paths"]["/ping"]["trace"]["operationId"], "trace-ping");
        assert_eq!(value["paths"]["/ping"]["get"]["x-custom"], true);
        assert!(value.get("host").is_none());
        assert!(value.get("definitions").is_some());
    }

    #[test]
    fn test_operations_follow_inspection_order() {
        let mut item = PathItem::default();
        item.set_operation(HttpMethod::Delete, Operation::with_id("delete"));
        item.set_operation(HttpMethod::Post, Operation::with_id("create"));
        item.set_operation(HttpMethod::Get, Operation::with_id("list"));

        let methods: Vec<HttpMethod> = item.operations().map(|(m, _)| m).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Post, HttpMethod::Get, HttpMethod::Delete]
        );
        assert!(!item.has_no_operations());
        assert!(PathItem::default().has_no_operations());
    }
}
