//! Api-config file loading

use crate::validate::validate_api_configs;
use crate::{ApimError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One API to publish from the shared specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Name shown in the API Management portal
    pub display_name: String,

    pub description: String,

    /// URL suffix the API is exposed under in the gateway
    pub path: String,

    /// API resource name in API Management
    pub name: String,

    /// Operations to publish; `None` publishes every operation
    pub operations: Option<Vec<OperationRef>>,

    /// Products the API is linked to
    pub products: Vec<String>,

    /// Relative suffix appended to the backend service URL (e.g. "admin")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url_suffix: Option<String>,

    /// Routing prefix removed from every path before publishing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_route_prefix: Option<String>,

    /// Extra API Management properties merged beneath the fixed ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// Reference to an operation by its `operationId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
    pub id: String,
}

impl ApiConfig {
    /// Requested operation ids, `None` when the API is unrestricted
    pub fn operation_ids(&self) -> Option<Vec<String>> {
        self.operations
            .as_ref()
            .map(|ops| ops.iter().map(|op| op.id.clone()).collect())
    }
}

/// Read, validate and parse an api-config file
///
/// The path must end in `.json`; this is checked before anything is read.
/// Validation runs on the raw JSON so that an explicit `null` can be told
/// apart from an absent key.
pub fn load_api_configs<P: AsRef<Path>>(path: P) -> Result<Vec<ApiConfig>> {
    let path = path.as_ref();
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return Err(ApimError::Config(format!(
            "The api-config must be a path to a json file, got {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), content = %content, "Read api config");

    let value: Value = serde_json::from_str(&content)?;
    validate_api_configs(&value)?;

    Ok(serde_json::from_value(value)?)
}
