//! API Management capability used by the publish pipeline

use crate::config::ApiConfig;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Properties keys the pipeline always sets itself
const FIXED_PROPERTIES: [&str; 7] = [
    "displayName",
    "description",
    "path",
    "protocols",
    "format",
    "serviceUrl",
    "value",
];

/// Properties of an API create-or-update request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCreateOrUpdate {
    pub display_name: String,
    pub description: String,
    pub path: String,
    pub protocols: Vec<String>,
    pub format: String,
    pub service_url: String,

    /// Serialized OpenAPI document
    pub value: String,

    /// Additional properties from the api-config `parameters` object
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl ApiCreateOrUpdate {
    /// Build the request for `config`, importing `value` as `openapi+json`
    ///
    /// Keys of `config.parameters` that clash with the fixed properties are
    /// ignored.
    pub fn new(config: &ApiConfig, service_url: String, value: String) -> Self {
        let mut additional = config.parameters.clone().unwrap_or_default();
        additional.retain(|key, _| !FIXED_PROPERTIES.contains(&key.as_str()));

        Self {
            display_name: config.display_name.clone(),
            description: config.description.clone(),
            path: config.path.clone(),
            protocols: vec!["https".to_string()],
            format: "openapi+json".to_string(),
            service_url,
            value,
            additional,
        }
    }
}

/// Operations the publish pipeline needs from an API Management instance
///
/// Implementations are bound to a single instance (subscription, resource
/// group and service name).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiManagement: Send + Sync {
    /// Create the API or replace its definition, waiting for completion
    async fn create_or_update_api(&self, api_name: &str, parameters: &ApiCreateOrUpdate)
        -> Result<()>;

    /// Names of the products the API is currently linked to
    async fn list_api_products(&self, api_name: &str) -> Result<Vec<String>>;

    /// Link the API to a product
    async fn create_or_update_product_api(&self, product: &str, api_name: &str) -> Result<()>;

    /// Unlink the API from a product
    async fn delete_product_from_api(&self, product: &str, api_name: &str) -> Result<()>;
}
