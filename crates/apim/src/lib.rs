//! Publishing OpenAPI specifications to Azure API Management
//!
//! Each entry of an api-config file describes one API that is carved out of
//! a single fetched specification:
//! - the config list is validated up front ([`validate_api_configs`])
//! - each entry's routing prefix is dropped, guarded by a collision check
//! - the specification is filtered down to the entry's operations
//! - the result is created or updated in API Management and linked to the
//!   configured products ([`publish_all`])
//!
//! The management API sits behind the [`ApiManagement`] trait so the
//! pipeline can run without network access.

mod arm;
mod client;
mod config;
mod credential;
mod fetch;
mod publish;
mod service_url;
mod validate;

pub use arm::{ApimInstance, ArmApiManagementClient};
pub use client::{ApiCreateOrUpdate, ApiManagement};
pub use config::{load_api_configs, ApiConfig, OperationRef};
pub use credential::Credential;
pub use fetch::fetch_openapi_spec;
pub use publish::{
    apply_plan, plan_api, publish_all, publish_api, PublishOutcome, PublishPlan, PublishTarget,
};
pub use service_url::service_url;
pub use validate::{validate_api_configs, ApiConfigValidationError, ValidationIssue};

use ado_cli_common::AdoError;
use thiserror::Error;

/// Errors that can occur while validating or publishing APIs
#[derive(Debug, Error)]
pub enum ApimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Api config is not valid: {0}")]
    Validation(#[from] ApiConfigValidationError),

    #[error(
        "After dropping route prefix \"{prefix}\" at least one duplicate path exists for API with name \"{api_name}\""
    )]
    Collision {
        api_name: String,
        prefix: String,
        paths: Vec<String>,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API Management request failed with status {status}: {message}")]
    Management { status: u16, message: String },

    #[error("Specification error: {0}")]
    Spec(#[from] AdoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for API Management operations
pub type Result<T> = std::result::Result<T, ApimError>;
