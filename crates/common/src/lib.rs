//! Common types and utilities for ADO CLI
//!
//! This crate contains the shared error type, path normalization and the
//! CI-aware logging setup used across the openapi, apim and CLI components.

pub mod logging;
pub mod path;

pub use path::{trim_slashes, with_leading_slash};

use thiserror::Error;

/// Errors shared by every ADO CLI crate
#[derive(Error, Debug)]
pub enum AdoError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for shared operations
pub type Result<T> = std::result::Result<T, AdoError>;
