//! OpenAPI v2 transformations for publishing to API Management
//!
//! A fetched specification goes through up to three steps before it is
//! published:
//! 1. [`has_duplicate_path_after_prefix_drop`] gates a route-prefix drop so
//!    that two distinct routes are never merged into one
//! 2. [`drop_prefix_from_paths`] removes the routing prefix from every path
//! 3. [`filter_by_operation_ids`] keeps only the requested operations
//!
//! Every step borrows its input and returns a fresh document.
//!
//! ## Usage
//! ```rust,ignore
//! use ado_cli_openapi::{drop_prefix_from_paths, filter_by_operation_ids, OpenApiSpec};
//!
//! let spec = OpenApiSpec::from_json(&body)?;
//! let spec = drop_prefix_from_paths(&spec, "v1");
//! let ids = vec!["ping".to_string()];
//! let spec = filter_by_operation_ids("utilities", &spec, Some(&ids));
//! ```

mod filter;
mod prefix;
mod types;

pub use filter::{filter_by_operation_ids, filter_operations, FilterOutcome, UndeclaredOperation};
pub use prefix::{drop_prefix_from_paths, has_duplicate_path_after_prefix_drop};
pub use types::{HttpMethod, OpenApiSpec, Operation, PathItem};
