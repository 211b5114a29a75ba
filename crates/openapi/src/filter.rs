//! Operation filtering by `operationId`

use crate::types::{HttpMethod, OpenApiSpec, PathItem};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// An operation that exists in the document but has no `operationId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeclaredOperation {
    pub path: String,
    pub method: HttpMethod,
}

/// Result of [`filter_operations`]
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Filtered document
    pub spec: OpenApiSpec,

    /// Requested ids that no operation carries, in request order
    pub missing_operation_ids: Vec<String>,

    /// Operations that can never be selected because they have no id
    pub undeclared_operations: Vec<UndeclaredOperation>,

    /// Ids present in the document but not requested
    pub excluded_operation_ids: Vec<String>,
}

/// Keep only the operations whose id is in `operation_ids`
///
/// `None` means no filtering was requested and returns the document as is.
/// Otherwise only the recognized HTTP methods are inspected, and a path is
/// kept only when at least one of its operations matched. Path-level keys
/// other than those methods are not carried into the filtered document.
pub fn filter_operations(spec: &OpenApiSpec, operation_ids: Option<&[String]>) -> FilterOutcome {
    let Some(operation_ids) = operation_ids else {
        return FilterOutcome {
            spec: spec.clone(),
            missing_operation_ids: vec![],
            undeclared_operations: vec![],
            excluded_operation_ids: vec![],
        };
    };

    let wanted: HashSet<&str> = operation_ids.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut undeclared_operations = Vec::new();
    let mut excluded_operation_ids = Vec::new();
    let mut paths = BTreeMap::new();

    for (path, item) in &spec.paths {
        let mut filtered = PathItem::default();

        for (method, operation) in item.operations() {
            match operation.operation_id.as_deref() {
                Some(id) if wanted.contains(id) => {
                    seen.insert(id);
                    filtered.set_operation(method, operation.clone());
                }
                Some(id) => excluded_operation_ids.push(id.to_string()),
                None => undeclared_operations.push(UndeclaredOperation {
                    path: path.clone(),
                    method,
                }),
            }
        }

        if !filtered.has_no_operations() {
            paths.insert(path.clone(), filtered);
        }
    }

    let mut reported = HashSet::new();
    let missing_operation_ids = operation_ids
        .iter()
        .filter(|id| !seen.contains(id.as_str()) && reported.insert(id.as_str()))
        .cloned()
        .collect();

    FilterOutcome {
        spec: OpenApiSpec {
            paths,
            ..spec.clone()
        },
        missing_operation_ids,
        undeclared_operations,
        excluded_operation_ids,
    }
}

/// Filter `spec` for the API named `api_name` and log what was left out
///
/// Missing ids are not an error: the API may reference an operation that the
/// fetched document does not have yet.
pub fn filter_by_operation_ids(
    api_name: &str,
    spec: &OpenApiSpec,
    operation_ids: Option<&[String]>,
) -> OpenApiSpec {
    let outcome = filter_operations(spec, operation_ids);

    for id in &outcome.excluded_operation_ids {
        debug!(api_name, operation_id = %id, "Operation not part of API, skipping");
    }
    for op in &outcome.undeclared_operations {
        warn!(
            api_name,
            path = %op.path,
            method = %op.method,
            "Operation has no operationId and can never be selected by id"
        );
    }
    for id in &outcome.missing_operation_ids {
        warn!(
            api_name,
            operation_id = %id,
            "Requested operationId was not found in the OpenApi specification"
        );
    }

    outcome.spec
}
