//! Route-prefix removal
//!
//! Backends are often mounted under a routing prefix (`/v1`, `/internal`)
//! that should not show up in the published API. Prefixes are plain string
//! prefixes: `v1` also matches the start of `/v1beta/...`, which then
//! becomes `/beta/...`.

use crate::types::OpenApiSpec;
use ado_cli_common::{trim_slashes, with_leading_slash};
use std::collections::{BTreeMap, HashSet};

/// Normalized route a path ends up as once `prefix` is dropped
fn route_after_prefix_drop(path: &str, prefix: &str) -> String {
    let path = trim_slashes(path);
    let rest = path.strip_prefix(prefix).unwrap_or(path);
    with_leading_slash(rest)
}

/// Check whether dropping `prefix` would merge two routes into one
///
/// Paths are compared after normalization, so routes that were already
/// identical up to their outer slashes count as duplicates even when the
/// prefix matches none of them.
pub fn has_duplicate_path_after_prefix_drop<S: AsRef<str>>(paths: &[S], prefix: &str) -> bool {
    let prefix = trim_slashes(prefix);
    let mut seen = HashSet::new();
    paths
        .iter()
        .any(|path| !seen.insert(route_after_prefix_drop(path.as_ref(), prefix)))
}

/// Return a copy of `spec` with `prefix` removed from every path that
/// starts with it
///
/// A key matches when it starts with `/` followed by the normalized prefix;
/// a remainder without a leading `/` gets one. Other keys are copied
/// unchanged, including keys written without a leading slash. Callers
/// are expected to have ruled out collisions with
/// [`has_duplicate_path_after_prefix_drop`]; when two keys still end up the
/// same, the one sorting last wins.
pub fn drop_prefix_from_paths(spec: &OpenApiSpec, prefix: &str) -> OpenApiSpec {
    let prefix = with_leading_slash(prefix);

    let paths: BTreeMap<_, _> = spec
        .paths
        .iter()
        .map(|(key, item)| {
            let new_key = match key.strip_prefix(prefix.as_str()) {
                Some(rest) if rest.starts_with('/') => rest.to_string(),
                Some(rest) => format!("/{}", rest),
                None => key.clone(),
            };
            (new_key, item.clone())
        })
        .collect();

    OpenApiSpec {
        paths,
        ..spec.clone()
    }
}
