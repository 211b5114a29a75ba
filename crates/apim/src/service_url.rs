//! Backend service URL construction

use ado_cli_common::trim_slashes;

/// Join `host` and the present path fragments into an https URL
///
/// `https://` is prepended unless the host already carries it. Fragments are
/// normalized first; absent or empty ones are skipped.
pub fn service_url(host: &str, fragments: &[Option<&str>]) -> String {
    let base = if host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    fragments
        .iter()
        .flatten()
        .map(|fragment| trim_slashes(fragment))
        .filter(|fragment| !fragment.is_empty())
        .fold(base, |url, fragment| format!("{}/{}", url, fragment))
}
