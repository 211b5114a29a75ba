//! Route path normalization
//!
//! Prefix comparisons between routes are only reliable once the outer
//! separators are gone, so every path-like string is run through
//! [`trim_slashes`] before it is compared or joined.

/// Remove one leading and one trailing `/`
///
/// Only the outermost pair is removed: `"/abc/def/"` becomes `"abc/def"`,
/// while `""`, `"/"` and `"//"` all become `""`.
pub fn trim_slashes(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Normalize `path` and put back a single leading `/`
pub fn with_leading_slash(path: &str) -> String {
    format!("/{}", trim_slashes(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_slashes() {
        let cases = [
            ("", ""),
            ("/", ""),
            ("//", ""),
            ("abc", "abc"),
            ("/abc", "abc"),
            ("/abc/", "abc"),
            ("abc/", "abc"),
            ("abc-def", "abc-def"),
            ("abc/def", "abc/def"),
            ("/abc/def", "abc/def"),
            ("/abc/def/", "abc/def"),
            ("abc/def/", "abc/def"),
        ];

        for (subject, expected) in cases {
            assert_eq!(trim_slashes(subject), expected, "trimming {subject:?}");
        }
    }

    #[test]
    fn test_trim_slashes_is_idempotent() {
        for subject in ["", "/", "//", "abc", "/abc/", "/abc/def/", "a/b/c/"] {
            let once = trim_slashes(subject);
            assert_eq!(trim_slashes(once), once);
        }
    }

    #[test]
    fn test_with_leading_slash() {
        assert_eq!(with_leading_slash("v1"), "/v1");
        assert_eq!(with_leading_slash("/v1/"), "/v1");
        assert_eq!(with_leading_slash(""), "/");
    }
}
