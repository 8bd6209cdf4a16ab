//! Small helpers shared across the engine: field-path splitting and
//! qualified-name construction.

use smallvec::SmallVec;

/// Splits a dotted field path into its segments.
///
/// Returns `None` when the path is malformed (empty, or containing an empty
/// segment such as `a..b`). Callers treat a malformed path as a reported but
/// non-fatal condition, not an error.
#[must_use]
pub fn split_field_path(path: &str) -> Option<SmallVec<[&str; 4]>> {
    if path.is_empty() {
        return None;
    }
    let segments: SmallVec<[&str; 4]> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Joins a parent qualified id with a field segment into a dotted path.
#[must_use]
pub fn join_qualified(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_owned()
    } else {
        format!("{parent}.{segment}")
    }
}

/// Normalizes a path for CLI display.
///
/// - Converts backslashes to forward slashes (for cross-platform consistency)
/// - Strips leading "./" prefix (for cleaner output)
#[must_use]
pub fn normalize_display_path(path: &std::path::Path) -> String {
    let s = path.to_string_lossy();
    let normalized = s.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .unwrap_or(&normalized)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_field_path() {
        let segments = split_field_path("a.b.c").unwrap();
        assert_eq!(segments.as_slice(), &["a", "b", "c"]);

        assert_eq!(split_field_path("single").unwrap().as_slice(), &["single"]);
        assert!(split_field_path("").is_none());
        assert!(split_field_path("a..b").is_none());
        assert!(split_field_path(".leading").is_none());
    }

    #[test]
    fn test_join_qualified() {
        assert_eq!(join_qualified("pkg.Class", "method"), "pkg.Class.method");
        assert_eq!(join_qualified("", "root"), "root");
    }
}
