//! URL path helpers

/// Percent-encode `value` as exactly one URL path segment
///
/// Separators and query/fragment delimiters are escaped, so the result can
/// never address a sibling or parent resource. Empty and dot segments are
/// refused since URL normalisation would collapse them.
pub fn path_segment(value: &str) -> Option<String> {
    if matches!(value, "" | "." | "..") {
        return None;
    }
    Some(urlencoding::encode(value).into_owned())
}
