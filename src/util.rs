//! Shared utility functions

/// Maximum bytes of a raw input line echoed into log messages
pub const PREVIEW_BYTES: usize = 120;

/// Safely truncate a string to at most `max_bytes` while respecting UTF-8 boundaries.
///
/// # Examples
///
/// ```
/// use genui::util::truncate_utf8_safe;
///
/// assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
///
/// let s = "cafe\u{0301}";
/// let truncated = truncate_utf8_safe(s, 5);
/// assert!(truncated.len() <= 5);
/// ```
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Shorten a line for log output, marking the cut with an ellipsis
pub fn preview(s: &str) -> String {
    let cut = truncate_utf8_safe(s, PREVIEW_BYTES);
    if cut.len() < s.len() {
        format!("{}…", cut)
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate_utf8_safe("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_at_utf8_boundary() {
        let s = "日本語";
        assert_eq!(truncate_utf8_safe(s, 4), "日");
        assert_eq!(truncate_utf8_safe(s, 6), "日本");
    }

    #[test]
    fn test_preview_marks_truncation() {
        let long = "x".repeat(PREVIEW_BYTES + 10);
        let shown = preview(&long);
        assert!(shown.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
