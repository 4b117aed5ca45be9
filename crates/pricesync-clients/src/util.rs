//! Small shared helpers.

/// Truncate a string for log/error output without splitting a UTF-8
/// character.
pub(crate) fn truncate_safe(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_safe("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "é" is two bytes; cutting at 1 would split it
        let out = truncate_safe("élan", 1);
        assert_eq!(out, "...");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate_safe("abcdefgh", 4), "abcd...");
    }
}
