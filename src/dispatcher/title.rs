//! Conversation title autogeneration (§4.1, §10.6: normalize whitespace —
//! collapse runs to a single space and trim the ends — before truncating
//! to 50 chars with an ellipsis).

const MAX_TITLE_LEN: usize = 50;

/// Derive a conversation title from the first user message.
pub fn derive_title(text: &str) -> String {
    let normalized: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= MAX_TITLE_LEN {
        return normalized;
    }
    let truncated: String = normalized.chars().take(MAX_TITLE_LEN.saturating_sub(1)).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(derive_title("  hello   world  "), "hello world");
    }

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(derive_title("hello"), "hello");
    }

    #[test]
    fn long_text_truncates_with_ellipsis() {
        let text = "a".repeat(80);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with('…'));
    }
}
