//! Length bounds measured in UTF-16 code units, the unit SMS payloads are counted in.

/// Appended to page text that was clipped.
pub const TRUNCATION_MARKER: &str = "...";

/// Byte offset where the first `limit` UTF-16 units of `text` end, or `None` if `text` fits.
/// Never splits a surrogate pair: a pair straddling the limit is left out.
fn utf16_cut(text: &str, limit: usize) -> Option<usize> {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        let width = ch.len_utf16();
        if units + width > limit {
            return Some(idx);
        }
        units += width;
    }
    None
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// At most the first `limit` units of `text`.
pub fn prefix(text: &str, limit: usize) -> &str {
    match utf16_cut(text, limit) {
        Some(end) => &text[..end],
        None => text,
    }
}

/// `text` unchanged if it fits in `limit` units; otherwise its first `limit` units followed by
/// [`TRUNCATION_MARKER`].
pub fn bound_with_marker(text: String, limit: usize) -> String {
    match utf16_cut(&text, limit) {
        Some(end) => {
            let mut out = String::with_capacity(end + TRUNCATION_MARKER.len());
            out.push_str(&text[..end]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_at_limit_is_unchanged() {
        let body = "a".repeat(1200);
        assert_eq!(bound_with_marker(body.clone(), 1200), body);
    }

    #[test]
    fn text_over_limit_is_cut_and_marked() {
        let body = "b".repeat(1201);
        let out = bound_with_marker(body, 1200);
        assert_eq!(utf16_len(&out), 1203);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..1200], "b".repeat(1200));
    }

    #[test]
    fn counts_utf16_units_not_bytes() {
        // 'é' is two bytes in UTF-8 but one UTF-16 unit.
        let body = "é".repeat(10);
        assert_eq!(bound_with_marker(body.clone(), 10), body);
        assert_eq!(prefix(&body, 4), "éééé");
    }

    #[test]
    fn does_not_split_surrogate_pairs() {
        // Each emoji is two UTF-16 units.
        let body = "😀😀😀";
        assert_eq!(prefix(body, 3), "😀");
        assert_eq!(bound_with_marker(body.to_string(), 5), "😀😀...");
    }

    #[test]
    fn prefix_of_short_text_is_whole() {
        assert_eq!(prefix("short", 100), "short");
        assert_eq!(prefix("", 100), "");
    }
}
